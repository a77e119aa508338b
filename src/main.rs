use clap::{Parser, Subcommand};
use postframe::access::LocalDirAccess;
use postframe::imaging::{CropParams, Dimensions, ImageBackend, RustBackend};
use postframe::ratio::AspectRatio;
use postframe::session::CancelToken;
use postframe::{config, logging, output, process};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "postframe")]
#[command(about = "Crop, ratio-lock and finalize photos for multi-image posts")]
#[command(long_about = "\
Crop, ratio-lock and finalize photos for multi-image posts

Every post shares one aspect ratio (1:1, 4:5 or 16:9), locked when the first
asset is selected. Each asset is cropped by a zoom/offset pair over a crop
frame and rendered to a new JPEG at the ratio's fixed size:

  1:1   1080×1080
  4:5   1080×1350
  16:9  1920×1080

Only rendered files ever leave the pipeline; gallery handles and remote URLs
are rejected at every hand-off.

Run 'postframe gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml; relative output paths resolve against it
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the crop geometry for one image without rendering anything
    Plan(PlanArgs),
    /// Finalize every asset of a JSON request and write a manifest
    Finalize {
        /// Request file (JSON)
        request: PathBuf,
        /// Where to write the manifest
        #[arg(long, default_value = "manifest.json")]
        manifest: PathBuf,
        /// Media library root the access check runs against
        /// (default: the request's directory)
        #[arg(long)]
        media_root: Option<PathBuf>,
        /// Delete files in the output directory the new manifest does not reference
        #[arg(long)]
        prune: bool,
    },
    /// Run the hand-off checks on a manifest
    Check {
        /// Manifest file (JSON)
        manifest: PathBuf,
        /// Also run the pre-upload check for this user
        #[arg(long)]
        user: Option<String>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct PlanArgs {
    /// Image to probe for its size
    #[arg(required_unless_present = "size", conflicts_with = "size")]
    image: Option<PathBuf>,
    /// Image size instead of a file, e.g. 2000x1000
    #[arg(long, value_parser = parse_size)]
    size: Option<Dimensions>,
    /// Aspect ratio (default: the photo ratio from config)
    #[arg(long)]
    ratio: Option<AspectRatio>,
    #[arg(long, requires = "zoom")]
    offset_x: Option<f64>,
    #[arg(long, requires = "zoom")]
    offset_y: Option<f64>,
    /// Zoom to check; omitted means the fit-scale default
    #[arg(long)]
    zoom: Option<f64>,
}

fn parse_size(raw: &str) -> Result<Dimensions, String> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {raw:?}"))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid size {raw:?}: {e}"))
    };
    Ok(Dimensions {
        width: parse(w)?,
        height: parse(h)?,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    if cli.verbose {
        logging::init_with("postframe=debug");
    } else {
        logging::init();
    }

    match cli.command {
        Command::Plan(args) => {
            let config = config::load_config(&cli.config_dir)?;
            let image = match (args.size, &args.image) {
                (Some(size), _) => size,
                (None, Some(path)) => RustBackend::new().identify(path)?,
                (None, None) => return Err("either an image or --size is required".into()),
            };
            let requested = args.zoom.map(|zoom| CropParams {
                zoom,
                offset_x: args.offset_x.unwrap_or(0.0),
                offset_y: args.offset_y.unwrap_or(0.0),
            });
            let ratio = args.ratio.unwrap_or(config.ratios.photo);
            let plan = process::plan_crop(image, config.viewport(), ratio, requested);
            output::print_plan(&plan);
        }
        Command::Finalize {
            request,
            manifest,
            media_root,
            prune,
        } => {
            let config = config::load_config(&cli.config_dir)?;
            let req = process::load_request(&request)?;
            let settings = config.session_settings(req.kind, &cli.config_dir);
            let output_dir = settings.output.dir.clone();
            let root = media_root.unwrap_or_else(|| parent_dir(&request));

            let result = process::process(
                &LocalDirAccess::new(root),
                &req,
                settings,
                &CancelToken::new(),
            )?;
            process::write_manifest(&manifest, &result)?;
            output::print_finalize(&result);
            if prune {
                let removed = process::prune_unreferenced(&output_dir, &result)?;
                println!("Pruned {} stale file(s)", removed);
            }
            println!("Manifest: {}", manifest.display());
        }
        Command::Check { manifest, user } => {
            let loaded = process::load_manifest(&manifest)?;
            let result = process::check_manifest(&loaded, user.as_deref());
            output::print_check(&loaded, user.as_deref(), &result);
            result?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
