use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};

use pagesnap::capture::selection::{FixedSelection, SelectionSource};
use pagesnap::capture::sources::StaticPage;
use pagesnap::capture::{
    CaptureDependencies, CaptureManager, CaptureMode, CaptureOutcome, CaptureRequest,
    DirectorySink, MAX_DELAY_SECS,
};
use pagesnap::config::Config;
use pagesnap::draw::raster;
use pagesnap::editor::{EditorSession, ExportFormat, script};
use pagesnap::notification::DesktopNotifier;
use pagesnap::util::Rect;

#[derive(Parser, Debug)]
#[command(name = "pagesnap")]
#[command(version, about = "Full-page screenshot capture, stitching and annotation")]
struct Cli {
    /// Config file to use instead of ~/.config/pagesnap/config.toml
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture a page image through the scroll-and-stitch pipeline
    Capture(CaptureArgs),
    /// Replay editor commands on an image and export the result
    Annotate(AnnotateArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ModeArg {
    Viewport,
    Fullpage,
    Selection,
    Element,
}

#[derive(Args, Debug)]
struct CaptureArgs {
    /// Image of the whole rendered page, in device pixels
    #[arg(long, value_name = "PNG")]
    page: PathBuf,

    /// Viewport height in CSS pixels
    #[arg(long, value_name = "PX")]
    viewport_height: u32,

    /// Device pixel ratio of the page image
    #[arg(long, default_value_t = 1.0)]
    dpr: f64,

    #[arg(long, value_enum, default_value_t = ModeArg::Fullpage)]
    mode: ModeArg,

    /// Selection rectangle (viewport CSS pixels) or element bounds (document
    /// CSS pixels), as x,y,w,h
    #[arg(long, value_name = "X,Y,W,H", value_parser = parse_rect)]
    rect: Option<Rect>,

    /// CSS selector for element capture
    #[arg(long)]
    selector: Option<String>,

    /// Countdown in seconds before capturing (0-60)
    #[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(0..=MAX_DELAY_SECS))]
    delay: Option<u64>,

    /// Directory that receives the captured image
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Post a desktop notification with the outcome
    #[arg(long)]
    notify: bool,
}

#[derive(Args, Debug)]
struct AnnotateArgs {
    /// Image file, image data URL, or editor URL with an `image` parameter
    image: String,

    /// JSON list of editor commands
    #[arg(long, value_name = "FILE")]
    ops: PathBuf,

    #[arg(long, value_parser = parse_format)]
    format: Option<ExportFormat>,

    /// Directory that receives the exported image
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
}

fn parse_rect(value: &str) -> Result<Rect, String> {
    let parts: Vec<i32> = value
        .split(',')
        .map(|part| part.trim().parse::<i32>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid rectangle '{value}': {e}"))?;
    match parts.as_slice() {
        [x, y, w, h] => Rect::new(*x, *y, *w, *h)
            .ok_or_else(|| format!("rectangle '{value}' has no area")),
        _ => Err(format!("expected x,y,w,h, got '{value}'")),
    }
}

fn parse_format(value: &str) -> Result<ExportFormat, String> {
    value.parse().map_err(|e| format!("{e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Command::Capture(args) => run_capture(args, &config).await,
        Command::Annotate(args) => run_annotate(args, &config),
    }
}

async fn run_capture(args: CaptureArgs, config: &Config) -> Result<()> {
    if args.viewport_height == 0 {
        bail!("--viewport-height must be positive");
    }

    let mut page = StaticPage::from_file(&args.page, args.viewport_height, args.dpr)
        .with_context(|| format!("Failed to load page image {}", args.page.display()))?;

    let mode = match args.mode {
        ModeArg::Viewport => CaptureMode::Viewport,
        ModeArg::Fullpage => CaptureMode::FullPage,
        ModeArg::Selection => CaptureMode::Selection,
        ModeArg::Element => {
            let selector = args
                .selector
                .clone()
                .context("--mode element needs --selector")?;
            if let Some(rect) = args.rect {
                page = page.with_element(selector.clone(), rect);
            }
            CaptureMode::Element { selector }
        }
    };

    let selection: Option<Arc<dyn SelectionSource>> = match args.mode {
        ModeArg::Selection => Some(Arc::new(FixedSelection(args.rect))),
        _ => None,
    };

    let mut save = config.file_save_config();
    if let Some(dir) = args.output_dir {
        save.save_directory = dir;
    }
    let output_dir = save.save_directory.clone();

    let handle = tokio::runtime::Handle::current();
    let mut dependencies = CaptureDependencies::for_static_page(
        &handle,
        Arc::new(page),
        selection,
        Arc::new(DirectorySink::new(save)),
    );
    let notifier = args
        .notify
        .then(|| Arc::new(DesktopNotifier::new(handle.clone())));
    if let Some(notifier) = &notifier {
        dependencies = dependencies.with_notifier(notifier.clone());
    }

    let manager = CaptureManager::with_dependencies(&handle, dependencies, config.capture_settings());
    let delay = args
        .delay
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.default_delay());
    manager.request_capture(CaptureRequest::new(mode).with_delay(delay))?;

    let outcome = manager.wait_for_outcome().await;
    if let Some(notifier) = &notifier {
        notifier.flush(Duration::from_secs(5)).await;
    }

    match outcome {
        CaptureOutcome::Success(image) => {
            println!(
                "Captured {}x{} image into {}",
                image.width,
                image.height,
                output_dir.display()
            );
            Ok(())
        }
        CaptureOutcome::Cancelled(reason) => {
            println!("Capture cancelled: {reason}");
            Ok(())
        }
        CaptureOutcome::Failed(reason) => bail!("Capture failed: {reason}"),
    }
}

fn open_session(image: &str, config: &Config) -> Result<EditorSession> {
    let settings = config.tool_settings();
    let options = config.editor_options();
    if image.starts_with("data:") {
        return Ok(EditorSession::from_data_url(image, settings, options)?);
    }
    let path = Path::new(image);
    if path.exists() {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let decoded = raster::decode(&bytes)
            .with_context(|| format!("Failed to decode {}", path.display()))?;
        return Ok(EditorSession::new(decoded, settings, options));
    }
    EditorSession::from_editor_url(image, settings, options)
        .with_context(|| format!("'{image}' is neither a file, a data URL nor an editor URL"))
}

fn run_annotate(args: AnnotateArgs, config: &Config) -> Result<()> {
    let mut session = open_session(&args.image, config)?;

    let ops = std::fs::read_to_string(&args.ops)
        .with_context(|| format!("Failed to read {}", args.ops.display()))?;
    let commands = script::parse_script(&ops)
        .with_context(|| format!("Failed to parse {}", args.ops.display()))?;
    script::replay(&mut session, &commands)?;

    let mut options = config.export_options();
    if let Some(format) = args.format {
        options.format = format;
    }
    if let Some(dir) = args.output_dir {
        options.save.save_directory = dir;
    }

    let path = session.save(&options)?;
    println!("Saved {}", path.display());
    Ok(())
}
