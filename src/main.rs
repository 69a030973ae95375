//! Face overlay application: live video with sprites pinned to facial features.

use anyhow::{Context, Result};
use clap::Parser;
use face_overlay::app::{Control, OverlayApp, UiEvent};
use face_overlay::config::{ConfigStore, Settings};
use face_overlay::console::{parse_command, HELP};
use face_overlay::constants::DEFAULT_LOG_FILE;
use face_overlay::detection::ScrfdDetector;
use face_overlay::overlay::OverlayRegistry;
use face_overlay::pipeline::{PipelineController, PipelineSettings, SourceSpec};
use face_overlay::vision::OpenCvBackend;
use log::info;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory with one sub-directory of sprites per overlay identity
    #[arg(short, long)]
    assets: Option<PathBuf>,

    /// Overlay identity to load at startup
    #[arg(short = 't', long)]
    identity: Option<String>,

    /// Camera index to use
    #[arg(long)]
    cam: Option<i32>,

    /// Video file to process (.mp4, .avi, .mov)
    #[arg(short, long)]
    video: Option<PathBuf>,

    /// SCRFD face detector model (ONNX)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Log file
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Do not open a display window
    #[arg(long)]
    headless: bool,

    /// Start capturing right away
    #[arg(long)]
    start: bool,
}

fn init_logging(args: &Args) -> Result<()> {
    if let Some(parent) = args.log_file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create log directory {}", parent.display()))?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&args.log_file)
        .with_context(|| format!("Cannot open log file {}", args.log_file.display()))?;

    let level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::new().default_filter_or(level))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Settings::from_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?
        }
        None => Settings::default(),
    };

    if let Some(root) = &args.assets {
        settings.assets.root = root.clone();
    }
    if let Some(identity) = &args.identity {
        settings.assets.default_identity = Some(identity.clone());
    }
    if let Some(index) = args.cam {
        settings.video.camera_index = index;
        settings.video.file = None;
    }
    if let Some(video) = &args.video {
        settings.video.file = Some(video.clone());
    }
    if let Some(model) = &args.model {
        settings.detection.model = model.clone();
    }

    settings.validate()?;
    Ok(settings)
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    init_logging(&args)?;

    info!("Face Overlay {} ({})", env!("CARGO_PKG_VERSION"), env!("BUILD_TARGET"));
    let settings = load_settings(&args)?;

    let registry = OverlayRegistry::new(
        settings.assets.root.clone(),
        ConfigStore::new(settings.overlay.clone()),
    );
    // No identities at all is the one unrecoverable startup condition
    let identities = registry.identities().context("No overlay assets available")?;
    info!("Available overlay identities: {}", identities.join(", "));
    println!("Overlay targets: {}", identities.join(", "));

    let detector = ScrfdDetector::new(&settings.detection.model, settings.detection.confidence_threshold)?;

    let (notifications, receiver) = mpsc::channel();
    let printer = thread::spawn(move || {
        for notification in receiver {
            if notification.is_error() {
                eprintln!("{notification}");
            } else {
                println!("{notification}");
            }
        }
    });

    let source = match &settings.video.file {
        Some(path) => SourceSpec::File(path.clone()),
        None => SourceSpec::Camera(settings.video.camera_index),
    };
    let controller = PipelineController::new(
        Arc::new(OpenCvBackend {
            headless: args.headless,
        }),
        Box::new(detector),
        registry.clone(),
        PipelineSettings::from_settings(&settings),
        notifications.clone(),
    );
    let mut app = OverlayApp::new(controller, registry, source, notifications);

    if let Some(identity) = settings.assets.default_identity.clone() {
        app.dispatch(UiEvent::SelectIdentity(identity));
    }
    if args.start {
        app.dispatch(UiEvent::StartCapture);
    }

    println!("{HELP}");
    for line in io::stdin().lock().lines() {
        match parse_command(&line?) {
            Ok(Some(event)) => {
                if app.dispatch(event) == Control::Exit {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => eprintln!("{e}"),
        }
    }

    // Dropping the app stops capture and closes the notification channel
    drop(app);
    printer
        .join()
        .map_err(|_| anyhow::anyhow!("Notification printer panicked"))?;

    info!("Application shutting down");
    Ok(())
}
