//! Frame pipeline controller.
//!
//! A capture session runs on its own thread and repeats one tick:
//! acquire frame, detect face, compute geometry, composite, present.
//! The UI thread talks to it only through the shared [`ConfigStore`], the
//! [`OverlayRegistry`] and the session's stop flag.

use crate::compositor::Frame;
use crate::config::{ConfigStore, FrameSize, Settings};
use crate::constants::SUPPORTED_VIDEO_EXTENSIONS;
use crate::error::Notification;
use crate::geometry::FeatureGeometry;
use crate::keypoints::NormalizedDetection;
use crate::overlay::OverlayRegistry;
use crate::smoothing::PositionSmoother;
use crate::{Error, Result};
use image::imageops::{self, FilterType};
use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Where frames come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// Camera device index
    Camera(i32),
    /// Video file path
    File(PathBuf),
}

impl SourceSpec {
    /// Check the source before anything is opened
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` for a missing file or unsupported extension, and
    /// `Source` for a negative camera index
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Camera(index) if *index < 0 => {
                Err(Error::Source(format!("Invalid camera index {index}")))
            }
            Self::Camera(_) => Ok(()),
            Self::File(path) => validate_video_path(path),
        }
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Camera(index) => write!(f, "camera {index}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Accept existing `.mp4`, `.avi` and `.mov` files (case-insensitive)
///
/// # Errors
///
/// Returns `InvalidPath` describing what is wrong with `path`
pub fn validate_video_path(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !SUPPORTED_VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        return Err(Error::InvalidPath(format!(
            "{} (supported formats: {})",
            path.display(),
            SUPPORTED_VIDEO_EXTENSIONS.join(", ")
        )));
    }
    if !path.is_file() {
        return Err(Error::InvalidPath(format!("{} does not exist", path.display())));
    }
    Ok(())
}

/// Supplier of frames for one capture session
///
/// Dropping the source releases the device or file.
pub trait FrameSource: Send {
    /// Next frame, or `None` once the source is exhausted
    fn read(&mut self) -> Result<Option<Frame>>;

    /// Human-readable name used in notifications
    fn describe(&self) -> String;
}

/// Face detector producing at most one face per frame
pub trait FaceDetector: Send {
    /// Detect the most confident face, in frame-relative coordinates
    fn detect(&mut self, frame: &Frame) -> Result<Option<NormalizedDetection>>;
}

/// What the presentation surface wants after showing a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkSignal {
    Continue,
    /// The user asked to end the session
    Quit,
}

/// Presentation surface for composited frames
pub trait FrameSink {
    fn present(&mut self, frame: &Frame) -> Result<SinkSignal>;
}

/// Sink that discards every frame
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn present(&mut self, _frame: &Frame) -> Result<SinkSignal> {
        Ok(SinkSignal::Continue)
    }
}

/// Opens sources and sinks for capture sessions
pub trait MediaBackend: Send + Sync {
    /// Open a validated source, asking for frames of `frame_size`
    fn open_source(&self, spec: &SourceSpec, frame_size: FrameSize) -> Result<Box<dyn FrameSource>>;

    /// Open the presentation surface; called on the pipeline thread
    fn open_sink(&self) -> Result<Box<dyn FrameSink>>;
}

/// Detector shared between successive sessions
pub type SharedDetector = Arc<Mutex<Box<dyn FaceDetector>>>;

/// Pipeline parameters fixed for the lifetime of the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Size every frame is resized to before detection
    pub frame_size: FrameSize,
    /// Scheduling quantum between ticks
    pub tick_interval: Duration,
    /// Smoothing filter description
    pub smoothing_filter: String,
}

impl PipelineSettings {
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            frame_size: settings.video.frame_size,
            tick_interval: settings.video.tick_interval(),
            smoothing_filter: settings.smoothing.filter.clone(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A face was found and the composited frame was presented
    Presented { overlays: usize },
    /// No face this frame; the unmodified frame was presented
    NoFace,
    /// Compositing failed; the unmodified frame was presented
    Degraded,
    /// The source has no more frames
    Exhausted,
    /// The sink asked to end the session
    Quit,
}

/// Achieved frame rate over one-second windows
#[derive(Debug)]
struct FrameStats {
    window_start: Instant,
    frames: u32,
    fps: f64,
}

impl FrameStats {
    fn new() -> Self {
        Self {
            window_start: Instant::now(),
            frames: 0,
            fps: 0.0,
        }
    }

    fn record(&mut self) {
        self.frames += 1;
        let elapsed = self.window_start.elapsed();
        if elapsed >= Duration::from_secs(1) {
            self.fps = f64::from(self.frames) / elapsed.as_secs_f64();
            log::debug!("Pipeline running at {:.1} FPS", self.fps);
            self.frames = 0;
            self.window_start = Instant::now();
        }
    }
}

/// State of one capture session
pub struct FrameLoop {
    source: Box<dyn FrameSource>,
    detector: SharedDetector,
    sink: Box<dyn FrameSink>,
    registry: OverlayRegistry,
    geometry: FeatureGeometry,
    frame_size: FrameSize,
    sprite_generation: Option<u64>,
    stats: FrameStats,
}

impl FrameLoop {
    /// # Errors
    ///
    /// Returns `FilterError` if the smoothing filter description is invalid
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: SharedDetector,
        sink: Box<dyn FrameSink>,
        registry: OverlayRegistry,
        settings: &PipelineSettings,
    ) -> Result<Self> {
        let smoother = PositionSmoother::with_filter(&settings.smoothing_filter)?;
        Ok(Self {
            source,
            detector,
            sink,
            registry,
            geometry: FeatureGeometry::with_smoother(smoother),
            frame_size: settings.frame_size,
            sprite_generation: None,
            stats: FrameStats::new(),
        })
    }

    /// Run one acquire, detect, composite, present cycle
    ///
    /// # Errors
    ///
    /// Propagates source read and sink errors; both end the session.
    /// Detection and compositing failures only degrade the current tick.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        let Some(frame) = self.source.read()? else {
            return Ok(TickOutcome::Exhausted);
        };
        let frame = self.fit_frame(frame);

        // One consistent view of the settings and sprites for the whole tick
        let config = self.registry.config().snapshot();
        let sprites = self.registry.sprite_snapshot();
        // Smoothing restarts on an identity load only; eye variant swaps keep it
        let generation = sprites.as_ref().map(|set| set.generation());
        if generation != self.sprite_generation {
            self.geometry.reset();
            self.sprite_generation = generation;
        }

        let detection = match self.detector.lock().detect(&frame) {
            Ok(detection) => detection,
            Err(e) => {
                log::warn!("Face detection failed: {e}");
                None
            }
        };

        let (output, outcome) = match (detection, sprites.as_ref()) {
            (Some(detection), Some(set)) => {
                let placements =
                    self.geometry
                        .compute_positions(&detection, frame.width(), frame.height(), &config);
                let mut composited = frame.clone();
                match set.apply(&mut composited, &placements, &config) {
                    Ok(overlays) => (composited, TickOutcome::Presented { overlays }),
                    Err(e) => {
                        log::warn!("Compositing failed, presenting the unmodified frame: {e}");
                        (frame, TickOutcome::Degraded)
                    }
                }
            }
            (Some(_), None) => (frame, TickOutcome::Presented { overlays: 0 }),
            (None, _) => (frame, TickOutcome::NoFace),
        };

        let signal = self.sink.present(&output)?;
        self.stats.record();
        if signal == SinkSignal::Quit {
            return Ok(TickOutcome::Quit);
        }
        Ok(outcome)
    }

    /// Description of the underlying source
    #[must_use]
    pub fn describe_source(&self) -> String {
        self.source.describe()
    }

    /// Frame rate over the last complete one-second window
    #[must_use]
    pub fn fps(&self) -> f64 {
        self.stats.fps
    }

    fn fit_frame(&self, frame: Frame) -> Frame {
        let FrameSize { width, height } = self.frame_size;
        if frame.dimensions() == (width, height) {
            frame
        } else {
            imageops::resize(&frame, width, height, FilterType::Triangle)
        }
    }
}

/// Coarse controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Capturing,
}

struct Session {
    source: SourceSpec,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Starts and stops capture sessions; at most one runs at a time
pub struct PipelineController {
    backend: Arc<dyn MediaBackend>,
    detector: SharedDetector,
    registry: OverlayRegistry,
    settings: PipelineSettings,
    notifications: Sender<Notification>,
    session: Option<Session>,
}

impl PipelineController {
    pub fn new(
        backend: Arc<dyn MediaBackend>,
        detector: Box<dyn FaceDetector>,
        registry: OverlayRegistry,
        settings: PipelineSettings,
        notifications: Sender<Notification>,
    ) -> Self {
        Self {
            backend,
            detector: Arc::new(Mutex::new(detector)),
            registry,
            settings,
            notifications,
            session: None,
        }
    }

    /// Start capturing from `spec`, stopping any running session first
    ///
    /// # Errors
    ///
    /// Returns `NoIdentity` if no overlay identity is loaded, `InvalidPath`
    /// for a rejected video file, or the backend's error if the source
    /// cannot be opened. A missing identity or rejected source leaves a
    /// running session untouched; a source that fails to open leaves the
    /// controller idle.
    pub fn start(&mut self, spec: SourceSpec) -> Result<()> {
        if !self.registry.has_identity() {
            return Err(Error::NoIdentity);
        }
        spec.validate()?;
        self.stop();

        let source = self.backend.open_source(&spec, self.settings.frame_size)?;
        log::info!("Starting capture from {spec}");

        let stop = Arc::new(AtomicBool::new(false));
        let worker = Worker {
            source,
            backend: Arc::clone(&self.backend),
            detector: Arc::clone(&self.detector),
            registry: self.registry.clone(),
            settings: self.settings.clone(),
            notifications: self.notifications.clone(),
            stop: Arc::clone(&stop),
        };
        let handle = thread::Builder::new()
            .name("frame-pipeline".to_string())
            .spawn(move || worker.run())?;

        self.session = Some(Session {
            source: spec,
            stop,
            handle,
        });
        Ok(())
    }

    /// Stop the running session and wait until its source is released
    ///
    /// Returns `false` if nothing was running.
    pub fn stop(&mut self) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        session.stop.store(true, Ordering::SeqCst);
        if session.handle.join().is_err() {
            log::error!("Frame pipeline thread panicked");
        }
        log::info!("Capture from {} stopped", session.source);
        true
    }

    #[must_use]
    pub fn state(&self) -> PipelineState {
        match &self.session {
            Some(session) if !session.handle.is_finished() => PipelineState::Capturing,
            _ => PipelineState::Idle,
        }
    }

    /// Source of the running session
    #[must_use]
    pub fn current_source(&self) -> Option<&SourceSpec> {
        match self.state() {
            PipelineState::Capturing => self.session.as_ref().map(|session| &session.source),
            PipelineState::Idle => None,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Everything the pipeline thread owns
struct Worker {
    source: Box<dyn FrameSource>,
    backend: Arc<dyn MediaBackend>,
    detector: SharedDetector,
    registry: OverlayRegistry,
    settings: PipelineSettings,
    notifications: Sender<Notification>,
    stop: Arc<AtomicBool>,
}

impl Worker {
    fn run(self) {
        let notify = |notification: Notification| {
            if self.notifications.send(notification).is_err() {
                log::debug!("Notification receiver is gone");
            }
        };

        let frame_loop = self.backend.open_sink().and_then(|sink| {
            FrameLoop::new(
                self.source,
                Arc::clone(&self.detector),
                sink,
                self.registry.clone(),
                &self.settings,
            )
        });
        let mut frame_loop = match frame_loop {
            Ok(frame_loop) => frame_loop,
            Err(e) => {
                log::error!("Cannot start capture session: {e}");
                notify(e.notification());
                return;
            }
        };

        let description = frame_loop.describe_source();
        loop {
            if self.stop.load(Ordering::SeqCst) {
                notify(Notification::Stopped);
                break;
            }

            let started = Instant::now();
            match frame_loop.tick() {
                Ok(TickOutcome::Exhausted) => {
                    log::info!("Source {description} exhausted");
                    notify(Notification::SourceExhausted(description.clone()));
                    break;
                }
                Ok(TickOutcome::Quit) => {
                    log::info!("Quit requested from the display window");
                    notify(Notification::Stopped);
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    log::error!("Capture session ended: {e}");
                    notify(e.notification());
                    break;
                }
            }

            if let Some(remaining) = self.settings.tick_interval.checked_sub(started.elapsed()) {
                thread::sleep(remaining);
            }
        }
    }
}
