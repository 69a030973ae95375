//! `OpenCV` capture and display backend.

use crate::compositor::Frame;
use crate::config::FrameSize;
use crate::constants::WINDOW_TITLE;
use crate::pipeline::{FrameSink, FrameSource, MediaBackend, NullSink, SinkSignal, SourceSpec};
use crate::utils::image_conversion::{frame_to_mat, mat_to_frame};
use crate::{Error, Result};
use opencv::core::Mat;
use opencv::highgui::{self, WINDOW_NORMAL};
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH};
use std::path::Path;

/// Camera or video file opened through `VideoCapture`
///
/// The device is released when the source is dropped.
pub struct OpenCvSource {
    capture: VideoCapture,
    buffer: Mat,
    description: String,
}

impl OpenCvSource {
    /// Open camera `index`, asking for frames of `frame_size`
    ///
    /// # Errors
    ///
    /// Returns `Source` if the camera cannot be opened
    pub fn camera(index: i32, frame_size: FrameSize) -> Result<Self> {
        log::info!("Opening camera {index}");
        let mut capture = VideoCapture::new(index, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(Error::Source(format!("Camera {index} could not be opened")));
        }

        capture.set(CAP_PROP_FRAME_WIDTH, f64::from(frame_size.width))?;
        capture.set(CAP_PROP_FRAME_HEIGHT, f64::from(frame_size.height))?;
        // Reduce buffer size for lower latency (webcam only)
        capture.set(CAP_PROP_BUFFERSIZE, 1.0)?;

        Ok(Self {
            capture,
            buffer: Mat::default(),
            description: format!("camera {index}"),
        })
    }

    /// Open a video file
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` if the file cannot be decoded
    pub fn file(path: &Path) -> Result<Self> {
        log::info!("Opening video file: {}", path.display());
        let path_str = path
            .to_str()
            .ok_or_else(|| Error::InvalidPath(format!("{} is not valid UTF-8", path.display())))?;
        let capture = VideoCapture::from_file(path_str, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(Error::InvalidPath(format!(
                "{} could not be decoded",
                path.display()
            )));
        }

        Ok(Self {
            capture,
            buffer: Mat::default(),
            description: path.display().to_string(),
        })
    }
}

impl FrameSource for OpenCvSource {
    fn read(&mut self) -> Result<Option<Frame>> {
        if !self.capture.read(&mut self.buffer)? || self.buffer.empty() {
            return Ok(None);
        }
        mat_to_frame(&self.buffer).map(Some)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

impl Drop for OpenCvSource {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            log::warn!("Failed to release {}: {e}", self.description);
        } else {
            log::debug!("Released {}", self.description);
        }
    }
}

/// `highgui` window showing the composited frames
///
/// Pressing `q` or Escape in the window ends the session.
pub struct HighguiSink {
    title: String,
}

impl HighguiSink {
    /// # Errors
    ///
    /// Returns `OpenCV` if the window cannot be created
    pub fn new(title: &str) -> Result<Self> {
        highgui::named_window(title, WINDOW_NORMAL)?;
        Ok(Self {
            title: title.to_string(),
        })
    }
}

impl FrameSink for HighguiSink {
    fn present(&mut self, frame: &Frame) -> Result<SinkSignal> {
        let mat = frame_to_mat(frame)?;
        highgui::imshow(&self.title, &mat)?;

        let key = highgui::wait_key(1)?;
        if key == 27 || key == i32::from(b'q') {
            return Ok(SinkSignal::Quit);
        }
        Ok(SinkSignal::Continue)
    }
}

impl Drop for HighguiSink {
    fn drop(&mut self) {
        if let Err(e) = highgui::destroy_window(&self.title) {
            log::debug!("Failed to close window: {e}");
        }
    }
}

/// Media backend built on `OpenCV`
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenCvBackend {
    /// Discard frames instead of opening a window
    pub headless: bool,
}

impl MediaBackend for OpenCvBackend {
    fn open_source(&self, spec: &SourceSpec, frame_size: FrameSize) -> Result<Box<dyn FrameSource>> {
        let source = match spec {
            SourceSpec::Camera(index) => OpenCvSource::camera(*index, frame_size)?,
            SourceSpec::File(path) => OpenCvSource::file(path)?,
        };
        Ok(Box::new(source))
    }

    fn open_sink(&self) -> Result<Box<dyn FrameSink>> {
        if self.headless {
            Ok(Box::new(NullSink))
        } else {
            Ok(Box::new(HighguiSink::new(WINDOW_TITLE)?))
        }
    }
}
