//! Main application module: the UI-event dispatch boundary.
//!
//! Every user action arrives as a [`UiEvent`]. [`OverlayApp::dispatch`] is the
//! one place where errors are caught, logged and turned into notifications.

use crate::config::{FeatureGroup, SliderKind};
use crate::error::Notification;
use crate::keypoints::Feature;
use crate::overlay::{LoadReport, OverlayRegistry};
use crate::pipeline::{PipelineController, PipelineState, SourceSpec};
use crate::Result;
use std::sync::mpsc::Sender;

/// Discrete user action
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Start capturing from the selected source
    StartCapture,
    /// Stop the running capture
    StopCapture,
    /// Select another camera or video file; restarts a running capture
    SwitchSource(SourceSpec),
    /// Load the sprites of an overlay identity
    SelectIdentity(String),
    /// Move a slider
    AdjustSlider {
        group: FeatureGroup,
        kind: SliderKind,
        value: f64,
    },
    /// Show or hide one feature
    ToggleFeature { feature: Feature, enabled: bool },
    /// Switch between plain and eyebrow eye sprites
    SetEyebrows(bool),
    /// Report the current state
    Status,
    /// Stop everything and exit
    Quit,
}

/// Whether the event loop should keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Exit,
}

/// Main application struct
pub struct OverlayApp {
    controller: PipelineController,
    registry: OverlayRegistry,
    source: SourceSpec,
    notifications: Sender<Notification>,
}

impl OverlayApp {
    pub fn new(
        controller: PipelineController,
        registry: OverlayRegistry,
        source: SourceSpec,
        notifications: Sender<Notification>,
    ) -> Self {
        Self {
            controller,
            registry,
            source,
            notifications,
        }
    }

    /// Handle one event, reporting any failure to the user
    pub fn dispatch(&mut self, event: UiEvent) -> Control {
        let control = if event == UiEvent::Quit {
            Control::Exit
        } else {
            Control::Continue
        };

        log::debug!("Dispatching {event:?}");
        if let Err(e) = self.handle(event) {
            log::error!("{e}");
            self.notify(e.notification());
        }
        control
    }

    fn handle(&mut self, event: UiEvent) -> Result<()> {
        match event {
            UiEvent::StartCapture => {
                self.controller.start(self.source.clone())?;
                self.notify(Notification::Info(format!("Capturing from {}", self.source)));
            }
            UiEvent::StopCapture => {
                if !self.controller.stop() {
                    self.notify(Notification::Info("Capture is not running".to_string()));
                }
            }
            UiEvent::SwitchSource(spec) => {
                spec.validate()?;
                let was_capturing = self.controller.state() == PipelineState::Capturing;
                self.source = spec;
                if was_capturing {
                    self.controller.start(self.source.clone())?;
                    self.notify(Notification::Info(format!("Capturing from {}", self.source)));
                } else {
                    self.notify(Notification::Info(format!("Source set to {}", self.source)));
                }
            }
            UiEvent::SelectIdentity(identity) => {
                let report = self.registry.load_overlays(&identity)?;
                self.report_failures(&report);
                self.notify(Notification::Info(format!("Overlay target: {identity}")));
            }
            UiEvent::AdjustSlider { group, kind, value } => {
                self.registry
                    .config()
                    .update(|config| config.apply_slider(group, kind, value))?;
            }
            UiEvent::ToggleFeature { feature, enabled } => {
                self.registry.toggle_feature(feature, enabled);
            }
            UiEvent::SetEyebrows(enabled) => {
                if let Some(report) = self.registry.set_eyebrows(enabled)? {
                    self.report_failures(&report);
                }
            }
            UiEvent::Status => {
                let status = self.status();
                self.notify(Notification::Info(status));
            }
            UiEvent::Quit => {
                self.controller.stop();
            }
        }
        Ok(())
    }

    /// One-line summary of source, target and capture state
    #[must_use]
    pub fn status(&self) -> String {
        let state = match self.controller.state() {
            PipelineState::Capturing => "capturing",
            PipelineState::Idle => "idle",
        };
        let identity = self
            .registry
            .active_identity()
            .unwrap_or_else(|| "none".to_string());
        format!("{state}, source: {}, target: {identity}", self.source)
    }

    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.controller.state()
    }

    /// Source used by the next start
    #[must_use]
    pub fn source(&self) -> &SourceSpec {
        &self.source
    }

    #[must_use]
    pub fn registry(&self) -> &OverlayRegistry {
        &self.registry
    }

    fn report_failures(&self, report: &LoadReport) {
        for (feature, reason) in &report.failures {
            self.notify(Notification::LoadFailed(format!("{feature}: {reason}")));
        }
        for feature in &report.derived {
            self.notify(Notification::Warning(format!(
                "{feature} overlay mirrored from the other eye"
            )));
        }
    }

    fn notify(&self, notification: Notification) {
        if self.notifications.send(notification).is_err() {
            log::debug!("Notification receiver is gone");
        }
    }
}
