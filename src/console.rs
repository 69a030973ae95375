//! Text commands standing in for the control panel.
//!
//! One command per line, e.g. `target kim`, `size eye 150`, `show nose off`.

use crate::app::UiEvent;
use crate::config::{FeatureGroup, SliderKind};
use crate::keypoints::Feature;
use crate::pipeline::SourceSpec;
use crate::{Error, Result};
use std::path::PathBuf;

/// Usage text printed for unknown commands
pub const HELP: &str = "\
commands:
  start | stop                 start or stop capturing
  camera N                     capture from camera N
  video PATH                   capture from a .mp4, .avi or .mov file
  target NAME                  load the overlays of NAME
  size GROUP PERCENT           GROUP is eye, nose or mouth (1-400)
  offset-x GROUP PIXELS        -100..100
  offset-y GROUP PIXELS        -100..100
  spacing eye PIXELS           -20..20
  show FEATURE on|off          right_eye, left_eye, nose, mouth
  eyebrows on|off              eyebrow variant of the eye overlays
  status | quit";

/// Parse one console line; blank lines yield `None`
///
/// # Errors
///
/// Returns `InvalidInput` for unknown commands or malformed arguments
pub fn parse_command(line: &str) -> Result<Option<UiEvent>> {
    let line = line.trim();
    let Some((command, rest)) = split_word(line) else {
        return Ok(None);
    };

    let event = match command.to_lowercase().as_str() {
        "start" => UiEvent::StartCapture,
        "stop" => UiEvent::StopCapture,
        "status" => UiEvent::Status,
        "quit" | "exit" => UiEvent::Quit,
        "camera" | "cam" => {
            let index = rest
                .parse::<i32>()
                .map_err(|_| invalid(format!("camera index expected, got '{rest}'")))?;
            UiEvent::SwitchSource(SourceSpec::Camera(index))
        }
        "video" => {
            if rest.is_empty() {
                return Err(invalid("video needs a file path".to_string()));
            }
            UiEvent::SwitchSource(SourceSpec::File(PathBuf::from(rest)))
        }
        "target" => {
            if rest.is_empty() {
                return Err(invalid("target needs an identity name".to_string()));
            }
            UiEvent::SelectIdentity(rest.to_string())
        }
        "show" => {
            let (feature, state) = split_word(rest).ok_or_else(|| invalid("show FEATURE on|off".to_string()))?;
            UiEvent::ToggleFeature {
                feature: feature.parse::<Feature>()?,
                enabled: parse_switch(state)?,
            }
        }
        "eyebrows" => UiEvent::SetEyebrows(parse_switch(rest)?),
        slider => {
            let kind = slider
                .parse::<SliderKind>()
                .map_err(|_| invalid(format!("unknown command '{command}'\n{HELP}")))?;
            let (group, value) = split_word(rest).ok_or_else(|| invalid(format!("{kind} GROUP VALUE")))?;
            let value = value
                .parse::<f64>()
                .map_err(|_| invalid(format!("number expected, got '{value}'")))?;
            UiEvent::AdjustSlider {
                group: group.parse::<FeatureGroup>()?,
                kind,
                value,
            }
        }
    };
    Ok(Some(event))
}

/// First word and the trimmed remainder
fn split_word(text: &str) -> Option<(&str, &str)> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => Some((word, rest.trim())),
        None => Some((text, "")),
    }
}

fn parse_switch(word: &str) -> Result<bool> {
    match word.trim().to_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Ok(true),
        "off" | "false" | "0" | "no" => Ok(false),
        other => Err(invalid(format!("on or off expected, got '{other}'"))),
    }
}

fn invalid(message: String) -> Error {
    Error::InvalidInput(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> UiEvent {
        parse_command(line).unwrap().unwrap()
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse("start"), UiEvent::StartCapture);
        assert_eq!(parse("  STOP "), UiEvent::StopCapture);
        assert_eq!(parse("quit"), UiEvent::Quit);
        assert!(parse_command("   ").unwrap().is_none());
    }

    #[test]
    fn test_sources() {
        assert_eq!(parse("camera 1"), UiEvent::SwitchSource(SourceSpec::Camera(1)));
        assert_eq!(
            parse("video /tmp/my clip.mp4"),
            UiEvent::SwitchSource(SourceSpec::File(PathBuf::from("/tmp/my clip.mp4")))
        );
        assert!(parse_command("camera front").is_err());
        assert!(parse_command("video").is_err());
    }

    #[test]
    fn test_sliders() {
        assert_eq!(
            parse("size eye 150"),
            UiEvent::AdjustSlider {
                group: FeatureGroup::Eye,
                kind: SliderKind::Size,
                value: 150.0,
            }
        );
        assert_eq!(
            parse("offset-y mouth -3"),
            UiEvent::AdjustSlider {
                group: FeatureGroup::Mouth,
                kind: SliderKind::OffsetY,
                value: -3.0,
            }
        );
        assert!(parse_command("size ears 10").is_err());
        assert!(parse_command("size eye big").is_err());
    }

    #[test]
    fn test_toggles() {
        assert_eq!(
            parse("show left-eye off"),
            UiEvent::ToggleFeature {
                feature: Feature::LeftEye,
                enabled: false,
            }
        );
        assert_eq!(parse("eyebrows on"), UiEvent::SetEyebrows(true));
        assert!(parse_command("eyebrows maybe").is_err());
    }

    #[test]
    fn test_unknown_command_lists_help() {
        let err = parse_command("dance").unwrap_err();
        assert!(err.to_string().contains("commands:"));
    }
}
