//! Control surface for the train: speed and light adjustments.
//!
//! Remote callers (the HTTP server on the board) can nudge the motor and
//! lights in bounded steps, set them outright, or brake. These commands act
//! on the actuators directly and leave the conductor state machine alone;
//! the next transition's entry action overrides any manual motor setting.
//!
//! # Endpoints
//!
//! | Path | Command |
//! |------|---------|
//! | `/speed/up`, `/speed/down` | [`ControlCommand::SpeedUp`], [`ControlCommand::SpeedDown`] |
//! | `/speed/set?value=N` | [`ControlCommand::SetSpeed`] |
//! | `/brake` | [`ControlCommand::Brake`] |
//! | `/lights/up`, `/lights/down` | [`ControlCommand::LightsUp`], [`ControlCommand::LightsDown`] |
//! | `/lights/set?value=N` | [`ControlCommand::SetLights`] |
//! | `/lights/off` | [`ControlCommand::LightsOff`] |
//! | `/status` | [`ControlCommand::Status`] |
//!
//! # Example
//!
//! ```rust
//! use rs_conductor::control::ControlCommand;
//!
//! assert_eq!(ControlCommand::from_path("/speed/up"), Some(ControlCommand::SpeedUp));
//! assert_eq!(
//!     ControlCommand::from_path("/lights/set?value=120"),
//!     Some(ControlCommand::SetLights(120))
//! );
//! assert_eq!(ControlCommand::from_path("/nope"), None);
//! ```

use core::fmt::{self, Write};

use crate::traits::{clamp_power, Indicator, MotorActuator};
use crate::train::{TrainController, TrainState};

/// A control surface request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlCommand {
    /// Raise motor power by one step.
    SpeedUp,
    /// Lower motor power by one step (may go negative to reverse).
    SpeedDown,
    /// Set motor power outright.
    SetSpeed(i16),
    /// Brake the motor.
    Brake,
    /// Raise light brightness by one step.
    LightsUp,
    /// Lower light brightness by one step.
    LightsDown,
    /// Set light brightness outright.
    SetLights(i16),
    /// Switch the lights off.
    LightsOff,
    /// Report status without changing anything.
    Status,
}

impl ControlCommand {
    /// Parse a request path (with optional `?value=N` query).
    pub fn from_path(path: &str) -> Option<Self> {
        let (route, query) = match path.split_once('?') {
            Some((route, query)) => (route, Some(query)),
            None => (path, None),
        };
        let route = route.trim_end_matches('/');

        match route {
            "/speed/up" => Some(ControlCommand::SpeedUp),
            "/speed/down" => Some(ControlCommand::SpeedDown),
            "/speed/set" => query
                .and_then(Self::from_query_value)
                .map(ControlCommand::SetSpeed),
            "/brake" | "/speed/brake" => Some(ControlCommand::Brake),
            "/lights/up" => Some(ControlCommand::LightsUp),
            "/lights/down" => Some(ControlCommand::LightsDown),
            "/lights/set" => query
                .and_then(Self::from_query_value)
                .map(ControlCommand::SetLights),
            "/lights/off" => Some(ControlCommand::LightsOff),
            "" | "/status" => Some(ControlCommand::Status),
            _ => None,
        }
    }

    /// Extract `value=N` from a query string, clamped to the power range.
    pub fn from_query_value(query: &str) -> Option<i16> {
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "value")
            .and_then(|(_, value)| value.trim().parse::<i32>().ok())
            .map(clamp_power)
    }

    /// Returns true if the command changes an actuator.
    pub const fn is_mutating(&self) -> bool {
        !matches!(self, ControlCommand::Status)
    }
}

/// Snapshot returned for every control request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlStatus {
    /// Conductor state.
    pub state: TrainState,
    /// Motor power.
    pub speed: i16,
    /// Light power.
    pub lights: i16,
}

/// Maximum length of a rendered status line.
pub const STATUS_TEXT_LEN: usize = 64;

impl ControlStatus {
    /// Render `state=Moving speed=255 lights=25`.
    pub fn write_text<W: Write>(&self, out: &mut W) -> fmt::Result {
        write!(
            out,
            "state={} speed={} lights={}",
            self.state, self.speed, self.lights
        )
    }

    /// Render the status line into a fixed buffer.
    pub fn to_text(&self) -> heapless::String<STATUS_TEXT_LEN> {
        let mut text = heapless::String::new();
        let _ = self.write_text(&mut text);
        text
    }

    /// Render as JSON.
    #[cfg(feature = "serde-json-core")]
    pub fn to_json(&self) -> Option<heapless::String<STATUS_TEXT_LEN>> {
        serde_json_core::to_string(self).ok()
    }
}

impl fmt::Display for ControlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_text(f)
    }
}

impl<M, L, I> TrainController<M, L, I>
where
    M: MotorActuator,
    L: MotorActuator<Error = M::Error>,
    I: Indicator<Error = M::Error>,
{
    /// Apply a control command and report the resulting status.
    pub fn apply_control(&mut self, cmd: ControlCommand) -> Result<ControlStatus, M::Error> {
        let step = self.config.control_step;
        match cmd {
            ControlCommand::SpeedUp => {
                self.motor.adjust(step)?;
            }
            ControlCommand::SpeedDown => {
                self.motor.adjust(-step)?;
            }
            ControlCommand::SetSpeed(power) => self.motor.drive(clamp_power(power as i32))?,
            ControlCommand::Brake => self.motor.brake()?,
            ControlCommand::LightsUp => {
                self.lights.adjust(step)?;
            }
            ControlCommand::LightsDown => {
                self.lights.adjust(-step)?;
            }
            ControlCommand::SetLights(power) => self.lights.drive(clamp_power(power as i32))?,
            ControlCommand::LightsOff => self.lights.brake()?,
            ControlCommand::Status => {}
        }
        if cmd.is_mutating() {
            log::info!(
                "control: {:?} -> speed {} lights {}",
                cmd,
                self.motor.power(),
                self.lights.power()
            );
        }
        Ok(self.status())
    }

    /// Current status snapshot.
    pub fn status(&self) -> ControlStatus {
        ControlStatus {
            state: self.state(),
            speed: self.motor.power(),
            lights: self.lights.power(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_all_routes() {
        assert_eq!(ControlCommand::from_path("/speed/down"), Some(ControlCommand::SpeedDown));
        assert_eq!(ControlCommand::from_path("/brake"), Some(ControlCommand::Brake));
        assert_eq!(ControlCommand::from_path("/lights/up/"), Some(ControlCommand::LightsUp));
        assert_eq!(ControlCommand::from_path("/lights/down"), Some(ControlCommand::LightsDown));
        assert_eq!(ControlCommand::from_path("/lights/off"), Some(ControlCommand::LightsOff));
        assert_eq!(ControlCommand::from_path("/"), Some(ControlCommand::Status));
        assert_eq!(ControlCommand::from_path("/status"), Some(ControlCommand::Status));
    }

    #[test]
    fn parse_set_needs_value() {
        assert_eq!(
            ControlCommand::from_path("/speed/set?value=-80"),
            Some(ControlCommand::SetSpeed(-80))
        );
        assert_eq!(ControlCommand::from_path("/speed/set"), None);
        assert_eq!(ControlCommand::from_path("/speed/set?value=fast"), None);
        assert_eq!(
            ControlCommand::from_path("/lights/set?x=1&value=9000"),
            Some(ControlCommand::SetLights(255))
        );
    }

    #[test]
    fn status_text() {
        let status = ControlStatus {
            state: TrainState::Moving,
            speed: 255,
            lights: 25,
        };
        assert_eq!(status.to_text().as_str(), "state=Moving speed=255 lights=25");
    }

    #[test]
    fn status_is_not_mutating() {
        assert!(!ControlCommand::Status.is_mutating());
        assert!(ControlCommand::Brake.is_mutating());
    }

    #[cfg(feature = "serde-json-core")]
    #[test]
    fn status_json() {
        let status = ControlStatus {
            state: TrainState::Stopped,
            speed: 0,
            lights: 25,
        };
        assert_eq!(
            status.to_json().unwrap().as_str(),
            r#"{"state":"Stopped","speed":0,"lights":25}"#
        );
    }
}
