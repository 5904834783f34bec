//! Toy train conductor state machine.
//!
//! This module provides [`TrainController`], which shuttles a toy train
//! between magnet markers on the track. A hall sensor under the locomotive
//! sees the magnet; the controller brakes, backs up onto the magnet, waits
//! for the train to be lifted or pushed off it, and sets off again.
//!
//! # State Machine
//!
//! ```text
//!            magnet absent              > start grace
//!  Stopped ───────────────▶ Starting ──────────────▶ Moving
//!     ▲  ▲                                              │ magnet sensed
//!     │  │ > settle, magnet still sensed                ▼
//!     │  └──────────────────────────────────────────  Braking
//!     │ magnet sensed                                   │ magnet absent
//!     └──────────────────── BackingUp ◀─────────────────┘
//!                              │ > backup timeout
//!                              ▼
//!                            Error (terminal, indicator blinks)
//! ```
//!
//! # Example
//!
//! ```rust
//! use rs_conductor::{TrainController, TrainState, TrainConfig};
//! use rs_conductor::hal::{MockDelay, MockIndicator, MockMagnet, MockMotor};
//! use rs_conductor::traits::MotorActuator;
//!
//! let mut train = TrainController::new(
//!     MockMotor::new(),
//!     MockMotor::new(),
//!     MockIndicator::new(),
//!     TrainConfig::default(),
//! );
//! let mut sensor = MockMagnet::absent();
//! let mut delay = MockDelay::new();
//!
//! train.start(0).unwrap();
//! train.tick(&mut sensor, &mut delay, 10).unwrap();
//! assert_eq!(train.state(), TrainState::Starting);
//! assert_eq!(train.motor().power(), 255);
//!
//! train.tick(&mut sensor, &mut delay, 600).unwrap();
//! assert_eq!(train.state(), TrainState::Moving);
//! ```

use core::fmt;

use embedded_hal::delay::DelayNs;

use crate::config::TrainConfig;
use crate::traits::{Indicator, MagnetSensor, MotorActuator};

/// Train motion state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrainState {
    /// Standing still, usually parked over a magnet.
    #[default]
    Stopped,
    /// Pulling away; magnet readings are ignored for a grace period.
    Starting,
    /// Running and watching for the next magnet.
    Moving,
    /// Brakes applied after a magnet was sensed.
    Braking,
    /// Reversing slowly onto the magnet it overshot.
    BackingUp,
    /// Magnet never found again. Needs a power cycle.
    Error,
}

impl TrainState {
    /// Returns the state name used in status text.
    pub const fn as_str(&self) -> &'static str {
        match self {
            TrainState::Stopped => "Stopped",
            TrainState::Starting => "Starting",
            TrainState::Moving => "Moving",
            TrainState::Braking => "Braking",
            TrainState::BackingUp => "BackingUp",
            TrainState::Error => "Error",
        }
    }
}

impl fmt::Display for TrainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quiescent band of the analog hall sensor.
///
/// With no magnet nearby the sensor idles around `center`; a magnet of either
/// polarity pushes the reading out of the band.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MagnetBand {
    /// Idle ADC reading.
    pub center: u16,
    /// Half-width of the idle band.
    pub tolerance: u16,
}

impl Default for MagnetBand {
    fn default() -> Self {
        Self {
            center: 1665,
            tolerance: 15,
        }
    }
}

impl MagnetBand {
    /// Returns true if `raw` is outside the idle band.
    #[inline]
    pub const fn is_present(&self, raw: u16) -> bool {
        raw <= self.center.saturating_sub(self.tolerance)
            || raw >= self.center.saturating_add(self.tolerance)
    }
}

/// Debounced magnet check.
///
/// Takes up to `reps` samples `sample_delay_ms` apart and returns true only
/// if every sample agrees with `expected`. Stops sampling at the first
/// disagreement.
pub fn magnet_sensed<S: MagnetSensor, D: DelayNs>(
    sensor: &mut S,
    delay: &mut D,
    band: &MagnetBand,
    reps: u8,
    sample_delay_ms: u32,
    expected: bool,
) -> Result<bool, S::Error> {
    for i in 0..reps.max(1) {
        if i > 0 {
            delay.delay_ms(sample_delay_ms);
        }
        let raw = sensor.read_raw()?;
        if band.is_present(raw) != expected {
            log::debug!("magnet sample {} = {} disagrees with {}", i, raw, expected);
            return Ok(false);
        }
    }
    Ok(true)
}

/// Error raised by [`TrainController::tick`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrainError<A, S> {
    /// Motor, lights or indicator driver failed.
    Actuator(A),
    /// Magnet sensor sampling failed.
    Sensor(S),
}

impl<A: fmt::Debug, S: fmt::Debug> fmt::Display for TrainError<A, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainError::Actuator(e) => write!(f, "actuator error: {:?}", e),
            TrainError::Sensor(e) => write!(f, "sensor error: {:?}", e),
        }
    }
}

/// Train conductor.
///
/// Owns the traction motor, the lights channel and the status indicator.
/// The magnet sensor and delay are borrowed for each [`tick`](Self::tick).
///
/// # Type Parameters
///
/// - `M`: traction motor ([`MotorActuator`])
/// - `L`: lights channel, sharing the motor's error type
/// - `I`: status indicator, sharing the motor's error type
pub struct TrainController<M, L, I> {
    pub(crate) motor: M,
    pub(crate) lights: L,
    indicator: I,
    pub(crate) config: TrainConfig,
    state: TrainState,
    last_state_change: u64,
    indicator_on: bool,
}

impl<M, L, I> TrainController<M, L, I>
where
    M: MotorActuator,
    L: MotorActuator<Error = M::Error>,
    I: Indicator<Error = M::Error>,
{
    /// Create a controller in [`TrainState::Stopped`].
    pub fn new(motor: M, lights: L, indicator: I, config: TrainConfig) -> Self {
        Self {
            motor,
            lights,
            indicator,
            config,
            state: TrainState::Stopped,
            last_state_change: 0,
            indicator_on: false,
        }
    }

    /// Switch the lights on and start timing from `now_ms`.
    pub fn start(&mut self, now_ms: u64) -> Result<(), M::Error> {
        self.last_state_change = now_ms;
        self.lights.drive(self.config.default_lights)?;
        log::info!(
            "train: conductor started in {}, lights at {}",
            self.state,
            self.config.default_lights
        );
        Ok(())
    }

    /// Run one control step.
    ///
    /// Reads the sensor as needed by the current state, moves to the next
    /// state if it differs, and runs that state's entry action. A candidate
    /// equal to the current state is a no-op: the state timer keeps running
    /// and the entry action is not repeated. If the entry action fails the
    /// state is left as it was.
    pub fn tick<S, D>(
        &mut self,
        sensor: &mut S,
        delay: &mut D,
        now_ms: u64,
    ) -> Result<(), TrainError<M::Error, S::Error>>
    where
        S: MagnetSensor,
        D: DelayNs,
    {
        let next = self
            .next_state(sensor, delay, now_ms)
            .map_err(TrainError::Sensor)?;

        if next != self.state {
            log::info!(
                "train: {} -> {} after {}ms",
                self.state,
                next,
                self.elapsed(now_ms)
            );
            self.enter(next).map_err(TrainError::Actuator)?;
            self.state = next;
            self.last_state_change = now_ms;
        }

        if self.state == TrainState::Error {
            self.blink_error(now_ms).map_err(TrainError::Actuator)?;
        }
        Ok(())
    }

    fn next_state<S: MagnetSensor, D: DelayNs>(
        &self,
        sensor: &mut S,
        delay: &mut D,
        now_ms: u64,
    ) -> Result<TrainState, S::Error> {
        let elapsed = self.elapsed(now_ms);
        let cfg = &self.config;
        let mut sensed = |expected: bool| {
            magnet_sensed(
                sensor,
                delay,
                &cfg.magnet,
                cfg.sensor_reps,
                cfg.sample_delay_ms,
                expected,
            )
        };

        let next = match self.state {
            TrainState::Starting => {
                if elapsed > cfg.start_grace_ms {
                    TrainState::Moving
                } else {
                    TrainState::Starting
                }
            }
            TrainState::Moving => {
                if sensed(true)? {
                    TrainState::Braking
                } else {
                    TrainState::Moving
                }
            }
            TrainState::Braking => {
                if sensed(false)? {
                    TrainState::BackingUp
                } else if elapsed > cfg.brake_settle_ms && sensed(true)? {
                    TrainState::Stopped
                } else {
                    TrainState::Braking
                }
            }
            TrainState::BackingUp => {
                if sensed(true)? {
                    TrainState::Stopped
                } else if elapsed > cfg.backup_timeout_ms {
                    TrainState::Error
                } else {
                    TrainState::BackingUp
                }
            }
            TrainState::Stopped => {
                if sensed(false)? {
                    TrainState::Starting
                } else {
                    TrainState::Stopped
                }
            }
            TrainState::Error => TrainState::Error,
        };
        Ok(next)
    }

    fn enter(&mut self, state: TrainState) -> Result<(), M::Error> {
        match state {
            TrainState::Starting => self.motor.drive(self.config.full_power),
            TrainState::Braking => self.motor.brake(),
            TrainState::BackingUp => self.motor.drive(self.config.backup_power),
            TrainState::Stopped => self.motor.brake(),
            TrainState::Error => {
                log::error!(
                    "train: magnet not found within {}ms of backing up, halting",
                    self.config.backup_timeout_ms
                );
                self.motor.brake()
            }
            TrainState::Moving => Ok(()),
        }
    }

    fn blink_error(&mut self, now_ms: u64) -> Result<(), M::Error> {
        let half = self.config.error_blink_ms.max(1);
        let on = (self.elapsed(now_ms) / half) % 2 == 0;
        if on != self.indicator_on {
            self.indicator.set(on)?;
            self.indicator_on = on;
        }
        Ok(())
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> TrainState {
        self.state
    }

    /// Timestamp of the last accepted transition.
    #[inline]
    pub fn last_state_change(&self) -> u64 {
        self.last_state_change
    }

    /// Milliseconds spent in the current state.
    #[inline]
    pub fn elapsed(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_state_change)
    }

    /// Configured loop period.
    #[inline]
    pub fn tick_ms(&self) -> u32 {
        self.config.tick_ms
    }

    /// Traction motor.
    pub fn motor(&self) -> &M {
        &self.motor
    }

    /// Lights channel.
    pub fn lights(&self) -> &L {
        &self.lights
    }

    /// Status indicator.
    pub fn indicator(&self) -> &I {
        &self.indicator
    }
}
