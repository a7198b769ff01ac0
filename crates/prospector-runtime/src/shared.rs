//! [`SharedRoverLoop`] – serialised access to one [`RoverLoop`] from
//! several threads.
//!
//! Perception and control may run on separate schedules; both go through
//! the same mutex, so a decision never observes a half-written perception
//! result.
//!
//! # Example
//!
//! ```rust
//! use std::time::Instant;
//! use prospector_perception::PerceptionConfig;
//! use prospector_runtime::config::DriveConfig;
//! use prospector_runtime::shared::SharedRoverLoop;
//! use prospector_types::Telemetry;
//!
//! let shared = SharedRoverLoop::new(
//!     PerceptionConfig::default(),
//!     DriveConfig::default(),
//!     320,
//!     160,
//! )
//! .unwrap();
//!
//! let control = shared.clone();
//! let cmd = control.decide(&Telemetry::default(), Instant::now()).unwrap();
//! assert_eq!(cmd.throttle, 0.2);
//! ```

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use image::RgbImage;
use prospector_perception::PerceptionConfig;
use prospector_types::{ActuatorCommand, FrameObservations, ProspectorError, Telemetry};

use crate::config::DriveConfig;
use crate::rover_loop::RoverLoop;
use crate::state::Mode;

#[derive(Clone)]
pub struct SharedRoverLoop {
    inner: Arc<Mutex<RoverLoop>>,
}

impl SharedRoverLoop {
    /// # Errors
    ///
    /// See [`RoverLoop::new`].
    pub fn new(
        perception: PerceptionConfig,
        drive: DriveConfig,
        width: u32,
        height: u32,
    ) -> Result<Self, ProspectorError> {
        Ok(Self::from_loop(RoverLoop::new(perception, drive, width, height)?))
    }

    pub fn from_loop(rover: RoverLoop) -> Self {
        Self {
            inner: Arc::new(Mutex::new(rover)),
        }
    }

    /// Run perception and return the new observations.
    pub fn perceive(
        &self,
        frame: &RgbImage,
        telemetry: &Telemetry,
    ) -> Result<FrameObservations, ProspectorError> {
        Ok(self.lock()?.perceive(frame, telemetry).observations)
    }

    /// Decide and verify the next command.
    pub fn decide(
        &self,
        telemetry: &Telemetry,
        now: Instant,
    ) -> Result<ActuatorCommand, ProspectorError> {
        Ok(self.lock()?.decide(telemetry, now).0)
    }

    pub fn mode(&self) -> Result<Mode, ProspectorError> {
        Ok(self.lock()?.mode())
    }

    /// Snapshot of the world map as an RGB image.
    pub fn map_snapshot(&self) -> Result<RgbImage, ProspectorError> {
        Ok(self.lock()?.map().to_image())
    }

    fn lock(&self) -> Result<MutexGuard<'_, RoverLoop>, ProspectorError> {
        self.inner.lock().map_err(|_| ProspectorError::StatePoisoned)
    }
}
