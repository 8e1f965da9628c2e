//! Calibration: the reference pose captured while the user looks at a known
//! point, the monocular screen transform built on it, and the two-phase
//! controller that captures it.

use crate::{
    config::HeadPoseFilterConfig,
    constants::GEOMETRY_EPSILON,
    head_pose::{HeadPose, HeadPoseFilterBank},
    Error, Result,
};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Reference pose for the monocular screen transform
///
/// Angles in degrees; `x`, `y`, `z` is the calibrated head position in the same
/// units as the screen coordinates passed to [`HeadPoseCalibration::transform`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadPoseCalibration {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl HeadPoseCalibration {
    /// Map a screen point, relative to the camera, to where it should be drawn
    /// for the given head pose
    ///
    /// The pitch and yaw deltas rotate the viewer's frame (roll is ignored);
    /// the point is projected along the new forward axis onto the plane through
    /// the displaced head position.
    ///
    /// # Errors
    ///
    /// Returns `DegenerateGeometry` when the rotated forward axis is parallel to
    /// the screen
    pub fn transform(&self, screen_x: f64, screen_y: f64, pose: &HeadPose) -> Result<(f64, f64)> {
        let dpitch = (pose.pitch - self.pitch).to_radians();
        let dyaw = (pose.yaw - self.yaw).to_radians();

        let (sp, cp) = dpitch.sin_cos();
        let r_pitch = Matrix3::new(1.0, 0.0, 0.0, 0.0, cp, sp, 0.0, -sp, cp);
        // Clockwise yaw viewed from above
        let (sy, cy) = dyaw.sin_cos();
        let r_yaw = Matrix3::new(cy, 0.0, sy, 0.0, 1.0, 0.0, -sy, 0.0, cy);
        let rotation = r_yaw * r_pitch;

        let z_hat = rotation * Vector3::z();
        let y_hat = rotation * Vector3::y();
        let x_hat = y_hat.cross(&z_hat);

        if z_hat.z.abs() < GEOMETRY_EPSILON {
            return Err(Error::DegenerateGeometry(
                "Viewing axis is parallel to the screen".to_string(),
            ));
        }

        let origin = Vector3::new(pose.x - self.x, pose.y - self.y, pose.z - self.z);
        let depth = (z_hat.dot(&origin) - z_hat.x * screen_x - z_hat.y * screen_y) / z_hat.z;
        let offset = Vector3::new(screen_x, screen_y, depth) - origin;

        Ok((offset.dot(&x_hat), offset.dot(&y_hat)))
    }
}

/// Snapshot of the filtered pose at the end of calibration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOffset {
    reference: HeadPose,
}

impl CalibrationOffset {
    #[must_use]
    pub const fn new(reference: HeadPose) -> Self {
        Self { reference }
    }

    #[must_use]
    pub const fn reference(&self) -> &HeadPose {
        &self.reference
    }

    /// Pose relative to the calibrated reference
    #[must_use]
    pub fn apply(&self, pose: &HeadPose) -> HeadPose {
        pose.relative_to(&self.reference)
    }
}

impl From<CalibrationOffset> for HeadPoseCalibration {
    fn from(offset: CalibrationOffset) -> Self {
        let r = offset.reference;
        Self {
            pitch: r.pitch,
            yaw: r.yaw,
            roll: r.roll,
            x: r.x,
            y: r.y,
            z: r.z,
        }
    }
}

/// Phase of a [`CalibrationController`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    Ready,
    Calibrating,
    Responding,
}

#[derive(Debug, Clone, Copy)]
enum ControllerState {
    Ready,
    Calibrating,
    Responding(CalibrationOffset),
}

/// What a controller produced for one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerOutput {
    /// Waiting for calibration to start
    Idle,
    /// Calibration bank estimate, `None` while warming up
    Calibrating(Option<HeadPose>),
    /// Response bank estimate relative to the calibration offset
    Responding(Option<HeadPose>),
}

/// Two-phase controller: one filter bank settles the reference pose, the other
/// drives the response once the reference is captured
pub struct CalibrationController {
    state: ControllerState,
    calibration_bank: HeadPoseFilterBank,
    response_bank: HeadPoseFilterBank,
}

impl CalibrationController {
    /// Create a controller in the `Ready` phase
    ///
    /// # Errors
    ///
    /// Returns an error if either bank configuration is invalid
    pub fn new(calibration: &HeadPoseFilterConfig, response: &HeadPoseFilterConfig) -> Result<Self> {
        log::info!("Initializing CalibrationController");
        Ok(Self {
            state: ControllerState::Ready,
            calibration_bank: HeadPoseFilterBank::new(calibration)?,
            response_bank: HeadPoseFilterBank::new(response)?,
        })
    }

    #[must_use]
    pub const fn phase(&self) -> CalibrationPhase {
        match self.state {
            ControllerState::Ready => CalibrationPhase::Ready,
            ControllerState::Calibrating => CalibrationPhase::Calibrating,
            ControllerState::Responding(_) => CalibrationPhase::Responding,
        }
    }

    /// Offset captured by the last completed calibration
    #[must_use]
    pub const fn offset(&self) -> Option<&CalibrationOffset> {
        match &self.state {
            ControllerState::Responding(offset) => Some(offset),
            _ => None,
        }
    }

    /// Enter (or re-enter) the calibration phase with a fresh calibration bank
    pub fn start_calibration(&mut self) {
        if matches!(self.state, ControllerState::Calibrating) {
            return;
        }
        log::debug!("Calibration started from {:?}", self.phase());
        self.calibration_bank.reset();
        self.state = ControllerState::Calibrating;
    }

    /// Capture the calibration bank's estimate and switch to responding
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` outside the calibration phase or while the
    /// calibration bank is still warming up
    pub fn finish_calibration(&mut self) -> Result<CalibrationOffset> {
        if !matches!(self.state, ControllerState::Calibrating) {
            return Err(Error::InvalidInput(format!(
                "Cannot finish calibration in the {:?} phase",
                self.phase()
            )));
        }
        let reference = self.calibration_bank.current().ok_or_else(|| {
            Error::InvalidInput("Calibration bank has no estimate yet".to_string())
        })?;
        let offset = CalibrationOffset::new(reference);
        log::debug!("Calibration captured: {reference}");
        self.response_bank.reset();
        self.state = ControllerState::Responding(offset);
        Ok(offset)
    }

    /// The single user-triggered transition:
    /// `Ready → Calibrating → Responding → Calibrating → ...`
    ///
    /// # Errors
    ///
    /// Returns an error if calibration cannot be finished yet
    pub fn advance(&mut self) -> Result<CalibrationPhase> {
        match self.state {
            ControllerState::Ready | ControllerState::Responding(_) => self.start_calibration(),
            ControllerState::Calibrating => {
                self.finish_calibration()?;
            }
        }
        Ok(self.phase())
    }

    /// Route a sample to the bank of the current phase
    ///
    /// # Errors
    ///
    /// Propagates errors from the active filter bank
    pub fn update(&mut self, sample: &HeadPose) -> Result<ControllerOutput> {
        Ok(match self.state {
            ControllerState::Ready => ControllerOutput::Idle,
            ControllerState::Calibrating => ControllerOutput::Calibrating(self.calibration_bank.update(sample)?),
            ControllerState::Responding(offset) => {
                ControllerOutput::Responding(self.response_bank.update(sample)?.map(|pose| offset.apply(&pose)))
            }
        })
    }
}
