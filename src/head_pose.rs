//! Six-parameter head pose stream: tracker remapping and the filter bank for it

use crate::{
    config::HeadPoseFilterConfig,
    constants::{TRACKER_PITCH_OFFSET, TRACKER_ROLL_OFFSET, TRACKER_YAW_OFFSET},
    filter_bank::{ParameterFilterBank, ParameterSet},
    framerate::FramerateCounter,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Head pose parameters, angles in degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadPoseParameter {
    Yaw,
    Pitch,
    Roll,
    X,
    Y,
    Z,
}

impl HeadPoseParameter {
    pub const ALL: [Self; 6] = [Self::Yaw, Self::Pitch, Self::Roll, Self::X, Self::Y, Self::Z];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Yaw => "yaw",
            Self::Pitch => "pitch",
            Self::Roll => "roll",
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        }
    }
}

impl fmt::Display for HeadPoseParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HeadPoseParameter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidInput(format!("Unknown head pose parameter: {s}")))
    }
}

/// One head pose sample
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadPose {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl HeadPose {
    #[must_use]
    pub const fn get(&self, parameter: HeadPoseParameter) -> f64 {
        match parameter {
            HeadPoseParameter::Yaw => self.yaw,
            HeadPoseParameter::Pitch => self.pitch,
            HeadPoseParameter::Roll => self.roll,
            HeadPoseParameter::X => self.x,
            HeadPoseParameter::Y => self.y,
            HeadPoseParameter::Z => self.z,
        }
    }

    fn get_mut(&mut self, parameter: HeadPoseParameter) -> &mut f64 {
        match parameter {
            HeadPoseParameter::Yaw => &mut self.yaw,
            HeadPoseParameter::Pitch => &mut self.pitch,
            HeadPoseParameter::Roll => &mut self.roll,
            HeadPoseParameter::X => &mut self.x,
            HeadPoseParameter::Y => &mut self.y,
            HeadPoseParameter::Z => &mut self.z,
        }
    }

    /// Map a raw tracker reading into the crate's convention
    ///
    /// Angles are re-centred on zero and the tracker's axes are rotated so that
    /// `x` is lateral, `y` vertical and `z` depth.
    #[must_use]
    pub fn from_tracker(raw: &Self) -> Self {
        Self {
            yaw: raw.yaw + TRACKER_YAW_OFFSET,
            pitch: raw.pitch + TRACKER_PITCH_OFFSET,
            roll: raw.roll + TRACKER_ROLL_OFFSET,
            x: raw.y,
            y: raw.z,
            z: raw.x,
        }
    }

    /// Parse a row of six numbers, `yaw pitch roll x y z`, separated by
    /// whitespace or commas
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the row does not hold exactly six numbers
    pub fn parse_row(row: &str) -> Result<Self> {
        let values = row
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
            .map(|token| {
                token
                    .parse::<f64>()
                    .map_err(|_| Error::InvalidInput(format!("Invalid number '{token}'")))
            })
            .collect::<Result<Vec<f64>>>()?;
        let &[yaw, pitch, roll, x, y, z] = values.as_slice() else {
            return Err(Error::InvalidInput(format!(
                "Expected 6 values (yaw pitch roll x y z), got {}",
                values.len()
            )));
        };
        Ok(Self {
            yaw,
            pitch,
            roll,
            x,
            y,
            z,
        })
    }

    /// Per-parameter product with a set of multipliers
    #[must_use]
    pub fn scaled(&self, multipliers: &Self) -> Self {
        let mut out = *self;
        for parameter in HeadPoseParameter::ALL {
            *out.get_mut(parameter) *= multipliers.get(parameter);
        }
        out
    }

    /// Per-parameter difference `self - other`
    #[must_use]
    pub fn relative_to(&self, other: &Self) -> Self {
        let mut out = *self;
        for parameter in HeadPoseParameter::ALL {
            *out.get_mut(parameter) -= other.get(parameter);
        }
        out
    }

    fn samples(&self) -> [(HeadPoseParameter, f64); 6] {
        HeadPoseParameter::ALL.map(|p| (p, self.get(p)))
    }

    fn from_set(set: &ParameterSet<HeadPoseParameter>) -> Option<Self> {
        let mut pose = Self::default();
        for parameter in HeadPoseParameter::ALL {
            *pose.get_mut(parameter) = set.get(parameter)?;
        }
        Some(pose)
    }
}

/// Sign convention between tracker output and screen space
pub const SCREEN_MULTIPLIERS: HeadPose = HeadPose {
    yaw: 1.0,
    pitch: -1.0,
    roll: -1.0,
    x: 1.0,
    y: -1.0,
    z: 1.0,
};

impl fmt::Display for HeadPose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.4} {:.4} {:.4} {:.4} {:.4} {:.4}",
            self.yaw, self.pitch, self.roll, self.x, self.y, self.z
        )
    }
}

/// Filter bank over the six head pose parameters
pub struct HeadPoseFilterBank {
    bank: ParameterFilterBank<HeadPoseParameter>,
    update_rate: FramerateCounter,
}

impl HeadPoseFilterBank {
    /// Build a bank with one fresh estimator per parameter
    ///
    /// # Errors
    ///
    /// Returns the first estimator configuration error
    pub fn new(config: &HeadPoseFilterConfig) -> Result<Self> {
        let bank = ParameterFilterBank::from_configs(HeadPoseParameter::ALL.map(|p| (p, config.get(p))))?;
        Ok(Self {
            bank,
            update_rate: FramerateCounter::default(),
        })
    }

    /// Feed a head pose sample; `Ok(None)` until every parameter has an estimate
    ///
    /// # Errors
    ///
    /// Propagates `InvalidInput` from the underlying parameter bank
    pub fn update(&mut self, sample: &HeadPose) -> Result<Option<HeadPose>> {
        self.update_rate.tick();
        let set = self.bank.update(&sample.samples())?;
        Ok(set.as_ref().and_then(HeadPose::from_set))
    }

    /// Feed a raw tracker reading, applying the tracker remap first
    ///
    /// # Errors
    ///
    /// Same as [`HeadPoseFilterBank::update`]
    pub fn update_from_tracker(&mut self, raw: &HeadPose) -> Result<Option<HeadPose>> {
        self.update(&HeadPose::from_tracker(raw))
    }

    #[must_use]
    pub fn current(&self) -> Option<HeadPose> {
        self.bank.current().as_ref().and_then(HeadPose::from_set)
    }

    /// Sample rate over the recent updates, in Hz
    #[must_use]
    pub fn update_rate(&self) -> Option<f64> {
        self.update_rate.query()
    }

    pub fn reset(&mut self) {
        self.bank.reset();
        self.update_rate.reset();
    }
}
