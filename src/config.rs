//! Safety mode and hardware variant selection.

use crate::limits::{LongitudinalLimits, GM_ASCM_LONG_LIMITS, GM_CAM_LONG_LIMITS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera harness: the interposer sits between the camera and the powertrain bus.
pub const GM_PARAM_HW_CAM: u16 = 1;
/// Camera harness with the stock longitudinal messages replaced (debug builds only).
pub const GM_PARAM_HW_CAM_LONG: u16 = 2;

/// Whether debug-only parameter bits are honored by this build.
pub const ALLOW_DEBUG: bool = cfg!(any(debug_assertions, feature = "allow-debug"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SafetyError {
    #[error("unknown safety mode {0}")]
    UnknownSafetyMode(u16),
}

/// Safety model numbers understood by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum SafetyMode {
    Gm = 4,
    NoOutput = 19,
}

impl TryFrom<u16> for SafetyMode {
    type Error = SafetyError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(SafetyMode::Gm),
            19 => Ok(SafetyMode::NoOutput),
            other => Err(SafetyError::UnknownSafetyMode(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HardwareVariant {
    /// Interposer replaces the ASCM and talks directly to every actuator bus.
    DirectController,
    /// Interposer sits behind the forward camera on the powertrain bus.
    CameraIntegrated { longitudinal_passthrough: bool },
}

impl HardwareVariant {
    pub fn is_camera(self) -> bool {
        matches!(self, HardwareVariant::CameraIntegrated { .. })
    }

    pub fn longitudinal_passthrough(self) -> bool {
        matches!(
            self,
            HardwareVariant::CameraIntegrated {
                longitudinal_passthrough: true
            }
        )
    }
}

/// Everything derived from the GM safety parameter at init.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GmConfig {
    pub variant: HardwareVariant,
    pub long_limits: LongitudinalLimits,
}

impl GmConfig {
    /// Decodes the 16-bit safety parameter. Unknown bits are ignored; anything
    /// without the camera bit is a direct-controller harness.
    pub fn from_param(param: u16) -> Self {
        Self::from_param_with_debug(param, ALLOW_DEBUG)
    }

    pub fn from_param_with_debug(param: u16, allow_debug: bool) -> Self {
        let variant = if param & GM_PARAM_HW_CAM != 0 {
            HardwareVariant::CameraIntegrated {
                longitudinal_passthrough: allow_debug && (param & GM_PARAM_HW_CAM_LONG != 0),
            }
        } else {
            HardwareVariant::DirectController
        };

        let long_limits = match variant {
            HardwareVariant::DirectController => GM_ASCM_LONG_LIMITS,
            HardwareVariant::CameraIntegrated { .. } => GM_CAM_LONG_LIMITS,
        };

        Self { variant, long_limits }
    }

    /// The policy tracks stock cruise engagement itself only when stock
    /// longitudinal is fully retained.
    pub fn pcm_cruise(&self) -> bool {
        self.variant.is_camera() && !self.variant.longitudinal_passthrough()
    }
}

impl Default for GmConfig {
    fn default() -> Self {
        Self::from_param_with_debug(0, false)
    }
}
