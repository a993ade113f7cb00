//! Numeric actuation limits.
//!
//! **WARNING**
//!
//! These values bound what the assistance computer may command on a real
//! vehicle. They mirror limits tuned against the stock controllers; do not
//! change them without validating on hardware.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SteeringLimitType {
    /// Torque rate limits widen with measured driver torque.
    DriverTorqueLimited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SteeringLimits {
    pub max_steer: i32,
    pub max_rate_up: i32,
    pub max_rate_down: i32,
    pub driver_torque_allowance: i32,
    pub driver_torque_factor: i32,
    pub max_rt_delta: i32,
    /// Realtime reference refresh interval. \[us\]
    pub max_rt_interval_us: u32,
    pub limit_type: SteeringLimitType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongitudinalLimits {
    pub max_gas: i32,
    pub min_gas: i32,
    /// Gas/regen value that must be sent while longitudinal control is not allowed.
    pub inactive_gas: i32,
    pub max_brake: i32,
}

pub const GM_STEERING_LIMITS: SteeringLimits = SteeringLimits {
    max_steer: 300,
    max_rate_up: 10,
    max_rate_down: 15,
    driver_torque_allowance: 65,
    driver_torque_factor: 4,
    max_rt_delta: 128,
    max_rt_interval_us: 250_000,
    limit_type: SteeringLimitType::DriverTorqueLimited,
};

/// Direct-controller (ASCM) harness.
pub const GM_ASCM_LONG_LIMITS: LongitudinalLimits = LongitudinalLimits {
    max_gas: 3072,
    min_gas: 1404,
    inactive_gas: 1404,
    max_brake: 400,
};

/// Camera harness.
pub const GM_CAM_LONG_LIMITS: LongitudinalLimits = LongitudinalLimits {
    max_gas: 3400,
    min_gas: 1514,
    inactive_gas: 1554,
    max_brake: 400,
};

/// Raw rear wheel speed above which the car is moving (~0.311 km/h).
pub const GM_STANDSTILL_THRESHOLD: u16 = 10;

/// Must equal the assistance computer's own interceptor threshold, otherwise the
/// two sides can disagree on gas pressed while pre-enabled.
/// (610 + 306.25) / 2, offset/gain ratio of the two interceptor tracks.
pub const GM_GAS_INTERCEPTOR_THRESHOLD: i32 = 506;
