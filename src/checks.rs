//! Vehicle-independent checks shared by every safety model: numeric bound
//! checks for steering and longitudinal commands, allow list matching, and
//! the engagement/disengagement edge rules driven from the rx path.

use crate::can::CanFrame;
use crate::limits::{LongitudinalLimits, SteeringLimitType, SteeringLimits};
use crate::state::{SampleWindow, VehicleSafetyState};
use crate::tables::CanMsg;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Ticks after a mode change during which a stock ECU on the bus is tolerated.
pub const RELAY_TRNS_TIMEOUT: u32 = 1;

/// `true` when `val` lies outside `[min, max]`.
pub fn max_limit_check(val: i32, max: i32, min: i32) -> bool {
    val > max || val < min
}

/// Rate limits for torque commands, widened by how hard the driver is
/// steering. Once the applied torque exceeds what the driver allowance
/// permits, the command must ramp back toward zero.
pub fn driver_limit_check(
    val: i32,
    val_last: i32,
    driver: &SampleWindow,
    limits: &SteeringLimits,
) -> bool {
    let highest_allowed_rl = val_last.max(0) + limits.max_rate_up;
    let lowest_allowed_rl = val_last.min(0) - limits.max_rate_up;

    let driver_max_limit = limits.max_steer
        + (limits.driver_torque_allowance + driver.max()) * limits.driver_torque_factor;
    let driver_min_limit = -limits.max_steer
        + (-limits.driver_torque_allowance + driver.min()) * limits.driver_torque_factor;

    let highest_allowed =
        highest_allowed_rl.min((val_last - limits.max_rate_down).max(driver_max_limit.max(0)));
    let lowest_allowed =
        lowest_allowed_rl.max((val_last + limits.max_rate_down).min(driver_min_limit.min(0)));

    max_limit_check(val, highest_allowed, lowest_allowed)
}

/// Bounds how far `val` may move from the realtime reference `val_last`.
pub fn rt_rate_limit_check(val: i32, val_last: i32, max_rt_delta: i32) -> bool {
    let highest_val = val_last.max(0) + max_rt_delta;
    let lowest_val = val_last.min(0) - max_rt_delta;
    max_limit_check(val, highest_val, lowest_val)
}

/// Per-session history the steering torque check needs between commands.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SteerTorqueChecker {
    desired_torque_last: i32,
    rt_torque_last: i32,
    ts_torque_check_last: u32,
}

impl SteerTorqueChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn desired_torque_last(&self) -> i32 {
        self.desired_torque_last
    }

    /// Returns `true` on violation. `now_us` is a free-running microsecond
    /// timer; wraparound is handled.
    pub fn check(
        &mut self,
        desired_torque: i32,
        state: &VehicleSafetyState,
        limits: &SteeringLimits,
        now_us: u32,
    ) -> bool {
        let mut violation = false;

        if state.controls_allowed {
            violation |= max_limit_check(desired_torque, limits.max_steer, -limits.max_steer);

            match limits.limit_type {
                SteeringLimitType::DriverTorqueLimited => {
                    violation |= driver_limit_check(
                        desired_torque,
                        self.desired_torque_last,
                        &state.torque_driver,
                        limits,
                    );
                }
            }
            self.desired_torque_last = desired_torque;

            violation |= rt_rate_limit_check(desired_torque, self.rt_torque_last, limits.max_rt_delta);

            let ts_elapsed = now_us.wrapping_sub(self.ts_torque_check_last);
            if ts_elapsed > limits.max_rt_interval_us {
                self.rt_torque_last = desired_torque;
                self.ts_torque_check_last = now_us;
            }
        }

        if !state.controls_allowed && desired_torque != 0 {
            violation = true;
        }

        if violation || !state.controls_allowed {
            self.desired_torque_last = 0;
            self.rt_torque_last = 0;
            self.ts_torque_check_last = now_us;
        }

        violation
    }
}

pub fn longitudinal_brake_checks(
    desired_brake: i32,
    state: &VehicleSafetyState,
    limits: &LongitudinalLimits,
) -> bool {
    let mut violation = false;
    violation |= !state.longitudinal_allowed() && desired_brake != 0;
    violation |= desired_brake > limits.max_brake;
    violation
}

pub fn longitudinal_gas_checks(
    desired_gas: i32,
    state: &VehicleSafetyState,
    limits: &LongitudinalLimits,
) -> bool {
    if state.longitudinal_allowed() {
        max_limit_check(desired_gas, limits.max_gas, limits.min_gas)
    } else {
        desired_gas != limits.inactive_gas
    }
}

/// Interceptor gas commands must be zero unless longitudinal control is allowed.
pub fn longitudinal_interceptor_checks(frame: &CanFrame, state: &VehicleSafetyState) -> bool {
    !state.longitudinal_allowed() && (frame.byte(0) != 0 || frame.byte(1) != 0)
}

/// Default-deny allow list lookup on `(addr, bus, len)`.
pub fn msg_allowed(frame: &CanFrame, allowed: &[CanMsg]) -> bool {
    allowed.iter().any(|m| {
        m.addr == frame.addr() && m.bus == frame.bus() && usize::from(m.len) == frame.len()
    })
}

/// Follows the stock cruise state: enter controls on its rising edge, exit
/// whenever it is off.
pub fn pcm_cruise_check(cruise_engaged: bool, state: &mut VehicleSafetyState) {
    if !cruise_engaged && state.controls_allowed {
        debug!("stock cruise disengaged, controls not allowed");
        state.controls_allowed = false;
    }
    if cruise_engaged && !state.cruise_engaged_prev {
        debug!("stock cruise engaged, controls allowed");
        state.controls_allowed = true;
    }
    state.cruise_engaged_prev = cruise_engaged;
}

/// Pedal disengagement edges and stock ECU detection, run after every
/// powertrain frame has been decoded.
pub fn generic_rx_checks(stock_ecu_detected: bool, state: &mut VehicleSafetyState) {
    if state.gas_pressed && !state.gas_pressed_prev && state.controls_allowed {
        debug!("gas pressed, controls not allowed");
        state.controls_allowed = false;
    }
    state.gas_pressed_prev = state.gas_pressed;

    if state.brake_pressed
        && (!state.brake_pressed_prev || state.vehicle_moving)
        && state.controls_allowed
    {
        debug!(moving = state.vehicle_moving, "brake pressed, controls not allowed");
        state.controls_allowed = false;
    }
    state.brake_pressed_prev = state.brake_pressed;

    if state.regen_braking
        && (!state.regen_braking_prev || state.vehicle_moving)
        && state.controls_allowed
    {
        debug!(moving = state.vehicle_moving, "regen paddle pressed, controls not allowed");
        state.controls_allowed = false;
    }
    state.regen_braking_prev = state.regen_braking;

    // Stock ECU on a bus the harness should have split: relay is stuck.
    if stock_ecu_detected && state.safety_mode_cnt > RELAY_TRNS_TIMEOUT && !state.relay_malfunction {
        warn!("stock ECU detected on split bus, latching relay malfunction");
        state.relay_malfunction = true;
        state.controls_allowed = false;
    }
}
