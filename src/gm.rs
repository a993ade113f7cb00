//! GM safety model.
//!
//! All commands (gas/regen, friction brake and steering) are passed up to
//! their limits only while controls are allowed and no pedal is pressed;
//! otherwise anything producing actuation is blocked. Frames are never
//! edited, only passed or dropped whole.
//!
//! Two harnesses are supported:
//!
//! - **ASCM** ([`HardwareVariant::DirectController`]): the interposer replaces
//!   the ASCM and commands steering, gas/regen and friction brakes on every
//!   bus. Nothing is forwarded.
//! - **Camera** ([`HardwareVariant::CameraIntegrated`]): the interposer sits
//!   between the forward camera and the powertrain bus. Stock longitudinal is
//!   kept (controls follow the stock cruise state) unless longitudinal
//!   passthrough is enabled, in which case the stock ACC messages from the
//!   camera are dropped and replaced.

use crate::can::{to_signed, CanFrame};
use crate::checks::{
    generic_rx_checks, longitudinal_brake_checks, longitudinal_gas_checks,
    longitudinal_interceptor_checks, msg_allowed, pcm_cruise_check,
};
use crate::config::{GmConfig, HardwareVariant};
use crate::hooks::{SafetyContext, SafetyHooks};
use crate::limits::{GM_GAS_INTERCEPTOR_THRESHOLD, GM_STANDSTILL_THRESHOLD, GM_STEERING_LIMITS};
use crate::state::{CruiseButton, VehicleSafetyState};
use crate::tables::{
    AddrCheck, CanMsg, BUS_CAMERA, BUS_POWERTRAIN, GM_ACC_DASHBOARD_CMD, GM_ADDR_CHECKS,
    GM_ASCM_BRAKE_PEDAL, GM_ASCM_TX_MSGS, GM_CAM_BRAKE_PEDAL, GM_CAM_LONG_TX_MSGS,
    GM_CAM_TX_MSGS, GM_CRUISE_BUTTONS, GM_FRICTION_BRAKE_CMD, GM_GAS_INTERCEPTOR,
    GM_GAS_INTERCEPTOR_CMD, GM_GAS_PEDAL, GM_GAS_REGEN_CMD, GM_LKAS_STEERING_CMD, GM_PSCM_STATUS,
    GM_REAR_WHEEL_SPEED, GM_REGEN_PADDLE,
};
use tracing::{debug, trace};

// ****************************************************************************
// SIGNAL DECODING
// ****************************************************************************

/// Driver torque from PSCMStatus: 11-bit signed, `(b6 & 0x7) << 8 | b7`.
pub fn driver_torque(frame: &CanFrame) -> i32 {
    let raw = (u32::from(frame.byte(6) & 0x7) << 8) | u32::from(frame.byte(7));
    to_signed(raw, 11)
}

/// Left and right rear wheel speeds, big-endian words at bytes 0 and 2.
pub fn rear_wheel_speeds(frame: &CanFrame) -> (u16, u16) {
    (frame.be_u16(0), frame.be_u16(2))
}

/// Cruise button code in bits 4..7 of byte 5.
pub fn cruise_button(frame: &CanFrame) -> CruiseButton {
    CruiseButton::from_code((frame.byte(5) >> 4) & 0x7)
}

/// Average of the interceptor's two redundant pedal tracks.
pub fn interceptor_value(frame: &CanFrame) -> i32 {
    let track_a = (i32::from(frame.byte(0)) << 8) + i32::from(frame.byte(1));
    let track_b = (i32::from(frame.byte(2)) << 8) + i32::from(frame.byte(3));
    (track_a + track_b) / 2
}

/// Friction brake magnitude; the wire value counts down from 0x1000.
pub fn brake_command(frame: &CanFrame) -> i32 {
    let raw = (i32::from(frame.byte(0) & 0xF) << 8) + i32::from(frame.byte(1));
    (0x1000 - raw) & 0xFFF
}

/// Requested LKA torque: 11-bit signed, `(b0 & 0x7) << 8 | b1`.
pub fn steer_command(frame: &CanFrame) -> i32 {
    let raw = (u32::from(frame.byte(0) & 0x7) << 8) | u32::from(frame.byte(1));
    to_signed(raw, 11)
}

/// Apply bit and 12-bit gas/regen magnitude.
pub fn gas_regen_command(frame: &CanFrame) -> (bool, i32) {
    let apply = frame.bit(0);
    let gas_regen =
        (i32::from(frame.byte(2) & 0x7F) << 5) + (i32::from(frame.byte(3) & 0xF8) >> 3);
    (apply, gas_regen)
}

// ****************************************************************************
// HOOKS
// ****************************************************************************

#[derive(Debug, Clone)]
pub struct GmSafety {
    config: GmConfig,
    /// Controls follow the stock cruise state instead of button edges.
    pcm_cruise: bool,
}

impl GmSafety {
    pub fn new() -> Self {
        let config = GmConfig::default();
        Self {
            pcm_cruise: config.pcm_cruise(),
            config,
        }
    }

    pub fn config(&self) -> &GmConfig {
        &self.config
    }

    pub fn variant(&self) -> HardwareVariant {
        self.config.variant
    }

    pub fn pcm_cruise(&self) -> bool {
        self.pcm_cruise
    }

    /// Allow list for the installed harness.
    pub fn tx_msgs(&self) -> &'static [CanMsg] {
        match self.config.variant {
            HardwareVariant::DirectController => &GM_ASCM_TX_MSGS,
            HardwareVariant::CameraIntegrated {
                longitudinal_passthrough: false,
            } => &GM_CAM_TX_MSGS,
            HardwareVariant::CameraIntegrated {
                longitudinal_passthrough: true,
            } => &GM_CAM_LONG_TX_MSGS,
        }
    }

    fn update_state(&mut self, frame: &CanFrame, state: &mut VehicleSafetyState) {
        let addr = frame.addr();
        let is_camera = self.config.variant.is_camera();

        match addr {
            GM_PSCM_STATUS => state.torque_driver.update(driver_torque(frame)),

            GM_REAR_WHEEL_SPEED => {
                let (left, right) = rear_wheel_speeds(frame);
                state.vehicle_moving =
                    left > GM_STANDSTILL_THRESHOLD || right > GM_STANDSTILL_THRESHOLD;
            }

            // Camera harness ties controls to the stock buttons
            GM_CRUISE_BUTTONS if is_camera => self.update_cruise_button(cruise_button(frame), state),

            GM_ASCM_BRAKE_PEDAL if !is_camera => state.brake_pressed = frame.byte(1) >= 8,

            GM_CAM_BRAKE_PEDAL if is_camera => state.brake_pressed = frame.bit(40),

            GM_GAS_PEDAL => {
                if !state.gas_interceptor_detected {
                    state.gas_pressed = frame.byte(5) != 0;
                }

                if self.pcm_cruise {
                    let cruise_engaged = (frame.byte(1) >> 5) != 0;
                    pcm_cruise_check(cruise_engaged, state);
                }
            }

            GM_REGEN_PADDLE => state.regen_braking = (frame.byte(0) >> 4) != 0,

            GM_GAS_INTERCEPTOR => {
                if !state.gas_interceptor_detected {
                    debug!("gas interceptor detected, taking over gas pressed");
                }
                state.gas_interceptor_detected = true;
                self.pcm_cruise = false;

                let gas_interceptor = interceptor_value(frame);
                state.gas_pressed = gas_interceptor > GM_GAS_INTERCEPTOR_THRESHOLD;
                state.gas_interceptor_prev = gas_interceptor;
            }

            _ => {}
        }

        // ASCMLKASteeringCmd always; ASCMGasRegenCmd only when the ASCM is replaced
        let stock_ecu_detected = addr == GM_LKAS_STEERING_CMD
            || (self.config.variant == HardwareVariant::DirectController
                && addr == GM_GAS_REGEN_CMD);
        generic_rx_checks(stock_ecu_detected, state);
    }

    /// Enter controls on the falling edge of set or the rising edge of resume
    /// (entering on set press faults the stock cruise). Cancel exits.
    fn update_cruise_button(&self, button: CruiseButton, state: &mut VehicleSafetyState) {
        let prev = state.cruise_button_prev;
        let set = button != CruiseButton::Set && prev == CruiseButton::Set;
        let res = button == CruiseButton::Resume && prev != CruiseButton::Resume;

        if (set || res) && !state.controls_allowed {
            debug!(?button, ?prev, "cruise button edge, controls allowed");
        }
        if set || res {
            state.controls_allowed = true;
        }

        if button == CruiseButton::Cancel {
            if state.controls_allowed {
                debug!("cruise cancel, controls not allowed");
            }
            state.controls_allowed = false;
        }

        state.cruise_button_prev = button;
    }

    fn button_allowed(&self, button: CruiseButton, state: &VehicleSafetyState) -> bool {
        let mut allowed = button == CruiseButton::Cancel && state.cruise_engaged_prev;

        // Stock cruise: resume/set spamming keeps the car engaged
        allowed |= state.cruise_engaged_prev
            && self.config.variant.is_camera()
            && matches!(
                button,
                CruiseButton::Set | CruiseButton::Resume | CruiseButton::Unpress
            );

        // TODO: cancel needs handling for interceptor-equipped ASCM cars
        allowed
    }
}

impl Default for GmSafety {
    fn default() -> Self {
        Self::new()
    }
}

impl SafetyHooks for GmSafety {
    fn init(&mut self, param: u16) -> &'static [AddrCheck] {
        self.config = GmConfig::from_param(param);
        self.pcm_cruise = self.config.pcm_cruise();

        debug!(
            variant = ?self.config.variant,
            pcm_cruise = self.pcm_cruise,
            "GM safety initialized"
        );
        &GM_ADDR_CHECKS
    }

    fn rx(&mut self, frame: &CanFrame, ctx: &mut SafetyContext) -> bool {
        let valid = ctx.rx_checks.addr_safety_check(frame, ctx.now_us);

        // Bookkeeping runs on every powertrain frame; validity is enforced by the caller
        if frame.bus() == BUS_POWERTRAIN {
            self.update_state(frame, &mut ctx.state);
        }

        valid
    }

    fn tx(&self, frame: &CanFrame, ctx: &mut SafetyContext) -> bool {
        let state = &ctx.state;
        let limits = &self.config.long_limits;
        let mut tx = msg_allowed(frame, self.tx_msgs());

        match frame.addr() {
            GM_FRICTION_BRAKE_CMD => {
                if longitudinal_brake_checks(brake_command(frame), state, limits) {
                    tx = false;
                }
            }

            GM_LKAS_STEERING_CMD => {
                let desired_torque = steer_command(frame);
                if ctx.steer.check(desired_torque, state, &GM_STEERING_LIMITS, ctx.now_us) {
                    tx = false;
                }
            }

            GM_GAS_INTERCEPTOR_CMD => {
                if longitudinal_interceptor_checks(frame, state) {
                    tx = false;
                }
            }

            GM_GAS_REGEN_CMD => {
                let (apply, gas_regen) = gas_regen_command(frame);

                // Apply bit is allowed while pre-enabled and overriding
                let mut violation = !state.controls_allowed && apply;
                violation |= longitudinal_gas_checks(gas_regen, state, limits);

                if violation {
                    tx = false;
                }
            }

            // Resume spamming and cancellation with stock longitudinal
            GM_CRUISE_BUTTONS if self.pcm_cruise || self.config.variant.is_camera() => {
                if !self.button_allowed(cruise_button(frame), state) {
                    tx = false;
                }
            }

            _ => {}
        }

        if !tx {
            trace!(addr = frame.addr(), bus = frame.bus(), len = frame.len(), "tx blocked");
        }
        tx
    }

    fn fwd(&self, bus: u8, frame: &CanFrame) -> Option<u8> {
        let HardwareVariant::CameraIntegrated {
            longitudinal_passthrough,
        } = self.config.variant
        else {
            return None;
        };
        let addr = frame.addr();

        match bus {
            // PSCMStatus goes through the assistance computer to hide a camera alert
            BUS_POWERTRAIN if addr != GM_PSCM_STATUS => Some(BUS_CAMERA),
            BUS_CAMERA => {
                let is_lkas_msg = addr == GM_LKAS_STEERING_CMD;
                let is_acc_msg = matches!(
                    addr,
                    GM_FRICTION_BRAKE_CMD | GM_GAS_REGEN_CMD | GM_ACC_DASHBOARD_CMD
                );
                if is_lkas_msg || (is_acc_msg && longitudinal_passthrough) {
                    None
                } else {
                    Some(BUS_POWERTRAIN)
                }
            }
            _ => None,
        }
    }
}
