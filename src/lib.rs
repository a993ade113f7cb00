//! # GM CAN Interposer Safety
//!
//! Vehicle safety policy for a CAN interposer sitting between a GM car's
//! native control units and a driving-assistance computer. Only bounded
//! commands reach steering, gas/regen, friction brakes and cruise buttons,
//! while vehicle state is tracked from observed traffic.
//!
//! ## Features
//!
//! - **Rx state tracking**: driver torque, wheel speed, pedals, cruise buttons and engagement
//! - **Tx gating**: default-deny allow lists plus per-message bound checks
//! - **Bus forwarding**: camera harness routing between the powertrain and camera buses
//! - **Presence monitoring**: per-address length and cadence checks
//! - **Embedded-friendly**: no heap allocations on the frame path, bounded work per call
//!
//! ## Quick Start
//!
//! ```rust
//! use gmsafety::{CanFrame, SafetyMode, SafetySupervisor};
//!
//! let mut supervisor = SafetySupervisor::new();
//! supervisor.set_safety_mode(SafetyMode::Gm, gmsafety::config::GM_PARAM_HW_CAM);
//!
//! // Feed inbound traffic
//! let wheel_speed = CanFrame::new(842, 0, &[0, 5, 0, 20, 0]).unwrap();
//! assert!(supervisor.rx(&wheel_speed));
//! assert!(supervisor.state().vehicle_moving);
//!
//! // Steering is blocked until controls are allowed
//! let steer = CanFrame::new(384, 0, &[0, 5, 0, 0]).unwrap();
//! assert!(!supervisor.tx(&steer));
//! ```
//!
//! ## Architecture
//!
//! - [`supervisor`] - Dispatch-side wrapper owning the model and its context
//! - [`hooks`] - The per-vehicle hook trait and shared context
//! - [`gm`] - GM rx/tx/fwd hooks and signal decoding
//! - [`checks`] - Vehicle-independent bound checks and edge rules
//! - [`monitor`] - Inbound presence and timing monitor
//! - [`tables`], [`limits`], [`config`] - Static catalog, limits and parameter decoding

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::new_without_default)]

pub mod can;
pub mod checks;
pub mod config;
pub mod gm;
pub mod hooks;
pub mod limits;
pub mod monitor;
pub mod state;
pub mod supervisor;
pub mod tables;

// Re-export main public types for convenience
pub use can::{CanFrame, FrameError};
pub use config::{GmConfig, HardwareVariant, SafetyError, SafetyMode};
pub use gm::GmSafety;
pub use hooks::{SafetyContext, SafetyHooks, SafetyModel};
pub use state::{CruiseButton, VehicleSafetyState};
pub use supervisor::{SafetyStats, SafetySupervisor};
