//! The per-vehicle hook interface and the context every hook operates on.

use crate::can::CanFrame;
use crate::checks::SteerTorqueChecker;
use crate::gm::GmSafety;
use crate::monitor::RxMonitor;
use crate::state::VehicleSafetyState;
use crate::tables::AddrCheck;
use serde::Serialize;

/// Mutable state owned by the dispatch loop and passed into every hook.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SafetyContext {
    pub state: VehicleSafetyState,
    pub rx_checks: RxMonitor,
    pub steer: SteerTorqueChecker,
    /// Free-running microsecond timer, advanced by the dispatch loop.
    pub now_us: u32,
}

impl SafetyContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Entry points a vehicle safety model provides to the dispatch loop.
///
/// `rx` is the only hook allowed to change [`VehicleSafetyState`]; `tx` may
/// only advance the steering command history in the context.
pub trait SafetyHooks {
    /// Called once when the model is installed. Returns the address checks
    /// for the presence monitor.
    fn init(&mut self, param: u16) -> &'static [AddrCheck];

    /// Inbound frame. Returns whether the frame is structurally valid.
    fn rx(&mut self, frame: &CanFrame, ctx: &mut SafetyContext) -> bool;

    /// Outbound frame. Returns whether it may be transmitted unchanged.
    fn tx(&self, frame: &CanFrame, ctx: &mut SafetyContext) -> bool;

    /// Target bus for mirroring an inbound frame, if any.
    fn fwd(&self, bus: u8, frame: &CanFrame) -> Option<u8>;
}

/// Blocks all output and forwards nothing. Used before a vehicle model is selected.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOutputSafety;

impl SafetyHooks for NoOutputSafety {
    fn init(&mut self, _param: u16) -> &'static [AddrCheck] {
        &[]
    }

    fn rx(&mut self, _frame: &CanFrame, _ctx: &mut SafetyContext) -> bool {
        true
    }

    fn tx(&self, _frame: &CanFrame, _ctx: &mut SafetyContext) -> bool {
        false
    }

    fn fwd(&self, _bus: u8, _frame: &CanFrame) -> Option<u8> {
        None
    }
}

/// The installed safety model, selected once at startup.
#[derive(Debug, Clone)]
pub enum SafetyModel {
    NoOutput(NoOutputSafety),
    Gm(GmSafety),
}

impl Default for SafetyModel {
    fn default() -> Self {
        SafetyModel::NoOutput(NoOutputSafety)
    }
}

impl SafetyHooks for SafetyModel {
    fn init(&mut self, param: u16) -> &'static [AddrCheck] {
        match self {
            SafetyModel::NoOutput(model) => model.init(param),
            SafetyModel::Gm(model) => model.init(param),
        }
    }

    fn rx(&mut self, frame: &CanFrame, ctx: &mut SafetyContext) -> bool {
        match self {
            SafetyModel::NoOutput(model) => model.rx(frame, ctx),
            SafetyModel::Gm(model) => model.rx(frame, ctx),
        }
    }

    fn tx(&self, frame: &CanFrame, ctx: &mut SafetyContext) -> bool {
        match self {
            SafetyModel::NoOutput(model) => model.tx(frame, ctx),
            SafetyModel::Gm(model) => model.tx(frame, ctx),
        }
    }

    fn fwd(&self, bus: u8, frame: &CanFrame) -> Option<u8> {
        match self {
            SafetyModel::NoOutput(model) => model.fwd(bus, frame),
            SafetyModel::Gm(model) => model.fwd(bus, frame),
        }
    }
}
