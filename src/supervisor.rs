use crate::can::CanFrame;
use crate::config::{SafetyError, SafetyMode};
use crate::gm::GmSafety;
use crate::hooks::{NoOutputSafety, SafetyContext, SafetyHooks, SafetyModel};
use crate::state::VehicleSafetyState;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyStats {
    pub rx_frames: u32,
    pub rx_invalid: u32,
    pub tx_frames: u32,
    pub tx_blocked: u32,
    pub fwd_frames: u32,
}

/// Owns the installed safety model and its context, and wraps the hooks the
/// way the frame dispatch loop calls them.
///
/// Every call runs to completion synchronously; state written by `rx` is
/// visible to the very next `tx`.
#[derive(Debug, Default)]
pub struct SafetySupervisor {
    mode: Option<SafetyMode>,
    param: u16,
    model: SafetyModel,
    ctx: SafetyContext,
    stats: SafetyStats,
}

impl SafetySupervisor {
    /// Starts in no-output mode until a vehicle model is selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a safety model from its mode number, resetting all vehicle state.
    pub fn set_safety_mode_raw(&mut self, mode: u16, param: u16) -> Result<(), SafetyError> {
        let mode = SafetyMode::try_from(mode)?;
        self.set_safety_mode(mode, param);
        Ok(())
    }

    pub fn set_safety_mode(&mut self, mode: SafetyMode, param: u16) {
        let mut model = match mode {
            SafetyMode::Gm => SafetyModel::Gm(GmSafety::new()),
            SafetyMode::NoOutput => SafetyModel::NoOutput(NoOutputSafety),
        };

        let now_us = self.ctx.now_us;
        self.ctx = SafetyContext::new();
        self.ctx.now_us = now_us;

        let rx_checks = model.init(param);
        self.ctx.rx_checks.install(rx_checks, now_us);

        self.model = model;
        self.mode = Some(mode);
        self.param = param;
        self.stats = SafetyStats::default();

        info!(?mode, param, checks = rx_checks.len(), "safety mode installed");
    }

    pub fn mode(&self) -> Option<SafetyMode> {
        self.mode
    }

    pub fn param(&self) -> u16 {
        self.param
    }

    pub fn model(&self) -> &SafetyModel {
        &self.model
    }

    pub fn context(&self) -> &SafetyContext {
        &self.ctx
    }

    pub fn state(&self) -> &VehicleSafetyState {
        &self.ctx.state
    }

    pub fn stats(&self) -> SafetyStats {
        self.stats
    }

    /// Advances the microsecond timer used by the torque and lag checks.
    pub fn set_timestamp(&mut self, now_us: u32) {
        self.ctx.now_us = now_us;
    }

    /// Inbound frame; returns whether it is valid.
    pub fn rx(&mut self, frame: &CanFrame) -> bool {
        self.stats.rx_frames = self.stats.rx_frames.wrapping_add(1);
        let valid = self.model.rx(frame, &mut self.ctx);

        if !valid {
            self.stats.rx_invalid = self.stats.rx_invalid.wrapping_add(1);
            warn!(addr = frame.addr(), bus = frame.bus(), len = frame.len(), "invalid rx frame");
        }
        valid
    }

    /// Outbound frame; a latched relay malfunction blocks everything.
    pub fn tx(&mut self, frame: &CanFrame) -> bool {
        self.stats.tx_frames = self.stats.tx_frames.wrapping_add(1);
        let allowed = self.model.tx(frame, &mut self.ctx) && !self.ctx.state.relay_malfunction;

        if !allowed {
            self.stats.tx_blocked = self.stats.tx_blocked.wrapping_add(1);
        }
        allowed
    }

    pub fn fwd(&mut self, bus: u8, frame: &CanFrame) -> Option<u8> {
        if self.ctx.state.relay_malfunction {
            return None;
        }

        let target = self.model.fwd(bus, frame);
        if target.is_some() {
            self.stats.fwd_frames = self.stats.fwd_frames.wrapping_add(1);
        }
        target
    }

    /// Periodic (1 Hz) housekeeping: relay grace counter and rx lag detection.
    pub fn tick(&mut self, now_us: u32) {
        self.ctx.now_us = now_us;
        self.ctx.state.safety_mode_cnt = self.ctx.state.safety_mode_cnt.saturating_add(1);
        self.ctx.rx_checks.tick(now_us, &mut self.ctx.state);
    }
}
