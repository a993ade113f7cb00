//! Presence and timing monitor for inbound frames.
//!
//! Each address check may list several acceptable layouts for the same
//! address. The first layout observed on the bus is locked in for the rest
//! of the session, so a car cannot switch layouts mid-drive.

use crate::can::CanFrame;
use crate::state::VehicleSafetyState;
use crate::tables::{AddrCheck, AddrCheckMsg, MAX_ADDR_CHECKS};
use heapless::Vec;
use serde::Serialize;
use tracing::warn;

/// Missed periods before a monitored address counts as lagging.
pub const MAX_MISSED_MSGS: u32 = 10;
/// Lower bound on the lag window. \[us\]
pub const MIN_LAG_WINDOW_US: u32 = 1_000_000;

/// Outcome of matching one frame against the address checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AddrMatch {
    /// Address not covered by any check.
    Unmonitored,
    /// Matched the check at this index.
    Monitored(usize),
    /// Address/bus is monitored but the length fits no allowed layout.
    Malformed(usize),
}

#[derive(Debug, Clone, Serialize)]
pub struct AddrCheckState {
    pub check: AddrCheck,
    /// Index of the layout locked in on first sight.
    pub locked_msg: Option<usize>,
    pub last_timestamp_us: u32,
    pub lagging: bool,
}

impl AddrCheckState {
    fn new(check: AddrCheck, now_us: u32) -> Self {
        Self {
            check,
            locked_msg: None,
            last_timestamp_us: now_us,
            lagging: false,
        }
    }

    fn covers(&self, frame: &CanFrame) -> bool {
        self.check
            .alternatives()
            .any(|m| m.addr == frame.addr() && m.bus == frame.bus())
    }

    fn expected(&self) -> Option<&AddrCheckMsg> {
        match self.locked_msg {
            Some(index) => self.check.msg[index].as_ref(),
            None => self.check.alternatives().next(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RxMonitor {
    checks: Vec<AddrCheckState, MAX_ADDR_CHECKS>,
}

impl RxMonitor {
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    /// Installs a check table; entries beyond capacity are dropped with a warning.
    pub fn install(&mut self, table: &[AddrCheck], now_us: u32) {
        self.checks.clear();
        for check in table {
            if self.checks.push(AddrCheckState::new(*check, now_us)).is_err() {
                warn!(capacity = MAX_ADDR_CHECKS, "address check table truncated");
                break;
            }
        }
    }

    pub fn checks(&self) -> &[AddrCheckState] {
        &self.checks
    }

    pub fn match_frame(&mut self, frame: &CanFrame) -> AddrMatch {
        let Some(index) = self.checks.iter().position(|c| c.covers(frame)) else {
            return AddrMatch::Unmonitored;
        };
        let entry = &mut self.checks[index];

        if entry.locked_msg.is_none() {
            entry.locked_msg = entry.check.msg.iter().position(|m| {
                m.is_some_and(|m| {
                    m.addr == frame.addr()
                        && m.bus == frame.bus()
                        && usize::from(m.len) == frame.len()
                })
            });
        }

        match entry.locked_msg.and_then(|i| entry.check.msg[i]) {
            Some(m) if m.addr == frame.addr() && usize::from(m.len) == frame.len() => {
                AddrMatch::Monitored(index)
            }
            _ => AddrMatch::Malformed(index),
        }
    }

    /// Records the frame's arrival and reports whether it is structurally valid.
    pub fn addr_safety_check(&mut self, frame: &CanFrame, now_us: u32) -> bool {
        match self.match_frame(frame) {
            AddrMatch::Unmonitored => true,
            AddrMatch::Monitored(index) => {
                let entry = &mut self.checks[index];
                entry.last_timestamp_us = now_us;
                entry.lagging = false;
                true
            }
            AddrMatch::Malformed(_) => false,
        }
    }

    /// Flags addresses that have gone quiet and revokes controls while any are lagging.
    /// Returns `true` if any address is lagging.
    pub fn tick(&mut self, now_us: u32, state: &mut VehicleSafetyState) -> bool {
        let mut any_lagging = false;

        for entry in &mut self.checks {
            let Some(expected) = entry.expected() else {
                continue;
            };
            let window = expected
                .expected_timestep_us
                .saturating_mul(MAX_MISSED_MSGS)
                .max(MIN_LAG_WINDOW_US);
            let elapsed = now_us.wrapping_sub(entry.last_timestamp_us);
            let lagging = elapsed > window;

            if lagging && !entry.lagging {
                warn!(addr = expected.addr, elapsed_us = elapsed, "rx message lagging");
            }
            entry.lagging = lagging;
            any_lagging |= lagging;
        }

        if any_lagging {
            state.controls_allowed = false;
        }
        any_lagging
    }
}
