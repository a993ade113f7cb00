#![allow(dead_code)]

use gmsafety::gm::GmSafety;
use gmsafety::hooks::{SafetyContext, SafetyHooks};
use gmsafety::CanFrame;

pub const PARAM_ASCM: u16 = 0;
pub const PARAM_CAM: u16 = 1;
pub const PARAM_CAM_LONG: u16 = 3;

/// GM hooks plus the context the dispatch loop would own.
pub struct Harness {
    pub gm: GmSafety,
    pub ctx: SafetyContext,
}

impl Harness {
    pub fn new(param: u16) -> Self {
        let mut gm = GmSafety::new();
        let checks = gm.init(param);
        let mut ctx = SafetyContext::new();
        ctx.rx_checks.install(checks, 0);
        Self { gm, ctx }
    }

    pub fn rx(&mut self, frame: &CanFrame) -> bool {
        self.gm.rx(frame, &mut self.ctx)
    }

    pub fn tx(&mut self, frame: &CanFrame) -> bool {
        self.gm.tx(frame, &mut self.ctx)
    }

    pub fn fwd(&self, bus: u8, frame: &CanFrame) -> Option<u8> {
        self.gm.fwd(bus, frame)
    }

    pub fn set_controls_allowed(&mut self, allowed: bool) {
        self.ctx.state.controls_allowed = allowed;
    }

    pub fn controls_allowed(&self) -> bool {
        self.ctx.state.controls_allowed
    }
}

pub fn frame(addr: u32, bus: u8, data: &[u8]) -> CanFrame {
    CanFrame::new(addr, bus, data).unwrap()
}

fn raw11(value: i32) -> (u8, u8) {
    let raw = (value as u32) & 0x7FF;
    ((raw >> 8) as u8, (raw & 0xFF) as u8)
}

// ---- inbound reports ----

pub fn torque_driver_msg(torque: i32) -> CanFrame {
    let (hi, lo) = raw11(torque);
    frame(388, 0, &[0, 0, 0, 0, 0, 0, hi, lo])
}

pub fn wheel_speed_msg(left: u16, right: u16) -> CanFrame {
    let l = left.to_be_bytes();
    let r = right.to_be_bytes();
    frame(842, 0, &[l[0], l[1], r[0], r[1], 0])
}

pub fn button_msg(code: u8) -> CanFrame {
    frame(481, 0, &[0, 0, 0, 0, 0, (code & 0x7) << 4, 0])
}

pub fn ascm_brake_msg(pressed: bool) -> CanFrame {
    frame(190, 0, &[0, if pressed { 8 } else { 0 }, 0, 0, 0, 0])
}

pub fn cam_brake_msg(pressed: bool) -> CanFrame {
    frame(201, 0, &[0, 0, 0, 0, 0, u8::from(pressed), 0, 0])
}

pub fn gas_pedal_msg(gas: u8, cruise_engaged: bool) -> CanFrame {
    let cruise = if cruise_engaged { 0x20 } else { 0 };
    frame(452, 0, &[0, cruise, 0, 0, 0, gas, 0, 0])
}

pub fn regen_msg(pressed: bool) -> CanFrame {
    frame(189, 0, &[if pressed { 0x10 } else { 0 }, 0, 0, 0, 0, 0, 0, 0])
}

pub fn interceptor_msg(value: u16) -> CanFrame {
    let v = value.to_be_bytes();
    frame(513, 0, &[v[0], v[1], v[0], v[1], 0, 0])
}

// ---- outbound commands ----

pub fn steer_cmd(torque: i32) -> CanFrame {
    let (hi, lo) = raw11(torque);
    frame(384, 0, &[hi, lo, 0, 0])
}

pub fn brake_cmd(bus: u8, brake: i32) -> CanFrame {
    let raw = ((0x1000 - brake) & 0xFFF) as u16;
    frame(789, bus, &[((raw >> 8) & 0xF) as u8, (raw & 0xFF) as u8, 0, 0, 0])
}

pub fn gas_regen_cmd(apply: bool, gas: i32) -> CanFrame {
    let b2 = ((gas >> 5) & 0x7F) as u8;
    let b3 = ((gas & 0x1F) << 3) as u8;
    frame(715, 0, &[u8::from(apply), 0, b2, b3, 0, 0, 0, 0])
}

pub fn interceptor_cmd(gas: u16) -> CanFrame {
    let g = gas.to_be_bytes();
    frame(512, 0, &[g[0], g[1], 0, 0, 0, 0])
}

pub fn button_cmd(bus: u8, code: u8) -> CanFrame {
    frame(481, bus, &[0, 0, 0, 0, 0, (code & 0x7) << 4, 0])
}
