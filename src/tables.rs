//! Static GM message catalog: addresses, transmit allow lists and the
//! inbound address checks installed into the presence monitor.

use serde::Serialize;
use static_assertions::const_assert;

// ****************************************************************************
// POWERTRAIN BUS REPORTS
// ****************************************************************************

/// Regen paddle state.
pub const GM_REGEN_PADDLE: u32 = 189;
/// Brake pedal, direct-controller harness.
pub const GM_ASCM_BRAKE_PEDAL: u32 = 190;
/// Brake pedal, camera harness.
pub const GM_CAM_BRAKE_PEDAL: u32 = 201;
pub const GM_STEERING_WHEEL_ANGLE: u32 = 241;
/// Driver torque and EPS status (PSCMStatus).
pub const GM_PSCM_STATUS: u32 = 388;
/// Gas pedal and stock cruise state.
pub const GM_GAS_PEDAL: u32 = 452;
/// Cruise control buttons.
pub const GM_CRUISE_BUTTONS: u32 = 481;
/// Pedal interceptor report.
pub const GM_GAS_INTERCEPTOR: u32 = 513;
pub const GM_REAR_WHEEL_SPEED: u32 = 842;

// ****************************************************************************
// COMMANDS
// ****************************************************************************

pub const GM_LKAS_STEERING_CMD: u32 = 384;
pub const GM_GAS_INTERCEPTOR_CMD: u32 = 512;
pub const GM_GAS_REGEN_CMD: u32 = 715;
pub const GM_FRICTION_BRAKE_CMD: u32 = 789;
pub const GM_ACC_DASHBOARD_CMD: u32 = 880;

// ****************************************************************************
// BUSES
// ****************************************************************************

pub const BUS_POWERTRAIN: u8 = 0;
pub const BUS_OBSTACLE: u8 = 1;
pub const BUS_CHASSIS: u8 = 2;
/// Camera harness reuses bus 2 for the camera side.
pub const BUS_CAMERA: u8 = 2;
pub const BUS_GMLAN: u8 = 3;

/// One transmit allow list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CanMsg {
    pub addr: u32,
    pub bus: u8,
    pub len: u8,
}

const fn msg(addr: u32, bus: u8, len: u8) -> CanMsg {
    CanMsg { addr, bus, len }
}

pub const GM_ASCM_TX_MSGS: [CanMsg; 13] = [
    msg(GM_LKAS_STEERING_CMD, BUS_POWERTRAIN, 4),
    msg(1033, BUS_POWERTRAIN, 7),
    msg(1034, BUS_POWERTRAIN, 7),
    msg(GM_GAS_REGEN_CMD, BUS_POWERTRAIN, 8),
    msg(GM_ACC_DASHBOARD_CMD, BUS_POWERTRAIN, 6),
    msg(GM_GAS_INTERCEPTOR_CMD, BUS_POWERTRAIN, 6),
    msg(161, BUS_OBSTACLE, 7),
    msg(774, BUS_OBSTACLE, 8),
    msg(776, BUS_OBSTACLE, 7),
    msg(784, BUS_OBSTACLE, 2),
    msg(GM_FRICTION_BRAKE_CMD, BUS_CHASSIS, 5),
    msg(0x104c_006c, BUS_GMLAN, 3),
    msg(0x1040_0060, BUS_GMLAN, 5),
];

pub const GM_CAM_TX_MSGS: [CanMsg; 5] = [
    msg(GM_LKAS_STEERING_CMD, BUS_POWERTRAIN, 4),
    msg(GM_GAS_INTERCEPTOR_CMD, BUS_POWERTRAIN, 6),
    msg(GM_CRUISE_BUTTONS, BUS_POWERTRAIN, 7),
    msg(GM_CRUISE_BUTTONS, BUS_CAMERA, 7),
    msg(GM_PSCM_STATUS, BUS_CAMERA, 8),
];

pub const GM_CAM_LONG_TX_MSGS: [CanMsg; 8] = [
    msg(GM_LKAS_STEERING_CMD, BUS_POWERTRAIN, 4),
    msg(GM_FRICTION_BRAKE_CMD, BUS_POWERTRAIN, 5),
    msg(GM_GAS_REGEN_CMD, BUS_POWERTRAIN, 8),
    msg(GM_ACC_DASHBOARD_CMD, BUS_POWERTRAIN, 6),
    msg(GM_GAS_INTERCEPTOR_CMD, BUS_POWERTRAIN, 6),
    msg(GM_CRUISE_BUTTONS, BUS_POWERTRAIN, 7),
    msg(GM_CRUISE_BUTTONS, BUS_CAMERA, 7),
    msg(GM_PSCM_STATUS, BUS_CAMERA, 8),
];

/// Alternatives per address check, to tolerate layout differences between models.
pub const MAX_ADDR_CHECK_MSGS: usize = 3;

/// One acceptable (addr, bus, len) layout and its expected period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AddrCheckMsg {
    pub addr: u32,
    pub bus: u8,
    pub len: u8,
    pub expected_timestep_us: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AddrCheck {
    pub msg: [Option<AddrCheckMsg>; MAX_ADDR_CHECK_MSGS],
}

impl AddrCheck {
    pub fn alternatives(&self) -> impl Iterator<Item = &AddrCheckMsg> {
        self.msg.iter().flatten()
    }
}

// TODO: checksum and counter checks once the rx layouts are confirmed; 0.1 s timestep for now.
const GM_RX_TIMESTEP_US: u32 = 100_000;

const fn rx(addr: u32, len: u8) -> Option<AddrCheckMsg> {
    Some(AddrCheckMsg {
        addr,
        bus: BUS_POWERTRAIN,
        len,
        expected_timestep_us: GM_RX_TIMESTEP_US,
    })
}

const fn single(addr: u32, len: u8) -> AddrCheck {
    AddrCheck {
        msg: [rx(addr, len), None, None],
    }
}

pub const GM_ADDR_CHECKS: [AddrCheck; 7] = [
    single(GM_PSCM_STATUS, 8),
    single(GM_REAR_WHEEL_SPEED, 5),
    single(GM_CRUISE_BUTTONS, 7),
    single(GM_STEERING_WHEEL_ANGLE, 6),
    // Volt, Silverado, Acadia Denali / Bolt EUV / Escalade
    AddrCheck {
        msg: [
            rx(GM_ASCM_BRAKE_PEDAL, 6),
            rx(GM_ASCM_BRAKE_PEDAL, 7),
            rx(GM_ASCM_BRAKE_PEDAL, 8),
        ],
    },
    single(GM_GAS_PEDAL, 8),
    single(GM_CAM_BRAKE_PEDAL, 8),
];

/// Capacity of the runtime presence monitor.
pub const MAX_ADDR_CHECKS: usize = 16;

const_assert!(GM_ADDR_CHECKS.len() <= MAX_ADDR_CHECKS);
