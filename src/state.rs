use serde::{Deserialize, Serialize};

/// Number of driver torque samples kept for the override allowance.
pub const MAX_SAMPLE_VALS: usize = 6;

/// Rolling window of the most recent samples with cached extremes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleWindow {
    values: [i32; MAX_SAMPLE_VALS],
    min: i32,
    max: i32,
}

impl SampleWindow {
    pub fn new() -> Self {
        Self {
            values: [0; MAX_SAMPLE_VALS],
            min: 0,
            max: 0,
        }
    }

    /// Shifts `sample` in as the newest value and recomputes min/max.
    pub fn update(&mut self, sample: i32) {
        self.values.copy_within(0..MAX_SAMPLE_VALS - 1, 1);
        self.values[0] = sample;

        self.min = self.values.iter().copied().min().unwrap_or(sample);
        self.max = self.values.iter().copied().max().unwrap_or(sample);
    }

    pub fn values(&self) -> &[i32] {
        &self.values
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Steering wheel cruise buttons as reported on the bus (3-bit code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CruiseButton {
    Unpress,
    Resume,
    Set,
    Cancel,
    Other(u8),
}

impl CruiseButton {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => CruiseButton::Unpress,
            2 => CruiseButton::Resume,
            3 => CruiseButton::Set,
            6 => CruiseButton::Cancel,
            other => CruiseButton::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            CruiseButton::Unpress => 1,
            CruiseButton::Resume => 2,
            CruiseButton::Set => 3,
            CruiseButton::Cancel => 6,
            CruiseButton::Other(code) => code,
        }
    }
}

impl Default for CruiseButton {
    fn default() -> Self {
        CruiseButton::Other(0)
    }
}

/// Vehicle state shared by the rx, tx and forwarding hooks.
///
/// Only the rx path writes these fields. `controls_allowed` never decays on
/// its own: it changes on engagement edges, pedal edges, cancel presses and
/// monitor faults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleSafetyState {
    pub controls_allowed: bool,
    pub relay_malfunction: bool,

    pub vehicle_moving: bool,
    pub brake_pressed: bool,
    pub brake_pressed_prev: bool,
    pub gas_pressed: bool,
    pub gas_pressed_prev: bool,
    pub regen_braking: bool,
    pub regen_braking_prev: bool,

    /// Latched for the session once any interceptor report is seen.
    pub gas_interceptor_detected: bool,
    pub gas_interceptor_prev: i32,

    pub cruise_button_prev: CruiseButton,
    pub cruise_engaged_prev: bool,

    pub torque_driver: SampleWindow,

    /// Safety ticks since the current mode was installed.
    pub safety_mode_cnt: u32,
}

impl VehicleSafetyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Longitudinal commands additionally require the gas pedal to be released.
    pub fn longitudinal_allowed(&self) -> bool {
        self.controls_allowed && !self.gas_pressed_prev
    }
}
