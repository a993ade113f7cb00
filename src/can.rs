//! CAN frame representation and the bit/byte extraction helpers used by the
//! safety hooks.
//!
//! Byte offsets are zero-based from the start of the payload. Bit numbers
//! count from the least significant bit of byte 0, so bit 40 is the LSB of
//! byte 5. Reads past the payload length yield zero rather than panicking;
//! the presence monitor is responsible for flagging short frames.

use arrayvec::ArrayVec;
use thiserror::Error;

/// Largest payload supported (CAN FD).
pub const MAX_PAYLOAD_LEN: usize = 64;

/// Widest identifier on the bus (29-bit extended frames).
pub const MAX_EXTENDED_ADDR: u32 = 0x1FFF_FFFF;

pub type Payload = ArrayVec<u8, MAX_PAYLOAD_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("payload of {0} bytes exceeds {MAX_PAYLOAD_LEN}")]
    PayloadTooLong(usize),
    #[error("address {0:#x} does not fit in 29 bits")]
    AddressOutOfRange(u32),
}

/// A single frame as seen by the safety layer: address, bus segment and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanFrame {
    addr: u32,
    bus: u8,
    data: Payload,
}

impl CanFrame {
    pub fn new(addr: u32, bus: u8, data: &[u8]) -> Result<Self, FrameError> {
        if addr > MAX_EXTENDED_ADDR {
            return Err(FrameError::AddressOutOfRange(addr));
        }
        let payload = Payload::try_from(data).map_err(|_| FrameError::PayloadTooLong(data.len()))?;

        Ok(Self {
            addr,
            bus,
            data: payload,
        })
    }

    pub fn addr(&self) -> u32 {
        self.addr
    }

    pub fn bus(&self) -> u8 {
        self.bus
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Byte at `index`, or 0 past the end of the payload.
    pub fn byte(&self, index: usize) -> u8 {
        self.data.get(index).copied().unwrap_or(0)
    }

    /// Single bit, numbered from the LSB of byte 0.
    pub fn bit(&self, bit: usize) -> bool {
        (self.byte(bit / 8) >> (bit % 8)) & 1 != 0
    }

    /// Big-endian 16-bit word starting at `index`.
    pub fn be_u16(&self, index: usize) -> u16 {
        (u16::from(self.byte(index)) << 8) | u16::from(self.byte(index + 1))
    }
}

/// Sign-extends the low `bits` bits of `value` (two's complement).
pub fn to_signed(value: u32, bits: u32) -> i32 {
    debug_assert!(bits > 0 && bits <= 32, "field width {bits} out of range");
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}
