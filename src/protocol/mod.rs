/// Frame layout, one bit per symbol on the wire
/// Preamble(8) + Length(8) + <PAYLOAD...> + Checksum(16)
use std::fmt::{self, Display};

pub mod checksum;
pub mod frame;
pub mod length;
pub mod preamble;

pub use checksum::{Checksum, CrcVariant};
pub use frame::{build_frames, Frame, FrameEncoder, FrameMatchResult, FrameSet, PayloadCapacity};
pub use length::Length;
pub use preamble::Preamble;

pub const PREAMBLE_PATTERN: u8 = 0b0101_0101;
pub const MAX_PAYLOAD_BITS: usize = u8::MAX as usize;

#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum Bit {
    ZERO,
    ONE,
}

impl Bit {
    pub fn is_one(&self) -> bool {
        *self == Bit::ONE
    }

    /// The byte fed to the CRC for this bit
    pub fn as_u8(&self) -> u8 {
        match self {
            Bit::ZERO => 0,
            Bit::ONE => 1,
        }
    }
}

impl From<bool> for Bit {
    fn from(value: bool) -> Self {
        if value {
            Bit::ONE
        } else {
            Bit::ZERO
        }
    }
}

impl Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct BitVec(pub Vec<Bit>);

impl BitVec {
    /// Parse a string of '0'/'1', anything else is skipped
    pub fn parse(text: &str) -> Self {
        BitVec(
            text.chars()
                .filter_map(|c| match c {
                    '0' => Some(Bit::ZERO),
                    '1' => Some(Bit::ONE),
                    _ => None,
                })
                .collect(),
        )
    }

    /// Unsigned value of the bits, MSB first
    pub fn to_u32(&self) -> anyhow::Result<u32> {
        if self.0.len() > 32 {
            return Err(anyhow::anyhow!(
                "bit vec of {} bits does not fit in u32",
                self.0.len()
            ));
        }
        Ok(self
            .0
            .iter()
            .fold(0u32, |acc, bit| (acc << 1) | bit.as_u8() as u32))
    }

    pub fn to_byte(&self) -> anyhow::Result<u8> {
        let value = self.to_u32()?;
        u8::try_from(value).map_err(|_| anyhow::anyhow!("value {} not a byte", value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Bit] {
        &self.0[..]
    }
}

impl From<u8> for BitVec {
    fn from(value: u8) -> Self {
        BitVec(to_bit_vec(value as u32, 8))
    }
}

impl Display for BitVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.0.iter() {
            write!(f, "{}", bit)?;
        }
        Ok(())
    }
}

/// Lowest `bit_size` bits of `value`, MSB first
pub fn to_bit_vec(value: u32, bit_size: usize) -> Vec<Bit> {
    (0..bit_size)
        .rev()
        .map(|shift| {
            if shift >= 32 {
                Bit::ZERO
            } else {
                Bit::from((value >> shift) & 1 == 1)
            }
        })
        .collect()
}

pub trait Segment {
    // width on the wire
    fn bits() -> usize;
    // wire bits, MSB first
    fn value(&self) -> Vec<Bit>;
}
