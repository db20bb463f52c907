use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use super::{to_bit_vec, Bit, Segment};
use crate::error::StrobeError;

const POLY: u16 = 0x1021;
// POLY with its bit order reversed
const POLY_REFLECTED: u16 = 0x8408;

/// CRC-16 flavours over polynomial 0x1021, both with init 0 and no final xor
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrcVariant {
    /// CRC-16/CCITT, reflected input and output (a.k.a. KERMIT)
    #[default]
    Kermit,
    /// Non-reflected CCITT table (a.k.a. XMODEM)
    Xmodem,
}

impl CrcVariant {
    pub fn checksum<I>(&self, data: I) -> u16
    where
        I: IntoIterator<Item = u8>,
    {
        let data = data.into_iter();
        match self {
            CrcVariant::Kermit => data.fold(0, reflected_update),
            CrcVariant::Xmodem => data.fold(0, normal_update),
        }
    }
}

fn reflected_update(crc: u16, byte: u8) -> u16 {
    let mut crc = crc ^ byte as u16;
    for _ in 0..8 {
        crc = if crc & 1 != 0 {
            (crc >> 1) ^ POLY_REFLECTED
        } else {
            crc >> 1
        };
    }
    crc
}

fn normal_update(crc: u16, byte: u8) -> u16 {
    let mut crc = crc ^ ((byte as u16) << 8);
    for _ in 0..8 {
        crc = if crc & 0x8000 != 0 {
            (crc << 1) ^ POLY
        } else {
            crc << 1
        };
    }
    crc
}

impl Display for CrcVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CrcVariant::Kermit => write!(f, "kermit"),
            CrcVariant::Xmodem => write!(f, "xmodem"),
        }
    }
}

impl FromStr for CrcVariant {
    type Err = StrobeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kermit" | "ccitt" => Ok(CrcVariant::Kermit),
            "xmodem" => Ok(CrcVariant::Xmodem),
            other => Err(StrobeError::config(format!(
                "unknown crc variant '{}', expected kermit or xmodem",
                other
            ))),
        }
    }
}

/// Frame trailer
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Checksum(u16);

impl Checksum {
    pub fn new(value: u16) -> Self {
        Checksum(value)
    }

    /// Each payload bit enters the CRC as a whole 0x00/0x01 byte
    pub fn compute(variant: CrcVariant, payload: &[Bit]) -> Self {
        Checksum(variant.checksum(payload.iter().map(Bit::as_u8)))
    }

    pub fn inner_value(&self) -> u16 {
        self.0
    }
}

impl Segment for Checksum {
    fn bits() -> usize {
        u16::BITS as usize
    }

    fn value(&self) -> Vec<Bit> {
        to_bit_vec(self.0 as u32, Self::bits())
    }
}
