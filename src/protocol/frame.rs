use std::fmt::{self, Display};

use bytes::Bytes;
use log::{debug, info, trace};

use super::{
    checksum::{Checksum, CrcVariant},
    length::Length,
    preamble::Preamble,
    Bit, BitVec, Segment, MAX_PAYLOAD_BITS,
};
use crate::bitstream;
use crate::config::Config;
use crate::error::{StrobeError, StrobeResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameMatchResult<'a> {
    Incomplete(&'a str),
    MissMatch(&'a str),
    Complete,
}

/// Payload bits per frame, always within 1..=255
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PayloadCapacity(u8);

impl PayloadCapacity {
    pub fn new(bits: usize) -> StrobeResult<Self> {
        if bits == 0 || bits > MAX_PAYLOAD_BITS {
            return Err(StrobeError::config(format!(
                "data_len value {} out of range, valid range: (0, {}]",
                bits, MAX_PAYLOAD_BITS
            )));
        }
        Ok(PayloadCapacity(bits as u8))
    }

    pub fn bits(&self) -> usize {
        self.0 as usize
    }
}

impl Default for PayloadCapacity {
    fn default() -> Self {
        PayloadCapacity(u8::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    length: Length,
    payload: Vec<Bit>,
    checksum: Checksum,
    crc: CrcVariant,
    encode_raw: Vec<Bit>,
}

impl Frame {
    pub fn new(payload: &[Bit], crc: CrcVariant) -> StrobeResult<Frame> {
        if payload.is_empty() {
            return Err(StrobeError::config("frame payload must carry at least one bit"));
        }
        let length = Length::try_from(payload.len())
            .map_err(|err| StrobeError::config(err.to_string()))?;
        let checksum = Checksum::compute(crc, payload);

        let mut encode_raw = Vec::with_capacity(Self::overhead_bits() + payload.len());
        encode_raw.extend_from_slice(&Preamble.value()[..]);
        encode_raw.extend_from_slice(&length.value()[..]);
        encode_raw.extend_from_slice(payload);
        encode_raw.extend_from_slice(&checksum.value()[..]);

        Ok(Frame {
            length,
            payload: payload.to_vec(),
            checksum,
            crc,
            encode_raw,
        })
    }

    /// Preamble + length + checksum
    pub fn overhead_bits() -> usize {
        Preamble::bits() + Length::bits() + Checksum::bits()
    }

    pub fn length(&self) -> Length {
        self.length
    }

    pub fn payload(&self) -> &[Bit] {
        &self.payload[..]
    }

    pub fn checksum(&self) -> Checksum {
        self.checksum
    }

    /// Wire bits in transmission order
    pub fn encode(&self) -> &[Bit] {
        &self.encode_raw[..]
    }

    pub fn len_bits(&self) -> usize {
        self.encode_raw.len()
    }

    pub fn check(&self) -> FrameMatchResult<'static> {
        Frame::check_bits(self.encode(), self.crc)
    }

    /// Validate a complete wire frame
    pub fn check_bits<'a>(wire: &[Bit], crc: CrcVariant) -> FrameMatchResult<'a> {
        let preamble_end = Preamble::bits();
        if wire.len() < preamble_end {
            return FrameMatchResult::Incomplete("preamble");
        }
        if !Preamble::matches(&wire[..preamble_end]) {
            trace!("preamble, {}", BitVec(wire[..preamble_end].to_vec()));
            return FrameMatchResult::MissMatch("preamble");
        }

        let length_end = preamble_end + Length::bits();
        if wire.len() < length_end {
            return FrameMatchResult::Incomplete("length");
        }
        let length = match BitVec(wire[preamble_end..length_end].to_vec()).to_byte() {
            Ok(length) => length as usize,
            Err(_) => return FrameMatchResult::MissMatch("length"),
        };
        if length == 0 {
            return FrameMatchResult::MissMatch("length");
        }

        let payload_end = length_end + length;
        let frame_end = payload_end + Checksum::bits();
        if wire.len() < frame_end {
            return FrameMatchResult::Incomplete("payload");
        }
        if wire.len() > frame_end {
            return FrameMatchResult::MissMatch("length");
        }

        let expected = Checksum::compute(crc, &wire[length_end..payload_end]);
        let embedded = match BitVec(wire[payload_end..frame_end].to_vec()).to_u32() {
            Ok(value) => value as u16,
            Err(_) => return FrameMatchResult::MissMatch("crc"),
        };
        if expected.inner_value() != embedded {
            trace!(
                "crc, expected {:#06x} got {:#06x}",
                expected.inner_value(),
                embedded
            );
            return FrameMatchResult::MissMatch("crc");
        }
        FrameMatchResult::Complete
    }
}

impl Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            BitVec(Preamble.value()),
            BitVec(self.length.value()),
            BitVec(self.payload.clone()),
            BitVec(self.checksum.value())
        )
    }
}

/// Frames in transmission order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameSet(Vec<Frame>);

impl FrameSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.0.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.0.get(index)
    }

    /// Payload bits of every frame, concatenated
    pub fn payload_bits(&self) -> Vec<Bit> {
        self.0
            .iter()
            .flat_map(|frame| frame.payload().iter().copied())
            .collect()
    }

    pub fn payload_len_bits(&self) -> usize {
        self.0.iter().map(|frame| frame.payload().len()).sum()
    }

    pub fn wire_len_bits(&self) -> usize {
        self.0.iter().map(Frame::len_bits).sum()
    }

    /// Whole transmission packed MSB first, last byte zero padded
    pub fn pack(&self) -> Bytes {
        let wire: Vec<Bit> = self
            .0
            .iter()
            .flat_map(|frame| frame.encode().iter().copied())
            .collect();
        bitstream::pack_bits(&wire)
    }
}

impl<'a> IntoIterator for &'a FrameSet {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for FrameSet {
    type Item = Frame;
    type IntoIter = std::vec::IntoIter<Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

pub struct FrameEncoder {
    capacity: PayloadCapacity,
    crc: CrcVariant,
}

impl FrameEncoder {
    pub fn new(capacity: PayloadCapacity, crc: CrcVariant) -> Self {
        FrameEncoder { capacity, crc }
    }

    pub fn from_config(cfg: &Config) -> StrobeResult<Self> {
        Ok(FrameEncoder::new(
            PayloadCapacity::new(cfg.payload_capacity)?,
            cfg.crc,
        ))
    }

    pub fn capacity(&self) -> PayloadCapacity {
        self.capacity
    }

    /// Number of frames needed for `total_bits`
    pub fn frame_count(&self, total_bits: usize) -> usize {
        total_bits.div_ceil(self.capacity.bits())
    }

    /// Payload size of the trailing short frame, 0 when every frame is full
    pub fn last_frame_len(&self, total_bits: usize) -> usize {
        total_bits % self.capacity.bits()
    }

    pub fn encode(&self, bits: &[Bit]) -> StrobeResult<FrameSet> {
        info!("Packing frames...");
        info!(
            "nframes: {}, last_frame_len: {}",
            self.frame_count(bits.len()),
            self.last_frame_len(bits.len())
        );

        // chunks() never yields an empty slice, an exact multiple leaves no tail
        let mut frames = Vec::with_capacity(self.frame_count(bits.len()));
        for (index, chunk) in bits.chunks(self.capacity.bits()).enumerate() {
            let frame = Frame::new(chunk, self.crc)?;
            debug!(
                "Frame {} payload {} bits crc {:#06x}",
                index,
                chunk.len(),
                frame.checksum().inner_value()
            );
            trace!("Frame {} => {}", index, &frame);
            frames.push(frame);
        }

        info!("Packing finished!");
        Ok(FrameSet(frames))
    }
}

pub fn build_frames(bits: &[Bit], capacity: usize, crc: CrcVariant) -> StrobeResult<FrameSet> {
    FrameEncoder::new(PayloadCapacity::new(capacity)?, crc).encode(bits)
}
