use super::{to_bit_vec, Bit, Segment};

/// Payload size in bits
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Length(u8);

impl Length {
    pub fn new(value: u8) -> Self {
        Length(value)
    }

    pub fn inner_value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<usize> for Length {
    type Error = anyhow::Error;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        let value = u8::try_from(value)
            .map_err(|_| anyhow::anyhow!("payload of {} bits does not fit length field", value))?;
        Ok(Length(value))
    }
}

impl Segment for Length {
    fn bits() -> usize {
        u8::BITS as usize
    }

    fn value(&self) -> Vec<Bit> {
        to_bit_vec(self.0 as u32, Self::bits())
    }
}
