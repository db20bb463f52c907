use super::{to_bit_vec, Bit, Segment, PREAMBLE_PATTERN};

/// Fixed sync pattern opening every frame
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub struct Preamble;

impl Preamble {
    pub fn matches(bits: &[Bit]) -> bool {
        bits == &Preamble.value()[..]
    }
}

impl Segment for Preamble {
    fn bits() -> usize {
        8
    }

    fn value(&self) -> Vec<Bit> {
        to_bit_vec(PREAMBLE_PATTERN as u32, Self::bits())
    }
}
