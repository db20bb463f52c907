use std::path::Path;

use bytes::{BufMut, Bytes, BytesMut};
use log::{debug, info};

use crate::error::{StrobeError, StrobeResult};
use crate::protocol::{to_bit_vec, Bit};

/// Every byte becomes 8 bits, MSB first
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<Bit> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for byte in bytes {
        bits.extend(to_bit_vec(*byte as u32, 8));
    }
    bits
}

/// Groups of 8 bits back into bytes, a short tail is zero padded on the right
pub fn pack_bits(bits: &[Bit]) -> Bytes {
    let mut buff = BytesMut::with_capacity(bits.len().div_ceil(8));
    for chunk in bits.chunks(8) {
        let byte = chunk
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, bit)| acc | (bit.as_u8() << (7 - i)));
        buff.put_u8(byte);
    }
    buff.freeze()
}

pub async fn read_file_bits(path: impl AsRef<Path>) -> StrobeResult<Vec<Bit>> {
    let path = path.as_ref();
    info!("Converting file to bits...");
    let bytes = tokio::fs::read(path).await.map_err(|source| StrobeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    let bits = bytes_to_bits(&bytes[..]);
    info!("File converted to bits successfully! ({} bits)", bits.len());
    Ok(bits)
}
