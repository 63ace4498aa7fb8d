// On-disk vector file codec
//
// Layout (little-endian): magic "RQVF", u32 version, u32 dimension,
// u64 row count, then count * dimension f32 values in row-id order.

use crate::error::{IndexError, Result};

pub const MAGIC: &[u8; 4] = b"RQVF";
pub const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// Serialize a row-major matrix of `dimension`-wide rows
pub fn encode(dimension: usize, data: &[f32]) -> Vec<u8> {
    let count = if dimension == 0 { 0 } else { data.len() / dimension };
    let mut bytes = Vec::with_capacity(HEADER_LEN + data.len() * 4);

    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&(dimension as u32).to_le_bytes());
    bytes.extend_from_slice(&(count as u64).to_le_bytes());
    for value in data {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    bytes
}

/// Parse a vector file, returning (dimension, row-major data)
pub fn decode(bytes: &[u8]) -> Result<(usize, Vec<f32>)> {
    if bytes.len() < HEADER_LEN {
        return Err(IndexError::Corrupt("vector file is truncated".to_string()));
    }
    if &bytes[0..4] != MAGIC {
        return Err(IndexError::Corrupt("vector file has a bad magic number".to_string()));
    }

    let version = u32::from_le_bytes(read_array(&bytes[4..8]));
    if version != FORMAT_VERSION {
        return Err(IndexError::Corrupt(format!("unsupported vector file version {}", version)));
    }

    let dimension = u32::from_le_bytes(read_array(&bytes[8..12])) as usize;
    let count = u64::from_le_bytes(read_array(&bytes[12..20])) as usize;

    let body = &bytes[HEADER_LEN..];
    let expected = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| IndexError::Corrupt("vector file header overflows".to_string()))?;
    if body.len() != expected {
        return Err(IndexError::Corrupt(format!(
            "vector file holds {} bytes of data, header promises {}",
            body.len(),
            expected
        )));
    }

    let data = body
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes(read_array(b)))
        .collect();

    Ok((dimension, data))
}

/// Hex digest used to tie vectors.bin to its metadata rows
pub fn digest(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

fn read_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let data = vec![0.5, -1.0, 2.25, 3.0, 0.0, -0.125];
        let bytes = encode(3, &data);

        assert_eq!(&bytes[0..4], MAGIC);
        let (dimension, decoded) = decode(&bytes).unwrap();
        assert_eq!(dimension, 3);
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_empty_matrix() {
        let bytes = encode(8, &[]);
        let (dimension, decoded) = decode(&bytes).unwrap();
        assert_eq!(dimension, 8);
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_rejects_truncated_body() {
        let mut bytes = encode(2, &[1.0, 2.0, 3.0, 4.0]);
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(decode(&bytes), Err(IndexError::Corrupt(_))));
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = encode(1, &[1.0]);
        bytes[0] = b'X';
        assert!(matches!(decode(&bytes), Err(IndexError::Corrupt(_))));
    }
}
