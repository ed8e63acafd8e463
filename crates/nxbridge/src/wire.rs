//! Wire format for host tensors
//!
//! ```text
//! [element_type: u32][byte_size: u64][payload: byte_size][dim_count: u64][dims: i64 * dim_count]
//! ```
//!
//! Native endianness, no padding, no version field. The format only moves
//! tensors between a host and this process.

use crate::error::{Error, Result};
use nxbridge_hal::ElementType;

/// Decoded wire blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireTensor {
    pub element_type: ElementType,
    pub data: Vec<u8>,
    pub dims: Vec<i64>,
}

/// Encoded length of a tensor with `byte_size` payload bytes and `rank` dims
pub fn encoded_len(byte_size: usize, rank: usize) -> usize {
    4 + 8 + byte_size + 8 + rank * 8
}

pub fn encode(element_type: ElementType, data: &[u8], dims: &[i64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(data.len(), dims.len()));
    out.extend_from_slice(&element_type.raw().to_ne_bytes());
    out.extend_from_slice(&(data.len() as u64).to_ne_bytes());
    out.extend_from_slice(data);
    out.extend_from_slice(&(dims.len() as u64).to_ne_bytes());
    for dim in dims {
        out.extend_from_slice(&dim.to_ne_bytes());
    }
    out
}

/// Decode a blob produced by [`encode`].
///
/// The whole input must be consumed.
pub fn decode(blob: &[u8]) -> Result<WireTensor> {
    let mut reader = Reader { rest: blob };

    let tag = u32::from_ne_bytes(reader.array("element type")?);
    let element_type = ElementType::from_raw(tag)
        .filter(|ty| ty.is_valid())
        .ok_or_else(|| Error::construction(format!("invalid element type tag {tag:#010x}")))?;

    let byte_size = reader.length("byte size")?;
    let data = reader.take(byte_size, "payload")?.to_vec();

    let dim_count = reader.length("dim count")?;
    let dims_len = dim_count
        .checked_mul(8)
        .ok_or_else(|| Error::construction(format!("dim count {dim_count} overflows")))?;
    let dims = reader
        .take(dims_len, "dims")?
        .chunks_exact(8)
        .map(|chunk| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            i64::from_ne_bytes(raw)
        })
        .collect();

    if !reader.rest.is_empty() {
        return Err(Error::construction(format!(
            "{} trailing byte(s) after tensor",
            reader.rest.len()
        )));
    }
    Ok(WireTensor {
        element_type,
        data,
        dims,
    })
}

struct Reader<'a> {
    rest: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        if self.rest.len() < len {
            return Err(Error::construction(format!(
                "truncated tensor: {what} needs {len} byte(s), {} left",
                self.rest.len()
            )));
        }
        let (head, tail) = self.rest.split_at(len);
        self.rest = tail;
        Ok(head)
    }

    fn array<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let mut raw = [0u8; N];
        raw.copy_from_slice(self.take(N, what)?);
        Ok(raw)
    }

    fn length(&mut self, what: &str) -> Result<usize> {
        let value = u64::from_ne_bytes(self.array(what)?);
        usize::try_from(value).map_err(|_| Error::construction(format!("{what} {value} does not fit in memory")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        encode(ElementType::Int32, &[1, 0, 0, 0, 2, 0, 0, 0], &[2])
    }

    #[test]
    fn layout_is_tag_size_payload_dims() {
        let blob = sample();
        assert_eq!(blob.len(), encoded_len(8, 1));
        assert_eq!(&blob[0..4], &ElementType::Int32.raw().to_ne_bytes());
        assert_eq!(&blob[4..12], &8u64.to_ne_bytes());
        assert_eq!(&blob[20..28], &1u64.to_ne_bytes());
        assert_eq!(&blob[28..36], &2i64.to_ne_bytes());
    }

    #[test]
    fn decodes_what_it_encodes() {
        let decoded = decode(&sample()).unwrap();
        assert_eq!(decoded.element_type, ElementType::Int32);
        assert_eq!(decoded.dims, vec![2]);
        assert_eq!(decoded.data.len(), 8);
    }

    #[test]
    fn scalar_has_no_dims() {
        let decoded = decode(&encode(ElementType::Float64, &[0; 8], &[])).unwrap();
        assert!(decoded.dims.is_empty());
    }

    #[test]
    fn rejects_truncated_input() {
        let blob = sample();
        for len in [0, 3, 11, 15, 27, 35] {
            assert!(decode(&blob[..len]).is_err(), "prefix of {len} bytes decoded");
        }
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut blob = sample();
        blob.push(0);
        let err = decode(&blob).unwrap_err();
        assert!(err.to_string().contains("trailing"));
    }

    #[test]
    fn rejects_invalid_tag() {
        let mut blob = sample();
        blob[0..4].copy_from_slice(&0xdead_beefu32.to_ne_bytes());
        assert!(decode(&blob).is_err());

        blob[0..4].copy_from_slice(&ElementType::None.raw().to_ne_bytes());
        assert!(decode(&blob).is_err());
    }

    #[test]
    fn rejects_overflowing_dim_count() {
        let mut blob = sample();
        blob[20..28].copy_from_slice(&u64::MAX.to_ne_bytes());
        assert!(decode(&blob).is_err());
    }
}
