//! Decoding of NumPy `.npy` pixel payloads.
//!
//! The backend returns multi-band pixels as a 2-D structured array, one
//! named field per band, in row-major order. The format has no mask, so
//! masked pixels are filled with [`MASKED_SENTINEL`] server-side and decoded
//! back to `NaN`.

use crate::composite::{Band, BandRaster, Composite};
use thiserror::Error;

const MAGIC: &[u8] = b"\x93NUMPY";

/// Fill value for masked pixels. Far outside the reflectance range.
pub const MASKED_SENTINEL: f32 = -9999.0;

/// Errors decoding an `.npy` payload.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NpyError {
    #[error("missing .npy magic")]
    BadMagic,
    #[error("unsupported .npy version {0}.{1}")]
    UnsupportedVersion(u8, u8),
    #[error("truncated payload")]
    Truncated,
    #[error("malformed header: {0}")]
    Header(String),
    #[error("fortran-ordered arrays are not supported")]
    FortranOrder,
    #[error("unsupported field type '{0}'")]
    UnsupportedType(String),
    #[error("band '{0}' missing from payload")]
    MissingBand(&'static str),
    #[error("payload holds {actual} bytes of pixels, expected {expected}")]
    DataLength { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FieldType {
    F32,
    F64,
    I16,
    U16,
}

impl FieldType {
    fn parse(descr: &str) -> Result<Self, NpyError> {
        match descr {
            "<f4" => Ok(FieldType::F32),
            "<f8" => Ok(FieldType::F64),
            "<i2" => Ok(FieldType::I16),
            "<u2" => Ok(FieldType::U16),
            other => Err(NpyError::UnsupportedType(other.to_string())),
        }
    }

    fn size(self) -> usize {
        match self {
            FieldType::F32 => 4,
            FieldType::F64 => 8,
            FieldType::I16 | FieldType::U16 => 2,
        }
    }

    fn read(self, bytes: &[u8]) -> f32 {
        match self {
            FieldType::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            FieldType::F64 => f64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]) as f32,
            FieldType::I16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f32,
            FieldType::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as f32,
        }
    }
}

#[derive(Debug)]
struct Header {
    fields: Vec<(String, FieldType)>,
    rows: usize,
    cols: usize,
}

/// Decodes a structured `.npy` array with `Red`, `Green` and `Blue` fields
/// into a composite tagged with `time_start`.
pub fn decode_rgb(bytes: &[u8], time_start: i64) -> Result<Composite, NpyError> {
    let (header, data) = split(bytes)?;
    let header = parse_header(header)?;

    let record: usize = header.fields.iter().map(|(_, t)| t.size()).sum();
    let expected = header
        .rows
        .checked_mul(header.cols)
        .and_then(|n| n.checked_mul(record))
        .ok_or_else(|| {
            NpyError::Header(format!("shape ({}, {}) overflows", header.rows, header.cols))
        })?;
    if data.len() != expected {
        return Err(NpyError::DataLength {
            expected,
            actual: data.len(),
        });
    }

    let mut rasters = Vec::with_capacity(3);
    for band in Band::RGB {
        let mut offset = 0;
        let mut found = None;
        for (name, field) in &header.fields {
            if name == band.name() {
                found = Some((offset, *field));
                break;
            }
            offset += field.size();
        }
        let (offset, field) = found.ok_or(NpyError::MissingBand(band.name()))?;

        let samples: Vec<f32> = data
            .chunks_exact(record)
            .map(|rec| field.read(&rec[offset..offset + field.size()]))
            .map(|v| if v == MASKED_SENTINEL { f32::NAN } else { v })
            .collect();

        let (width, height) = match (u32::try_from(header.cols), u32::try_from(header.rows)) {
            (Ok(w), Ok(h)) => (w, h),
            _ => return Err(NpyError::Header("shape exceeds u32".into())),
        };
        let raster = BandRaster::new(width, height, samples)
            .map_err(|e| NpyError::Header(e.to_string()))?;
        rasters.push(raster);
    }

    let blue = rasters.pop().ok_or(NpyError::MissingBand("Blue"))?;
    let green = rasters.pop().ok_or(NpyError::MissingBand("Green"))?;
    let red = rasters.pop().ok_or(NpyError::MissingBand("Red"))?;
    Composite::new(time_start, red, green, blue).map_err(|e| NpyError::Header(e.to_string()))
}

fn split(bytes: &[u8]) -> Result<(&str, &[u8]), NpyError> {
    if bytes.len() < 10 || &bytes[..6] != MAGIC {
        return Err(NpyError::BadMagic);
    }
    let (major, minor) = (bytes[6], bytes[7]);
    let (header_len, start) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err(NpyError::Truncated);
            }
            (
                u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize,
                12,
            )
        }
        _ => return Err(NpyError::UnsupportedVersion(major, minor)),
    };

    let end = start + header_len;
    if bytes.len() < end {
        return Err(NpyError::Truncated);
    }
    let header = std::str::from_utf8(&bytes[start..end])
        .map_err(|e| NpyError::Header(e.to_string()))?;
    Ok((header, &bytes[end..]))
}

fn parse_header(header: &str) -> Result<Header, NpyError> {
    if header.contains("'fortran_order': True") {
        return Err(NpyError::FortranOrder);
    }

    let descr = section(header, "'descr':", '[', ']')?;
    let mut fields = Vec::new();
    for entry in descr.split(')') {
        let parts: Vec<&str> = entry
            .split('\'')
            .enumerate()
            .filter(|(i, _)| i % 2 == 1)
            .map(|(_, s)| s)
            .collect();
        if let [name, descr] = parts.as_slice() {
            fields.push((name.to_string(), FieldType::parse(descr)?));
        }
    }
    if fields.is_empty() {
        return Err(NpyError::Header("no fields in descr".into()));
    }

    let shape = section(header, "'shape':", '(', ')')?;
    let dims: Vec<usize> = shape
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().map_err(|_| NpyError::Header(format!("bad shape '{shape}'"))))
        .collect::<Result<_, _>>()?;
    let (rows, cols) = match dims.as_slice() {
        [rows, cols] => (*rows, *cols),
        _ => return Err(NpyError::Header(format!("expected 2-D shape, got '{shape}'"))),
    };

    Ok(Header { fields, rows, cols })
}

fn section<'a>(header: &'a str, key: &str, open: char, close: char) -> Result<&'a str, NpyError> {
    let rest = header
        .find(key)
        .map(|i| &header[i + key.len()..])
        .ok_or_else(|| NpyError::Header(format!("missing {key}")))?;
    let start = rest
        .find(open)
        .ok_or_else(|| NpyError::Header(format!("malformed {key}")))?;
    let end = rest[start..]
        .find(close)
        .ok_or_else(|| NpyError::Header(format!("unterminated {key}")))?;
    Ok(&rest[start + 1..start + end])
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Encodes an `.npy` v1 structured array the way the backend does.
    pub(crate) fn encode(fields: &[&str], rows: usize, cols: usize, values: &[f32]) -> Vec<u8> {
        let descr: Vec<String> = fields.iter().map(|f| format!("('{f}', '<f4')")).collect();
        let mut header = format!(
            "{{'descr': [{}], 'fortran_order': False, 'shape': ({rows}, {cols}), }}",
            descr.join(", ")
        );
        while (10 + header.len() + 1) % 64 != 0 {
            header.push(' ');
        }
        header.push('\n');

        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        for v in values {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    #[test]
    fn test_decode_interleaved_fields() {
        // 1 row, 2 columns, fields Red/Green/Blue.
        let bytes = encode(&["Red", "Green", "Blue"], 1, 2, &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        let composite = decode_rgb(&bytes, 42).unwrap();

        assert_eq!(composite.time_start(), 42);
        assert_eq!(composite.width(), 2);
        assert_eq!(composite.height(), 1);
        assert_eq!(composite.band(Band::Red).samples(), &[0.1, 0.4]);
        assert_eq!(composite.band(Band::Blue).samples(), &[0.3, 0.6]);
    }

    #[test]
    fn test_decode_reordered_fields() {
        let bytes = encode(&["Blue", "Red", "Green"], 1, 1, &[0.3, 0.1, 0.2]);
        let composite = decode_rgb(&bytes, 0).unwrap();
        assert_eq!(composite.band(Band::Red).samples(), &[0.1]);
        assert_eq!(composite.band(Band::Green).samples(), &[0.2]);
        assert_eq!(composite.band(Band::Blue).samples(), &[0.3]);
    }

    #[test]
    fn test_missing_band() {
        let bytes = encode(&["Red", "Green"], 1, 1, &[0.1, 0.2]);
        assert_eq!(decode_rgb(&bytes, 0).unwrap_err(), NpyError::MissingBand("Blue"));
    }

    #[test]
    fn test_bad_magic_and_truncation() {
        assert_eq!(decode_rgb(b"not an npy file", 0).unwrap_err(), NpyError::BadMagic);

        let mut bytes = encode(&["Red", "Green", "Blue"], 2, 2, &[0.0; 12]);
        bytes.truncate(bytes.len() - 4);
        assert!(matches!(
            decode_rgb(&bytes, 0),
            Err(NpyError::DataLength { .. })
        ));
    }

    #[test]
    fn test_sentinel_decodes_to_masked() {
        let bytes = encode(
            &["Red", "Green", "Blue"],
            1,
            2,
            &[MASKED_SENTINEL, MASKED_SENTINEL, MASKED_SENTINEL, 0.1, -0.2, 0.3],
        );
        let composite = decode_rgb(&bytes, 0).unwrap();

        for band in Band::RGB {
            assert!(composite.band(band).samples()[0].is_nan());
        }
        assert_eq!(composite.band(Band::Red).samples()[1], 0.1);
        // Offset-scaled zero is still valid reflectance.
        assert_eq!(composite.band(Band::Green).samples()[1], -0.2);
    }

    #[test]
    fn test_oversized_shape_is_rejected() {
        let header = format!(
            "{{'descr': [('Red', '<f4'), ('Green', '<f4'), ('Blue', '<f4')], \
             'fortran_order': False, 'shape': ({}, {}), }}\n",
            usize::MAX / 2,
            4
        );
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());

        assert!(matches!(decode_rgb(&bytes, 0), Err(NpyError::Header(_))));
    }
}
