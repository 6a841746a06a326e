//! Tile payload codec.
//!
//! Raster tiles are gzip streams of big-endian, row-major sample tables.
//! Decoding happens after the disk cache returns the raw bytes, so a corrupt
//! payload surfaces as [`DataError::Decode`] rather than being re-fetched.

use std::io::{Read, Write};

use bytes::Buf;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::DataError;
use crate::raster::Raster;

/// Inflates a gzip payload.
pub fn decompress(payload: &[u8]) -> Result<Vec<u8>, DataError> {
    let mut decoder = GzDecoder::new(payload);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| DataError::decode(format!("gzip: {}", e)))?;
    Ok(out)
}

/// Deflates `data` into a gzip payload.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, DataError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn check_len(table: &[u8], width: usize, height: usize, sample_size: usize) -> Result<(), DataError> {
    let expected = width * height * sample_size;
    if table.len() < expected {
        return Err(DataError::decode(format!(
            "short table: expected {} bytes for {}x{}, got {}",
            expected,
            width,
            height,
            table.len()
        )));
    }
    Ok(())
}

/// Decodes a `width`×`height` table of unsigned bytes.
pub fn decode_u8_table(table: &[u8], width: usize, height: usize) -> Result<Raster<u8>, DataError> {
    check_len(table, width, height, 1)?;
    Raster::from_vec(width, height, table[..width * height].to_vec())
        .ok_or_else(|| DataError::decode("table size mismatch"))
}

/// Decodes a `width`×`height` table of big-endian signed 16-bit samples.
pub fn decode_i16_table(table: &[u8], width: usize, height: usize) -> Result<Raster<i16>, DataError> {
    check_len(table, width, height, 2)?;

    let mut buf = table;
    let mut samples = Vec::with_capacity(width * height);
    for _ in 0..width * height {
        samples.push(buf.get_i16());
    }

    Raster::from_vec(width, height, samples).ok_or_else(|| DataError::decode("table size mismatch"))
}

/// Inflates and decodes a gzip u8 tile.
pub fn decode_u8_tile(payload: &[u8], width: usize, height: usize) -> Result<Raster<u8>, DataError> {
    decode_u8_table(&decompress(payload)?, width, height)
}

/// Inflates and decodes a gzip i16 tile.
pub fn decode_i16_tile(payload: &[u8], width: usize, height: usize) -> Result<Raster<i16>, DataError> {
    decode_i16_table(&decompress(payload)?, width, height)
}

/// Encodes a u8 raster as a gzip tile payload.
pub fn encode_u8_tile(raster: &Raster<u8>) -> Result<Vec<u8>, DataError> {
    compress(raster.data())
}

/// Encodes an i16 raster as a gzip tile payload.
pub fn encode_i16_tile(raster: &Raster<i16>) -> Result<Vec<u8>, DataError> {
    let table: Vec<u8> = raster.data().iter().flat_map(|v| v.to_be_bytes()).collect();
    compress(&table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i16_big_endian_order() {
        let table = [0x01, 0x02, 0xFF, 0xFE];
        let raster = decode_i16_table(&table, 2, 1).unwrap();
        assert_eq!(raster.get(0, 0), 0x0102);
        assert_eq!(raster.get(1, 0), -2);
    }

    #[test]
    fn test_u8_row_major() {
        let table = [1, 2, 3, 4, 5, 6];
        let raster = decode_u8_table(&table, 3, 2).unwrap();
        assert_eq!(raster.get(2, 0), 3);
        assert_eq!(raster.get(0, 1), 4);
    }

    #[test]
    fn test_short_table_is_decode_error() {
        let result = decode_i16_table(&[0u8; 7], 2, 2);
        assert!(matches!(result, Err(DataError::Decode(_))));
    }

    #[test]
    fn test_corrupt_gzip_is_decode_error() {
        let result = decode_u8_tile(b"definitely not gzip", 1, 1);
        assert!(matches!(result, Err(DataError::Decode(_))));
    }

    #[test]
    fn test_elevation_tile_through_gzip() {
        let mut raster: Raster<i16> = Raster::new(3, 3);
        raster.set(1, 1, -412);
        raster.set(2, 0, 8848);

        let payload = encode_i16_tile(&raster).unwrap();
        assert_eq!(decode_i16_tile(&payload, 3, 3).unwrap(), raster);
    }
}
