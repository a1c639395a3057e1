//! Cartridge RAM save files, optionally gzip-compressed.

use std::fs;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use rnt_errors::{RntError, RntResult};
use tracing::debug;

use crate::gbcart::MAX_CART_RAM_SIZE;

/// Leading bytes of a gzip stream.
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Return `bytes`, decompressed first when they are a gzip stream.
///
/// A stream inflating past the largest cartridge RAM is rejected.
pub fn decode_save_data(bytes: Vec<u8>) -> RntResult<Vec<u8>> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(bytes);
    }
    let limit = u64::try_from(MAX_CART_RAM_SIZE + 1).unwrap_or(u64::MAX);
    let mut out = Vec::new();
    GzDecoder::new(bytes.as_slice())
        .take(limit)
        .read_to_end(&mut out)
        .map_err(|e| RntError::bad_param(format!("corrupt gzip save data: {e}")))?;
    if out.len() > MAX_CART_RAM_SIZE {
        return Err(RntError::bad_param(format!(
            "gzip save data inflates past {MAX_CART_RAM_SIZE} bytes"
        )));
    }
    debug!("decompressed {} byte save to {} bytes", bytes.len(), out.len());
    Ok(out)
}

/// Read a save file, decompressing it if needed.
pub fn load_save_file(path: &Path) -> RntResult<Vec<u8>> {
    let bytes =
        fs::read(path).map_err(|e| RntError::io(format!("reading {}: {e}", path.display())))?;
    decode_save_data(bytes)
}
