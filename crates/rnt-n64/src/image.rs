//! Controller Pak image files.
//!
//! Two layouts are understood: a raw 32 KiB dump (`.mpk`) and the
//! DexDrive-style `.n64` file, which prefixes the dump with a 0x1040-byte
//! header starting with `123-456-STD`.

use std::fs;
use std::path::Path;

use rnt_errors::{RntError, RntResult};
use tracing::debug;

use crate::crc::PAK_BLOCK_SIZE;
use crate::mempak::{MEMPAK_SIZE, PakBlock};

/// Tag at the start of a `.n64` header.
pub const N64_HEADER_TAG: &[u8] = b"123-456-STD";
/// Length of the `.n64` header.
pub const N64_HEADER_SIZE: usize = 0x1040;

/// On-disk layout of a Controller Pak image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// Raw pak contents
    #[default]
    Mpk,
    /// DexDrive header followed by the raw contents
    N64,
}

impl ImageFormat {
    /// Pick the layout from a file name; anything but `.n64` is raw.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("n64") => Self::N64,
            _ => Self::Mpk,
        }
    }

    fn header_len(self) -> usize {
        match self {
            Self::Mpk => 0,
            Self::N64 => N64_HEADER_SIZE,
        }
    }
}

/// Full contents of a Controller Pak.
#[derive(Clone, PartialEq, Eq)]
pub struct ControllerPakImage {
    data: Vec<u8>,
}

impl std::fmt::Debug for ControllerPakImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerPakImage")
            .field("len", &self.data.len())
            .finish()
    }
}

impl Default for ControllerPakImage {
    fn default() -> Self {
        Self::filled(0)
    }
}

impl ControllerPakImage {
    /// Image with every byte set to `value`.
    pub fn filled(value: u8) -> Self {
        Self {
            data: vec![value; MEMPAK_SIZE],
        }
    }

    /// Wrap a raw 32 KiB dump.
    pub fn from_raw(data: Vec<u8>) -> RntResult<Self> {
        if data.len() != MEMPAK_SIZE {
            return Err(RntError::bad_param(format!(
                "controller pak image is {} bytes, expected {MEMPAK_SIZE}",
                data.len()
            )));
        }
        Ok(Self { data })
    }

    /// Parse file contents in either layout.
    ///
    /// A `.n64` header is recognised by its tag whatever `format` says, so a
    /// misnamed file still loads.
    pub fn parse(bytes: &[u8], format: ImageFormat) -> RntResult<Self> {
        let format = if bytes.starts_with(N64_HEADER_TAG) {
            ImageFormat::N64
        } else {
            format
        };
        let body = bytes.get(format.header_len()..).ok_or_else(|| {
            RntError::bad_param(format!("{} bytes is shorter than the image header", bytes.len()))
        })?;
        debug!("parsing {format:?} image, {} byte body", body.len());
        Self::from_raw(body.to_vec())
    }

    /// File contents in `format`.
    pub fn to_bytes(&self, format: ImageFormat) -> Vec<u8> {
        let mut out = Vec::with_capacity(format.header_len() + MEMPAK_SIZE);
        if format == ImageFormat::N64 {
            let mut header = vec![0u8; N64_HEADER_SIZE];
            if let Some(tag) = header.get_mut(..N64_HEADER_TAG.len()) {
                tag.copy_from_slice(N64_HEADER_TAG);
            }
            out.extend_from_slice(&header);
        }
        out.extend_from_slice(&self.data);
        out
    }

    /// Load an image, choosing the layout from the file extension.
    pub fn load(path: &Path) -> RntResult<Self> {
        let bytes = fs::read(path)
            .map_err(|e| RntError::io(format!("reading {}: {e}", path.display())))?;
        Self::parse(&bytes, ImageFormat::from_path(path))
    }

    /// Save the image, choosing the layout from the file extension.
    pub fn save(&self, path: &Path) -> RntResult<()> {
        fs::write(path, self.to_bytes(ImageFormat::from_path(path)))
            .map_err(|e| RntError::io(format!("writing {}: {e}", path.display())))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The 32 bytes at block-aligned `addr`.
    pub fn block(&self, addr: u16) -> RntResult<PakBlock> {
        let start = usize::from(addr);
        self.data
            .get(start..start + PAK_BLOCK_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| RntError::bad_param(format!("block {addr:#06x} outside the image")))
    }

    pub fn set_block(&mut self, addr: u16, block: &PakBlock) -> RntResult<()> {
        let start = usize::from(addr);
        let dst = self
            .data
            .get_mut(start..start + PAK_BLOCK_SIZE)
            .ok_or_else(|| RntError::bad_param(format!("block {addr:#06x} outside the image")))?;
        dst.copy_from_slice(block);
        Ok(())
    }
}
