//! Raw 128 KiB memory card images.

use std::fs;
use std::path::Path;

use rnt_errors::{RntError, RntResult};

use crate::card::{SECTOR_SIZE, Sector};

/// Size of a standard memory card.
pub const CARD_SIZE: usize = 0x20000;

/// Full contents of a memory card, sector 0 first.
#[derive(Clone, PartialEq, Eq)]
pub struct MemoryCardImage {
    data: Vec<u8>,
}

impl std::fmt::Debug for MemoryCardImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCardImage")
            .field("len", &self.data.len())
            .finish()
    }
}

impl Default for MemoryCardImage {
    fn default() -> Self {
        Self::filled(0)
    }
}

impl MemoryCardImage {
    pub fn filled(value: u8) -> Self {
        Self {
            data: vec![value; CARD_SIZE],
        }
    }

    pub fn from_raw(data: Vec<u8>) -> RntResult<Self> {
        if data.len() != CARD_SIZE {
            return Err(RntError::bad_param(format!(
                "memory card image is {} bytes, expected {CARD_SIZE}",
                data.len()
            )));
        }
        Ok(Self { data })
    }

    pub fn load(path: &Path) -> RntResult<Self> {
        let bytes = fs::read(path)
            .map_err(|e| RntError::io(format!("reading {}: {e}", path.display())))?;
        Self::from_raw(bytes)
    }

    pub fn save(&self, path: &Path) -> RntResult<()> {
        fs::write(path, &self.data)
            .map_err(|e| RntError::io(format!("writing {}: {e}", path.display())))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn sector(&self, n: u16) -> RntResult<Sector> {
        let start = usize::from(n) * SECTOR_SIZE;
        self.data
            .get(start..start + SECTOR_SIZE)
            .and_then(|s| s.try_into().ok())
            .ok_or(RntError::InvalidSector(n))
    }

    pub fn set_sector(&mut self, n: u16, sector: &Sector) -> RntResult<()> {
        let start = usize::from(n) * SECTOR_SIZE;
        let dst = self
            .data
            .get_mut(start..start + SECTOR_SIZE)
            .ok_or(RntError::InvalidSector(n))?;
        dst.copy_from_slice(sector);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_sector_access() -> TestResult {
        let mut image = MemoryCardImage::default();
        image.set_sector(1023, &[0x77; SECTOR_SIZE])?;
        assert_eq!(image.sector(1023)?, [0x77; SECTOR_SIZE]);
        assert_eq!(image.sector(1022)?, [0x00; SECTOR_SIZE]);
        assert_eq!(image.sector(1024), Err(RntError::InvalidSector(1024)));
        Ok(())
    }

    #[test]
    fn test_file_round_trip() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("card.mcr");
        let mut image = MemoryCardImage::filled(0xFF);
        image.set_sector(0, &[b'M'; SECTOR_SIZE])?;
        image.save(&path)?;
        assert_eq!(MemoryCardImage::load(&path)?, image);
        Ok(())
    }

    #[test]
    fn test_wrong_size_is_bad_param() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("short.mcr");
        std::fs::write(&path, [0u8; 0x2000])?;
        assert!(matches!(MemoryCardImage::load(&path), Err(RntError::BadParam(_))));
        assert!(matches!(
            MemoryCardImage::load(&dir.path().join("missing.mcr")),
            Err(RntError::Io(_))
        ));
        Ok(())
    }
}
