//! Checksums of the N64 accessory port protocol.
//!
//! Every accessory read or write carries a 16-bit address whose low five bits
//! are a checksum of the upper eleven, and every 32-byte data block is
//! followed by a CRC-8 computed by the accessory.

/// Bytes per accessory block.
pub const PAK_BLOCK_SIZE: usize = 32;

/// Contribution of each address bit to the 5-bit address checksum.
const ADDRESS_XOR_TABLE: [u16; 16] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x15, 0x1F, 0x0B, 0x16, 0x19, 0x07, 0x0E, 0x1C, 0x0D, 0x1A, 0x01,
];

const DATA_CRC_POLY: u8 = 0x85;

/// Address as sent on the bus: `addr` with its low five bits replaced by the
/// checksum of bits 5..=15.
pub fn pak_address_crc(addr: u16) -> u16 {
    let addr = addr & !0x1F;
    let crc = ADDRESS_XOR_TABLE
        .iter()
        .enumerate()
        .filter(|&(bit, _)| addr & (1 << bit) != 0)
        .fold(0u16, |crc, (_, &entry)| crc ^ entry);
    addr | (crc & 0x1F)
}

/// CRC-8 (polynomial 0x85) the accessory appends to a data block.
///
/// The register is clocked once more than there are data bytes, the final
/// pass shifting in zeros.
pub fn pak_data_crc(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for i in 0..=data.len() {
        let byte = data.get(i).copied().unwrap_or(0);
        for bit in (0..8).rev() {
            let xor_tap = if crc & 0x80 != 0 { DATA_CRC_POLY } else { 0 };
            crc <<= 1;
            if byte & (1 << bit) != 0 {
                crc |= 1;
            }
            crc ^= xor_tap;
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_crc_known_values() {
        assert_eq!(pak_address_crc(0x0000), 0x0000);
        assert_eq!(pak_address_crc(0x8000), 0x8001);
        assert_eq!(pak_address_crc(0xC000), 0xC01B);
        assert_eq!(pak_address_crc(0x0020), 0x0035);
    }

    #[test]
    fn test_address_crc_ignores_low_bits() {
        assert_eq!(pak_address_crc(0x8000), pak_address_crc(0x801F));
    }

    #[test]
    fn test_data_crc_blocks() {
        assert_eq!(pak_data_crc(&[0u8; PAK_BLOCK_SIZE]), 0x00);
        assert_ne!(pak_data_crc(&[0xFF; PAK_BLOCK_SIZE]), 0x00);
        assert_ne!(
            pak_data_crc(&[0x84; PAK_BLOCK_SIZE]),
            pak_data_crc(&[0xFE; PAK_BLOCK_SIZE])
        );
    }
}
