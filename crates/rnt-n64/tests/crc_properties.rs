//! Property tests for the accessory-port checksums.

use proptest::prelude::*;
use rnt_n64::{PAK_BLOCK_SIZE, pak_address_crc, pak_data_crc};

proptest! {
    #[test]
    fn address_crc_keeps_block_address(addr in any::<u16>()) {
        let framed = pak_address_crc(addr);
        prop_assert_eq!(framed & !0x1F, addr & !0x1F);
        prop_assert_eq!(pak_address_crc(framed), framed);
    }

    #[test]
    fn address_crc_ignores_low_bits(addr in any::<u16>(), low in 0u16..0x20) {
        prop_assert_eq!(pak_address_crc(addr), pak_address_crc((addr & !0x1F) | low));
    }

    #[test]
    fn address_bit_flip_changes_frame(addr in any::<u16>(), bit in 5u32..16) {
        let flipped = addr ^ (1 << bit);
        prop_assert_ne!(pak_address_crc(addr), pak_address_crc(flipped));
    }

    #[test]
    fn data_crc_detects_single_bit_errors(
        block in prop::collection::vec(any::<u8>(), PAK_BLOCK_SIZE),
        index in 0usize..PAK_BLOCK_SIZE,
        bit in 0u8..8,
    ) {
        let mut corrupted = block.clone();
        corrupted[index] ^= 1 << bit;
        prop_assert_ne!(pak_data_crc(&block), pak_data_crc(&corrupted));
    }

    #[test]
    fn data_crc_is_deterministic(block in prop::collection::vec(any::<u8>(), PAK_BLOCK_SIZE)) {
        prop_assert_eq!(pak_data_crc(&block), pak_data_crc(&block.clone()));
    }
}
