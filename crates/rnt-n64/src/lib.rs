//! N64 accessories behind a raphnet adapter.
//!
//! [`ControllerPak`] reads and writes the 32 KiB memory pak block by block.
//! [`CartridgeSession`] drives a Transfer Pak to reach the Game Boy
//! cartridge plugged into it: header, banked ROM and battery RAM.
//!
//! Both borrow the [`rnt_adapter::DeviceHandle`] mutably for as long as they
//! live. Callers should suspend the adapter's controller polling around bulk
//! transfers (see [`rnt_adapter::DeviceHandle::suspend_guard`]).

#![deny(static_mut_refs)]
#![deny(clippy::unwrap_used)]

pub mod crc;
pub mod gbcart;
pub mod image;
pub mod mbc;
pub mod mempak;
pub mod savefile;
pub mod xferpak;

pub use crc::{PAK_BLOCK_SIZE, pak_address_crc, pak_data_crc};
pub use gbcart::{CartFlags, CartridgeInfo, MAX_CART_RAM_SIZE, Mbc, cart_type_name};
pub use image::{ControllerPakImage, ImageFormat};
pub use mbc::{RAM_BANK_SIZE, ROM_BANK_SIZE, verify_ram_contents};
pub use mempak::{ControllerPak, DEFAULT_LFSR_SEED, MEMPAK_BLOCK_COUNT, MEMPAK_SIZE, PakBlock};
pub use savefile::{decode_save_data, load_save_file};
pub use xferpak::CartridgeSession;
