//! PlayStation bus access through raphnet PSX adapters.
//!
//! Everything goes through [`psx_exchange`], which clocks bytes on one port
//! of the adapter. [`MemoryCard`] builds the 128-byte sector protocol on top
//! of it and [`PsxController`] the pad configuration commands.

#![deny(static_mut_refs)]
#![deny(clippy::unwrap_used)]

pub mod card;
pub mod exchange;
pub mod image;
pub mod pad;

pub use card::{MemoryCard, SECTOR_COUNT, SECTOR_SIZE, Sector};
pub use exchange::{PsxFlags, psx_exchange};
pub use image::{CARD_SIZE, MemoryCardImage};
pub use pad::{PadStatus, PsxController, controller_id_name, pad_id};
