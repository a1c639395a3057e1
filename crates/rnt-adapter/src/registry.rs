//! Built-in table of known adapters.
//!
//! Each entry is keyed by (vendor ID, product ID, interface). Entries with
//! no interface are legacy adapters: they match on any interface and expose
//! no management requests.

use serde::{Deserialize, Serialize};

use crate::features::Features;
use crate::ids::{OUR_VENDOR_ID, legacy_vendor_ids};

/// Report size used by firmware older than block IO.
pub const LEGACY_REPORT_SIZE: usize = 40;
/// Report size of every later firmware.
pub const DEFAULT_REPORT_SIZE: usize = 63;

/// Static description of an adapter model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterCaps {
    /// Declared report size; `0` means "derive from features".
    pub report_size: usize,
    pub n_channels: u8,
    pub n_raw_channels: u8,
    pub features: Features,
    /// Lowest accepted poll interval in milliseconds, `0` when unrestricted.
    pub min_poll_interval: u8,
}

impl AdapterCaps {
    const fn new(report_size: usize, n_channels: u8, n_raw_channels: u8, features: Features) -> Self {
        Self {
            report_size,
            n_channels,
            n_raw_channels,
            features,
            min_poll_interval: 0,
        }
    }

    const fn min_poll(mut self, ms: u8) -> Self {
        self.min_poll_interval = ms;
        self
    }

    const LEGACY: Self = Self::new(0, 1, 0, Features::empty());

    /// Channel count as shown to users (never zero).
    pub fn channels(&self) -> u8 {
        self.n_channels.max(1)
    }

    /// Report size negotiated at open time.
    pub fn negotiated_report_size(&self) -> usize {
        if self.report_size != 0 {
            self.report_size
        } else if self
            .features
            .intersects(Features::BLOCK_IO | Features::DYNAMIC_FEATURES)
        {
            DEFAULT_REPORT_SIZE
        } else {
            LEGACY_REPORT_SIZE
        }
    }
}

/// One row of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryEntry {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Management interface number; `None` for legacy adapters.
    pub interface: Option<i32>,
    pub caps: AdapterCaps,
    pub name: &'static str,
}

impl RegistryEntry {
    pub fn is_legacy(&self) -> bool {
        self.interface.is_none()
    }

    pub fn matches(&self, vendor_id: u16, product_id: u16, interface: i32) -> bool {
        self.vendor_id == vendor_id
            && self.product_id == product_id
            && self.interface.is_none_or(|i| i == interface)
    }
}

const GC_STD: Features = Features::V3_STD
    .union(Features::GC_FULL_SLIDERS)
    .union(Features::GC_INVERT_TRIG);
const GC_BLOCK: Features = GC_STD.union(Features::BLOCK_IO);
const GC_DYN: Features = Features::BLOCK_IO.union(Features::DYNAMIC_FEATURES);
const PCE_DYN: Features = Features::DYNAMIC_FEATURES.union(Features::ADAPTER_MODE);
const WUSBMOTE: Features = Features::V3_STD
    .union(Features::DPAD_AS_AXES)
    .union(Features::SWAP_RL_STICKS)
    .union(Features::NUNCHUK_ACC_ENABLE)
    .union(Features::ADAPTER_MODE);
const WUSBMOTE_MOUSE: Features = Features::V3_NOPOLLRATE
    .union(Features::SWAP_RL_STICKS)
    .union(Features::MOUSE_INVERT_SCROLL)
    .union(Features::ADAPTER_MODE);
const WUSBMOTE_21: Features = WUSBMOTE.union(Features::DISABLE_ANALOG_TRIGGERS);
const SNES_ADV: Features = Features::V3_STD.union(Features::DPAD_AS_BUTTONS);

const fn entry(
    product_id: u16,
    interface: i32,
    caps: AdapterCaps,
    name: &'static str,
) -> RegistryEntry {
    RegistryEntry {
        vendor_id: OUR_VENDOR_ID,
        product_id,
        interface: Some(interface),
        caps,
        name,
    }
}

const fn legacy(vendor_id: u16, product_id: u16, name: &'static str) -> RegistryEntry {
    RegistryEntry {
        vendor_id,
        product_id,
        interface: None,
        caps: AdapterCaps::LEGACY,
        name,
    }
}

/// Every adapter this stack knows how to talk to.
pub static REGISTRY: &[RegistryEntry] = &[
    entry(0x0017, 1, AdapterCaps::new(0, 1, 1, GC_STD), "GC/N64 to USB v3.0-3.1"),
    entry(0x001D, 1, AdapterCaps::new(0, 1, 1, GC_STD), "GC/N64 to USB v3.2-3.3"),
    entry(0x0020, 1, AdapterCaps::new(0, 1, 1, GC_STD), "GC/N64 to USB v3.2.1 (N64 mode)"),
    entry(0x0021, 1, AdapterCaps::new(0, 1, 1, GC_STD), "GC/N64 to USB v3.2.1 (GC mode)"),
    entry(0x0022, 1, AdapterCaps::new(0, 2, 2, GC_STD), "Dual GC/N64 to USB v3.3"),
    entry(0x0030, 1, AdapterCaps::new(0, 2, 2, GC_STD), "Dual N64 to USB v3.3"),
    entry(0x0031, 1, AdapterCaps::new(0, 2, 2, GC_STD), "Dual GC to USB v3.3"),
    entry(0x0032, 1, AdapterCaps::new(0, 1, 1, GC_BLOCK), "GC/N64 to USB v3.4"),
    entry(0x0033, 1, AdapterCaps::new(0, 1, 1, GC_BLOCK), "N64 to USB v3.4"),
    entry(0x0034, 1, AdapterCaps::new(0, 1, 1, GC_BLOCK), "GC to USB v3.4"),
    entry(0x0035, 1, AdapterCaps::new(0, 2, 2, GC_BLOCK), "Dual GC/N64 to USB v3.4"),
    entry(0x0036, 1, AdapterCaps::new(0, 2, 2, GC_BLOCK), "Dual N64 to USB v3.4"),
    entry(0x0037, 1, AdapterCaps::new(0, 2, 2, GC_BLOCK), "Dual GC to USB v3.4"),
    entry(0x0038, 1, AdapterCaps::new(0, 1, 2, GC_DYN), "GC/N64 to USB v3.5"),
    entry(0x0039, 1, AdapterCaps::new(0, 1, 2, GC_DYN), "N64 to USB v3.5"),
    entry(0x003A, 1, AdapterCaps::new(0, 1, 2, GC_DYN), "GC to USB v3.5"),
    entry(0x003B, 2, AdapterCaps::new(0, 2, 2, GC_DYN), "Dual GC/N64 to USB v3.5"),
    entry(0x003C, 2, AdapterCaps::new(0, 2, 2, GC_DYN), "Dual N64 to USB v3.5"),
    entry(0x003D, 2, AdapterCaps::new(0, 2, 2, GC_DYN), "Dual GC to USB v3.5"),
    entry(0x003E, 1, AdapterCaps::new(0, 2, 2, Features::V3_STD.union(Features::BLOCK_IO)), "GC/N64 to USB (reserved)"),
    entry(0x003F, 1, AdapterCaps::new(0, 2, 2, Features::V3_STD.union(Features::BLOCK_IO)), "GC/N64 to USB (reserved)"),
    entry(0x0050, 1, AdapterCaps::new(63, 1, 0, PCE_DYN), "PC Engine to USB v1.0"),
    entry(0x0051, 1, AdapterCaps::new(63, 5, 0, PCE_DYN), "PC Engine to USB v1.0 (5 players)"),
    entry(0x0052, 1, AdapterCaps::new(63, 2, 0, PCE_DYN), "PC Engine to USB v1.0 (2 players)"),
    entry(0x0053, 1, AdapterCaps::new(63, 3, 0, PCE_DYN), "PC Engine to USB v1.0 (3 players)"),
    entry(0x0054, 1, AdapterCaps::new(63, 4, 0, PCE_DYN), "PC Engine to USB v1.0 (4 players)"),
    entry(0x0026, 1, AdapterCaps::new(63, 1, 0, SNES_ADV), "SNES to USB v2.0"),
    entry(0x0027, 1, AdapterCaps::new(63, 2, 0, SNES_ADV), "Dual SNES to USB v2.0"),
    entry(0x0028, 1, AdapterCaps::new(63, 1, 0, WUSBMOTE), "WUSBMote v2.0"),
    entry(0x0029, 1, AdapterCaps::new(63, 2, 0, WUSBMOTE).min_poll(3), "WUSBMote v2.0 (2 players)"),
    entry(0x002A, 1, AdapterCaps::new(63, 2, 0, WUSBMOTE_MOUSE), "WUSBMote v2.0 (mouse mode)"),
    entry(0x002B, 1, AdapterCaps::new(63, 1, 0, WUSBMOTE_21), "WUSBMote v2.1"),
    entry(0x002C, 2, AdapterCaps::new(63, 2, 0, WUSBMOTE_21).min_poll(3), "WUSBMote v2.1 (2 players)"),
    entry(0x002E, 1, AdapterCaps::new(63, 1, 0, Features::DYNAMIC_FEATURES), "SNES to USB v2.1"),
    entry(0x002F, 2, AdapterCaps::new(63, 2, 0, Features::DYNAMIC_FEATURES), "Dual SNES to USB v2.1"),
    entry(0x0041, 1, AdapterCaps::new(63, 1, 0, Features::DYNAMIC_FEATURES), "NES to USB v2.0"),
    entry(0x0042, 2, AdapterCaps::new(63, 2, 0, Features::DYNAMIC_FEATURES), "Dual NES to USB v2.0"),
    entry(0x0044, 1, AdapterCaps::new(63, 1, 1, Features::DYNAMIC_FEATURES), "PSX to USB v1.0"),
    entry(0x0045, 2, AdapterCaps::new(63, 2, 2, Features::DYNAMIC_FEATURES), "Dual PSX to USB v1.0"),
    legacy(OUR_VENDOR_ID, 0x0001, "GC/N64 to USB v2.2"),
    RegistryEntry {
        caps: AdapterCaps::new(0, 4, 0, Features::empty()),
        ..legacy(OUR_VENDOR_ID, 0x0003, "4nes4snes")
    },
    legacy(legacy_vendor_ids::MISTYPED_4NES4SNES, 0x0003, "4nes4snes v1.4.1"),
    legacy(OUR_VENDOR_ID, 0x0004, "GC/N64 to USB v2.3"),
    legacy(OUR_VENDOR_ID, 0x0005, "Saturn to USB (joystick)"),
    legacy(OUR_VENDOR_ID, 0x0006, "Saturn to USB (mouse)"),
    legacy(OUR_VENDOR_ID, 0x0007, "Famicom to USB"),
    legacy(OUR_VENDOR_ID, 0x0008, "Dreamcast to USB (joystick)"),
    legacy(OUR_VENDOR_ID, 0x0009, "Dreamcast to USB (mouse)"),
    legacy(OUR_VENDOR_ID, 0x000A, "Dreamcast to USB (keyboard)"),
    legacy(OUR_VENDOR_ID, 0x000B, "GC/N64 to USB v2.9 (GC keyboard)"),
    legacy(OUR_VENDOR_ID, 0x000C, "GC/N64 to USB v2.9 (joystick)"),
    legacy(OUR_VENDOR_ID, 0x000D, "GC/N64 to USB v2.9 (keyboard)"),
    legacy(OUR_VENDOR_ID, 0x000E, "Virtual Boy to USB v1.1"),
    legacy(OUR_VENDOR_ID, 0x000F, "N64 to USB v2.9 (custom)"),
    legacy(OUR_VENDOR_ID, 0x0010, "WUSBMote v1.2 (joystick)"),
    legacy(OUR_VENDOR_ID, 0x0011, "WUSBMote v1.2 (mouse)"),
    legacy(OUR_VENDOR_ID, 0x0012, "WUSBMote v1.2.1 (joystick)"),
    legacy(OUR_VENDOR_ID, 0x0013, "WUSBMote v1.2.1 (mouse)"),
    legacy(OUR_VENDOR_ID, 0x0014, "WUSBMote v1.3 (joystick)"),
    legacy(OUR_VENDOR_ID, 0x0015, "WUSBMote v1.3 (mouse)"),
    legacy(OUR_VENDOR_ID, 0x0016, "WUSBMote v1.3 (I2C)"),
    legacy(OUR_VENDOR_ID, 0x0018, "Atari Jaguar to USB v1.1"),
    legacy(OUR_VENDOR_ID, 0x0019, "MultiDB9 to USB"),
    legacy(OUR_VENDOR_ID, 0x001A, "MultiDB9 to USB (multitap)"),
    legacy(OUR_VENDOR_ID, 0x001B, "USB Game12 v1.1"),
    legacy(OUR_VENDOR_ID, 0x001E, "Vectrex to USB"),
    legacy(OUR_VENDOR_ID, 0x0023, "3DO to USB"),
    legacy(OUR_VENDOR_ID, 0x0024, "Intellivision to USB v1.3"),
    legacy(OUR_VENDOR_ID, 0x0025, "CD32 to USB"),
    legacy(legacy_vendor_ids::OLD_GAME12, 0x0A96, "USB Game12 (SNES)"),
    legacy(legacy_vendor_ids::OLD_GAME12, 0x0A97, "SNES mouse to USB"),
    legacy(legacy_vendor_ids::OLD_GAME12, 0x0A99, "NES to USB"),
    legacy(legacy_vendor_ids::OLD_GAME12, 0x0A9A, "GC/N64 to USB (old)"),
    legacy(legacy_vendor_ids::OLD_GAME12, 0x0A9B, "Atari/Genesis/DB9 to USB"),
    legacy(legacy_vendor_ids::OLD_GAME12, 0x0A9C, "Intellivision to USB (old)"),
    legacy(legacy_vendor_ids::OLD_GAME12, 0x0A9D, "4nes4snes (old)"),
    legacy(legacy_vendor_ids::OLD_GAME12, 0x0A9E, "Genesis multitap"),
    legacy(legacy_vendor_ids::OLD_GAME12, 0x0A9F, "MultiDB9 (old)"),
    legacy(legacy_vendor_ids::OLD_WUSBMOTE, 0x0579, "WUSBMote (old)"),
    legacy(legacy_vendor_ids::OLD_WUSBMOTE, 0x057A, "TG16 to USB"),
    legacy(legacy_vendor_ids::OLD_GAME12, 0x057B, "Jaguar to USB (old)"),
    legacy(legacy_vendor_ids::OLD_GAME12, 0x057D, "Virtual Boy to USB (old)"),
    legacy(legacy_vendor_ids::OLD_GAME12, 0x057E, "Saturn to USB (old)"),
    legacy(legacy_vendor_ids::OLD_WUSBMOTE, 0x057F, "GC/N64 to USB v2.0"),
    legacy(legacy_vendor_ids::OLD_WUSBMOTE, 0x0580, "USB Game16"),
];

/// Find the registry entry for a device interface.
pub fn lookup(vendor_id: u16, product_id: u16, interface: i32) -> Option<&'static RegistryEntry> {
    REGISTRY
        .iter()
        .find(|e| e.matches(vendor_id, product_id, interface))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::product_ids;

    #[test]
    fn test_interface_must_match_for_managed_adapters() {
        assert!(lookup(OUR_VENDOR_ID, product_ids::GCN64_V3_4, 1).is_some());
        assert!(lookup(OUR_VENDOR_ID, product_ids::GCN64_V3_4, 0).is_none());
        assert!(lookup(OUR_VENDOR_ID, product_ids::GCN64_V3_5_DUAL, 2).is_some());
    }

    #[test]
    fn test_legacy_matches_any_interface() {
        for iface in [-1, 0, 3] {
            let e = lookup(OUR_VENDOR_ID, product_ids::GCN64_V2_2_LEGACY, iface);
            assert!(e.is_some_and(RegistryEntry::is_legacy));
        }
    }

    #[test]
    fn test_vendor_id_is_part_of_the_key() {
        let mistyped = lookup(legacy_vendor_ids::MISTYPED_4NES4SNES, 0x0003, 0);
        let ours = lookup(OUR_VENDOR_ID, 0x0003, 0);
        assert!(mistyped.is_some());
        assert_eq!(ours.map(|e| e.caps.n_channels), Some(4));
        assert!(lookup(legacy_vendor_ids::OLD_GAME12, product_ids::GCN64_V3_4, 1).is_none());
    }

    #[test]
    fn test_report_size_negotiation() {
        let pre_block_io = AdapterCaps::new(0, 1, 1, GC_STD);
        let block_io = AdapterCaps::new(0, 1, 1, GC_BLOCK);
        let dynamic = AdapterCaps::new(0, 1, 2, Features::DYNAMIC_FEATURES);
        let declared = AdapterCaps::new(63, 1, 0, SNES_ADV);
        assert_eq!(pre_block_io.negotiated_report_size(), LEGACY_REPORT_SIZE);
        assert_eq!(block_io.negotiated_report_size(), DEFAULT_REPORT_SIZE);
        assert_eq!(dynamic.negotiated_report_size(), DEFAULT_REPORT_SIZE);
        assert_eq!(declared.negotiated_report_size(), 63);
    }

    #[test]
    fn test_channels_never_zero() {
        assert_eq!(AdapterCaps::LEGACY.channels(), 1);
        let caps = AdapterCaps {
            n_channels: 0,
            ..AdapterCaps::LEGACY
        };
        assert_eq!(caps.channels(), 1);
    }

    #[test]
    fn test_no_duplicate_keys() {
        for (i, a) in REGISTRY.iter().enumerate() {
            for b in REGISTRY.iter().skip(i + 1) {
                assert!(
                    !(a.vendor_id == b.vendor_id
                        && a.product_id == b.product_id
                        && a.interface == b.interface),
                    "duplicate entry {:04x}:{:04x}",
                    a.vendor_id,
                    a.product_id
                );
            }
        }
    }

    #[test]
    fn test_wusbmote_min_poll_interval() {
        let e = lookup(OUR_VENDOR_ID, 0x0029, 1);
        assert_eq!(e.map(|e| e.caps.min_poll_interval), Some(3));
    }
}
