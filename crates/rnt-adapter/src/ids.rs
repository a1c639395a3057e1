//! USB vendor and product ID constants.
//!
//! Current adapters enumerate under the project's own vendor ID. Products
//! built before it was assigned used borrowed IDs and are all legacy
//! (no management interface).

/// Vendor ID of every current adapter.
pub const OUR_VENDOR_ID: u16 = 0x289B;

/// Vendor IDs used by early adapters.
pub mod legacy_vendor_ids {
    pub const OLD_GAME12: u16 = 0x1781;
    pub const OLD_WUSBMOTE: u16 = 0x1740;
    /// 4nes4snes 1.4.1 shipped with a mistyped vendor ID.
    pub const MISTYPED_4NES4SNES: u16 = 0x288B;
}

/// All vendor IDs worth enumerating.
pub const ALL_VENDOR_IDS: [u16; 4] = [
    OUR_VENDOR_ID,
    legacy_vendor_ids::OLD_GAME12,
    legacy_vendor_ids::OLD_WUSBMOTE,
    legacy_vendor_ids::MISTYPED_4NES4SNES,
];

/// Product IDs referenced by name elsewhere in the stack.
pub mod product_ids {
    pub const GCN64_V3_0: u16 = 0x0017;
    pub const GCN64_V3_2: u16 = 0x001D;
    pub const GCN64_V3_3_DUAL: u16 = 0x0022;
    pub const GCN64_V3_4: u16 = 0x0032;
    pub const GCN64_V3_4_DUAL: u16 = 0x0035;
    pub const GCN64_V3_5: u16 = 0x0038;
    pub const GCN64_V3_5_DUAL: u16 = 0x003B;
    pub const SNES_V2_0: u16 = 0x0026;
    pub const WUSBMOTE_V2_0: u16 = 0x0028;
    pub const WUSBMOTE_V2_1: u16 = 0x002B;
    pub const SNES_V2_1: u16 = 0x002E;
    pub const NES_V2_0: u16 = 0x0041;
    pub const PSX_V1_0: u16 = 0x0044;
    pub const PSX_V1_0_DUAL: u16 = 0x0045;
    pub const PCE_V1_0: u16 = 0x0050;
    pub const GCN64_V2_2_LEGACY: u16 = 0x0001;
}
