//! Firmware compatibility shims.
//!
//! Behaviour here is driven by observed firmware quirks rather than by what
//! the firmware advertises. Each shim is versioned by the firmware range it
//! applies to and is applied separately from the advertised capability set,
//! so callers can tell the two apart.

use std::ops::RangeInclusive;

use semver::Version;
use tracing::warn;

use crate::features::Features;
use crate::ids::OUR_VENDOR_ID;

/// First firmware that honours the triggers-as-buttons parameter without
/// listing it.
pub const TRIGGER_AS_BUTTONS_SINCE: Version = Version::new(3, 4, 1);

/// Signature of atmega32u2-based firmware images.
pub const SIGNATURE_ATMEGA32U2: &str = "9c3ea8b8-753f-11e5-a0dc-001bfca3c593";
/// Signature of at90usb1287-based firmware images.
pub const SIGNATURE_AT90USB1287: &str = "e106420a-7c54-11e5-ae9a-001bfca3c593";

/// A known-wrong signature reported by a range of products.
#[derive(Debug, Clone)]
pub struct SignatureFix {
    pub vendor_id: u16,
    pub product_ids: RangeInclusive<u16>,
    pub reported: &'static str,
    pub corrected: &'static str,
}

/// PSX to USB v1.0 boards are at90usb1287-based but their firmware reports
/// the atmega32u2 signature.
pub static SIGNATURE_FIXES: &[SignatureFix] = &[SignatureFix {
    vendor_id: OUR_VENDOR_ID,
    product_ids: 0x0044..=0x0045,
    reported: SIGNATURE_ATMEGA32U2,
    corrected: SIGNATURE_AT90USB1287,
}];

/// Parse the leading `major.minor.patch` of a firmware version string.
pub fn parse_firmware_version(version: &str) -> Option<Version> {
    let token = version.split_whitespace().next()?;
    Version::parse(token).ok()
}

/// Features implied by the firmware version alone.
pub fn version_features(version: &str) -> Features {
    match parse_firmware_version(version) {
        Some(v) if v >= TRIGGER_AS_BUTTONS_SINCE => Features::TRIGGER_AS_BUTTONS,
        _ => Features::empty(),
    }
}

/// Replace a signature known to be misreported by this product.
pub fn correct_signature(vendor_id: u16, product_id: u16, signature: String) -> String {
    let fix = SIGNATURE_FIXES.iter().find(|fix| {
        fix.vendor_id == vendor_id
            && fix.product_ids.contains(&product_id)
            && fix.reported == signature
    });
    match fix {
        Some(fix) => {
            warn!(
                "Correcting signature reported by {:04x}:{:04x}",
                vendor_id, product_id
            );
            fix.corrected.to_string()
        }
        None => signature,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_shim_threshold() {
        assert_eq!(version_features("3.4.1"), Features::TRIGGER_AS_BUTTONS);
        assert_eq!(version_features("3.6.0"), Features::TRIGGER_AS_BUTTONS);
        assert_eq!(version_features("4.0.0"), Features::TRIGGER_AS_BUTTONS);
        assert!(version_features("3.4.0").is_empty());
        assert!(version_features("3.3.9").is_empty());
    }

    #[test]
    fn test_trigger_shim_needs_three_components() {
        assert!(version_features("3.5").is_empty());
        assert!(version_features("").is_empty());
        assert!(version_features("garbage").is_empty());
    }

    #[test]
    fn test_trailing_text_is_ignored() {
        assert_eq!(
            parse_firmware_version("3.6.1 (beta)"),
            Some(Version::new(3, 6, 1))
        );
    }

    #[test]
    fn test_signature_fix_applies_only_in_range() {
        let fixed = correct_signature(OUR_VENDOR_ID, 0x0044, SIGNATURE_ATMEGA32U2.to_string());
        assert_eq!(fixed, SIGNATURE_AT90USB1287);

        let untouched = correct_signature(OUR_VENDOR_ID, 0x0032, SIGNATURE_ATMEGA32U2.to_string());
        assert_eq!(untouched, SIGNATURE_ATMEGA32U2);

        let other = correct_signature(OUR_VENDOR_ID, 0x0045, "something-else".to_string());
        assert_eq!(other, "something-else");
    }
}
