//! Property tests for error messages.

use proptest::prelude::*;
use rnt_errors::RntError;

proptest! {
    #[test]
    fn test_invalid_sector_display_names_sector(sector in any::<u16>()) {
        let msg = RntError::InvalidSector(sector).to_string();
        prop_assert!(msg.contains(&sector.to_string()));
    }

    #[test]
    fn test_bad_param_preserves_message(msg in "[a-z ]{1,32}") {
        let err = RntError::bad_param(msg.clone());
        prop_assert!(err.to_string().contains(&msg));
        prop_assert!(!err.is_retryable());
    }
}
