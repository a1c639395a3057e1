//! Prelude module for convenient error handling imports.
//!
//! ```
//! use rnt_errors::prelude::*;
//!
//! fn read_status() -> RntResult<u8> {
//!     Err(RntError::NoCommandAck)
//! }
//!
//! assert_eq!(read_status().map_err(|e| e.category()), Err(ErrorCategory::Protocol));
//! ```

pub use crate::{
    RntResult,
    common::{ErrorCategory, ErrorSeverity},
    protocol::{ChecksumKind, RntError},
};

/// Return a [`RntError::BadParam`] from the enclosing function unless the
/// condition holds.
#[macro_export]
macro_rules! ensure_param {
    ($condition:expr, $($msg:tt)+) => {
        if !$condition {
            return Err($crate::RntError::BadParam(format!($($msg)+)));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_param_macro() {
        fn aligned(addr: u16) -> RntResult<()> {
            ensure_param!(addr % 32 == 0, "address {addr:#06x} not aligned");
            Ok(())
        }
        assert!(aligned(0x40).is_ok());
        assert_eq!(
            aligned(0x41),
            Err(RntError::BadParam("address 0x0041 not aligned".to_string()))
        );
    }
}
