//! Property tests for the report cursors.

use proptest::prelude::*;
use rnt_hid_common::{ReportBuilder, ReportParser};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_builder_never_exceeds_capacity(
        capacity in 1usize..64,
        chunks in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..16), 0..8),
    ) {
        let mut builder = ReportBuilder::with_padding(capacity, 0xFF);
        for chunk in &chunks {
            let before = builder.len();
            if builder.write_bytes(chunk).is_err() {
                prop_assert_eq!(builder.len(), before);
            }
        }
        prop_assert!(builder.len() <= capacity);
        prop_assert_eq!(builder.into_padded().len(), capacity);
    }

    #[test]
    fn prop_parser_reads_exactly_what_was_written(
        records in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..8), 0..6),
    ) {
        let mut builder = ReportBuilder::new(256);
        for record in &records {
            let len = u8::try_from(record.len()).map_err(|e| TestCaseError::fail(e.to_string()))?;
            builder.write_u8(len).map_err(|e| TestCaseError::fail(e.to_string()))?;
            builder.write_bytes(record).map_err(|e| TestCaseError::fail(e.to_string()))?;
        }
        let frame = builder.into_inner();
        let mut parser = ReportParser::new(&frame);
        for record in &records {
            let len = parser.read_u8().map_err(|e| TestCaseError::fail(e.to_string()))?;
            let body = parser.read_bytes(usize::from(len)).map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(body, record.as_slice());
        }
        prop_assert!(parser.is_empty());
    }

    #[test]
    fn prop_parser_never_panics_on_arbitrary_lengths(
        data in proptest::collection::vec(any::<u8>(), 0..64),
        wants in proptest::collection::vec(0usize..80, 0..10),
    ) {
        let mut parser = ReportParser::new(&data);
        for want in wants {
            let before = parser.remaining();
            match parser.read_bytes(want) {
                Ok(bytes) => prop_assert_eq!(bytes.len(), want),
                Err(_) => prop_assert_eq!(parser.remaining(), before),
            }
        }
    }
}
