//! Property tests: capability derivation and block IO path equivalence.

use proptest::prelude::*;
use rnt_adapter::{
    AdapterConfig, AdapterInfo, BlockIoOp, BlockIoStatus, DeviceHandle, Features,
    OUR_VENDOR_ID, SupportedSets, derive_features, product_ids, rq,
};
use rnt_hid_common::HidDeviceInfo;
use rnt_test_helpers::prelude::*;

const SI_GET_CAPS: u8 = 0x00;
const SI_POLL: u8 = 0x01;

fn sets_strategy() -> impl Strategy<Value = SupportedSets> {
    (
        prop::collection::vec(any::<u8>(), 0..24),
        prop::collection::vec(any::<u8>(), 0..24),
        prop::collection::vec(any::<u8>(), 0..8),
    )
        .prop_map(|(requests, cfg_params, modes)| SupportedSets {
            requests,
            cfg_params,
            modes,
            mappings: None,
        })
}

/// Opcodes that no feature relation mentions.
fn unrelated_opcode() -> impl Strategy<Value = u8> {
    any::<u8>().prop_filter("opcode has a feature relation", |op| {
        ![
            rq::JUMP_TO_BOOTLOADER,
            rq::BLOCK_IO,
            rq::SUSPEND_POLLING,
            rq::GET_CONTROLLER_TYPE,
        ]
        .contains(op)
    })
}

fn open_sim(product_id: u16) -> Result<(SimulatedAdapter, DeviceHandle), TestCaseError> {
    let sim = SimulatedAdapter::new()
        .with_n64_controller(0, Accessory::controller_pak())
        .with_n64_controller(1, Accessory::None);
    let hid = HidDeviceInfo::new(OUR_VENDOR_ID, product_id, "sim".into()).with_interface(1);
    let info = AdapterInfo::from_hid(hid)
        .ok_or_else(|| TestCaseError::fail("product not in registry"))?;
    let config = AdapterConfig {
        exchange_timeout_ms: 20,
        ..AdapterConfig::default()
    };
    let handle = DeviceHandle::open(info, Some(sim.transport()), config)
        .map_err(|e| TestCaseError::fail(e.to_string()))?;
    Ok((sim, handle))
}

/// Operations whose expected length matches what the device sends, so
/// both paths can only complete or time out.
fn op_strategy() -> impl Strategy<Value = BlockIoOp> {
    (0u8..4, prop::bool::ANY).prop_map(|(channel, poll)| {
        if poll {
            BlockIoOp::new(channel, vec![SI_POLL], 4)
        } else {
            BlockIoOp::new(channel, vec![SI_GET_CAPS], 3)
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn derivation_is_deterministic(sets in sets_strategy()) {
        prop_assert_eq!(derive_features(&sets), derive_features(&sets.clone()));
    }

    #[test]
    fn derivation_ignores_order_and_duplicates(sets in sets_strategy()) {
        let mut shuffled = sets.clone();
        shuffled.requests.reverse();
        shuffled.requests.extend(sets.requests.iter().copied());
        shuffled.cfg_params.reverse();
        prop_assert_eq!(derive_features(&sets), derive_features(&shuffled));
    }

    #[test]
    fn unrelated_opcode_changes_nothing(sets in sets_strategy(), opcode in unrelated_opcode()) {
        let mut extended = sets.clone();
        extended.requests.push(opcode);
        prop_assert_eq!(derive_features(&sets), derive_features(&extended));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn native_and_fallback_block_io_agree(
        template in prop::collection::vec(op_strategy(), 1..10)
    ) {
        let (_native_sim, mut native) = open_sim(product_ids::GCN64_V3_4)?;
        let (_compat_sim, mut compat) = open_sim(product_ids::GCN64_V3_2)?;
        prop_assert!(native.has(Features::BLOCK_IO));
        prop_assert!(!compat.has(Features::BLOCK_IO));

        let mut native_ops = template.clone();
        let mut compat_ops = template;
        native.block_io(&mut native_ops).map_err(|e| TestCaseError::fail(e.to_string()))?;
        compat.block_io(&mut compat_ops).map_err(|e| TestCaseError::fail(e.to_string()))?;

        for (n, c) in native_ops.iter().zip(&compat_ops) {
            prop_assert_eq!(n.outcome(), c.outcome());
            if n.channel >= 2 {
                prop_assert_eq!(n.status(), BlockIoStatus::TimedOut);
            } else {
                prop_assert_eq!(n.status(), BlockIoStatus::Complete);
            }
        }
    }
}
