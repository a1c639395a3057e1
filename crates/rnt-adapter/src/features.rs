//! Feature bitmask and its derivation from dynamically enumerated sets.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::requests::{cfg_param, rq};

bitflags! {
    /// What an adapter can do, beyond the basic exchange.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Features: u32 {
        const FW_UPDATE = 1 << 0;
        const POLL_RATE = 1 << 1;
        const SUSPEND_POLLING = 1 << 2;
        const CONTROLLER_TYPE = 1 << 3;
        const GC_FULL_SLIDERS = 1 << 4;
        const GC_INVERT_TRIG = 1 << 5;
        const BLOCK_IO = 1 << 6;
        const DPAD_AS_BUTTONS = 1 << 7;
        const DPAD_AS_AXES = 1 << 8;
        const SWAP_RL_STICKS = 1 << 9;
        const NUNCHUK_ACC_ENABLE = 1 << 10;
        const ADAPTER_MODE = 1 << 11;
        const MOUSE_INVERT_SCROLL = 1 << 12;
        const DISABLE_ANALOG_TRIGGERS = 1 << 13;
        const TRIGGER_AS_BUTTONS = 1 << 14;
        /// Firmware describes itself through the get-supported-* requests
        const DYNAMIC_FEATURES = 1 << 15;

        /// Common set of the 3.x GameCube/N64 firmware family
        const V3_STD = Self::FW_UPDATE.bits()
            | Self::POLL_RATE.bits()
            | Self::SUSPEND_POLLING.bits()
            | Self::CONTROLLER_TYPE.bits();
        /// [`Features::V3_STD`] without a configurable poll rate
        const V3_NOPOLLRATE = Self::FW_UPDATE.bits()
            | Self::SUSPEND_POLLING.bits()
            | Self::CONTROLLER_TYPE.bits();
    }
}

/// Configuration parameter → feature relations.
pub const CFG_PARAM_FEATURES: &[(u8, Features)] = &[
    (cfg_param::POLL_INTERVAL0, Features::POLL_RATE),
    (cfg_param::POLL_INTERVAL1, Features::POLL_RATE),
    (cfg_param::POLL_INTERVAL2, Features::POLL_RATE),
    (cfg_param::POLL_INTERVAL3, Features::POLL_RATE),
    (cfg_param::FULL_SLIDERS, Features::GC_FULL_SLIDERS),
    (cfg_param::INVERT_TRIG, Features::GC_INVERT_TRIG),
    (cfg_param::TRIGGERS_AS_BUTTONS, Features::TRIGGER_AS_BUTTONS),
    (cfg_param::DPAD_AS_BUTTONS, Features::DPAD_AS_BUTTONS),
    (cfg_param::DPAD_AS_AXES, Features::DPAD_AS_AXES),
    (cfg_param::MOUSE_INVERT_SCROLL, Features::MOUSE_INVERT_SCROLL),
    (cfg_param::SWAP_STICKS, Features::SWAP_RL_STICKS),
    (cfg_param::ENABLE_NUNCHUK_X_ACCEL, Features::NUNCHUK_ACC_ENABLE),
    (cfg_param::ENABLE_NUNCHUK_Y_ACCEL, Features::NUNCHUK_ACC_ENABLE),
    (cfg_param::ENABLE_NUNCHUK_Z_ACCEL, Features::NUNCHUK_ACC_ENABLE),
    (cfg_param::DISABLE_ANALOG_TRIGGERS, Features::DISABLE_ANALOG_TRIGGERS),
];

/// Request opcode → feature relations.
pub const REQUEST_FEATURES: &[(u8, Features)] = &[
    (rq::JUMP_TO_BOOTLOADER, Features::FW_UPDATE),
    (rq::BLOCK_IO, Features::BLOCK_IO),
    (rq::SUSPEND_POLLING, Features::SUSPEND_POLLING),
    (rq::GET_CONTROLLER_TYPE, Features::CONTROLLER_TYPE),
];

/// Feature a configuration write to `param` depends on, if any.
///
/// Parameters without a relation (mode, serial) are always writable.
pub fn feature_for_cfg_param(param: u8) -> Option<Features> {
    CFG_PARAM_FEATURES
        .iter()
        .find(|(p, _)| *p == param)
        .map(|(_, f)| *f)
}

/// Sets reported by firmware with [`Features::DYNAMIC_FEATURES`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedSets {
    pub requests: Vec<u8>,
    pub cfg_params: Vec<u8>,
    pub modes: Vec<u8>,
    /// Only queried when the firmware lists the mappings request.
    pub mappings: Option<Vec<u8>>,
}

impl SupportedSets {
    pub fn supports_request(&self, opcode: u8) -> bool {
        self.requests.contains(&opcode)
    }

    pub fn supports_cfg_param(&self, param: u8) -> bool {
        self.cfg_params.contains(&param)
    }

    pub fn supports_mode(&self, mode: u8) -> bool {
        self.modes.contains(&mode)
    }
}

/// Translate enumerated sets into a feature mask.
///
/// Depends only on membership, so ordering and duplicates in the sets do not
/// matter and IDs with no relation are ignored.
pub fn derive_features(sets: &SupportedSets) -> Features {
    let from_params = CFG_PARAM_FEATURES
        .iter()
        .filter(|(param, _)| sets.supports_cfg_param(*param))
        .fold(Features::empty(), |acc, (_, f)| acc | *f);

    REQUEST_FEATURES
        .iter()
        .filter(|(opcode, _)| sets.supports_request(*opcode))
        .fold(from_params, |acc, (_, f)| acc | *f)
}
