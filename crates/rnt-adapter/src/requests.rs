//! Request opcodes, configuration parameters and their value sets.
//!
//! Byte 0 of every feature-report payload is one of the [`rq`] opcodes.

/// Request opcodes.
pub mod rq {
    pub const SET_CONFIG_PARAM: u8 = 0x01;
    pub const GET_CONFIG_PARAM: u8 = 0x02;
    pub const SUSPEND_POLLING: u8 = 0x03;
    pub const GET_VERSION: u8 = 0x04;
    pub const GET_SIGNATURE: u8 = 0x05;
    pub const GET_CONTROLLER_TYPE: u8 = 0x06;
    pub const SET_VIBRATION: u8 = 0x07;
    pub const GET_SUPPORTED_CFG_PARAMS: u8 = 0x08;
    pub const GET_SUPPORTED_MODES: u8 = 0x09;
    pub const GET_SUPPORTED_REQUESTS: u8 = 0x0A;
    pub const GET_SUPPORTED_MAPPINGS: u8 = 0x0B;

    pub const RAW_SI_COMMAND: u8 = 0x80;
    pub const BLOCK_IO: u8 = 0x81;
    pub const PSX_RAW: u8 = 0x82;
    pub const I2C_TRANSACTIONS: u8 = 0x83;

    pub const RESET_FIRMWARE: u8 = 0xFE;
    pub const JUMP_TO_BOOTLOADER: u8 = 0xFF;
}

/// Configuration parameter IDs.
pub mod cfg_param {
    pub const MODE: u8 = 0x00;
    pub const SERIAL: u8 = 0x01;
    pub const POLL_INTERVAL0: u8 = 0x10;
    pub const POLL_INTERVAL1: u8 = 0x11;
    pub const POLL_INTERVAL2: u8 = 0x12;
    pub const POLL_INTERVAL3: u8 = 0x13;
    pub const FULL_SLIDERS: u8 = 0x23;
    pub const INVERT_TRIG: u8 = 0x24;
    pub const TRIGGERS_AS_BUTTONS: u8 = 0x25;
    pub const MOUSE_INVERT_SCROLL: u8 = 0x26;
    pub const SWAP_STICKS: u8 = 0x27;
    pub const DPAD_AS_BUTTONS: u8 = 0x30;
    pub const DPAD_AS_AXES: u8 = 0x31;
    pub const ENABLE_NUNCHUK_X_ACCEL: u8 = 0x32;
    pub const ENABLE_NUNCHUK_Y_ACCEL: u8 = 0x33;
    pub const ENABLE_NUNCHUK_Z_ACCEL: u8 = 0x34;
    pub const DISABLE_ANALOG_TRIGGERS: u8 = 0x35;

    pub const POLL_INTERVALS: [u8; 4] = [
        POLL_INTERVAL0,
        POLL_INTERVAL1,
        POLL_INTERVAL2,
        POLL_INTERVAL3,
    ];
}

/// Values for [`cfg_param::MODE`].
pub mod mode {
    pub const STANDARD: u8 = 0x00;
    pub const N64_ONLY: u8 = 0x01;
    pub const GC_ONLY: u8 = 0x02;
    pub const DUAL_STANDARD: u8 = 0x10;
    pub const DUAL_N64_ONLY: u8 = 0x11;
    pub const DUAL_GC_ONLY: u8 = 0x12;
    pub const MOUSE: u8 = 0x20;
}

/// Controller type codes returned by `GET_CONTROLLER_TYPE`.
pub mod ctl_type {
    pub const NONE: u8 = 0;
    pub const N64: u8 = 1;
    pub const GC: u8 = 2;
    pub const GC_KEYBOARD: u8 = 3;

    pub const NONE_NEW: u8 = 100;
    pub const CLASSIC: u8 = 101;
    pub const SNES: u8 = 102;
    pub const NES: u8 = 103;
    pub const N64_NEW: u8 = 104;
    pub const GAMECUBE_NEW: u8 = 105;
    pub const MD: u8 = 106;
    pub const SMS: u8 = 107;
    pub const SNES_NDK10: u8 = 108;
    pub const SNES_MOUSE: u8 = 109;
    pub const PCE: u8 = 110;
    pub const PCE6: u8 = 111;
    pub const NUNCHUK: u8 = 112;
}

/// Human-readable name for a controller type code.
pub fn controller_name(code: u8) -> &'static str {
    match code {
        ctl_type::NONE | ctl_type::NONE_NEW => "No controller",
        ctl_type::N64 | ctl_type::N64_NEW => "N64 Controller",
        ctl_type::GC | ctl_type::GAMECUBE_NEW => "GC Controller",
        ctl_type::GC_KEYBOARD => "GC Keyboard",
        ctl_type::CLASSIC => "Classic controller",
        ctl_type::SNES => "SNES controller",
        ctl_type::NES => "NES controller",
        ctl_type::MD => "Megadrive controller",
        ctl_type::SMS => "SMS controller",
        ctl_type::SNES_NDK10 => "NTT Data controller",
        ctl_type::SNES_MOUSE => "SNES mouse",
        ctl_type::PCE => "PC engine controller",
        ctl_type::PCE6 => "PC engine 6 button controller",
        ctl_type::NUNCHUK => "Nunchuk",
        _ => "Unknown",
    }
}

/// Name of a configuration parameter, for display and CLI parsing.
pub fn cfg_param_name(param: u8) -> Option<&'static str> {
    Some(match param {
        cfg_param::MODE => "mode",
        cfg_param::SERIAL => "serial",
        cfg_param::POLL_INTERVAL0 => "poll_interval0",
        cfg_param::POLL_INTERVAL1 => "poll_interval1",
        cfg_param::POLL_INTERVAL2 => "poll_interval2",
        cfg_param::POLL_INTERVAL3 => "poll_interval3",
        cfg_param::FULL_SLIDERS => "full_sliders",
        cfg_param::INVERT_TRIG => "invert_trig",
        cfg_param::TRIGGERS_AS_BUTTONS => "triggers_as_buttons",
        cfg_param::MOUSE_INVERT_SCROLL => "mouse_invert_scroll",
        cfg_param::SWAP_STICKS => "swap_sticks",
        cfg_param::DPAD_AS_BUTTONS => "dpad_as_buttons",
        cfg_param::DPAD_AS_AXES => "dpad_as_axes",
        cfg_param::ENABLE_NUNCHUK_X_ACCEL => "nunchuk_x_accel",
        cfg_param::ENABLE_NUNCHUK_Y_ACCEL => "nunchuk_y_accel",
        cfg_param::ENABLE_NUNCHUK_Z_ACCEL => "nunchuk_z_accel",
        cfg_param::DISABLE_ANALOG_TRIGGERS => "disable_analog_triggers",
        _ => return None,
    })
}

/// Reverse of [`cfg_param_name`]; also accepts a hex (`0x23`) or decimal ID.
pub fn parse_cfg_param(token: &str) -> Option<u8> {
    let t = token.trim().to_ascii_lowercase();
    if let Some(hex) = t.strip_prefix("0x") {
        return u8::from_str_radix(hex, 16).ok();
    }
    if let Ok(value) = t.parse::<u8>() {
        return Some(value);
    }
    (0..=u8::MAX).find(|p| cfg_param_name(*p) == Some(t.as_str()))
}
