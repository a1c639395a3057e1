//! Simulated adapter firmware.
//!
//! `SimulatedAdapter` implements [`FeatureTransport`] and answers management
//! requests the way adapter firmware does, with N64 controllers and their
//! accessories, PlayStation ports and I2C devices attached per channel.
//! Clones share state, so a test keeps one clone as a probe after moving
//! another into a device handle.

mod gbcart;
mod n64;
mod psx;

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rnt_hid_common::{FeatureTransport, HidCommonError, HidCommonResult, REPORT_ID};
use tracing::trace;

pub use gbcart::{GbCartridge, Mbc};
pub use n64::{Accessory, CartTraffic, N64Controller, TransferPak, address_crc, data_crc};
pub use psx::{MemoryCard, PsxPad, PsxPort};

const RQ_SET_CONFIG: u8 = 0x01;
const RQ_GET_CONFIG: u8 = 0x02;
const RQ_SUSPEND_POLLING: u8 = 0x03;
const RQ_GET_VERSION: u8 = 0x04;
const RQ_GET_SIGNATURE: u8 = 0x05;
const RQ_GET_CONTROLLER_TYPE: u8 = 0x06;
const RQ_SET_VIBRATION: u8 = 0x07;
const RQ_GET_SUPPORTED_CFG_PARAMS: u8 = 0x08;
const RQ_GET_SUPPORTED_MODES: u8 = 0x09;
const RQ_GET_SUPPORTED_REQUESTS: u8 = 0x0A;
const RQ_GET_SUPPORTED_MAPPINGS: u8 = 0x0B;
const RQ_RAW_SI: u8 = 0x80;
const RQ_BLOCK_IO: u8 = 0x81;
const RQ_PSX_RAW: u8 = 0x82;
const RQ_I2C: u8 = 0x83;
const RQ_RESET: u8 = 0xFE;
const RQ_BOOTLOADER: u8 = 0xFF;

const FRAME_SIZE: usize = 63;
const BIO_TIMEDOUT: u8 = 0x80;
const BIO_PARTIAL: u8 = 0x40;
const PSX_FLAG_NO_DESELECT: u8 = 0x02;
const I2C_NACK: u8 = 0x01;

/// Register-file I2C target with an auto-incrementing pointer.
#[derive(Debug, Clone)]
pub struct I2cDevice {
    pub registers: Vec<u8>,
    pointer: u8,
}

impl I2cDevice {
    pub fn new() -> Self {
        Self {
            registers: vec![0; 256],
            pointer: 0,
        }
    }

    /// Wii extension controller identifying as `id`.
    pub fn extension(id: u16) -> Self {
        let mut dev = Self::new();
        let [hi, lo] = id.to_be_bytes();
        dev.registers[0xFA..0x100].copy_from_slice(&[0x00, 0x00, 0xA4, 0x20, hi, lo]);
        dev
    }

    fn write(&mut self, data: &[u8]) {
        if let Some((&reg, values)) = data.split_first() {
            self.pointer = reg;
            for &v in values {
                self.registers[usize::from(self.pointer)] = v;
                self.pointer = self.pointer.wrapping_add(1);
            }
        }
    }

    fn read(&mut self, len: usize) -> Vec<u8> {
        (0..len)
            .map(|_| {
                let v = self.registers[usize::from(self.pointer)];
                self.pointer = self.pointer.wrapping_add(1);
                v
            })
            .collect()
    }
}

impl Default for I2cDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default)]
struct SupportedSets {
    requests: Vec<u8>,
    cfg_params: Vec<u8>,
    modes: Vec<u8>,
    mappings: Vec<u8>,
}

#[derive(Debug, Default)]
struct Channel {
    controller_type: u8,
    vibration: bool,
    n64: Option<N64Controller>,
    psx: PsxPort,
    i2c: BTreeMap<u8, I2cDevice>,
}

#[derive(Debug)]
struct SimState {
    version: String,
    signature: String,
    supported: Option<SupportedSets>,
    block_io: bool,
    config: BTreeMap<u8, Vec<u8>>,
    channels: Vec<Channel>,
    pending: Option<Vec<u8>>,
    silent: bool,
    fail_reads: bool,
    fail_sends: bool,
    si_budget: Option<usize>,
    sent: Vec<Vec<u8>>,
    suspend_log: Vec<bool>,
    resets: usize,
    bootloader_requests: usize,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            version: "3.6.1".to_string(),
            signature: "e106420a-7c54-11e5-ae9a-001bfca3c593".to_string(),
            supported: None,
            block_io: true,
            config: BTreeMap::new(),
            channels: (0..4).map(|_| Channel::default()).collect(),
            pending: None,
            silent: false,
            fail_reads: false,
            fail_sends: false,
            si_budget: None,
            sent: Vec::new(),
            suspend_log: Vec::new(),
            resets: 0,
            bootloader_requests: 0,
        }
    }
}

/// Software adapter answering management requests.
#[derive(Debug, Clone, Default)]
pub struct SimulatedAdapter {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedAdapter {
    /// Adapter with four empty channels, firmware 3.6.1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Boxed clone, ready to hand to a device handle.
    pub fn transport(&self) -> Box<dyn FeatureTransport> {
        Box::new(self.clone())
    }

    pub fn with_version(self, version: &str) -> Self {
        self.state.lock().version = version.to_string();
        self
    }

    pub fn with_signature(self, signature: &str) -> Self {
        self.state.lock().signature = signature.to_string();
        self
    }

    /// Answer the get-supported queries with these sets.
    pub fn with_supported_sets(self, requests: &[u8], cfg_params: &[u8], modes: &[u8]) -> Self {
        self.state.lock().supported = Some(SupportedSets {
            requests: requests.to_vec(),
            cfg_params: cfg_params.to_vec(),
            modes: modes.to_vec(),
            mappings: Vec::new(),
        });
        self
    }

    pub fn with_mappings(self, mappings: &[u8]) -> Self {
        if let Some(sets) = self.state.lock().supported.as_mut() {
            sets.mappings = mappings.to_vec();
        }
        self
    }

    /// Firmware without the block IO request never answers it.
    pub fn with_block_io(self, enabled: bool) -> Self {
        self.state.lock().block_io = enabled;
        self
    }

    pub fn with_n64_controller(self, channel: u8, accessory: Accessory) -> Self {
        self.set_accessory(channel, accessory);
        self
    }

    pub fn with_memory_card(self, channel: u8, card: MemoryCard) -> Self {
        self.with_channel(channel, |c| c.psx.card = Some(card));
        self
    }

    pub fn with_psx_pad(self, channel: u8, pad: PsxPad) -> Self {
        self.with_channel(channel, |c| c.psx.pad = Some(pad));
        self
    }

    pub fn with_i2c_device(self, channel: u8, addr: u8, device: I2cDevice) -> Self {
        self.with_channel(channel, |c| {
            c.i2c.insert(addr, device);
        });
        self
    }

    pub fn with_controller_type(self, channel: u8, controller_type: u8) -> Self {
        self.with_channel(channel, |c| c.controller_type = controller_type);
        self
    }

    fn with_channel<R>(&self, channel: u8, f: impl FnOnce(&mut Channel) -> R) -> Option<R> {
        self.state
            .lock()
            .channels
            .get_mut(usize::from(channel))
            .map(f)
    }

    /// Plug a controller with `accessory` into `channel`.
    pub fn set_accessory(&self, channel: u8, accessory: Accessory) {
        self.with_channel(channel, |c| {
            c.n64 = Some(N64Controller {
                accessory,
                ..N64Controller::default()
            });
        });
    }

    pub fn unplug_controller(&self, channel: u8) {
        self.with_channel(channel, |c| c.n64 = None);
    }

    /// Run `f` on the N64 controller of `channel`.
    pub fn with_controller<R>(&self, channel: u8, f: impl FnOnce(&mut N64Controller) -> R) -> Option<R> {
        self.with_channel(channel, |c| c.n64.as_mut().map(f)).flatten()
    }

    /// Run `f` on the memory card of `channel`.
    pub fn with_card<R>(&self, channel: u8, f: impl FnOnce(&mut MemoryCard) -> R) -> Option<R> {
        self.with_channel(channel, |c| c.psx.card.as_mut().map(f)).flatten()
    }

    pub fn psx_pad(&self, channel: u8) -> Option<PsxPad> {
        self.with_channel(channel, |c| c.psx.pad.clone()).flatten()
    }

    pub fn i2c_registers(&self, channel: u8, addr: u8) -> Option<Vec<u8>> {
        self.with_channel(channel, |c| c.i2c.get(&addr).map(|d| d.registers.clone()))
            .flatten()
    }

    /// Contents of the Controller Pak on `channel`.
    pub fn pak_contents(&self, channel: u8) -> Option<Vec<u8>> {
        self.with_controller(channel, |ctl| match &ctl.accessory {
            Accessory::ControllerPak(mem) => Some(mem.clone()),
            _ => None,
        })
        .flatten()
    }

    /// Cartridge traffic recorded on `channel`.
    pub fn cart_traffic(&self, channel: u8) -> CartTraffic {
        self.with_controller(channel, |ctl| ctl.traffic.clone())
            .unwrap_or_default()
    }

    pub fn clear_cart_traffic(&self, channel: u8) {
        self.with_controller(channel, |ctl| ctl.traffic = CartTraffic::default());
    }

    /// Transfer Pak of `channel`.
    pub fn transfer_pak(&self, channel: u8) -> Option<TransferPak> {
        self.with_controller(channel, |ctl| match &ctl.accessory {
            Accessory::TransferPak(xpak) => Some(xpak.clone()),
            _ => None,
        })
        .flatten()
    }

    pub fn corrupt_pak_crc(&self, channel: u8, corrupt: bool) {
        self.with_controller(channel, |ctl| ctl.corrupt_data_crc = corrupt);
    }

    /// Controllers stop answering SI commands after `count` more of them.
    pub fn fail_si_after(&self, count: usize) {
        self.state.lock().si_budget = Some(count);
    }

    /// Stop answering anything.
    pub fn set_silent(&self, silent: bool) {
        self.state.lock().silent = silent;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }

    pub fn fail_sends(&self, fail: bool) {
        self.state.lock().fail_sends = fail;
    }

    /// Payloads received so far, report ID stripped.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.state.lock().sent.clone()
    }

    /// Number of requests received with opcode `opcode`.
    pub fn count_requests(&self, opcode: u8) -> usize {
        self.state
            .lock()
            .sent
            .iter()
            .filter(|p| p.first() == Some(&opcode))
            .count()
    }

    pub fn suspend_log(&self) -> Vec<bool> {
        self.state.lock().suspend_log.clone()
    }

    pub fn config_value(&self, param: u8) -> Option<Vec<u8>> {
        self.state.lock().config.get(&param).cloned()
    }

    pub fn vibration(&self, channel: u8) -> bool {
        self.with_channel(channel, |c| c.vibration).unwrap_or(false)
    }

    pub fn resets(&self) -> usize {
        self.state.lock().resets
    }

    pub fn bootloader_requests(&self) -> usize {
        self.state.lock().bootloader_requests
    }
}

impl SimState {
    fn handle(&mut self, payload: &[u8]) -> Option<Vec<u8>> {
        let (&opcode, args) = payload.split_first()?;
        match opcode {
            RQ_SET_CONFIG => {
                let (&param, value) = args.split_first()?;
                self.config.insert(param, vec![value.first().copied().unwrap_or(0)]);
                Some(vec![RQ_SET_CONFIG])
            }
            RQ_GET_CONFIG => {
                let &param = args.first()?;
                let mut reply = vec![RQ_GET_CONFIG, param];
                reply.extend(self.config.get(&param).cloned().unwrap_or_else(|| vec![0]));
                Some(reply)
            }
            RQ_SUSPEND_POLLING => {
                self.suspend_log.push(args.first().copied().unwrap_or(0) != 0);
                Some(vec![RQ_SUSPEND_POLLING])
            }
            RQ_GET_VERSION => Some(string_reply(opcode, &self.version)),
            RQ_GET_SIGNATURE => Some(string_reply(opcode, &self.signature)),
            RQ_GET_CONTROLLER_TYPE => {
                let &channel = args.first()?;
                let ctl = self.channels.get(usize::from(channel))?.controller_type;
                Some(vec![opcode, channel, ctl])
            }
            RQ_SET_VIBRATION => {
                let &channel = args.first()?;
                let on = args.get(1).copied().unwrap_or(0) != 0;
                self.channels.get_mut(usize::from(channel))?.vibration = on;
                Some(vec![opcode])
            }
            RQ_GET_SUPPORTED_REQUESTS
            | RQ_GET_SUPPORTED_CFG_PARAMS
            | RQ_GET_SUPPORTED_MODES
            | RQ_GET_SUPPORTED_MAPPINGS => {
                let sets = self.supported.as_ref()?;
                let ids = match opcode {
                    RQ_GET_SUPPORTED_REQUESTS => &sets.requests,
                    RQ_GET_SUPPORTED_CFG_PARAMS => &sets.cfg_params,
                    RQ_GET_SUPPORTED_MODES => &sets.modes,
                    _ => &sets.mappings,
                };
                let mut reply = vec![opcode];
                reply.extend_from_slice(ids);
                Some(reply)
            }
            RQ_RAW_SI => {
                let (&channel, rest) = args.split_first()?;
                let (&tx_len, rest) = rest.split_first()?;
                let tx = rest.get(..usize::from(tx_len))?;
                let rx = self.si_command(channel, tx).unwrap_or_default();
                let mut reply = vec![RQ_RAW_SI, channel, rx.len() as u8];
                reply.extend_from_slice(&rx);
                Some(reply)
            }
            RQ_BLOCK_IO if self.block_io => Some(self.block_io(args)),
            RQ_PSX_RAW => {
                let (&chn_flags, rest) = args.split_first()?;
                let (&tx_len, rest) = rest.split_first()?;
                let (&max_rx, rest) = rest.split_first()?;
                let tx = rest.get(..usize::from(tx_len))?;
                let channel = chn_flags & 0x0F;
                let keep = (chn_flags >> 4) & PSX_FLAG_NO_DESELECT != 0;
                let count = usize::from(max_rx).max(tx.len());
                let port = &mut self.channels.get_mut(usize::from(channel))?.psx;
                let mut rx = port.exchange(tx, count, keep);
                rx.truncate(usize::from(max_rx));
                let mut reply = vec![RQ_PSX_RAW, rx.len() as u8];
                reply.extend_from_slice(&rx);
                Some(reply)
            }
            RQ_I2C => Some(self.i2c(args)),
            RQ_RESET => {
                self.resets += 1;
                None
            }
            RQ_BOOTLOADER => {
                self.bootloader_requests += 1;
                None
            }
            _ => None,
        }
    }

    fn si_command(&mut self, channel: u8, tx: &[u8]) -> Option<Vec<u8>> {
        if let Some(budget) = self.si_budget.as_mut() {
            if *budget == 0 {
                return None;
            }
            *budget -= 1;
        }
        self.channels
            .get_mut(usize::from(channel))?
            .n64
            .as_mut()?
            .command(tx)
    }

    fn block_io(&mut self, mut frame: &[u8]) -> Vec<u8> {
        let mut reply = vec![RQ_BLOCK_IO];
        while let [channel, tx_len, rx_len, rest @ ..] = frame {
            if *channel == 0xFF {
                break;
            }
            let Some(tx) = rest.get(..usize::from(*tx_len)) else {
                break;
            };
            let wanted = usize::from(*rx_len);
            match self.si_command(*channel, tx) {
                Some(rx) if rx.len() >= wanted => {
                    reply.push(*rx_len);
                    reply.extend_from_slice(&rx[..wanted]);
                }
                Some(rx) if !rx.is_empty() => {
                    reply.push(BIO_PARTIAL | rx.len() as u8);
                    reply.extend_from_slice(&rx);
                }
                _ => reply.push(BIO_TIMEDOUT),
            }
            frame = &rest[usize::from(*tx_len)..];
        }
        reply.resize(FRAME_SIZE, 0xFF);
        reply
    }

    fn i2c(&mut self, mut frame: &[u8]) -> Vec<u8> {
        let mut reply = vec![RQ_I2C];
        while let [channel, addr, wr_len, rd_len, rest @ ..] = frame {
            if *addr == 0 && *wr_len == 0 && *rd_len == 0 {
                break;
            }
            let Some(write) = rest.get(..usize::from(*wr_len)) else {
                break;
            };
            let device = self
                .channels
                .get_mut(usize::from(*channel))
                .and_then(|c| c.i2c.get_mut(addr));
            match device {
                Some(dev) => {
                    dev.write(write);
                    let data = dev.read(usize::from(*rd_len));
                    reply.push(0);
                    reply.push(data.len() as u8);
                    reply.extend_from_slice(&data);
                }
                None => reply.push(I2C_NACK),
            }
            frame = &rest[usize::from(*wr_len)..];
        }
        reply.resize(FRAME_SIZE, 0);
        reply
    }
}

fn string_reply(opcode: u8, text: &str) -> Vec<u8> {
    let mut reply = vec![opcode];
    reply.extend_from_slice(text.as_bytes());
    reply.push(0);
    reply
}

impl FeatureTransport for SimulatedAdapter {
    fn send_feature_report(&mut self, data: &[u8]) -> HidCommonResult<()> {
        let mut state = self.state.lock();
        if state.fail_sends {
            return Err(HidCommonError::WriteError("simulated failure".to_string()));
        }
        let Some((&REPORT_ID, payload)) = data.split_first() else {
            return Err(HidCommonError::InvalidReport("missing report ID".to_string()));
        };
        state.sent.push(payload.to_vec());
        let reply = if state.silent {
            None
        } else {
            state.handle(payload)
        };
        trace!("sim {:02x?} -> {:02x?}", payload.first(), reply.as_ref().map(Vec::len));
        state.pending = reply;
        Ok(())
    }

    fn get_feature_report(&mut self, buf: &mut [u8]) -> HidCommonResult<usize> {
        let mut state = self.state.lock();
        if state.fail_reads {
            return Err(HidCommonError::ReadError("simulated failure".to_string()));
        }
        let Some(reply) = state.pending.take() else {
            return Ok(0);
        };
        let n = reply.len().min(buf.len().saturating_sub(1));
        if let Some((id, rest)) = buf.split_first_mut() {
            *id = REPORT_ID;
            rest[..n].copy_from_slice(&reply[..n]);
        }
        Ok(n + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(sim: &mut SimulatedAdapter, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![REPORT_ID];
        frame.extend_from_slice(payload);
        frame.resize(64, 0);
        sim.send_feature_report(&frame).unwrap();
        let mut buf = [0u8; 64];
        let n = sim.get_feature_report(&mut buf).unwrap();
        buf[1..n].to_vec()
    }

    #[test]
    fn test_version_reply() {
        let mut sim = SimulatedAdapter::new().with_version("3.4.1");
        assert_eq!(exchange(&mut sim, &[RQ_GET_VERSION]), b"\x043.4.1\0".to_vec());
    }

    #[test]
    fn test_unknown_request_gets_no_reply() {
        let mut sim = SimulatedAdapter::new();
        let mut frame = vec![REPORT_ID, 0x42];
        frame.resize(64, 0);
        sim.send_feature_report(&frame).unwrap();
        let mut buf = [0u8; 64];
        assert_eq!(sim.get_feature_report(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_raw_si_caps() {
        let mut sim = SimulatedAdapter::new().with_n64_controller(0, Accessory::controller_pak());
        let reply = exchange(&mut sim, &[RQ_RAW_SI, 0, 1, 0x00]);
        assert_eq!(&reply[..6], &[RQ_RAW_SI, 0, 3, 0x05, 0x00, 0x01]);
    }

    #[test]
    fn test_block_io_marks_missing_controller_timed_out() {
        let mut sim = SimulatedAdapter::new().with_n64_controller(0, Accessory::None);
        let reply = exchange(&mut sim, &[RQ_BLOCK_IO, 0, 1, 3, 0x00, 1, 1, 3, 0x00, 0xFF]);
        assert_eq!(reply.len(), FRAME_SIZE);
        assert_eq!(&reply[..6], &[RQ_BLOCK_IO, 3, 0x05, 0x00, 0x02, BIO_TIMEDOUT]);
    }

    #[test]
    fn test_i2c_register_read() {
        let mut sim = SimulatedAdapter::new().with_i2c_device(0, 0x52, I2cDevice::extension(0x0101));
        let reply = exchange(&mut sim, &[RQ_I2C, 0, 0x52, 1, 6, 0xFA]);
        assert_eq!(&reply[..9], &[RQ_I2C, 0, 6, 0x00, 0x00, 0xA4, 0x20, 0x01, 0x01]);
    }
}
