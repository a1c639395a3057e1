//! Transfer Pak sessions and MBC transfers against a simulated cartridge.

use rnt_adapter::{
    AdapterConfig, AdapterInfo, CancelAt, DeviceHandle, NoProgress, OUR_VENDOR_ID, product_ids,
};
use rnt_errors::{ChecksumKind, RntError};
use rnt_hid_common::HidDeviceInfo;
use rnt_n64::{CartridgeSession, Mbc, ROM_BANK_SIZE};
use rnt_test_helpers::prelude::*;

fn open(sim: &SimulatedAdapter) -> Result<DeviceHandle, Box<dyn std::error::Error>> {
    let hid = HidDeviceInfo::new(OUR_VENDOR_ID, product_ids::GCN64_V3_4, "sim".into())
        .with_interface(1);
    let info = AdapterInfo::from_hid(hid).ok_or("not in registry")?;
    let config = AdapterConfig {
        exchange_timeout_ms: 20,
        ..AdapterConfig::default()
    };
    Ok(DeviceHandle::open(info, Some(sim.transport()), config)?)
}

fn sim_with_cart(cart: GbCartridge) -> SimulatedAdapter {
    SimulatedAdapter::new().with_n64_controller(0, Accessory::transfer_pak(Some(cart)))
}

fn sim_cart(sim: &SimulatedAdapter) -> Result<GbCartridge, Box<dyn std::error::Error>> {
    let xpak = sim.transfer_pak(0).ok_or("no transfer pak")?;
    Ok(xpak.cart.ok_or("no cartridge")?)
}

// ── Session lifecycle ───────────────────────────────────────────────────────

#[test]
fn open_enables_and_drop_disables() -> TestResult {
    let sim = sim_with_cart(GbCartridge::new(0x19, 1, 0));
    let mut handle = open(&sim)?;
    {
        let session = CartridgeSession::open(&mut handle, 0)?;
        assert_eq!(session.current_window(), None);
        let xpak = sim.transfer_pak(0).ok_or("no transfer pak")?;
        assert!(xpak.powered);
        assert!(xpak.access_enabled);
    }
    assert!(!sim.transfer_pak(0).ok_or("no transfer pak")?.access_enabled);
    Ok(())
}

#[test]
fn close_reports_success() -> TestResult {
    let sim = sim_with_cart(GbCartridge::new(0x19, 1, 0));
    let mut handle = open(&sim)?;
    CartridgeSession::open(&mut handle, 0)?.close()?;
    assert!(!sim.transfer_pak(0).ok_or("no transfer pak")?.access_enabled);
    Ok(())
}

#[test]
fn controller_pak_fails_presence_test() -> TestResult {
    let sim = SimulatedAdapter::new().with_n64_controller(0, Accessory::controller_pak());
    let mut handle = open(&sim)?;
    assert!(matches!(
        CartridgeSession::open(&mut handle, 0),
        Err(RntError::NoDeviceDetected)
    ));
    Ok(())
}

#[test]
fn missing_accessory_or_controller() -> TestResult {
    let sim = SimulatedAdapter::new().with_n64_controller(0, Accessory::None);
    let mut handle = open(&sim)?;
    assert!(matches!(
        CartridgeSession::open(&mut handle, 0),
        Err(RntError::NoDeviceDetected)
    ));
    // Nothing at all on channel 2: the caps query gets an empty reply.
    assert!(matches!(
        CartridgeSession::open(&mut handle, 2),
        Err(RntError::NoDeviceDetected)
    ));
    Ok(())
}

#[test]
fn window_select_is_cached_and_reset_per_session() -> TestResult {
    let sim = sim_with_cart(GbCartridge::new(0x00, 0, 0));
    let mut handle = open(&sim)?;
    let mut buf = vec![0u8; 0x8000];
    {
        let mut session = CartridgeSession::open(&mut handle, 0)?;
        session.read_cart(0x0000, &mut buf)?;
        assert_eq!(session.current_window(), Some(1));
    }
    assert_eq!(sim.cart_traffic(0).window_selects, vec![0, 1]);

    let mut session = CartridgeSession::open(&mut handle, 0)?;
    assert_eq!(session.current_window(), None);
    session.read_cart(0x4000, &mut buf[..0x20])?;
    drop(session);
    assert_eq!(sim.cart_traffic(0).window_selects, vec![0, 1, 1]);
    Ok(())
}

#[test]
fn cart_access_must_be_whole_blocks() -> TestResult {
    let sim = sim_with_cart(GbCartridge::new(0x00, 0, 0));
    let mut handle = open(&sim)?;
    let mut session = CartridgeSession::open(&mut handle, 0)?;
    let mut buf = [0u8; 0x30];
    assert!(matches!(session.read_cart(0, &mut buf), Err(RntError::BadParam(_))));
    assert!(matches!(
        session.read_cart(0xFFE0, &mut [0u8; 0x40]),
        Err(RntError::BadParam(_))
    ));
    Ok(())
}

// ── Header ──────────────────────────────────────────────────────────────────

#[test]
fn read_info_parses_header() -> TestResult {
    let sim = sim_with_cart(GbCartridge::new(0x1B, 3, 3).with_title("ZELDA").japanese());
    let mut handle = open(&sim)?;
    let info = CartridgeSession::open(&mut handle, 0)?.read_info()?;
    assert_eq!(info.title, "ZELDA");
    assert_eq!(info.mbc(), Mbc::Mbc5);
    assert_eq!(info.rom_size, 256 * 1024);
    assert_eq!(info.ram_size, 32 * 1024);
    assert!(info.is_japanese());
    Ok(())
}

#[test]
fn bad_header_checksum_stops_before_rom_access() -> TestResult {
    let sim = sim_with_cart(GbCartridge::new(0x1B, 2, 2).with_bad_header_checksum());
    let mut handle = open(&sim)?;
    let mut session = CartridgeSession::open(&mut handle, 0)?;

    let result = session.read_rom(&mut NoProgress);
    assert!(matches!(
        result,
        Err(RntError::BadChecksum(ChecksumKind::CartridgeHeader))
    ));
    assert!(matches!(
        session.read_ram(&mut NoProgress),
        Err(RntError::BadChecksum(ChecksumKind::CartridgeHeader))
    ));
    drop(session);

    let traffic = sim.cart_traffic(0);
    assert!(traffic.writes.is_empty());
    assert!(traffic.reads.iter().all(|&addr| addr < 0x200));
    Ok(())
}

// ── ROM ─────────────────────────────────────────────────────────────────────

#[test]
fn mbc5_three_banks_three_selects() -> TestResult {
    let cart = GbCartridge::new(0x19, 1, 0);
    let expected = cart.rom()[ROM_BANK_SIZE..4 * ROM_BANK_SIZE].to_vec();
    let sim = sim_with_cart(cart);
    let mut handle = open(&sim)?;
    let mut session = CartridgeSession::open(&mut handle, 0)?;
    let info = session.read_info()?;
    sim.clear_cart_traffic(0);

    let data = session.read_rom_banks(&info, 1..4, &mut NoProgress)?;
    drop(session);

    assert_eq!(data, expected);
    let writes = sim.cart_traffic(0).writes;
    let low_selects: Vec<u8> = writes
        .iter()
        .filter(|(addr, _)| *addr == 0x2000)
        .map(|&(_, v)| v)
        .collect();
    assert_eq!(low_selects, vec![1, 2, 3]);
    assert_eq!(writes.iter().filter(|(addr, _)| *addr == 0x3000).count(), 3);
    assert_eq!(writes.len(), 6);
    Ok(())
}

fn dump_matches(cart_type: u8, rom_code: u8) -> TestResult {
    let cart = GbCartridge::new(cart_type, rom_code, 0);
    let expected = cart.rom().to_vec();
    let sim = sim_with_cart(cart);
    let mut handle = open(&sim)?;
    let mut session = CartridgeSession::open(&mut handle, 0)?;
    let (info, rom) = session.read_rom(&mut NoProgress)?;
    assert_eq!(info.rom_size, expected.len());
    assert!(rom == expected, "ROM dump of type {cart_type:#04x} differs");
    Ok(())
}

#[test]
fn rom_dump_rom_only() -> TestResult {
    dump_matches(0x00, 0)
}

#[test]
fn rom_dump_mbc1() -> TestResult {
    dump_matches(0x01, 2)
}

#[test]
fn rom_dump_mbc1_one_mebibyte() -> TestResult {
    dump_matches(0x01, 5)
}

#[test]
fn mbc1_bank_0x20_is_read_in_advanced_mode() -> TestResult {
    let cart = GbCartridge::new(0x01, 5, 0);
    let expected = cart.rom()[0x1F * ROM_BANK_SIZE..0x22 * ROM_BANK_SIZE].to_vec();
    let sim = sim_with_cart(cart);
    let mut handle = open(&sim)?;
    let mut session = CartridgeSession::open(&mut handle, 0)?;
    let info = session.read_info()?;
    sim.clear_cart_traffic(0);

    let data = session.read_rom_banks(&info, 0x1F..0x22, &mut NoProgress)?;
    drop(session);

    assert!(data == expected, "banks 0x1f..0x22 differ from the cartridge");
    let traffic = sim.cart_traffic(0);
    let modes: Vec<u8> = traffic
        .writes
        .iter()
        .filter(|(addr, _)| *addr == 0x6000)
        .map(|&(_, v)| v)
        .collect();
    // bank 0x1f select, 0x20 enter and leave mode 1, bank 0x21 select
    assert_eq!(modes, vec![0, 1, 0, 0]);
    assert!(traffic.reads.iter().any(|&addr| addr < 0x4000));
    Ok(())
}

#[test]
fn mbc1_aliased_bank_cannot_be_selected_at_0x4000() -> TestResult {
    let sim = sim_with_cart(GbCartridge::new(0x01, 5, 0));
    let mut handle = open(&sim)?;
    let mut session = CartridgeSession::open(&mut handle, 0)?;
    assert!(matches!(
        session.select_rom_bank(Mbc::Mbc1, 0x40),
        Err(RntError::Unsupported(_))
    ));
    Ok(())
}

#[test]
fn rom_dump_mbc2() -> TestResult {
    dump_matches(0x05, 2)
}

#[test]
fn rom_dump_mbc3() -> TestResult {
    dump_matches(0x11, 3)
}

#[test]
fn rom_dump_mbc5() -> TestResult {
    dump_matches(0x19, 2)
}

#[test]
fn rom_only_with_banked_size_is_unsupported() -> TestResult {
    let sim = sim_with_cart(GbCartridge::new(0x00, 1, 0));
    let mut handle = open(&sim)?;
    let mut session = CartridgeSession::open(&mut handle, 0)?;
    assert!(matches!(
        session.read_rom(&mut NoProgress),
        Err(RntError::Unsupported(_))
    ));
    Ok(())
}

#[test]
fn unknown_controller_is_unsupported() -> TestResult {
    let sim = sim_with_cart(GbCartridge::new(0xFE, 1, 0));
    let mut handle = open(&sim)?;
    let mut session = CartridgeSession::open(&mut handle, 0)?;
    assert!(matches!(
        session.read_rom(&mut NoProgress),
        Err(RntError::Unsupported(_))
    ));
    Ok(())
}

#[test]
fn rom_progress_polls_every_512_bytes() -> TestResult {
    let sim = sim_with_cart(GbCartridge::new(0x00, 0, 0));
    let mut handle = open(&sim)?;
    let mut session = CartridgeSession::open(&mut handle, 0)?;
    let mut seen = Vec::new();
    let mut sink = |current: usize| {
        seen.push(current);
        rnt_adapter::ContinueOrCancel::Continue
    };
    session.read_rom(&mut sink)?;
    assert_eq!(seen.len(), 0x8000 / 0x200);
    assert!(seen.iter().enumerate().all(|(i, &c)| c == i * 0x200));
    Ok(())
}

// ── RAM ─────────────────────────────────────────────────────────────────────

fn ram_pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 13 + i / 0x2000) as u8).collect()
}

#[test]
fn mbc5_ram_write_verify_and_read_back() -> TestResult {
    let sim = sim_with_cart(GbCartridge::new(0x1B, 2, 3));
    let mut handle = open(&sim)?;
    let data = ram_pattern(0x8000);
    let mut session = CartridgeSession::open(&mut handle, 0)?;
    session.write_ram(&data, true, &mut NoProgress)?;
    let (_, ram) = session.read_ram(&mut NoProgress)?;
    drop(session);

    assert!(ram == data);
    let cart = sim_cart(&sim)?;
    assert!(cart.ram() == data.as_slice());
    assert!(!cart.ram_enabled());
    Ok(())
}

#[test]
fn mbc1_ram_uses_ram_banking_mode() -> TestResult {
    let sim = sim_with_cart(GbCartridge::new(0x03, 2, 3));
    let mut handle = open(&sim)?;
    let data = ram_pattern(0x8000);
    let mut session = CartridgeSession::open(&mut handle, 0)?;
    session.write_ram(&data, true, &mut NoProgress)?;
    drop(session);

    let cart = sim_cart(&sim)?;
    assert!(cart.ram() == data.as_slice());
    let writes = sim.cart_traffic(0).writes;
    let modes: Vec<u8> = writes
        .iter()
        .filter(|(addr, _)| *addr == 0x6000)
        .map(|&(_, v)| v)
        .collect();
    // Write pass and verify pass each enter RAM mode and leave it.
    assert_eq!(modes, vec![1, 0, 1, 0]);
    Ok(())
}

#[test]
fn mbc2_ram_verifies_low_nibbles() -> TestResult {
    let sim = sim_with_cart(GbCartridge::new(0x06, 1, 0));
    let mut handle = open(&sim)?;
    let data: Vec<u8> = (0..0x200).map(|i| 0xA0 | (i % 16) as u8).collect();
    let mut session = CartridgeSession::open(&mut handle, 0)?;
    let info = session.write_ram(&data, true, &mut NoProgress)?;
    assert_eq!(info.ram_size, 0x200);

    let (_, ram) = session.read_ram(&mut NoProgress)?;
    drop(session);
    assert!(ram.iter().zip(&data).all(|(r, d)| r & 0x0F == d & 0x0F));
    assert!(ram.iter().all(|r| r & 0xF0 == 0xF0));
    Ok(())
}

#[test]
fn ram_operations_need_ram() -> TestResult {
    let sim = sim_with_cart(GbCartridge::new(0x19, 1, 0));
    let mut handle = open(&sim)?;
    let mut session = CartridgeSession::open(&mut handle, 0)?;
    assert_eq!(
        session.write_ram(&[0; 0x2000], false, &mut NoProgress),
        Err(RntError::NoCartridgeRam)
    );
    assert!(matches!(
        session.read_ram(&mut NoProgress),
        Err(RntError::NoCartridgeRam)
    ));
    Ok(())
}

#[test]
fn ram_size_mismatch_is_bad_param() -> TestResult {
    let sim = sim_with_cart(GbCartridge::new(0x1B, 1, 2));
    let mut handle = open(&sim)?;
    let mut session = CartridgeSession::open(&mut handle, 0)?;
    assert!(matches!(
        session.write_ram(&[0; 0x1000], false, &mut NoProgress),
        Err(RntError::BadParam(_))
    ));
    Ok(())
}

#[test]
fn cancelled_ram_write_still_disables_ram() -> TestResult {
    let sim = sim_with_cart(GbCartridge::new(0x1B, 1, 3));
    let mut handle = open(&sim)?;
    let mut session = CartridgeSession::open(&mut handle, 0)?;
    let result = session.write_ram(&ram_pattern(0x8000), false, &mut CancelAt::new(0x3000));
    assert_eq!(result, Err(RntError::UserCancelled));
    drop(session);

    let cart = sim_cart(&sim)?;
    assert!(!cart.ram_enabled());
    assert!(cart.ram()[..0x3000] == ram_pattern(0x8000)[..0x3000]);
    assert!(cart.ram()[0x3000..].iter().all(|&b| b == 0));
    Ok(())
}
