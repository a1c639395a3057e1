//! PlayStation memory card and controller, clocked one byte at a time.

pub const CARD_SIZE: usize = 0x20000;
pub const SECTOR_SIZE: usize = 128;
pub const SECTOR_COUNT: u16 = 1024;

const ADDR_PAD: u8 = 0x01;
const ADDR_CARD: u8 = 0x81;
const CMD_READ: u8 = 0x52;
const CMD_WRITE: u8 = 0x57;
const CARD_FLAG: u8 = 0x08;
const STATUS_GOOD: u8 = 0x47;
const STATUS_BAD_CHECKSUM: u8 = 0x4E;
const STATUS_BAD_SECTOR: u8 = 0xFF;

/// Memory card with fault switches.
#[derive(Debug, Clone)]
pub struct MemoryCard {
    pub data: Vec<u8>,
    /// Flip the read checksum byte.
    pub corrupt_read_checksum: bool,
    /// Added to the sector number echoed back on reads.
    pub sector_echo_offset: u16,
    /// Sectors committed by writes, in order.
    pub written_sectors: Vec<u16>,
}

impl Default for MemoryCard {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCard {
    pub fn new() -> Self {
        Self {
            data: vec![0; CARD_SIZE],
            corrupt_read_checksum: false,
            sector_echo_offset: 0,
            written_sectors: Vec::new(),
        }
    }

    /// Card whose contents are a per-sector pattern.
    pub fn patterned() -> Self {
        let mut card = Self::new();
        for (i, byte) in card.data.iter_mut().enumerate() {
            *byte = ((i / SECTOR_SIZE) as u8).wrapping_add(((i % SECTOR_SIZE) as u8).wrapping_mul(3));
        }
        card
    }

    pub fn sector(&self, n: u16) -> &[u8] {
        let start = usize::from(n) * SECTOR_SIZE;
        &self.data[start..start + SECTOR_SIZE]
    }
}

/// Digital or analog pad.
#[derive(Debug, Clone, Default)]
pub struct PsxPad {
    pub analog: bool,
    pub config_mode: bool,
    pub rumble_unlocked: bool,
}

impl PsxPad {
    pub fn id(&self) -> u16 {
        if self.config_mode {
            0x5AF3
        } else if self.analog {
            0x5A73
        } else {
            0x5A41
        }
    }

    fn data_len(&self) -> usize {
        if self.analog || self.config_mode { 6 } else { 2 }
    }
}

/// Devices sharing one PSX port and the state of the current selection.
#[derive(Debug, Clone, Default)]
pub struct PsxPort {
    pub card: Option<MemoryCard>,
    pub pad: Option<PsxPad>,
    tx_log: Vec<u8>,
}

impl PsxPort {
    /// Clock `count` bytes, sending `tx` then zeros. The selection ends
    /// unless `keep_selected`.
    pub fn exchange(&mut self, tx: &[u8], count: usize, keep_selected: bool) -> Vec<u8> {
        let mut rx = Vec::with_capacity(count);
        for i in 0..count {
            let out = tx.get(i).copied().unwrap_or(0);
            let pos = self.tx_log.len();
            self.tx_log.push(out);
            let byte = self.respond(pos);
            rx.push(byte);
        }
        if !keep_selected {
            self.deselect();
        }
        rx
    }

    fn deselect(&mut self) {
        if self.tx_log.first() == Some(&ADDR_PAD) {
            self.finish_pad_command();
        }
        self.tx_log.clear();
    }

    fn respond(&mut self, pos: usize) -> u8 {
        match self.tx_log.first().copied() {
            Some(ADDR_CARD) if self.card.is_some() => self.card_byte(pos),
            Some(ADDR_PAD) => match &self.pad {
                Some(pad) => pad_byte(pad, pos),
                None => 0xFF,
            },
            _ => 0xFF,
        }
    }

    fn card_byte(&mut self, pos: usize) -> u8 {
        let Some(card) = self.card.as_mut() else {
            return 0xFF;
        };
        let cmd = self.tx_log.get(1).copied();
        let sector = match (self.tx_log.get(4), self.tx_log.get(5)) {
            (Some(&hi), Some(&lo)) => Some(u16::from_be_bytes([hi, lo])),
            _ => None,
        };
        match (cmd, pos) {
            (_, 0) => 0xFF,
            (_, 1) => CARD_FLAG,
            (_, 2) => 0x5A,
            (_, 3) => 0x5D,
            (Some(CMD_READ), 4 | 5) => 0x00,
            (Some(CMD_READ), 6) => 0x5C,
            (Some(CMD_READ), 7) => 0x5D,
            (Some(CMD_READ), 8..=139) => {
                let sector = sector.unwrap_or(0);
                let valid = sector < SECTOR_COUNT;
                let echo = if valid {
                    sector.wrapping_add(card.sector_echo_offset)
                } else {
                    0xFFFF
                };
                let [hi, lo] = echo.to_be_bytes();
                match pos {
                    8 => hi,
                    9 => lo,
                    10..=137 if valid => card.sector(sector)[pos - 10],
                    138 if valid => {
                        let mut chk = hi ^ lo;
                        for &b in card.sector(sector) {
                            chk ^= b;
                        }
                        if card.corrupt_read_checksum {
                            chk ^= 0x01;
                        }
                        chk
                    }
                    139 => STATUS_GOOD,
                    _ => 0xFF,
                }
            }
            (Some(CMD_WRITE), 4..=134) => 0x00,
            (Some(CMD_WRITE), 135) => 0x5C,
            (Some(CMD_WRITE), 136) => 0x5D,
            (Some(CMD_WRITE), 137) => {
                let Some(sector) = sector.filter(|&s| s < SECTOR_COUNT) else {
                    return STATUS_BAD_SECTOR;
                };
                let payload = &self.tx_log[4..134];
                let chk = payload.iter().fold(0u8, |acc, &b| acc ^ b);
                if chk != self.tx_log[134] {
                    return STATUS_BAD_CHECKSUM;
                }
                let start = usize::from(sector) * SECTOR_SIZE;
                card.data[start..start + SECTOR_SIZE].copy_from_slice(&self.tx_log[6..134]);
                card.written_sectors.push(sector);
                STATUS_GOOD
            }
            _ => 0xFF,
        }
    }

    fn finish_pad_command(&mut self) {
        let Some(pad) = self.pad.as_mut() else {
            return;
        };
        let cmd = self.tx_log.get(1).copied();
        let arg = self.tx_log.get(3).copied().unwrap_or(0);
        match cmd {
            Some(0x43) => pad.config_mode = arg == 0x01,
            Some(0x44) if pad.config_mode => pad.analog = arg == 0x01,
            Some(0x4D) if pad.config_mode => pad.rumble_unlocked = true,
            _ => {}
        }
    }
}

fn pad_byte(pad: &PsxPad, pos: usize) -> u8 {
    let [id_hi, id_lo] = pad.id().to_be_bytes();
    match pos {
        0 => 0xFF,
        1 => id_lo,
        2 => id_hi,
        p if p < 3 + pad.data_len() => {
            if pad.analog && p >= 5 {
                0x80
            } else {
                0xFF
            }
        }
        _ => 0xFF,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_cmd(sector: u16) -> Vec<u8> {
        let [hi, lo] = sector.to_be_bytes();
        vec![ADDR_CARD, CMD_READ, 0, 0, hi, lo]
    }

    #[test]
    fn test_read_in_chunks() {
        let mut port = PsxPort {
            card: Some(MemoryCard::patterned()),
            ..PsxPort::default()
        };
        let mut rx = port.exchange(&read_cmd(3), 60, true);
        rx.extend(port.exchange(&[], 60, true));
        rx.extend(port.exchange(&[], 20, false));
        assert_eq!(rx.len(), 140);
        assert_eq!(&rx[2..4], &[0x5A, 0x5D]);
        assert_eq!(&rx[8..10], &[0x00, 0x03]);
        let chk = rx[8..139].iter().fold(0u8, |a, &b| a ^ b);
        assert_eq!(chk, 0);
        assert_eq!(rx[139], b'G');
    }

    #[test]
    fn test_patterned_card_wraps_bytes() {
        let card = MemoryCard::patterned();
        let sector = card.sector(2);
        assert_eq!(sector[0], 2);
        assert_eq!(sector[100], 2u8.wrapping_add(44));
        assert_eq!(sector[127], 2u8.wrapping_add(125));
        assert_eq!(card.sector(1023)[127], 0xFFu8.wrapping_add(125));
    }

    #[test]
    fn test_deselect_resets_transaction() {
        let mut port = PsxPort {
            card: Some(MemoryCard::new()),
            ..PsxPort::default()
        };
        port.exchange(&read_cmd(0), 10, false);
        let rx = port.exchange(&read_cmd(0), 4, false);
        assert_eq!(&rx[2..4], &[0x5A, 0x5D]);
    }

    #[test]
    fn test_pad_config_mode() {
        let mut port = PsxPort {
            pad: Some(PsxPad::default()),
            ..PsxPort::default()
        };
        port.exchange(&[ADDR_PAD, 0x43, 0x00, 0x01], 9, false);
        let rx = port.exchange(&[ADDR_PAD, 0x42, 0x00], 9, false);
        assert_eq!(u16::from_le_bytes([rx[1], rx[2]]), 0x5AF3);
    }
}
