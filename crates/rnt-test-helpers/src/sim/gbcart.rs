//! Game Boy cartridge with a working memory bank controller.

/// Memory bank controller family, derived from the header type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mbc {
    RomOnly,
    Mbc1,
    Mbc2,
    Mbc3,
    Mbc5,
    /// Any controller the simulation does not bank (MMM01, HuC...).
    Other,
}

impl Mbc {
    pub fn from_cart_type(cart_type: u8) -> Self {
        match cart_type {
            0x00 | 0x08 | 0x09 => Self::RomOnly,
            0x01..=0x03 => Self::Mbc1,
            0x05 | 0x06 => Self::Mbc2,
            0x0F..=0x13 => Self::Mbc3,
            0x19..=0x1E => Self::Mbc5,
            _ => Self::Other,
        }
    }
}

pub const HEADER_TITLE: usize = 0x134;
pub const HEADER_TYPE: usize = 0x147;
pub const HEADER_ROM_SIZE: usize = 0x148;
pub const HEADER_RAM_SIZE: usize = 0x149;
pub const HEADER_DESTINATION: usize = 0x14A;
pub const HEADER_CHECKSUM: usize = 0x14D;

const ROM_BANK_SIZE: usize = 0x4000;
const RAM_BANK_SIZE: usize = 0x2000;
const MBC2_RAM_SIZE: usize = 0x200;

/// A cartridge as seen from the Game Boy bus.
#[derive(Debug, Clone)]
pub struct GbCartridge {
    mbc: Mbc,
    rom: Vec<u8>,
    ram: Vec<u8>,
    ram_enabled: bool,
    rom_bank_low: u16,
    bank_high: u8,
    ram_bank: u8,
    banking_mode: u8,
}

impl GbCartridge {
    /// Build a cartridge from header codes. ROM contents are a pattern unique
    /// to each bank; RAM starts zeroed.
    pub fn new(cart_type: u8, rom_size_code: u8, ram_size_code: u8) -> Self {
        let mbc = Mbc::from_cart_type(cart_type);
        let rom_size = if rom_size_code <= 7 {
            0x8000usize << rom_size_code
        } else {
            0x8000
        };
        let ram_size = if mbc == Mbc::Mbc2 {
            MBC2_RAM_SIZE
        } else {
            match ram_size_code {
                1 => 0x800,
                2 => 0x2000,
                3 => 0x8000,
                4 => 0x20000,
                _ => 0,
            }
        };

        let rom = (0..rom_size)
            .map(|i| {
                let bank = (i / ROM_BANK_SIZE) as u8;
                bank.wrapping_mul(0x1F) ^ (i as u8) ^ ((i >> 8) as u8)
            })
            .collect();

        let mut cart = Self {
            mbc,
            rom,
            ram: vec![0; ram_size],
            ram_enabled: false,
            rom_bank_low: 1,
            bank_high: 0,
            ram_bank: 0,
            banking_mode: 0,
        };
        cart.rom[HEADER_TYPE] = cart_type;
        cart.rom[HEADER_ROM_SIZE] = rom_size_code;
        cart.rom[HEADER_RAM_SIZE] = ram_size_code;
        cart.rom[HEADER_DESTINATION] = 0x01;
        cart.set_title("SIMCART");
        cart
    }

    /// Replace the title and recompute the header checksum.
    pub fn with_title(mut self, title: &str) -> Self {
        self.set_title(title);
        self
    }

    /// Mark the cartridge as a Japanese release.
    pub fn japanese(mut self) -> Self {
        self.rom[HEADER_DESTINATION] = 0x00;
        self.fix_header_checksum();
        self
    }

    /// Break the header checksum byte.
    pub fn with_bad_header_checksum(mut self) -> Self {
        self.rom[HEADER_CHECKSUM] ^= 0x5A;
        self
    }

    fn set_title(&mut self, title: &str) {
        let field = &mut self.rom[HEADER_TITLE..HEADER_TITLE + 16];
        field.fill(0);
        for (dst, src) in field.iter_mut().zip(title.bytes()) {
            *dst = src;
        }
        self.fix_header_checksum();
    }

    fn fix_header_checksum(&mut self) {
        let mut chk = 0u8;
        for &b in &self.rom[HEADER_TITLE..HEADER_CHECKSUM] {
            chk = chk.wrapping_sub(b).wrapping_sub(1);
        }
        self.rom[HEADER_CHECKSUM] = chk;
    }

    pub fn mbc(&self) -> Mbc {
        self.mbc
    }

    pub fn rom(&self) -> &[u8] {
        &self.rom
    }

    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    pub fn ram_mut(&mut self) -> &mut [u8] {
        &mut self.ram
    }

    pub fn ram_enabled(&self) -> bool {
        self.ram_enabled
    }

    /// Bank currently mapped at 0x4000-0x7FFF.
    pub fn rom_bank(&self) -> usize {
        match self.mbc {
            Mbc::RomOnly | Mbc::Other => 1,
            Mbc::Mbc1 => usize::from(self.bank_high) << 5 | usize::from(self.rom_bank_low & 0x1F).max(1),
            Mbc::Mbc2 => usize::from(self.rom_bank_low & 0x0F).max(1),
            Mbc::Mbc3 => usize::from(self.rom_bank_low & 0x7F).max(1),
            Mbc::Mbc5 => usize::from(self.rom_bank_low & 0x1FF),
        }
    }

    /// Bank currently mapped at 0x0000-0x3FFF. MBC1 in mode 1 maps the
    /// upper bank bits there too.
    pub fn rom_bank0(&self) -> usize {
        match self.mbc {
            Mbc::Mbc1 if self.banking_mode == 1 => usize::from(self.bank_high) << 5,
            _ => 0,
        }
    }

    fn ram_offset(&self, addr: u16) -> usize {
        let bank = match self.mbc {
            Mbc::Mbc1 if self.banking_mode == 1 => usize::from(self.bank_high),
            Mbc::Mbc3 | Mbc::Mbc5 => usize::from(self.ram_bank),
            _ => 0,
        };
        bank * RAM_BANK_SIZE + usize::from(addr - 0xA000)
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x3FFF => {
                let offset = self.rom_bank0() * ROM_BANK_SIZE + usize::from(addr);
                self.rom[offset % self.rom.len()]
            }
            0x4000..=0x7FFF => {
                let offset = self.rom_bank() * ROM_BANK_SIZE + usize::from(addr - 0x4000);
                self.rom[offset % self.rom.len()]
            }
            0xA000..=0xBFFF if self.ram_enabled || self.mbc == Mbc::RomOnly => {
                if self.mbc == Mbc::Mbc2 {
                    let cell = usize::from(addr - 0xA000) % MBC2_RAM_SIZE;
                    return 0xF0 | self.ram[cell];
                }
                let offset = self.ram_offset(addr);
                self.ram.get(offset).copied().unwrap_or(0xFF)
            }
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        match (self.mbc, addr) {
            (Mbc::Mbc2, 0x0000..=0x3FFF) => {
                if addr & 0x0100 == 0 {
                    self.ram_enabled = value & 0x0F == 0x0A;
                } else {
                    self.rom_bank_low = u16::from(value & 0x0F);
                }
            }
            (Mbc::Mbc1 | Mbc::Mbc3 | Mbc::Mbc5, 0x0000..=0x1FFF) => {
                self.ram_enabled = value & 0x0F == 0x0A;
            }
            (Mbc::Mbc1, 0x2000..=0x3FFF) => self.rom_bank_low = u16::from(value & 0x1F),
            (Mbc::Mbc3, 0x2000..=0x3FFF) => self.rom_bank_low = u16::from(value & 0x7F),
            (Mbc::Mbc5, 0x2000..=0x2FFF) => {
                self.rom_bank_low = (self.rom_bank_low & 0x100) | u16::from(value);
            }
            (Mbc::Mbc5, 0x3000..=0x3FFF) => {
                self.rom_bank_low = (self.rom_bank_low & 0xFF) | (u16::from(value & 1) << 8);
            }
            (Mbc::Mbc1, 0x4000..=0x5FFF) => self.bank_high = value & 0x03,
            (Mbc::Mbc3 | Mbc::Mbc5, 0x4000..=0x5FFF) => self.ram_bank = value & 0x0F,
            (Mbc::Mbc1, 0x6000..=0x7FFF) => self.banking_mode = value & 0x01,
            (_, 0xA000..=0xBFFF) if self.ram_enabled || self.mbc == Mbc::RomOnly => {
                if self.mbc == Mbc::Mbc2 {
                    let cell = usize::from(addr - 0xA000) % MBC2_RAM_SIZE;
                    self.ram[cell] = value & 0x0F;
                    return;
                }
                let offset = self.ram_offset(addr);
                if let Some(cell) = self.ram.get_mut(offset) {
                    *cell = value;
                }
            }
            _ => {}
        }
    }
}
