use std::cell::RefCell;
use std::rc::Rc;

use crate::apu::Apu;
use crate::cartridge::SharedMapper;
use crate::joypad::Joypad;
use crate::ppu::Ppu;

const RAM_SIZE: usize = 0x0800;
const TEST_MODE_SIZE: usize = 8;

const OAM_DMA: u16 = 0x4014;
const APU_STATUS: u16 = 0x4015;
const JOYPAD1: u16 = 0x4016;
const JOYPAD2: u16 = 0x4017;

/// Bits 5-7 of a controller read are not driven by the pad
const JOYPAD_OPEN_BUS: u8 = 0x40;

/// Where a CPU address lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Offset into the 2KB internal RAM
    Ram(u16),
    /// PPU register index 0-7
    PpuRegister(u8),
    /// Offset into $4000-$4017
    ApuIo(u8),
    /// Offset into $4018-$401F
    TestMode(u8),
    /// Cartridge address, passed through untouched
    Cartridge(u16),
}

impl Region {
    /// Decode a CPU address. Total over the 16-bit space.
    pub fn resolve(addr: u16) -> Self {
        match addr {
            0x0000..=0x1FFF => Region::Ram(addr & 0x07FF),
            0x2000..=0x3FFF => Region::PpuRegister((addr & 0x0007) as u8),
            0x4000..=0x4017 => Region::ApuIo((addr - 0x4000) as u8),
            0x4018..=0x401F => Region::TestMode((addr - 0x4018) as u8),
            0x4020..=0xFFFF => Region::Cartridge(addr),
        }
    }
}

/// The CPU address space
///
/// Routes every access to RAM, the PPU/APU register blocks, the controllers or
/// the cartridge. Reads take `&mut self` because several registers have read
/// side effects (PPUSTATUS, PPUDATA, $4015, controller shift registers).
pub struct Memory {
    ram: [u8; RAM_SIZE],
    test_mode: [u8; TEST_MODE_SIZE],
    ppu: Rc<RefCell<Ppu>>,
    apu: Rc<RefCell<Apu>>,
    mapper: SharedMapper,
    joypads: [Joypad; 2],
    dma_request: Option<u8>,
}

impl Memory {
    pub fn new(ppu: Rc<RefCell<Ppu>>, apu: Rc<RefCell<Apu>>, mapper: SharedMapper) -> Self {
        Self {
            ram: [0; RAM_SIZE],
            test_mode: [0; TEST_MODE_SIZE],
            ppu,
            apu,
            mapper,
            joypads: [Joypad::new(), Joypad::new()],
            dma_request: None,
        }
    }

    /// Power cycle clears RAM, a soft reset leaves it alone
    pub fn reset(&mut self, power_cycle: bool) {
        if power_cycle {
            self.ram = [0; RAM_SIZE];
            self.test_mode = [0; TEST_MODE_SIZE];
        }
        self.dma_request = None;
        for joypad in &mut self.joypads {
            joypad.write_strobe(0);
        }
    }

    pub fn read(&mut self, addr: u16) -> u8 {
        match Region::resolve(addr) {
            Region::Ram(offset) => self.ram[offset as usize],
            Region::PpuRegister(index) => self.ppu.borrow_mut().read_register(index),
            Region::ApuIo(_) => self.read_apu_io(addr),
            Region::TestMode(offset) => self.test_mode[offset as usize],
            Region::Cartridge(addr) => self.mapper.borrow().read_cpu(addr),
        }
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        match Region::resolve(addr) {
            Region::Ram(offset) => self.ram[offset as usize] = value,
            Region::PpuRegister(index) => self.ppu.borrow_mut().write_register(index, value),
            Region::ApuIo(_) => self.write_apu_io(addr, value),
            Region::TestMode(offset) => self.test_mode[offset as usize] = value,
            Region::Cartridge(addr) => self.mapper.borrow_mut().write_cpu(addr, value),
        }
    }

    fn read_apu_io(&mut self, addr: u16) -> u8 {
        match addr {
            APU_STATUS => self.apu.borrow_mut().read_status(),
            JOYPAD1 => self.joypads[0].read() | JOYPAD_OPEN_BUS,
            JOYPAD2 => self.joypads[1].read() | JOYPAD_OPEN_BUS,
            // Everything else in the block is write-only
            _ => (addr >> 8) as u8,
        }
    }

    fn write_apu_io(&mut self, addr: u16, value: u8) {
        match addr {
            OAM_DMA => self.dma_request = Some(value),
            JOYPAD1 => {
                for joypad in &mut self.joypads {
                    joypad.write_strobe(value);
                }
            }
            // $4017 writes go to the APU frame counter
            _ => self.apu.borrow_mut().write_register(addr, value),
        }
    }

    /// Little-endian 16-bit read
    pub fn read_u16(&mut self, addr: u16) -> u16 {
        let lo = self.read(addr) as u16;
        let hi = self.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// Little-endian 16-bit write
    pub fn write_u16(&mut self, addr: u16, value: u16) {
        self.write(addr, value as u8);
        self.write(addr.wrapping_add(1), (value >> 8) as u8);
    }

    /// 16-bit read that never carries into the high byte of the pointer.
    ///
    /// Reproduces the 6502 indirect addressing bug: a pointer at $xxFF takes
    /// its high byte from $xx00 instead of the next page.
    pub fn read_u16_wrapped(&mut self, addr: u16) -> u16 {
        let hi_addr = (addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF);
        let lo = self.read(addr) as u16;
        let hi = self.read(hi_addr) as u16;
        (hi << 8) | lo
    }

    /// Page latched by a write to $4014, cleared once taken
    pub fn take_dma_request(&mut self) -> Option<u8> {
        self.dma_request.take()
    }

    pub fn ppu(&self) -> Rc<RefCell<Ppu>> {
        Rc::clone(&self.ppu)
    }

    pub fn apu(&self) -> Rc<RefCell<Apu>> {
        Rc::clone(&self.apu)
    }

    pub fn joypad(&self, index: usize) -> &Joypad {
        &self.joypads[index]
    }

    pub fn joypad_mut(&mut self, index: usize) -> &mut Joypad {
        &mut self.joypads[index]
    }
}
