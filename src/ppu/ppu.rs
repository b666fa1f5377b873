use tracing::debug;

use crate::cartridge::SharedMapper;
use crate::cpu::InterruptLines;
use crate::nes::TvSystem;
use crate::ppu::timing::{PRE_RENDER_SCANLINE, VBLANK_SCANLINE};
use crate::ppu::{FrameBuffer, PaletteRam, Registers, Sprites, Timing};

/// PPUSTATUS ($2002) flags
const STATUS_VBLANK: u8 = 0b1000_0000;
const STATUS_SPRITE_ZERO_HIT: u8 = 0b0100_0000;
const STATUS_SPRITE_OVERFLOW: u8 = 0b0010_0000;

const PALETTE_START: u16 = 0x3F00;

/// Background tile data fetched ahead of the shifters
#[derive(Debug, Default)]
struct BackgroundFetch {
    tile: u8,
    attribute: u8,
    pattern_lo: u8,
    pattern_hi: u8,
}

/// 16-bit background shift registers
#[derive(Debug, Default)]
struct BackgroundShifters {
    pattern_lo: u16,
    pattern_hi: u16,
    attribute_lo: u16,
    attribute_hi: u16,
}

impl BackgroundShifters {
    fn load(&mut self, fetch: &BackgroundFetch) {
        self.pattern_lo = (self.pattern_lo & 0xFF00) | u16::from(fetch.pattern_lo);
        self.pattern_hi = (self.pattern_hi & 0xFF00) | u16::from(fetch.pattern_hi);
        let lo = if fetch.attribute & 0x01 != 0 { 0xFF } else { 0x00 };
        let hi = if fetch.attribute & 0x02 != 0 { 0xFF } else { 0x00 };
        self.attribute_lo = (self.attribute_lo & 0xFF00) | lo;
        self.attribute_hi = (self.attribute_hi & 0xFF00) | hi;
    }

    fn shift(&mut self) {
        self.pattern_lo <<= 1;
        self.pattern_hi <<= 1;
        self.attribute_lo <<= 1;
        self.attribute_hi <<= 1;
    }

    /// (pattern value, palette) under fine X scroll
    fn pixel(&self, fine_x: u8) -> (u8, u8) {
        let mux = 0x8000 >> fine_x;
        let bit = |word: u16| u8::from(word & mux != 0);
        let color = (bit(self.pattern_hi) << 1) | bit(self.pattern_lo);
        let palette = (bit(self.attribute_hi) << 1) | bit(self.attribute_lo);
        (color, palette)
    }
}

/// NES Picture Processing Unit (2C02 / 2C07)
///
/// Clocked one dot at a time by the system clock. Pattern and nametable
/// accesses go through the shared mapper slot, so a cartridge swap is seen
/// on the next fetch.
pub struct Ppu {
    timing: Timing,
    registers: Registers,
    status: u8,
    palette: PaletteRam,
    sprites: Sprites,
    mapper: SharedMapper,
    interrupts: InterruptLines,
    /// Level of the internal NMI output on the previous dot
    nmi_output: bool,
    fetch: BackgroundFetch,
    shifters: BackgroundShifters,
    frame: FrameBuffer,
}

impl Ppu {
    pub fn new(tv_system: TvSystem, mapper: SharedMapper, interrupts: InterruptLines) -> Self {
        Self {
            timing: Timing::new(tv_system),
            registers: Registers::new(),
            status: 0,
            palette: PaletteRam::new(),
            sprites: Sprites::new(),
            mapper,
            interrupts,
            nmi_output: false,
            fetch: BackgroundFetch::default(),
            shifters: BackgroundShifters::default(),
            frame: FrameBuffer::new(),
        }
    }

    /// Return to the power-on state. Palette and OAM contents survive.
    pub fn reset(&mut self) {
        self.timing.reset();
        self.registers.reset();
        self.sprites.reset();
        self.status = 0;
        self.nmi_output = false;
        self.fetch = BackgroundFetch::default();
        self.shifters = BackgroundShifters::default();
        debug!(tv_system = ?self.timing.tv_system(), "PPU reset");
    }

    /// Run the current dot and advance the beam. Returns true when that dot
    /// completed a frame, at which point [`Ppu::frame`] holds the new picture.
    pub fn process_next_dot(&mut self) -> bool {
        let scanline = self.timing.scanline();
        let dot = self.timing.dot();
        let rendering = self.registers.rendering_enabled();

        if scanline == VBLANK_SCANLINE && dot == 1 {
            self.status |= STATUS_VBLANK;
        }
        if scanline == PRE_RENDER_SCANLINE && dot == 1 {
            self.status &= !(STATUS_VBLANK | STATUS_SPRITE_ZERO_HIT | STATUS_SPRITE_OVERFLOW);
        }

        if rendering && self.timing.on_render_line() {
            self.run_background_pipeline(scanline, dot);
            if dot == 257 {
                self.evaluate_sprites(scanline);
            }
        }

        if self.timing.on_visible_line() && (1..=256).contains(&dot) {
            self.output_pixel(scanline as usize, (dot - 1) as usize);
        }

        self.update_nmi_output();

        let frame_done = self.timing.advance(rendering);
        if frame_done {
            self.frame.swap();
        }
        frame_done
    }

    /// NMI fires on the rising edge of (vblank && NMI enabled)
    fn update_nmi_output(&mut self) {
        let output = self.status & STATUS_VBLANK != 0 && self.registers.nmi_enabled();
        if output && !self.nmi_output {
            self.interrupts.request_nmi();
        }
        self.nmi_output = output;
    }

    fn run_background_pipeline(&mut self, scanline: i16, dot: u16) {
        if (2..=257).contains(&dot) || (321..=337).contains(&dot) {
            if self.registers.show_background() {
                self.shifters.shift();
            }
            match (dot - 1) % 8 {
                0 => {
                    self.shifters.load(&self.fetch);
                    self.fetch_tile();
                }
                2 => self.fetch_attribute(),
                4 => self.fetch.pattern_lo = self.read_pattern(0),
                6 => self.fetch.pattern_hi = self.read_pattern(8),
                7 => self.registers.increment_coarse_x(),
                _ => {}
            }
        }

        match dot {
            256 => self.registers.increment_fine_y(),
            257 => {
                self.shifters.load(&self.fetch);
                self.registers.copy_horizontal_bits();
            }
            280..=304 if scanline == PRE_RENDER_SCANLINE => self.registers.copy_vertical_bits(),
            _ => {}
        }
    }

    fn fetch_tile(&mut self) {
        let addr = 0x2000 | (self.registers.v() & 0x0FFF);
        self.fetch.tile = self.read_vram(addr);
    }

    fn fetch_attribute(&mut self) {
        let v = self.registers.v();
        let addr = 0x23C0 | (v & 0x0C00) | ((v >> 4) & 0x38) | ((v >> 2) & 0x07);
        let mut attribute = self.read_vram(addr);
        // Each byte covers a 4x4 tile area, two bits per 2x2 quadrant
        if v & 0x0040 != 0 {
            attribute >>= 4;
        }
        if v & 0x0002 != 0 {
            attribute >>= 2;
        }
        self.fetch.attribute = attribute & 0x03;
    }

    fn read_pattern(&self, plane: u16) -> u8 {
        let fine_y = (self.registers.v() >> 12) & 0x07;
        let addr = self.registers.background_pattern_table()
            + u16::from(self.fetch.tile) * 16
            + fine_y
            + plane;
        self.read_vram(addr)
    }

    fn evaluate_sprites(&mut self, scanline: i16) {
        let height = self.registers.sprite_height();
        let table = self.registers.sprite_pattern_table();
        let mapper = self.mapper.borrow();
        let overflow = self
            .sprites
            .evaluate(scanline, height, table, |addr| mapper.read_ppu(addr));
        if overflow {
            self.status |= STATUS_SPRITE_OVERFLOW;
        }
    }

    fn output_pixel(&mut self, y: usize, x: usize) {
        if !self.registers.rendering_enabled() {
            let backdrop = self.palette.color(0, self.registers.grayscale());
            self.frame.set_pixel(x, y, backdrop);
            return;
        }

        let left_column = x < 8;
        let (bg_color, bg_palette) = if self.registers.show_background()
            && (!left_column || self.registers.show_background_left())
        {
            self.shifters.pixel(self.registers.fine_x())
        } else {
            (0, 0)
        };

        let sprite = if self.registers.show_sprites()
            && (!left_column || self.registers.show_sprites_left())
        {
            self.sprites.pixel(x as u8)
        } else {
            None
        };

        if let Some(sprite) = sprite {
            if sprite.sprite_zero && bg_color != 0 && x != 255 {
                self.status |= STATUS_SPRITE_ZERO_HIT;
            }
        }

        let slot = match sprite {
            Some(sprite) if bg_color == 0 || !sprite.behind_background => {
                0x10 | (sprite.palette << 2) | sprite.color
            }
            _ if bg_color != 0 => (bg_palette << 2) | bg_color,
            _ => 0,
        };
        let argb = self.palette.color(slot, self.registers.grayscale());
        self.frame.set_pixel(x, y, argb);
    }

    /// CPU read of $2000-$2007 (`index` = address & 7)
    pub fn read_register(&mut self, index: u8) -> u8 {
        let value = match index & 0x07 {
            2 => {
                let value = (self.status & 0xE0) | (self.registers.io_bus() & 0x1F);
                self.status &= !STATUS_VBLANK;
                self.registers.reset_latch();
                value
            }
            4 => self.sprites.read_oam(self.registers.oam_address),
            7 => self.read_data(),
            // Write-only registers float to the last bus value
            _ => return self.registers.io_bus(),
        };
        self.registers.set_io_bus(value);
        value
    }

    /// CPU write of $2000-$2007 (`index` = address & 7)
    pub fn write_register(&mut self, index: u8, value: u8) {
        self.registers.set_io_bus(value);
        match index & 0x07 {
            0 => self.registers.write_control(value),
            1 => self.registers.write_mask(value),
            2 => {}
            3 => self.registers.oam_address = value,
            4 => {
                self.sprites.write_oam(self.registers.oam_address, value);
                self.registers.oam_address = self.registers.oam_address.wrapping_add(1);
            }
            5 => self.registers.write_scroll(value),
            6 => self.registers.write_address(value),
            _ => self.write_data(value),
        }
    }

    fn read_data(&mut self) -> u8 {
        let addr = self.registers.v() & 0x3FFF;
        let value = if addr >= PALETTE_START {
            // Palette reads bypass the buffer, which picks up the nametable
            // byte hidden underneath instead
            let underneath = self.read_vram(addr - 0x1000);
            self.registers.set_data_buffer(underneath);
            self.palette.read(addr) | (self.registers.io_bus() & 0xC0)
        } else {
            let buffered = self.registers.data_buffer();
            let fresh = self.read_vram(addr);
            self.registers.set_data_buffer(fresh);
            buffered
        };
        self.advance_data_address();
        value
    }

    fn write_data(&mut self, value: u8) {
        let addr = self.registers.v() & 0x3FFF;
        if addr >= PALETTE_START {
            self.palette.write(addr, value);
        } else {
            self.mapper.borrow_mut().write_ppu(addr, value);
        }
        self.advance_data_address();
    }

    fn advance_data_address(&mut self) {
        let rendering = self.registers.rendering_enabled() && self.timing.on_render_line();
        self.registers.advance_after_data_access(rendering);
    }

    fn read_vram(&self, addr: u16) -> u8 {
        let addr = addr & 0x3FFF;
        if addr >= PALETTE_START {
            self.palette.read(addr)
        } else {
            self.mapper.borrow().read_ppu(addr)
        }
    }

    /// Last completed frame
    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn oam(&self) -> &[u8; 256] {
        self.sprites.oam()
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn scanline(&self) -> i16 {
        self.timing.scanline()
    }

    pub fn dot(&self) -> u16 {
        self.timing.dot()
    }

    pub fn frame_count(&self) -> u64 {
        self.timing.frame_count()
    }

    pub fn tv_system(&self) -> TvSystem {
        self.timing.tv_system()
    }

    /// Vblank flag without the read side effects of $2002
    pub fn in_vblank(&self) -> bool {
        self.status & STATUS_VBLANK != 0
    }
}
