/// PPUCTRL ($2000) bits
const CTRL_NMI_ENABLE: u8 = 0b1000_0000;
const CTRL_SPRITE_SIZE: u8 = 0b0010_0000;
const CTRL_BG_PATTERN_TABLE: u8 = 0b0001_0000;
const CTRL_SPRITE_PATTERN_TABLE: u8 = 0b0000_1000;
const CTRL_VRAM_INCREMENT: u8 = 0b0000_0100;
const CTRL_NAMETABLE: u8 = 0b0000_0011;

/// PPUMASK ($2001) bits
const MASK_GRAYSCALE: u8 = 0b0000_0001;
const MASK_BACKGROUND_LEFT: u8 = 0b0000_0010;
const MASK_SPRITES_LEFT: u8 = 0b0000_0100;
const MASK_BACKGROUND: u8 = 0b0000_1000;
const MASK_SPRITES: u8 = 0b0001_0000;

/// 15-bit VRAM address registers
const ADDRESS_MASK: u16 = 0x7FFF;

const COARSE_X: u16 = 0x001F;
const COARSE_Y: u16 = 0x03E0;
const NAMETABLE_X: u16 = 0x0400;
const NAMETABLE_Y: u16 = 0x0800;
const FINE_Y: u16 = 0x7000;

/// PPUCTRL, PPUMASK, OAMADDR, the PPUDATA read buffer, the I/O latch and the
/// internal scroll registers.
///
/// `v` and `t` are laid out as `yyy NN YYYYY XXXXX` (fine Y, nametable,
/// coarse Y, coarse X).
#[derive(Debug, Default)]
pub struct Registers {
    control: u8,
    mask: u8,
    pub oam_address: u8,
    data_buffer: u8,
    /// Last value driven on the CPU-PPU data bus
    io_bus: u8,
    /// Current VRAM address
    v: u16,
    /// Temporary VRAM address
    t: u16,
    /// Fine X scroll
    x: u8,
    /// Write toggle shared by $2005 and $2006
    w: bool,
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// $2000 write
    pub fn write_control(&mut self, value: u8) {
        self.control = value;
        // t: ...GH.. ........ <- d: ......GH
        let nametable = u16::from(value & CTRL_NAMETABLE);
        self.t = (self.t & !(NAMETABLE_X | NAMETABLE_Y)) | (nametable << 10);
    }

    /// $2001 write
    pub fn write_mask(&mut self, value: u8) {
        self.mask = value;
    }

    /// $2005 write, X then Y
    pub fn write_scroll(&mut self, value: u8) {
        let value = u16::from(value);
        if !self.w {
            // t: ....... ...ABCDE <- d: ABCDE...
            // x:              FGH <- d: .....FGH
            self.t = (self.t & !COARSE_X) | (value >> 3);
            self.x = (value & 0x07) as u8;
        } else {
            // t: FGH..AB CDE..... <- d: ABCDEFGH
            self.t = (self.t & !(FINE_Y | COARSE_Y))
                | ((value & 0x07) << 12)
                | ((value & 0xF8) << 2);
        }
        self.t &= ADDRESS_MASK;
        self.w = !self.w;
    }

    /// $2006 write, high byte then low byte. The second write commits to `v`.
    pub fn write_address(&mut self, value: u8) {
        let value = u16::from(value);
        if !self.w {
            // Bit 14 is cleared along with the upper two bits of the byte
            self.t = (self.t & 0x00FF) | ((value & 0x3F) << 8);
        } else {
            self.t = (self.t & 0xFF00) | value;
            self.v = self.t;
        }
        self.t &= ADDRESS_MASK;
        self.w = !self.w;
    }

    /// Advance `v` after a $2007 access. While rendering, the access collides
    /// with the fetch counters and bumps coarse X and fine Y instead.
    pub fn advance_after_data_access(&mut self, rendering: bool) {
        if rendering {
            self.increment_coarse_x();
            self.increment_fine_y();
        } else {
            self.v = self.v.wrapping_add(self.vram_increment()) & ADDRESS_MASK;
        }
    }

    pub fn increment_coarse_x(&mut self) {
        if self.v & COARSE_X == 31 {
            self.v &= !COARSE_X;
            self.v ^= NAMETABLE_X;
        } else {
            self.v += 1;
        }
    }

    pub fn increment_fine_y(&mut self) {
        if self.v & FINE_Y != FINE_Y {
            self.v += 0x1000;
            return;
        }

        self.v &= !FINE_Y;
        let mut coarse_y = (self.v & COARSE_Y) >> 5;
        match coarse_y {
            // Last row of the nametable, attribute rows follow
            29 => {
                coarse_y = 0;
                self.v ^= NAMETABLE_Y;
            }
            // Scrolled into the attribute table: wraps without switching
            31 => coarse_y = 0,
            _ => coarse_y += 1,
        }
        self.v = (self.v & !COARSE_Y) | (coarse_y << 5);
    }

    /// Dot 257: v: ....A.. ...BCDEF <- t: ....A.. ...BCDEF
    pub fn copy_horizontal_bits(&mut self) {
        let bits = COARSE_X | NAMETABLE_X;
        self.v = (self.v & !bits) | (self.t & bits);
    }

    /// Pre-render dots 280-304: v: GHIA.BC DEF..... <- t: GHIA.BC DEF.....
    pub fn copy_vertical_bits(&mut self) {
        let bits = FINE_Y | NAMETABLE_Y | COARSE_Y;
        self.v = (self.v & !bits) | (self.t & bits);
    }

    /// Reading $2002 resets the shared write toggle
    pub fn reset_latch(&mut self) {
        self.w = false;
    }

    pub fn io_bus(&self) -> u8 {
        self.io_bus
    }

    pub fn set_io_bus(&mut self, value: u8) {
        self.io_bus = value;
    }

    pub fn data_buffer(&self) -> u8 {
        self.data_buffer
    }

    pub fn set_data_buffer(&mut self, value: u8) {
        self.data_buffer = value;
    }

    pub fn v(&self) -> u16 {
        self.v
    }

    pub fn t(&self) -> u16 {
        self.t
    }

    pub fn fine_x(&self) -> u8 {
        self.x
    }

    pub fn w(&self) -> bool {
        self.w
    }

    pub fn control(&self) -> u8 {
        self.control
    }

    pub fn mask(&self) -> u8 {
        self.mask
    }

    pub fn nmi_enabled(&self) -> bool {
        self.control & CTRL_NMI_ENABLE != 0
    }

    pub fn vram_increment(&self) -> u16 {
        if self.control & CTRL_VRAM_INCREMENT != 0 { 32 } else { 1 }
    }

    pub fn sprite_height(&self) -> u8 {
        if self.control & CTRL_SPRITE_SIZE != 0 { 16 } else { 8 }
    }

    pub fn background_pattern_table(&self) -> u16 {
        if self.control & CTRL_BG_PATTERN_TABLE != 0 { 0x1000 } else { 0x0000 }
    }

    /// Ignored for 8x16 sprites, which pick the table from the tile index
    pub fn sprite_pattern_table(&self) -> u16 {
        if self.control & CTRL_SPRITE_PATTERN_TABLE != 0 { 0x1000 } else { 0x0000 }
    }

    pub fn show_background(&self) -> bool {
        self.mask & MASK_BACKGROUND != 0
    }

    pub fn show_sprites(&self) -> bool {
        self.mask & MASK_SPRITES != 0
    }

    pub fn show_background_left(&self) -> bool {
        self.mask & MASK_BACKGROUND_LEFT != 0
    }

    pub fn show_sprites_left(&self) -> bool {
        self.mask & MASK_SPRITES_LEFT != 0
    }

    pub fn grayscale(&self) -> bool {
        self.mask & MASK_GRAYSCALE != 0
    }

    pub fn rendering_enabled(&self) -> bool {
        self.show_background() || self.show_sprites()
    }

    #[cfg(test)]
    pub(crate) fn set_v(&mut self, v: u16) {
        self.v = v & ADDRESS_MASK;
    }
}
