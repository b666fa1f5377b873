/// Sprites drawn per scanline before the overflow flag trips
pub const MAX_SPRITES_PER_LINE: usize = 8;

/// OAM attribute bits 2-4 do not exist and read back as zero
const ATTRIBUTE_MASK: u8 = 0xE3;
const ATTR_PALETTE: u8 = 0x03;
const ATTR_BEHIND_BACKGROUND: u8 = 0x20;
const ATTR_FLIP_HORIZONTAL: u8 = 0x40;
const ATTR_FLIP_VERTICAL: u8 = 0x80;

/// A sprite selected for the upcoming scanline, with its pattern row
/// already fetched and flipped
#[derive(Debug, Clone, Copy, Default)]
struct LineSprite {
    x: u8,
    attributes: u8,
    pattern_lo: u8,
    pattern_hi: u8,
    sprite_zero: bool,
}

/// An opaque sprite pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpritePixel {
    /// 2-bit pattern value, never 0
    pub color: u8,
    /// Sprite palette 0-3
    pub palette: u8,
    pub behind_background: bool,
    pub sprite_zero: bool,
}

/// Object attribute memory and the per-line sprite buffer
#[derive(Debug)]
pub struct Sprites {
    oam: [u8; 256],
    line: [LineSprite; MAX_SPRITES_PER_LINE],
    count: usize,
}

impl Sprites {
    pub fn new() -> Self {
        Self {
            oam: [0xFF; 256],
            line: [LineSprite::default(); MAX_SPRITES_PER_LINE],
            count: 0,
        }
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn oam(&self) -> &[u8; 256] {
        &self.oam
    }

    pub fn read_oam(&self, addr: u8) -> u8 {
        let value = self.oam[addr as usize];
        if addr & 0x03 == 2 { value & ATTRIBUTE_MASK } else { value }
    }

    pub fn write_oam(&mut self, addr: u8, value: u8) {
        self.oam[addr as usize] = value;
    }

    /// Select the sprites visible on the line after `scanline` and fetch
    /// their pattern rows. Returns true when more than eight were in range.
    ///
    /// OAM Y is one less than the first line a sprite covers, so a sprite is
    /// in range when `scanline - y` falls within its height.
    pub fn evaluate(
        &mut self,
        scanline: i16,
        height: u8,
        pattern_table: u16,
        mut fetch: impl FnMut(u16) -> u8,
    ) -> bool {
        self.count = 0;
        let mut overflow = false;

        for index in 0..64 {
            let entry = &self.oam[index * 4..index * 4 + 4];
            let row = scanline - i16::from(entry[0]);
            if row < 0 || row >= i16::from(height) {
                continue;
            }
            if self.count == MAX_SPRITES_PER_LINE {
                overflow = true;
                break;
            }

            let tile = entry[1];
            let attributes = entry[2] & ATTRIBUTE_MASK;
            let x = entry[3];
            let mut row = row as u16;
            if attributes & ATTR_FLIP_VERTICAL != 0 {
                row = u16::from(height) - 1 - row;
            }

            let address = if height == 16 {
                // 8x16 tiles pick their table from bit 0 and stack two tiles
                let table = u16::from(tile & 0x01) * 0x1000;
                let mut tile = u16::from(tile & 0xFE);
                if row >= 8 {
                    tile += 1;
                    row -= 8;
                }
                table + tile * 16 + row
            } else {
                pattern_table + u16::from(tile) * 16 + row
            };

            let mut pattern_lo = fetch(address);
            let mut pattern_hi = fetch(address + 8);
            if attributes & ATTR_FLIP_HORIZONTAL != 0 {
                pattern_lo = pattern_lo.reverse_bits();
                pattern_hi = pattern_hi.reverse_bits();
            }

            self.line[self.count] = LineSprite {
                x,
                attributes,
                pattern_lo,
                pattern_hi,
                sprite_zero: index == 0,
            };
            self.count += 1;
        }

        overflow
    }

    /// Sprites selected for the current line
    pub fn line_count(&self) -> usize {
        self.count
    }

    /// First opaque sprite pixel at screen column `x`, in OAM order
    pub fn pixel(&self, x: u8) -> Option<SpritePixel> {
        self.line[..self.count].iter().find_map(|sprite| {
            let offset = x.checked_sub(sprite.x)?;
            if offset >= 8 {
                return None;
            }
            let bit = 7 - offset;
            let color = (((sprite.pattern_hi >> bit) & 1) << 1) | ((sprite.pattern_lo >> bit) & 1);
            (color != 0).then_some(SpritePixel {
                color,
                palette: sprite.attributes & ATTR_PALETTE,
                behind_background: sprite.attributes & ATTR_BEHIND_BACKGROUND != 0,
                sprite_zero: sprite.sprite_zero,
            })
        })
    }
}

impl Default for Sprites {
    fn default() -> Self {
        Self::new()
    }
}
