/// 2C02 master palette as 0xAARRGGBB
#[rustfmt::skip]
pub const SYSTEM_PALETTE: [u32; 64] = [
    0xFF545454, 0xFF001E74, 0xFF081090, 0xFF300088, 0xFF440064, 0xFF5C0030, 0xFF540400, 0xFF3C1800,
    0xFF202A00, 0xFF083A00, 0xFF004000, 0xFF003C00, 0xFF00302C, 0xFF000000, 0xFF000000, 0xFF000000,
    0xFF989698, 0xFF084CC4, 0xFF3032EC, 0xFF5C1EE4, 0xFF8814B0, 0xFFA01464, 0xFF982220, 0xFF783C00,
    0xFF545A00, 0xFF287200, 0xFF087C00, 0xFF007628, 0xFF006678, 0xFF000000, 0xFF000000, 0xFF000000,
    0xFFECEEEC, 0xFF3C7EEC, 0xFF5C5CEC, 0xFF8844EC, 0xFFB02CEC, 0xFFE028B0, 0xFFD83C50, 0xFFC45400,
    0xFFAC7000, 0xFF808800, 0xFF409C30, 0xFF20A458, 0xFF209A88, 0xFF404040, 0xFF000000, 0xFF000000,
    0xFFECEEEC, 0xFFA8BCEC, 0xFFBCACEC, 0xFFD4A0EC, 0xFFEC94EC, 0xFFEC90D4, 0xFFEC9CB4, 0xFFE4B090,
    0xFFDCC878, 0xFFD4DC78, 0xFFB8EC98, 0xFFA8ECBC, 0xFFA0E4E4, 0xFFA0A0A0, 0xFF000000, 0xFF000000,
];

/// Palette RAM at $3F00-$3F1F, mirrored through $3FFF.
///
/// Entries hold 6-bit color indices. The sprite backdrop slots $3F10, $3F14,
/// $3F18 and $3F1C alias their background counterparts.
#[derive(Debug)]
pub struct PaletteRam {
    entries: [u8; 32],
}

impl PaletteRam {
    pub fn new() -> Self {
        Self { entries: [0; 32] }
    }

    fn index(addr: u16) -> usize {
        let index = (addr & 0x1F) as usize;
        if index & 0x13 == 0x10 { index & 0x0F } else { index }
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.entries[Self::index(addr)]
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        self.entries[Self::index(addr)] = value & 0x3F;
    }

    /// Resolve a 5-bit palette slot to ARGB, optionally forcing the gray column
    pub fn color(&self, slot: u8, grayscale: bool) -> u32 {
        let mut index = self.entries[Self::index(u16::from(slot))];
        if grayscale {
            index &= 0x30;
        }
        SYSTEM_PALETTE[index as usize]
    }
}

impl Default for PaletteRam {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sprite_backdrop_slots_alias_background() {
        let mut palette = PaletteRam::new();
        for (mirror, base) in [
            (0x3F10, 0x3F00),
            (0x3F14, 0x3F04),
            (0x3F18, 0x3F08),
            (0x3F1C, 0x3F0C),
        ] {
            palette.write(mirror, 0x2A);
            assert_eq!(palette.read(base), 0x2A);
            palette.write(base, 0x15);
            assert_eq!(palette.read(mirror), 0x15);
        }
    }

    #[test]
    fn test_other_sprite_slots_are_distinct() {
        let mut palette = PaletteRam::new();
        palette.write(0x3F11, 0x01);
        palette.write(0x3F01, 0x02);
        assert_eq!(palette.read(0x3F11), 0x01);
        assert_eq!(palette.read(0x3F01), 0x02);
    }

    #[test]
    fn test_values_stored_as_six_bits() {
        let mut palette = PaletteRam::new();
        palette.write(0x3F03, 0xFF);
        assert_eq!(palette.read(0x3F03), 0x3F);
    }

    #[test]
    fn test_mirrored_through_3fff() {
        let mut palette = PaletteRam::new();
        palette.write(0x3F05, 0x11);
        assert_eq!(palette.read(0x3FE5), 0x11);
    }

    #[test]
    fn test_color_lookup_and_grayscale() {
        let mut palette = PaletteRam::new();
        palette.write(0x3F00, 0x21);
        assert_eq!(palette.color(0, false), SYSTEM_PALETTE[0x21]);
        assert_eq!(palette.color(0, true), SYSTEM_PALETTE[0x20]);
        assert_eq!(palette.color(0x10, false), SYSTEM_PALETTE[0x21]);
    }
}
