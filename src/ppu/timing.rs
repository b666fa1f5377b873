use crate::nes::TvSystem;

/// Dots per scanline on both NTSC and PAL
pub const DOTS_PER_SCANLINE: u16 = 341;
pub const PRE_RENDER_SCANLINE: i16 = -1;
pub const VISIBLE_SCANLINES: i16 = 240;
pub const VBLANK_SCANLINE: i16 = 241;

/// Beam position within a frame.
///
/// Scanline -1 is the pre-render line, 0-239 are visible, 240 is idle and
/// 241 onwards is vertical blank. A frame runs from the pre-render line to the
/// last vblank line.
#[derive(Debug)]
pub struct Timing {
    tv_system: TvSystem,
    scanline: i16,
    dot: u16,
    odd_frame: bool,
    frame_count: u64,
}

impl Timing {
    pub fn new(tv_system: TvSystem) -> Self {
        Self {
            tv_system,
            scanline: PRE_RENDER_SCANLINE,
            dot: 0,
            odd_frame: false,
            frame_count: 0,
        }
    }

    pub fn reset(&mut self) {
        self.scanline = PRE_RENDER_SCANLINE;
        self.dot = 0;
        self.odd_frame = false;
        self.frame_count = 0;
    }

    /// Move to the next dot. Returns true when this move finished the frame.
    ///
    /// On NTSC odd frames with rendering enabled the last dot of the
    /// pre-render line is skipped.
    pub fn advance(&mut self, rendering_enabled: bool) -> bool {
        if self.scanline == PRE_RENDER_SCANLINE
            && self.dot == DOTS_PER_SCANLINE - 2
            && self.odd_frame
            && rendering_enabled
            && self.tv_system.skips_odd_frame_dot()
        {
            self.scanline = 0;
            self.dot = 0;
            return false;
        }

        self.dot += 1;
        if self.dot < DOTS_PER_SCANLINE {
            return false;
        }

        self.dot = 0;
        self.scanline += 1;
        if self.scanline > self.last_scanline() {
            self.scanline = PRE_RENDER_SCANLINE;
            self.odd_frame = !self.odd_frame;
            self.frame_count += 1;
            return true;
        }
        false
    }

    fn last_scanline(&self) -> i16 {
        self.tv_system.scanlines_per_frame() as i16 - 2
    }

    pub fn scanline(&self) -> i16 {
        self.scanline
    }

    pub fn dot(&self) -> u16 {
        self.dot
    }

    pub fn odd_frame(&self) -> bool {
        self.odd_frame
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn tv_system(&self) -> TvSystem {
        self.tv_system
    }

    /// Visible or pre-render line, where the fetch pipeline runs
    pub fn on_render_line(&self) -> bool {
        self.scanline < VISIBLE_SCANLINES
    }

    pub fn on_visible_line(&self) -> bool {
        (0..VISIBLE_SCANLINES).contains(&self.scanline)
    }
}
