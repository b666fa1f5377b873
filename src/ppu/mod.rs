mod frame;
mod palette;
mod ppu;
mod registers;
mod sprites;
mod timing;

pub use frame::{FrameBuffer, SCREEN_HEIGHT, SCREEN_WIDTH};
pub use palette::{PaletteRam, SYSTEM_PALETTE};
pub use ppu::Ppu;
pub use registers::Registers;
pub use sprites::{MAX_SPRITES_PER_LINE, SpritePixel, Sprites};
pub use timing::{DOTS_PER_SCANLINE, Timing};
