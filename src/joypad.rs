/// NES Controller Button
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Button {
    A = 0,
    B = 1,
    Select = 2,
    Start = 3,
    Up = 4,
    Down = 5,
    Left = 6,
    Right = 7,
}

/// NES Standard Controller (Joypad)
///
/// A parallel-in/serial-out shift register. While the strobe latch is high the
/// register is continuously reloaded from the held buttons, so every read
/// returns the state of A. Once the strobe drops, each read pops one bit.
#[derive(Debug, Default, Clone)]
pub struct Joypad {
    strobe: bool,
    held: u8, // Bitfield: [Right, Left, Down, Up, Start, Select, B, A]
    shift_register: u8,
    reads: u8,
}

impl Joypad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write to strobe register ($4016), only bit 0 matters
    pub fn write_strobe(&mut self, value: u8) {
        self.strobe = value & 0x01 != 0;
        if self.strobe {
            self.reload();
        }
    }

    /// Read from controller register ($4016/$4017)
    /// Returns the next button state in bit 0
    pub fn read(&mut self) -> u8 {
        if self.strobe {
            self.reload();
            return self.held & 0x01;
        }

        // Official controllers shift in 1s once all eight buttons are out
        if self.reads >= 8 {
            return 1;
        }

        let bit = self.shift_register & 0x01;
        self.shift_register >>= 1;
        self.reads += 1;
        bit
    }

    /// Replace the full held-buttons mask
    pub fn set_buttons(&mut self, mask: u8) {
        self.held = mask;
        if self.strobe {
            self.reload();
        }
    }

    /// Set the state of a button
    pub fn set_button(&mut self, button: Button, pressed: bool) {
        let bit = 1 << (button as u8);
        let mask = if pressed {
            self.held | bit
        } else {
            self.held & !bit
        };
        self.set_buttons(mask);
    }

    pub fn buttons(&self) -> u8 {
        self.held
    }

    pub fn strobe(&self) -> bool {
        self.strobe
    }

    fn reload(&mut self) {
        self.shift_register = self.held;
        self.reads = 0;
    }
}
