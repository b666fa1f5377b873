use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::apu::Apu;
use crate::cartridge::{EmptyMapper, Mapper, RomImage, SharedMapper, create_mapper, empty_slot};
use crate::clock::{ClockDescriptor, FractionalClock, FramePacer};
use crate::config::{Config, clamp_with_warning};
use crate::cpu::{Cpu, InterruptLines};
use crate::error::RomError;
use crate::joypad::Joypad;
use crate::memory::Memory;
use crate::ppu::{FrameBuffer, Ppu, SCREEN_HEIGHT, SCREEN_WIDTH};

/// Video standard of the emulated console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TvSystem {
    #[default]
    Ntsc,
    Pal,
}

impl TvSystem {
    /// Pre-render line included
    pub fn scanlines_per_frame(self) -> u16 {
        match self {
            TvSystem::Ntsc => 262,
            TvSystem::Pal => 312,
        }
    }

    /// CPU clock in Hz
    pub fn cpu_frequency(self) -> u32 {
        match self {
            TvSystem::Ntsc => 1_789_773,
            TvSystem::Pal => 1_662_607,
        }
    }

    pub fn screen_width(self) -> usize {
        SCREEN_WIDTH
    }

    pub fn screen_height(self) -> usize {
        SCREEN_HEIGHT
    }

    /// Only the 2C02 drops a dot on odd frames
    pub fn skips_odd_frame_dot(self) -> bool {
        self == TvSystem::Ntsc
    }

    pub fn clock_descriptor(self) -> ClockDescriptor {
        match self {
            TvSystem::Ntsc => ClockDescriptor::NTSC,
            TvSystem::Pal => ClockDescriptor::PAL,
        }
    }
}

/// The console: CPU, PPU, APU, memory map and the cartridge slot, clocked in
/// lockstep one PPU dot at a time.
pub struct Nes {
    tv_system: TvSystem,
    memory: Rc<RefCell<Memory>>,
    cpu: Cpu,
    ppu: Rc<RefCell<Ppu>>,
    apu: Rc<RefCell<Apu>>,
    mapper: SharedMapper,
    clock: FractionalClock,
    speed: f64,
}

impl Nes {
    /// A powered-on console with an empty cartridge slot
    pub fn new(tv_system: TvSystem) -> Self {
        let interrupts = InterruptLines::new();
        let mapper = empty_slot();
        let ppu = Rc::new(RefCell::new(Ppu::new(
            tv_system,
            Rc::clone(&mapper),
            interrupts.clone(),
        )));
        let apu = Rc::new(RefCell::new(Apu::new(tv_system, interrupts.clone())));
        let memory = Rc::new(RefCell::new(Memory::new(
            Rc::clone(&ppu),
            Rc::clone(&apu),
            Rc::clone(&mapper),
        )));
        let cpu = Cpu::new(Rc::clone(&memory), interrupts);

        let mut nes = Self {
            tv_system,
            memory,
            cpu,
            ppu,
            apu,
            mapper,
            clock: FractionalClock::new(tv_system.clock_descriptor().cpu_clocks_per_ppu_dot),
            speed: 1.0,
        };
        nes.reset(true);
        nes
    }

    /// Parse an iNES image, swap its mapper into the slot and power cycle.
    ///
    /// On error the console is left exactly as it was.
    pub fn insert_cartridge(&mut self, bytes: &[u8]) -> Result<(), RomError> {
        let image = RomImage::parse(bytes)?;
        let mapper = create_mapper(image)?;
        self.swap_mapper(mapper);
        Ok(())
    }

    /// Return to the empty slot and power cycle
    pub fn eject_cartridge(&mut self) {
        self.swap_mapper(Box::new(EmptyMapper));
    }

    fn swap_mapper(&mut self, mapper: Box<dyn Mapper>) {
        let info = mapper.info();
        *self.mapper.borrow_mut() = mapper;
        info!(mapper = info.name, "cartridge inserted");
        self.reset(true);
    }

    /// Reset every chip. A power cycle also clears work RAM and CPU registers.
    pub fn reset(&mut self, power_cycle: bool) {
        self.memory.borrow_mut().reset(power_cycle);
        self.ppu.borrow_mut().reset();
        self.apu.borrow_mut().reset();
        self.clock.reset();
        self.cpu.reset(power_cycle);
        info!(power_cycle, tv_system = ?self.tv_system, "console reset");
    }

    /// Advance one PPU dot and the CPU/APU cycles due with it. Returns true
    /// when the dot completed a frame.
    pub fn step_dot(&mut self) -> bool {
        let frame_done = self.ppu.borrow_mut().process_next_dot();
        for _ in 0..self.clock.tick() {
            self.cpu.execute_clock_cycle();
            self.apu.borrow_mut().clock();
        }
        frame_done
    }

    /// Run until the PPU finishes the current frame
    pub fn process_frame(&mut self) {
        while !self.step_dot() {}
    }

    /// Run frames in real time until `cancel` is set.
    ///
    /// `on_frame` sees the console after every completed frame; the flag is
    /// checked once per frame.
    pub fn run(&mut self, cancel: &AtomicBool, mut on_frame: impl FnMut(&mut Nes)) {
        let mut pacer = FramePacer::new(&self.tv_system.clock_descriptor(), self.speed);
        info!(period = ?pacer.period(), "running");
        while !cancel.load(Ordering::Relaxed) {
            self.process_frame();
            on_frame(self);
            pacer.wait();
        }
        info!(frames = self.frame_count(), "stopped");
    }

    /// Emulation speed relative to real time, used by [`Nes::run`].
    ///
    /// Values outside the supported range are clamped; NaN falls back to real
    /// time.
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = if speed.is_nan() {
            warn!("speed is NaN, running at real time");
            1.0
        } else {
            clamp_with_warning("speed", speed, Config::MIN_SPEED, Config::MAX_SPEED)
        };
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn tv_system(&self) -> TvSystem {
        self.tv_system
    }

    /// A JAM opcode stopped the CPU; only a reset recovers
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    /// Last completed frame
    pub fn frame(&self) -> Ref<'_, FrameBuffer> {
        Ref::map(self.ppu.borrow(), |ppu| ppu.frame())
    }

    pub fn frame_count(&self) -> u64 {
        self.ppu.borrow().frame_count()
    }

    /// Controller 0 or 1
    pub fn joypad_mut(&mut self, index: usize) -> RefMut<'_, Joypad> {
        RefMut::map(self.memory.borrow_mut(), |memory| memory.joypad_mut(index))
    }

    pub fn apu_mut(&mut self) -> RefMut<'_, Apu> {
        self.apu.borrow_mut()
    }

    pub fn mapper_name(&self) -> &'static str {
        self.mapper.borrow().info().name
    }

    /// CPU bus read, with the same side effects a CPU read would have
    pub fn read_memory(&mut self, addr: u16) -> u8 {
        self.memory.borrow_mut().read(addr)
    }
}
