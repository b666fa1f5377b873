//! Whole-system checks against community test ROMs.
//!
//! The ROMs are not shipped with the crate. Drop them under `roms/` and run
//! `cargo test -- --ignored`.

use std::fs;

use crate::nes::{Nes, TvSystem};

/// Automation entry point of nestest, skipping the menu
const NESTEST_START: u16 = 0xC000;
/// Where nestest parks once every test has run
const NESTEST_END: u16 = 0xC66E;
const MAX_FRAMES: u32 = 600;

/// Blargg ROMs write 0x80 to $6000 while running and the final code when done
const BLARGG_STATUS: u16 = 0x6000;
const BLARGG_RUNNING: u8 = 0x80;

#[derive(Debug, PartialEq, Eq)]
enum RomOutcome {
    Pass,
    Fail(u8),
    Timeout,
}

fn load(path: &str) -> Nes {
    let rom = fs::read(path).unwrap_or_else(|e| panic!("reading {}: {}", path, e));
    let mut nes = Nes::new(TvSystem::Ntsc);
    nes.insert_cartridge(&rom)
        .unwrap_or_else(|e| panic!("loading {}: {}", path, e));
    nes
}

fn run_blargg(path: &str) -> RomOutcome {
    let mut nes = load(path);
    let mut started = false;
    for _ in 0..MAX_FRAMES {
        nes.process_frame();
        match nes.read_memory(BLARGG_STATUS) {
            BLARGG_RUNNING => started = true,
            0x00 if started => return RomOutcome::Pass,
            code if started && code < BLARGG_RUNNING => return RomOutcome::Fail(code),
            _ => {}
        }
    }
    RomOutcome::Timeout
}

#[test]
#[ignore = "needs roms/nestest.nes"]
fn test_nestest_automation() {
    let mut nes = load("roms/nestest.nes");
    nes.cpu_mut().pc = NESTEST_START;

    let budget = u64::from(MAX_FRAMES) * 29781;
    while !(nes.cpu().at_instruction_boundary() && nes.cpu().pc == NESTEST_END) {
        assert!(!nes.is_halted(), "CPU jammed at {:04X}", nes.cpu().pc);
        assert!(nes.cpu().total_cycles() < budget, "nestest never finished");
        nes.step_dot();
    }

    // Official opcode result, then unofficial opcode result
    assert_eq!(nes.read_memory(0x0002), 0x00);
    assert_eq!(nes.read_memory(0x0003), 0x00);
}

#[test]
#[ignore = "needs blargg's instr_test-v5"]
fn test_blargg_official_instructions() {
    assert_eq!(run_blargg("roms/instr_test-v5/official_only.nes"), RomOutcome::Pass);
}

#[test]
#[ignore = "needs blargg's oam_read"]
fn test_blargg_oam_read() {
    assert_eq!(run_blargg("roms/oam_read.nes"), RomOutcome::Pass);
}
