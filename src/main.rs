use std::fs;
use std::process::ExitCode;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use neser::config::Config;
use neser::error::NesResult;
use neser::nes::Nes;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_args();
    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> NesResult<()> {
    let mut nes = Nes::new(config.tv_system());
    nes.set_speed(config.speed);
    nes.apu_mut().set_sample_rate(config.sample_rate);

    if let Some(path) = &config.rom {
        let rom = fs::read(path)?;
        nes.insert_cartridge(&rom)?;
        info!(rom = %path.display(), "loaded");
    }

    if config.headless {
        run_headless(&mut nes, config.frames);
        Ok(())
    } else {
        run_windowed(&mut nes, config)
    }
}

/// Run a fixed number of frames as fast as possible and log where they ended
fn run_headless(nes: &mut Nes, frames: u64) {
    for _ in 0..frames {
        nes.process_frame();
        nes.apu_mut().samples_mut().clear();
        if nes.is_halted() {
            warn!(pc = %format!("{:04X}", nes.cpu().pc), "CPU jammed");
            break;
        }
    }
    info!(
        frames = nes.frame_count(),
        cycles = nes.cpu().total_cycles(),
        checksum = %format!("{:016X}", nes.frame().checksum()),
        "headless run complete"
    );
}

#[cfg(feature = "frontend")]
fn run_windowed(nes: &mut Nes, config: &Config) -> NesResult<()> {
    let mut event_loop = neser::eventloop::EventLoop::new(config)?;
    event_loop.run(nes)
}

#[cfg(not(feature = "frontend"))]
fn run_windowed(nes: &mut Nes, config: &Config) -> NesResult<()> {
    warn!("built without the frontend feature, running headless");
    run_headless(nes, config.frames);
    Ok(())
}
