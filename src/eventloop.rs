use std::sync::atomic::{AtomicBool, Ordering};

use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::{Color, PixelFormatEnum};
use sdl2::render::{Canvas, Texture};
use sdl2::video::Window;
use tracing::info;

use crate::audio::AudioOutput;
use crate::config::Config;
use crate::error::{NesError, NesResult};
use crate::joypad::Button;
use crate::nes::Nes;
use crate::ppu::{FrameBuffer, SCREEN_HEIGHT, SCREEN_WIDTH};

const CLEAR_COLOR: Color = Color::RGB(0, 0, 0);
const BYTES_PER_PIXEL: usize = 4;

/// SDL2 window, keyboard and audio around a running console.
///
/// Escape or closing the window stops the emulation loop. The keyboard drives
/// controller 1.
pub struct EventLoop {
    _sdl_context: sdl2::Sdl,
    canvas: Canvas<Window>,
    event_pump: sdl2::EventPump,
    audio: Option<AudioOutput>,
}

impl EventLoop {
    /// Open a window sized for the console's picture at `config.scale`.
    ///
    /// A missing audio device is not fatal: the loop runs silent.
    pub fn new(config: &Config) -> NesResult<Self> {
        let sdl_context = sdl2::init().map_err(NesError::Frontend)?;
        let event_pump = sdl_context.event_pump().map_err(NesError::Frontend)?;
        let canvas = Self::create_window_and_canvas(&sdl_context, config)?;

        let audio = match sdl_context.audio() {
            Ok(subsystem) => match AudioOutput::new(&subsystem, config.sample_rate) {
                Ok(output) => Some(output),
                Err(e) => {
                    tracing::warn!("audio disabled: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("audio disabled: {}", e);
                None
            }
        };

        Ok(EventLoop {
            _sdl_context: sdl_context,
            canvas,
            event_pump,
            audio,
        })
    }

    fn create_window_and_canvas(
        sdl_context: &sdl2::Sdl,
        config: &Config,
    ) -> NesResult<Canvas<Window>> {
        let tv_system = config.tv_system();
        let width = (tv_system.screen_width() as f32 * config.scale) as u32;
        let height = (tv_system.screen_height() as f32 * config.scale) as u32;
        let video_subsystem = sdl_context.video().map_err(NesError::Frontend)?;

        let window = video_subsystem
            .window("neser", width, height)
            .position_centered()
            .build()
            .map_err(|e| NesError::Frontend(e.to_string()))?;

        let mut canvas = window
            .into_canvas()
            .build()
            .map_err(|e| NesError::Frontend(e.to_string()))?;
        canvas.set_draw_color(CLEAR_COLOR);
        canvas.clear();
        canvas.present();
        Ok(canvas)
    }

    /// Run the console in real time until the user quits
    pub fn run(&mut self, nes: &mut Nes) -> NesResult<()> {
        let texture_creator = self.canvas.texture_creator();
        let mut texture = texture_creator
            .create_texture_streaming(
                PixelFormatEnum::ARGB8888,
                SCREEN_WIDTH as u32,
                SCREEN_HEIGHT as u32,
            )
            .map_err(|e| NesError::Frontend(e.to_string()))?;

        if let Some(audio) = &self.audio {
            nes.apu_mut().set_sample_rate(audio.sample_rate());
            audio.resume();
        }

        let cancel = AtomicBool::new(false);
        let mut failure = None;
        let canvas = &mut self.canvas;
        let event_pump = &mut self.event_pump;
        let audio = &mut self.audio;

        nes.run(&cancel, |nes| {
            for event in event_pump.poll_iter() {
                match event {
                    Event::Quit { .. }
                    | Event::KeyDown {
                        keycode: Some(Keycode::Escape),
                        ..
                    } => cancel.store(true, Ordering::Relaxed),
                    Event::KeyDown {
                        keycode: Some(key),
                        repeat: false,
                        ..
                    } => {
                        if let Some(button) = button_for_key(key) {
                            nes.joypad_mut(0).set_button(button, true);
                        }
                    }
                    Event::KeyUp {
                        keycode: Some(key), ..
                    } => {
                        if let Some(button) = button_for_key(key) {
                            nes.joypad_mut(0).set_button(button, false);
                        }
                    }
                    _ => {}
                }
            }

            let rendered = Self::render_frame(canvas, &mut texture, &nes.frame());
            let result = rendered.and_then(|()| match audio.as_mut() {
                Some(audio) => audio.pump(&mut nes.apu_mut()),
                None => Ok(()),
            });
            if let Err(e) = result {
                failure = Some(e);
                cancel.store(true, Ordering::Relaxed);
            }
        });

        if let Some(audio) = &self.audio {
            audio.pause();
        }
        info!(frames = nes.frame_count(), "window closed");
        failure.map_or(Ok(()), Err)
    }

    fn render_frame(
        canvas: &mut Canvas<Window>,
        texture: &mut Texture,
        frame: &FrameBuffer,
    ) -> NesResult<()> {
        texture
            .with_lock(None, |buffer: &mut [u8], pitch: usize| {
                let row_bytes = SCREEN_WIDTH * BYTES_PER_PIXEL;
                if pitch == row_bytes {
                    frame.copy_bytes(buffer);
                } else {
                    for (y, row) in frame.pixels().chunks_exact(SCREEN_WIDTH).enumerate() {
                        let line = &mut buffer[y * pitch..y * pitch + row_bytes];
                        for (bytes, pixel) in line.chunks_exact_mut(BYTES_PER_PIXEL).zip(row) {
                            bytes.copy_from_slice(&pixel.to_le_bytes());
                        }
                    }
                }
            })
            .map_err(NesError::Frontend)?;

        canvas.set_draw_color(CLEAR_COLOR);
        canvas.clear();
        canvas
            .copy(texture, None, None)
            .map_err(NesError::Frontend)?;
        canvas.present();
        Ok(())
    }
}

/// Keyboard layout for controller 1
fn button_for_key(key: Keycode) -> Option<Button> {
    match key {
        Keycode::X => Some(Button::A),
        Keycode::Z => Some(Button::B),
        Keycode::RShift | Keycode::Backspace => Some(Button::Select),
        Keycode::Return => Some(Button::Start),
        Keycode::Up => Some(Button::Up),
        Keycode::Down => Some(Button::Down),
        Keycode::Left => Some(Button::Left),
        Keycode::Right => Some(Button::Right),
        _ => None,
    }
}
