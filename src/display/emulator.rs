//! Simulated panels for development machines. With the `window` feature the
//! frame goes to an SDL window, otherwise it is painted into the terminal.

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::prelude::*;
use std::fmt::Write as _;
use std::io::{self, Write};
use tracing::debug;

use super::{lit, Framebuffer, Panel};
use crate::error::Result;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
const HOME: &str = "\x1b[H";
const RESET: &str = "\x1b[0m";

#[cfg(feature = "window")]
pub fn open() -> Result<Box<dyn Panel>> {
    Ok(Box::new(window::WindowPanel::new()))
}

#[cfg(not(feature = "window"))]
pub fn open() -> Result<Box<dyn Panel>> {
    Ok(Box::new(TerminalPanel::stdout()))
}

/// Paints the panel into a terminal with 24-bit ANSI colors, two characters
/// per pixel so it keeps roughly square proportions.
pub struct TerminalPanel<W: Write> {
    out: W,
}

impl TerminalPanel<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalPanel<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

fn render(frame: &Framebuffer) -> String {
    let mut screen = String::from(HOME);
    let size = frame.size();

    for y in 0..size.height as i32 {
        for x in 0..size.width as i32 {
            let color = frame.get_pixel(Point::new(x, y));
            if color == Rgb888::BLACK {
                screen.push_str(RESET);
                screen.push_str("  ");
            } else {
                let _ = write!(
                    screen,
                    "\x1b[38;2;{};{};{}m██",
                    color.r(),
                    color.g(),
                    color.b()
                );
            }
        }
        screen.push_str(RESET);
        screen.push('\n');
    }

    screen
}

impl<W: Write> Panel for TerminalPanel<W> {
    fn clear(&mut self) -> Result<()> {
        self.out.write_all(CLEAR_SCREEN.as_bytes())?;
        self.out.flush()?;

        Ok(())
    }

    fn show(&mut self, frame: &Framebuffer) -> Result<()> {
        debug!(lit = lit(frame).count(), "terminal frame");
        self.out.write_all(render(frame).as_bytes())?;
        self.out.flush()?;

        Ok(())
    }
}

#[cfg(feature = "window")]
mod window {
    use embedded_graphics_simulator::{OutputSettings, OutputSettingsBuilder, SimulatorEvent, Window};
    use tracing::{debug, info};

    use super::super::{framebuffer, lit, Framebuffer, Panel};
    use crate::error::Result;

    const SCALE: u32 = 10;

    /// The panel in an SDL window, each LED drawn as a round dot.
    pub struct WindowPanel {
        window: Window,
    }

    impl WindowPanel {
        pub fn new() -> Self {
            Self {
                window: Window::new("departure-board", &settings()),
            }
        }

        fn present(&mut self, frame: &Framebuffer) {
            self.window.update(frame);
            for event in self.window.events() {
                if let SimulatorEvent::Quit = event {
                    info!("emulator window closed, stop with ctrl-c");
                }
            }
        }
    }

    fn settings() -> OutputSettings {
        OutputSettingsBuilder::new().scale(SCALE).pixel_spacing(1).build()
    }

    impl Panel for WindowPanel {
        fn clear(&mut self) -> Result<()> {
            self.present(&framebuffer());

            Ok(())
        }

        fn show(&mut self, frame: &Framebuffer) -> Result<()> {
            debug!(lit = lit(frame).count(), "window frame");
            self.present(frame);

            Ok(())
        }
    }
}
