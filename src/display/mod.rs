use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::PointsIter;
use embedded_graphics_simulator::SimulatorDisplay;
use std::ops::{Deref, DerefMut};
use tracing::{info, warn};

use crate::config::{Backend, DisplayConfig};
use crate::error::Result;

pub mod emulator;
#[cfg(feature = "hardware")]
pub mod hardware;
pub mod layout;

pub const WIDTH: u32 = 64;
pub const HEIGHT: u32 = 32;

/// Off-screen canvas the layout is drawn into before it goes to a panel.
pub type Framebuffer = SimulatorDisplay<Rgb888>;

/// A blank canvas the size of the panel.
pub fn framebuffer() -> Framebuffer {
    SimulatorDisplay::new(Size::new(WIDTH, HEIGHT))
}

/// Every pixel of `frame` that isn't black, row by row.
pub fn lit(frame: &Framebuffer) -> impl Iterator<Item = (Point, Rgb888)> + '_ {
    frame
        .bounding_box()
        .points()
        .map(|point| (point, frame.get_pixel(point)))
        .filter(|&(_, color)| color != Rgb888::BLACK)
}

/// A physical or simulated 64x32 pixel panel.
pub trait Panel {
    fn clear(&mut self) -> Result<()>;
    fn show(&mut self, frame: &Framebuffer) -> Result<()>;
}

impl<P: Panel + ?Sized> Panel for Box<P> {
    fn clear(&mut self) -> Result<()> {
        (**self).clear()
    }

    fn show(&mut self, frame: &Framebuffer) -> Result<()> {
        (**self).show(frame)
    }
}

/// Owns a panel and blanks it when dropped.
pub struct PanelGuard<P: Panel> {
    panel: P,
}

impl<P: Panel> PanelGuard<P> {
    pub fn new(panel: P) -> Self {
        Self { panel }
    }
}

impl<P: Panel> Deref for PanelGuard<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.panel
    }
}

impl<P: Panel> DerefMut for PanelGuard<P> {
    fn deref_mut(&mut self) -> &mut P {
        &mut self.panel
    }
}

impl<P: Panel> Drop for PanelGuard<P> {
    fn drop(&mut self) {
        match self.panel.clear() {
            Ok(()) => info!("display cleared"),
            Err(e) => warn!("could not clear display: {}", e),
        }
    }
}

/// Development machines get the emulator, everything else the LED matrix.
fn detect() -> Backend {
    if cfg!(feature = "hardware") && std::env::consts::ARCH != "x86_64" {
        Backend::Hardware
    } else {
        Backend::Emulator
    }
}

pub fn open(config: &DisplayConfig) -> Result<Box<dyn Panel>> {
    let backend = match config.backend {
        Backend::Auto => detect(),
        backend => backend,
    };
    info!(?backend, "opening display");

    match backend {
        Backend::Hardware => open_hardware(config),
        _ => emulator::open(),
    }
}

#[cfg(feature = "hardware")]
fn open_hardware(config: &DisplayConfig) -> Result<Box<dyn Panel>> {
    Ok(Box::new(hardware::HardwarePanel::new(config)?))
}

#[cfg(not(feature = "hardware"))]
fn open_hardware(_config: &DisplayConfig) -> Result<Box<dyn Panel>> {
    Err(crate::error::Error::Display(
        "built without the `hardware` feature".to_owned(),
    ))
}
