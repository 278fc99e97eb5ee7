use embedded_graphics::pixelcolor::RgbColor;
use rpi_led_matrix::{LedCanvas, LedColor, LedMatrix, LedMatrixOptions};
use tracing::info;

use super::{lit, Framebuffer, Panel, HEIGHT, WIDTH};
use crate::config::DisplayConfig;
use crate::error::{Error, Result};

/// A single 64x32 HUB75 panel driven by rpi-rgb-led-matrix.
pub struct HardwarePanel {
    matrix: LedMatrix,
    canvas: Option<LedCanvas>,
}

impl HardwarePanel {
    pub fn new(config: &DisplayConfig) -> Result<Self> {
        let mut options = LedMatrixOptions::new();
        options.set_rows(HEIGHT);
        options.set_cols(WIDTH);
        options.set_chain_length(1);
        options.set_parallel(1);
        options.set_hardware_mapping(&config.hardware_mapping);
        options
            .set_brightness(config.brightness)
            .map_err(|e| Error::Display(e.to_owned()))?;

        let matrix = LedMatrix::new(Some(options), None).map_err(|e| Error::Display(e.to_owned()))?;
        info!(
            mapping = %config.hardware_mapping,
            brightness = config.brightness,
            "LED matrix initialized"
        );

        Ok(Self {
            matrix,
            canvas: None,
        })
    }

    /// Swaps a freshly painted off-screen canvas in.
    fn present(&mut self, paint: impl FnOnce(&mut LedCanvas)) {
        let mut canvas = self
            .canvas
            .take()
            .unwrap_or_else(|| self.matrix.offscreen_canvas());
        canvas.clear();
        paint(&mut canvas);
        self.canvas = Some(self.matrix.swap(canvas));
    }
}

impl Panel for HardwarePanel {
    fn clear(&mut self) -> Result<()> {
        self.present(|_| {});

        Ok(())
    }

    fn show(&mut self, frame: &Framebuffer) -> Result<()> {
        self.present(|canvas| {
            for (point, color) in lit(frame) {
                let color = LedColor {
                    red: color.r(),
                    green: color.g(),
                    blue: color.b(),
                };
                canvas.set(point.x, point.y, &color);
            }
        });

        Ok(())
    }
}
