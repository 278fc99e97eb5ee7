//! The scoreboard: one row per route on the left, clock, temperature and a
//! sun on the right.

use embedded_graphics::mono_font::{iso_8859_1::FONT_5X8, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle};
use embedded_graphics::text::Text;
use itertools::Itertools;

use crate::departures::RouteMinutes;

pub const MAX_ROWS: usize = 4;
pub const SHOWN_DEPARTURES: usize = 2;

const ROW_X: i32 = 2;
const ROW_BASELINE: i32 = 7;
const ROW_HEIGHT: i32 = 8;
const INFO_X: i32 = 40;
const SUN_CORE: Point = Point::new(45, 20);
const SUN_CORE_SIZE: u32 = 6;
const SUN_RAY: i32 = 6;

const ORANGE: Rgb888 = Rgb888::new(255, 165, 0);
const WHITE: Rgb888 = Rgb888::new(255, 255, 255);
const YELLOW: Rgb888 = Rgb888::new(255, 255, 0);

/// Everything painted on the panel. Two equal frames look identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub rows: Vec<RouteMinutes>,
    pub clock: String,
    pub temperature: Option<String>,
}

impl Frame {
    /// Keeps what fits: the first [`MAX_ROWS`] routes with their next
    /// [`SHOWN_DEPARTURES`] departures.
    pub fn new(sorted: Vec<RouteMinutes>, clock: String, temperature: Option<String>) -> Self {
        let rows = sorted
            .into_iter()
            .take(MAX_ROWS)
            .map(|(key, mut minutes)| {
                minutes.truncate(SHOWN_DEPARTURES);
                (key, minutes)
            })
            .collect();

        Self {
            rows,
            clock,
            temperature,
        }
    }

    pub fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        let orange = MonoTextStyle::new(&FONT_5X8, ORANGE);
        let white = MonoTextStyle::new(&FONT_5X8, WHITE);

        for (i, (key, minutes)) in self.rows.iter().enumerate() {
            let y = ROW_BASELINE + i as i32 * ROW_HEIGHT;
            Text::new(&row_text(key, minutes), Point::new(ROW_X, y), orange).draw(target)?;
        }

        Text::new(&self.clock, Point::new(INFO_X, ROW_BASELINE), white).draw(target)?;
        if let Some(temperature) = &self.temperature {
            Text::new(temperature, Point::new(INFO_X, ROW_BASELINE + ROW_HEIGHT), white)
                .draw(target)?;
        }

        draw_sun(target, SUN_CORE, SUN_CORE_SIZE, SUN_RAY, YELLOW)
    }
}

fn row_text(key: &str, minutes: &[u32]) -> String {
    if minutes.is_empty() {
        format!("{:>2}:--", key)
    } else {
        format!("{:>2}:{}", key, minutes.iter().join(" "))
    }
}

/// Square core with its top left corner at `core`, rays around it. Diagonal
/// and vertical rays are half as long as the horizontal ones.
fn draw_sun<D>(target: &mut D, core: Point, size: u32, ray: i32, color: Rgb888) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let (x, y) = (core.x, core.y);
    let s = size as i32;
    let mid = (s - 1) / 2;
    let half = ray / 2;

    Rectangle::new(core, Size::new(size, size))
        .into_styled(PrimitiveStyle::with_fill(color))
        .draw(target)?;

    let rays = [
        // horizontal
        ((x - ray, y + mid), (x - 1, y + mid)),
        ((x + s, y + mid), (x + s + ray - 1, y + mid)),
        // vertical
        ((x + mid, y - half), (x + mid, y - 1)),
        ((x + mid, y + s), (x + mid, y + s + half)),
        // diagonal
        ((x - half, y - half), (x - 1, y - 1)),
        ((x - half, y + s + half - 1), (x - 1, y + s)),
        ((x + s + half - 1, y - half), (x + s, y - 1)),
        ((x + s + half - 1, y + s + half - 1), (x + s, y + s)),
    ];

    let stroke = PrimitiveStyle::with_stroke(color, 1);
    for ((x0, y0), (x1, y1)) in rays {
        Line::new(Point::new(x0, y0), Point::new(x1, y1))
            .into_styled(stroke)
            .draw(target)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{framebuffer, lit};

    fn frame() -> Frame {
        Frame::new(
            vec![
                ("3".to_owned(), vec![3, 13, 23]),
                ("1".to_owned(), vec![5, 15]),
                ("8".to_owned(), vec![7]),
                ("70".to_owned(), vec![]),
                ("4".to_owned(), vec![]),
            ],
            "22:35".to_owned(),
            Some("17°C".to_owned()),
        )
    }

    #[test]
    fn frame_keeps_what_fits() {
        let frame = frame();

        assert_eq!(frame.rows.len(), MAX_ROWS);
        assert_eq!(frame.rows[0], ("3".to_owned(), vec![3, 13]));
        assert_eq!(frame.rows[3], ("70".to_owned(), vec![]));
    }

    #[test]
    fn rows_are_right_aligned() {
        assert_eq!(row_text("1", &[5, 15]), " 1:5 15");
        assert_eq!(row_text("70", &[1]), "70:1");
        assert_eq!(row_text("8", &[]), " 8:--");
    }

    #[test]
    fn draws_sun_and_text() {
        let mut fb = framebuffer();

        frame().draw(&mut fb).unwrap();

        // sun core, left, top, bottom and diagonal rays
        assert_eq!(fb.get_pixel(Point::new(45, 20)), YELLOW);
        assert_eq!(fb.get_pixel(Point::new(50, 25)), YELLOW);
        assert_eq!(fb.get_pixel(Point::new(39, 22)), YELLOW);
        assert_eq!(fb.get_pixel(Point::new(47, 17)), YELLOW);
        assert_eq!(fb.get_pixel(Point::new(42, 17)), YELLOW);
        assert_eq!(fb.get_pixel(Point::new(40, 20)), Rgb888::BLACK);

        // bottom ray runs four pixels below the core, one further than the top one
        assert_eq!(fb.get_pixel(Point::new(47, 29)), YELLOW);
        assert_eq!(fb.get_pixel(Point::new(47, 30)), Rgb888::BLACK);
        assert_eq!(fb.get_pixel(Point::new(47, 16)), Rgb888::BLACK);

        let row_pixels = lit(&fb)
            .filter(|(p, c)| *c == ORANGE && p.y < ROW_HEIGHT * MAX_ROWS as i32)
            .count();
        assert!(row_pixels > 0);

        let info_pixels = lit(&fb)
            .filter(|(p, c)| *c == WHITE && p.x >= INFO_X && p.y < 2 * ROW_HEIGHT)
            .count();
        assert!(info_pixels > 0);
    }

    #[test]
    fn missing_temperature_leaves_its_slot_dark() {
        let mut fb = framebuffer();
        let frame = Frame::new(vec![], "09:00".to_owned(), None);

        frame.draw(&mut fb).unwrap();

        assert!(!lit(&fb)
            .any(|(p, c)| c == WHITE && (ROW_HEIGHT + 1..2 * ROW_HEIGHT).contains(&p.y)));
    }
}
