//! Drawing primitives: percentage bar, braille sparkline, block graph.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::Widget;

const BLOCKS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Braille dot bits of the left and right columns, bottom to top.
const LEFT_DOTS: [u8; 4] = [0x40, 0x04, 0x02, 0x01];
const RIGHT_DOTS: [u8; 4] = [0x80, 0x20, 0x10, 0x08];

/// A horizontal percentage bar drawn with `━`.
#[derive(Debug, Clone)]
pub struct Bar {
    percent: f64,
    color: Color,
    empty: Color,
    show_value: bool,
}

impl Bar {
    /// Creates a bar for `percent` (0-100).
    #[must_use]
    pub fn new(percent: f64) -> Self {
        Self { percent: percent.clamp(0.0, 100.0), color: Color::Green, empty: Color::DarkGray, show_value: true }
    }

    /// Sets the filled color.
    #[must_use]
    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Sets the empty-cell color.
    #[must_use]
    pub fn empty(mut self, color: Color) -> Self {
        self.empty = color;
        self
    }

    /// Sets whether the `xx.x%` value follows the bar.
    #[must_use]
    pub fn show_value(mut self, show: bool) -> Self {
        self.show_value = show;
        self
    }

    /// Filled cells for a bar `width` cells wide.
    pub fn filled_cells(&self, width: u16) -> u16 {
        ((f64::from(width) * self.percent / 100.0) as u16).min(width)
    }
}

impl Widget for Bar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let value_width = if self.show_value { 7 } else { 0 };
        let bar_width = area.width.saturating_sub(value_width);
        let filled = self.filled_cells(bar_width);

        for i in 0..bar_width {
            let color = if i < filled { self.color } else { self.empty };
            buf.set_string(area.x + i, area.y, "━", Style::default().fg(color));
        }
        if self.show_value && area.width > bar_width {
            buf.set_string(area.x + bar_width + 1, area.y, format!("{:5.1}%", self.percent), Style::default());
        }
    }
}

/// One braille cell for two samples scaled against `max` (0-4 dots each).
pub fn braille_cell(left: f64, right: f64, max: f64) -> char {
    let dots = |v: f64| if max > 0.0 { ((v / max).clamp(0.0, 1.0) * 4.0) as usize } else { 0 };
    let mut pattern = 0u8;
    for bit in LEFT_DOTS.iter().take(dots(left)) {
        pattern |= bit;
    }
    for bit in RIGHT_DOTS.iter().take(dots(right)) {
        pattern |= bit;
    }
    char::from_u32(0x2800 + u32::from(pattern)).unwrap_or(' ')
}

/// Single-row sparkline packing two samples per cell; most recent on the right.
#[derive(Debug, Clone)]
pub struct BrailleSparkline<'a> {
    data: &'a [f64],
    max: f64,
    color: Color,
}

impl<'a> BrailleSparkline<'a> {
    /// Creates a sparkline scaled against `max`.
    #[must_use]
    pub fn new(data: &'a [f64], max: f64) -> Self {
        Self { data, max, color: Color::Cyan }
    }

    /// Sets the color.
    #[must_use]
    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Autoscaled maximum: the series peak, never below `floor`.
    pub fn peak(data: &[f64], floor: f64) -> f64 {
        data.iter().copied().fold(floor, f64::max)
    }
}

impl Widget for BrailleSparkline<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 || self.data.is_empty() {
            return;
        }
        let take = (area.width as usize * 2).min(self.data.len());
        let points = &self.data[self.data.len() - take..];
        for (i, pair) in points.chunks(2).enumerate() {
            let left = pair[0];
            let right = pair.get(1).copied().unwrap_or(0.0);
            let cell = braille_cell(left, right, self.max);
            buf.set_string(area.x + i as u16, area.y, cell.to_string(), Style::default().fg(self.color));
        }
    }
}

/// Filled area graph, one sample per column, colored by row.
#[derive(Debug, Clone)]
pub struct BlockGraph<'a> {
    data: &'a [f64],
    max: f64,
    low: Color,
    mid: Color,
    high: Color,
}

impl<'a> BlockGraph<'a> {
    /// Creates a graph scaled against at least `max`.
    #[must_use]
    pub fn new(data: &'a [f64], max: f64) -> Self {
        Self { data, max, low: Color::Green, mid: Color::Yellow, high: Color::Red }
    }

    /// Sets the bottom, middle and top row colors.
    #[must_use]
    pub fn colors(mut self, low: Color, mid: Color, high: Color) -> Self {
        self.low = low;
        self.mid = mid;
        self.high = high;
        self
    }

    /// Glyph for a normalized value in row `row` of `height` (row 0 on top).
    pub fn glyph(normalized: f64, row: u16, height: u16) -> char {
        let h = f64::from(height);
        let top = 1.0 - f64::from(row) / h;
        let bottom = 1.0 - f64::from(row + 1) / h;
        if normalized >= top {
            '█'
        } else if normalized > bottom {
            let frac = (normalized - bottom) / (top - bottom);
            BLOCKS[((frac * 8.0) as usize).min(8)]
        } else {
            ' '
        }
    }
}

impl Widget for BlockGraph<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width <= 2 || area.height == 0 || self.data.is_empty() {
            return;
        }
        let take = (area.width as usize).min(self.data.len());
        let points = &self.data[self.data.len() - take..];
        let scale = points.iter().copied().fold(self.max.max(1.0), f64::max);
        let offset = area.width - take as u16;

        for row in 0..area.height {
            let color = if f64::from(row) < f64::from(area.height) * 0.3 {
                self.high
            } else if f64::from(row) < f64::from(area.height) * 0.6 {
                self.mid
            } else {
                self.low
            };
            for (col, value) in points.iter().enumerate() {
                let glyph = Self::glyph((value / scale).min(1.0), row, area.height);
                if glyph != ' ' {
                    buf.set_string(
                        area.x + offset + col as u16,
                        area.y + row,
                        glyph.to_string(),
                        Style::default().fg(color),
                    );
                }
            }
        }
    }
}
