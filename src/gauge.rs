use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Color,
    widgets::{Block, Widget},
};

pub struct RoundedGauge<'a> {
    ratio: f64,
    label: String,
    filled_color: Color,
    dimmed_color: Color,
    overflow_at: Option<f64>,
    overflow_color: Color,
    block: Option<Block<'a>>,
    /// Positions in 0.0..=1.0 drawn as ticks, e.g. lyric line starts
    markers: &'a [f64],
}

impl<'a> RoundedGauge<'a> {
    pub fn new(ratio: f64, label: String, filled_color: Color) -> Self {
        RoundedGauge {
            ratio: ratio.clamp(0.0, 1.0),
            label,
            filled_color,
            dimmed_color: Color::DarkGray,
            overflow_at: None,
            overflow_color: Color::Red,
            block: None,
            markers: &[],
        }
    }

    pub fn markers(mut self, markers: &'a [f64]) -> Self {
        self.markers = markers;
        self
    }

    pub fn dimmed_color(mut self, color: Color) -> Self {
        self.dimmed_color = color;
        self
    }

    pub fn overflow(mut self, threshold: f64, color: Color) -> Self {
        self.overflow_at = Some(threshold);
        self.overflow_color = color;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

/// Columns (0-based) of a bar `width` cells wide that carry a marker.
pub fn marker_columns(markers: &[f64], width: usize) -> Vec<bool> {
    let mut cols = vec![false; width];
    if width == 0 {
        return cols;
    }
    for m in markers.iter().filter(|m| m.is_finite()) {
        let col = (m.clamp(0.0, 1.0) * (width - 1) as f64).round() as usize;
        cols[col] = true;
    }
    cols
}

impl Widget for RoundedGauge<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(block) = self.block {
            let inner = block.inner(area);
            block.render(area, buf);
            inner
        } else {
            area
        };

        if inner.width < 2 || inner.height == 0 {
            return;
        }

        let width = inner.width as usize;
        let filled = (self.ratio * width as f64).round() as usize;
        let overflow_col = self
            .overflow_at
            .map(|t| (t * width as f64).round() as usize)
            .unwrap_or(width);
        let ticks = marker_columns(self.markers, width);
        let y = inner.y;
        let dim = self.dimmed_color;

        for col in 0..width {
            let x = inner.x + col as u16;
            let fill_color = if col >= overflow_col {
                self.overflow_color
            } else {
                self.filled_color
            };
            let (ch, fg) = if ticks[col] {
                ('┃', if col < filled { fill_color } else { dim })
            } else if filled == 0 {
                if col == 0 {
                    ('╶', dim)
                } else if col == width - 1 {
                    ('╴', dim)
                } else {
                    ('─', dim)
                }
            } else if col < filled {
                if col == 0 {
                    ('╺', fill_color)
                } else if col == filled - 1 && filled < width {
                    ('╸', fill_color)
                } else {
                    ('━', fill_color)
                }
            } else if col == width - 1 {
                ('╴', dim)
            } else {
                ('─', dim)
            };

            buf[(x, y)].set_char(ch).set_fg(fg).set_bg(Color::Reset);
        }

        let label_len = self.label.chars().count();
        if label_len > 0 && label_len <= width {
            let start = inner.x + (width - label_len) as u16 / 2;
            for (i, ch) in self.label.chars().enumerate() {
                let x = start + i as u16;
                let col = (x - inner.x) as usize;
                let fg = if col < filled { Color::White } else { Color::Gray };
                buf[(x, y)].set_char(ch).set_fg(fg).set_bg(Color::Reset);
            }
        }
    }
}
