//! Decorative backgrounds drawn behind the lyric view.

use ratatui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};

use crate::theme::{Background, Palette};

const STAR_CHARS: [char; 4] = ['.', '·', '+', '*'];
const FLUID_CHARS: [char; 4] = [' ', '░', '▒', '▓'];

pub struct Backdrop<'a> {
    effect: Background,
    palette: &'a Palette,
    /// Seconds since start, drives the animation
    clock: f64,
    /// Extra brightness on line changes, 0.0..=1.0
    pulse: f64,
}

impl<'a> Backdrop<'a> {
    pub fn new(effect: Background, palette: &'a Palette, clock: f64) -> Self {
        Backdrop {
            effect,
            palette,
            clock,
            pulse: 0.0,
        }
    }

    pub fn pulse(mut self, pulse: f64) -> Self {
        self.pulse = pulse.clamp(0.0, 1.0);
        self
    }
}

fn cell_hash(x: u16, y: u16) -> u32 {
    let mut h = (u32::from(x)).wrapping_mul(73_856_093) ^ (u32::from(y)).wrapping_mul(19_349_663);
    h ^= h >> 13;
    h = h.wrapping_mul(0x5bd1_e995);
    h ^ (h >> 15)
}

fn dim(color: Color, factor: f64) -> Color {
    match color {
        Color::Rgb(r, g, b) => {
            let f = factor.clamp(0.0, 1.0);
            Color::Rgb(
                (f64::from(r) * f) as u8,
                (f64::from(g) * f) as u8,
                (f64::from(b) * f) as u8,
            )
        }
        other => other,
    }
}

impl Widget for Backdrop<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let boost = 0.35 + 0.4 * self.pulse;

        match self.effect {
            Background::None => {}
            Background::Stars => {
                for y in area.top()..area.bottom() {
                    for x in area.left()..area.right() {
                        let h = cell_hash(x - area.x, y - area.y);
                        if h % 23 != 0 {
                            continue;
                        }
                        // Each star twinkles on its own phase
                        let phase = f64::from(h % 628) / 100.0;
                        let level = ((self.clock * 1.5 + phase).sin() + 1.0) / 2.0;
                        let ch = STAR_CHARS[((level * 3.99) as usize).min(STAR_CHARS.len() - 1)];
                        let color = if h % 2 == 0 {
                            self.palette.accent
                        } else {
                            self.palette.secondary
                        };
                        buf[(x, y)].set_char(ch).set_fg(dim(color, boost * level + 0.1));
                    }
                }
            }
            Background::Fluid => {
                let w = f64::from(area.width);
                let h = f64::from(area.height);
                for y in area.top()..area.bottom() {
                    for x in area.left()..area.right() {
                        let nx = f64::from(x - area.x) / w;
                        let ny = f64::from(y - area.y) / h;
                        let v = (nx * 6.0 + self.clock * 0.7).sin()
                            + (ny * 4.0 - self.clock * 0.5).cos()
                            + ((nx + ny) * 5.0 + self.clock * 0.3).sin();
                        let level = (v + 3.0) / 6.0;
                        let idx = ((level * 4.0) as usize).min(FLUID_CHARS.len() - 1);
                        let color = if level > 0.5 {
                            self.palette.secondary
                        } else {
                            self.palette.accent
                        };
                        buf[(x, y)]
                            .set_char(FLUID_CHARS[idx])
                            .set_fg(dim(color, boost * 0.6));
                    }
                }
            }
            Background::Grid => {
                let horizon = area.y + area.height / 3;
                let cx = f64::from(area.x) + f64::from(area.width) / 2.0;
                let scroll = (self.clock * 2.0).fract();
                for y in horizon..area.bottom() {
                    let depth = f64::from(y - horizon + 1);
                    // Horizontal rungs get denser towards the horizon
                    let rung = ((depth.ln() * 4.0 - scroll * 4.0).rem_euclid(4.0)) < 0.6;
                    for x in area.left()..area.right() {
                        let dx = (f64::from(x) - cx) / depth;
                        let column = dx.rem_euclid(4.0) < 4.0 / depth.max(1.0);
                        let ch = match (rung, column) {
                            (true, true) => '┼',
                            (true, false) => '─',
                            (false, true) => '│',
                            (false, false) => continue,
                        };
                        buf[(x, y)]
                            .set_char(ch)
                            .set_fg(dim(self.palette.secondary, boost * (depth / 12.0).min(1.0) + 0.1));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::PaletteId;

    fn render(effect: Background) -> Buffer {
        let area = Rect::new(0, 0, 40, 12);
        let mut buf = Buffer::empty(area);
        Backdrop::new(effect, PaletteId::Cyber.palette(), 1.25)
            .pulse(0.5)
            .render(area, &mut buf);
        buf
    }

    fn non_blank(buf: &Buffer) -> usize {
        buf.content().iter().filter(|c| c.symbol() != " ").count()
    }

    #[test]
    fn none_leaves_buffer_untouched() {
        assert_eq!(non_blank(&render(Background::None)), 0);
    }

    #[test]
    fn effects_draw_something() {
        for effect in [Background::Stars, Background::Fluid, Background::Grid] {
            assert!(non_blank(&render(effect)) > 0, "{effect:?} drew nothing");
        }
    }

    #[test]
    fn zero_area_is_fine() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 0, 0));
        Backdrop::new(Background::Grid, PaletteId::Ocean.palette(), 0.0).render(Rect::new(0, 0, 0, 0), &mut buf);
    }
}
