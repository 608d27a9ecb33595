use std::time::Duration;

use ratatui::{
    layout::{Alignment, Rect},
    text::Line,
    widgets::{Block, BorderType, Borders},
    Frame,
};

use crate::gauge::RoundedGauge;
use crate::lrc::LyricLine;
use crate::theme::Palette;

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Lyric line starts as fractions of the track length.
pub fn line_markers(lines: &[LyricLine], total: Option<Duration>) -> Vec<f64> {
    match total {
        Some(t) if !t.is_zero() => {
            let total = t.as_secs_f64();
            lines.iter().map(|l| (l.time / total).min(1.0)).collect()
        }
        _ => Vec::new(),
    }
}

/// Width of the volume box beside the progress bar.
pub const VOLUME_WIDTH: u16 = 18;

pub fn draw_progress(
    frame: &mut Frame,
    area: Rect,
    elapsed: Duration,
    total: Option<Duration>,
    lines: &[LyricLine],
    palette: &Palette,
) {
    let progress_label = match total {
        Some(t) if !t.is_zero() => {
            format!("{} / {}", format_duration(elapsed), format_duration(t))
        }
        _ => format_duration(elapsed),
    };
    let ratio = total
        .map(|t| {
            if t.is_zero() {
                0.0
            } else {
                (elapsed.as_secs_f64() / t.as_secs_f64()).min(1.0)
            }
        })
        .unwrap_or(0.0);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(" Progress ")
        .title(Line::from(format!(" {progress_label} ")).alignment(Alignment::Right));

    let markers = line_markers(lines, total);
    let gauge = RoundedGauge::new(ratio, String::new(), palette.accent)
        .dimmed_color(palette.dimmed)
        .markers(&markers)
        .block(block);
    frame.render_widget(gauge, area);
}

/// Volume as a short gauge; the part above 100% is drawn in the secondary colour.
pub fn draw_volume(frame: &mut Frame, area: Rect, volume: f32, palette: &Palette) {
    let percent = (volume * 100.0).round() as u16;
    let gauge = RoundedGauge::new(f64::from(volume) / 2.0, format!("{percent}%"), palette.accent)
        .overflow(0.5, palette.secondary)
        .dimmed_color(palette.dimmed)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(" Vol "),
        );
    frame.render_widget(gauge, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0:00");
        assert_eq!(format_duration(Duration::from_secs(125)), "2:05");
        assert_eq!(format_duration(Duration::from_millis(59_999)), "0:59");
    }

    #[test]
    fn markers_need_a_duration() {
        let lines = crate::lrc::parse("[00:05.00]a\n[00:10.00]b\n[00:30.00]c");
        assert!(line_markers(&lines, None).is_empty());
        assert!(line_markers(&lines, Some(Duration::ZERO)).is_empty());
        assert_eq!(line_markers(&lines, Some(Duration::from_secs(20))), [0.25, 0.5, 1.0]);
    }
}
