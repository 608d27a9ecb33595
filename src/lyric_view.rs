use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
    Frame,
};

use crate::backdrop::Backdrop;
use crate::sync::LyricSync;
use crate::theme::{Background, Palette};

/// Everything the lyric panel needs for one frame.
pub struct LyricPanel<'a> {
    pub sync: &'a LyricSync,
    /// Playback position in seconds
    pub position: f64,
    pub has_track: bool,
    pub background: Background,
    pub palette: &'a Palette,
    /// Seconds since start, for the backdrop animation
    pub clock: f64,
    /// 1.0 right after the active line changes, decaying to 0.0
    pub pulse: f64,
}

/// Split `text` so the first `progress` share of its characters gets `done`
/// and the rest gets `todo`.
pub fn sweep_spans(text: &str, progress: f64, done: Style, todo: Style) -> Vec<Span<'static>> {
    let chars = text.chars().count();
    let split = ((progress.clamp(0.0, 1.0) * chars as f64).round() as usize).min(chars);
    let byte_split = text.char_indices().nth(split).map_or(text.len(), |(i, _)| i);
    let (head, tail) = text.split_at(byte_split);
    let mut spans = Vec::with_capacity(2);
    if !head.is_empty() {
        spans.push(Span::styled(head.to_string(), done));
    }
    if !tail.is_empty() {
        spans.push(Span::styled(tail.to_string(), todo));
    }
    spans
}

fn build_lines(panel: &LyricPanel<'_>) -> Vec<Line<'static>> {
    let p = panel.palette;
    let faint = Style::default().fg(p.dimmed);
    let neighbour = Style::default().fg(p.text).add_modifier(Modifier::DIM);

    if !panel.has_track {
        return vec![Line::styled("♪", faint)];
    }
    if panel.sync.lines().is_empty() {
        return vec![Line::styled("No lyrics for this track", faint)];
    }

    let previous = panel
        .sync
        .previous()
        .map_or_else(|| Line::raw(""), |l| Line::styled(l.text.clone(), neighbour));
    let current = match panel.sync.current() {
        Some(line) => {
            let done = Style::default().fg(p.accent).add_modifier(Modifier::BOLD);
            let todo = Style::default().fg(p.text).add_modifier(Modifier::BOLD);
            let progress = panel.sync.progress_in_line(panel.position);
            Line::from(sweep_spans(&line.text, progress, done, todo))
        }
        // Before the first line: an intro marker
        None => Line::styled("· · ·", faint),
    };
    let next = panel
        .sync
        .next()
        .map_or_else(|| Line::raw(""), |l| Line::styled(l.text.clone(), neighbour));

    vec![previous, Line::raw(""), current, Line::raw(""), next]
}

pub fn draw_lyrics(frame: &mut Frame, area: Rect, panel: &LyricPanel<'_>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(panel.palette.dimmed))
        .title(" Lyrics ");
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    frame.render_widget(
        Backdrop::new(panel.background, panel.palette, panel.clock).pulse(panel.pulse),
        inner,
    );

    let lines = build_lines(panel);
    let height = (lines.len() as u16).min(inner.height);
    let text_area = Rect::new(
        inner.x,
        inner.y + (inner.height - height) / 2,
        inner.width,
        height,
    );
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, text_area);
}
