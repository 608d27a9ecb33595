use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
    Frame,
};

use crate::playlist::{LyricOrigin, Track};
use crate::theme::Palette;

/// Two content rows plus borders.
pub const NOW_PLAYING_HEIGHT: u16 = 4;

pub fn draw_now_playing_bar(
    frame: &mut Frame,
    area: Rect,
    paused: bool,
    track: Option<&Track>,
    track_pos: Option<(usize, usize)>,
    status: Option<&str>,
    palette: &Palette,
) {
    let mut lines = Vec::with_capacity(2);
    match track {
        Some(track) => {
            let state = if paused { "Paused" } else { "Playing" };
            let mut title_spans = vec![
                Span::styled(
                    format!(" {state} "),
                    Style::default().fg(Color::Black).bg(palette.accent),
                ),
                Span::raw("  "),
                Span::styled(track.name.as_str(), Style::default().fg(palette.text)),
            ];
            if let Some((cur, total)) = track_pos {
                title_spans.push(Span::styled(
                    format!("  {cur}/{total}"),
                    Style::default().fg(palette.dimmed),
                ));
            }
            let origin_color = if track.origin == LyricOrigin::Failed {
                palette.secondary
            } else {
                palette.dimmed
            };
            title_spans.push(Span::styled(
                format!("  [{}]", track.origin.label()),
                Style::default().fg(origin_color),
            ));
            lines.push(Line::from(title_spans));
        }
        None => lines.push(Line::from(Span::styled(
            " No track loaded. Press a to add audio files or a .zip archive.",
            Style::default().fg(palette.dimmed),
        ))),
    }
    if let Some(status) = status {
        lines.push(Line::from(vec![
            Span::raw("         "),
            Span::styled(status.to_string(), Style::default().fg(palette.secondary)),
        ]));
    }

    let title = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(" Now Playing "),
    );
    frame.render_widget(title, area);
}
