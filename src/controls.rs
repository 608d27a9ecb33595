use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use crate::theme::Palette;

fn build_control_spans(has_tracks: bool, palette: &Palette) -> Vec<Span<'static>> {
    let key_style = Style::default().fg(Color::Black).bg(palette.secondary);
    let mut spans = vec![
        Span::styled(" Space ", key_style),
        Span::raw(" Play/Pause  "),
        Span::styled(" ←/→ ", key_style),
        Span::raw(" Seek ±5s  "),
        Span::styled(" ↑/↓ ", key_style),
        Span::raw(" Volume  "),
    ];
    if has_tracks {
        spans.extend([
            Span::styled(" n/N ", key_style),
            Span::raw(" Next/Prev  "),
            Span::styled(" 1-9 ", key_style),
            Span::raw(" Jump  "),
            Span::styled(" e ", key_style),
            Span::raw(" Edit Lyrics  "),
            Span::styled(" w ", key_style),
            Span::raw(" Save .lrc  "),
            Span::styled(" d ", key_style),
            Span::raw(" Remove  "),
            Span::styled(" c ", key_style),
            Span::raw(" Clear  "),
        ]);
    }
    spans.extend([
        Span::styled(" a ", key_style),
        Span::raw(" Add Files  "),
        Span::styled(" v ", key_style),
        Span::raw(" Visuals  "),
        Span::styled(" x ", key_style),
        Span::raw(" Clear Cache  "),
        Span::styled(" q ", key_style),
        Span::raw(" Quit"),
    ]);
    spans
}

/// Wrap spans into lines, breaking at group boundaries (every 2 spans = key + label).
fn wrap_lines(spans: Vec<Span<'static>>, inner_w: usize) -> Vec<Line<'static>> {
    if inner_w == 0 {
        return vec![Line::from(spans)];
    }
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_w: usize = 0;
    for chunk in spans.chunks(2) {
        let group_w: usize = Line::from(chunk.to_vec()).width();
        if current_w + group_w > inner_w && current_w > 0 {
            lines.push(Line::from(std::mem::take(&mut current)));
            current_w = 0;
        }
        current.extend(chunk.iter().cloned());
        current_w += group_w;
    }
    if !current.is_empty() {
        lines.push(Line::from(current));
    }
    lines
}

pub fn controls_height(width: u16, has_tracks: bool, palette: &Palette) -> u16 {
    let spans = build_control_spans(has_tracks, palette);
    let inner_w = width.saturating_sub(2) as usize;
    wrap_lines(spans, inner_w).len() as u16 + 2 // +2 for borders
}

pub fn draw_controls(frame: &mut Frame, area: Rect, has_tracks: bool, palette: &Palette) {
    let spans = build_control_spans(has_tracks, palette);
    let inner_w = area.width.saturating_sub(2) as usize;
    let lines = wrap_lines(spans, inner_w);
    let help = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(" Controls "),
    );
    frame.render_widget(help, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::PaletteId;

    #[test]
    fn groups_are_never_split() {
        let spans = build_control_spans(true, PaletteId::Cyber.palette());
        let lines = wrap_lines(spans, 30);
        assert!(lines.len() > 1);
        for line in &lines {
            assert_eq!(line.spans.len() % 2, 0);
        }
    }

    #[test]
    fn wider_terminal_needs_fewer_rows() {
        let p = PaletteId::Cyber.palette();
        assert!(controls_height(300, true, p) < controls_height(40, true, p));
        assert_eq!(controls_height(1000, false, p), 3);
    }
}
