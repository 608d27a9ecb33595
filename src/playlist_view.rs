use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, ListState},
    Frame,
};

use crate::lrc;
use crate::playlist::{LyricOrigin, Playlist};
use crate::theme::Palette;

pub const PLAYLIST_WIDTH: u16 = 34;

pub fn draw_playlist(frame: &mut Frame, area: Rect, playlist: &Playlist, palette: &Palette) {
    let selected = playlist.selected_index();
    let items: Vec<ListItem> = playlist
        .tracks()
        .iter()
        .enumerate()
        .map(|(i, track)| {
            let marker = if Some(i) == selected { "▶ " } else { "  " };
            let name_style = if Some(i) == selected {
                Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(palette.text)
            };
            let mut spans = vec![
                Span::styled(marker, Style::default().fg(palette.accent)),
                Span::styled(track.name.clone(), name_style),
            ];
            if track.origin == LyricOrigin::Failed {
                spans.push(Span::styled(" !", Style::default().fg(palette.secondary)));
            } else if track.lrc.trim() == lrc::INSTRUMENTAL {
                spans.push(Span::styled(" ♪", Style::default().fg(palette.dimmed)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let title = format!(" Playlist ({}) ", playlist.len());
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(title),
        )
        .highlight_style(Style::default().bg(Color::Reset));

    let mut state = ListState::default().with_selected(selected);
    frame.render_stateful_widget(list, area, &mut state);
}
