use clap::ValueEnum;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    Frame,
};
use serde::{Deserialize, Serialize};

pub struct Palette {
    pub name: &'static str,
    pub accent: Color,
    pub secondary: Color,
    pub text: Color,
    pub dimmed: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PaletteId {
    #[default]
    Cyber,
    Sunset,
    Matrix,
    Ocean,
}

pub const PALETTES: &[(PaletteId, Palette)] = &[
    (
        PaletteId::Cyber,
        Palette {
            name: "Cyber",
            accent: Color::Rgb(34, 211, 238),
            secondary: Color::Rgb(168, 85, 247),
            text: Color::White,
            dimmed: Color::DarkGray,
        },
    ),
    (
        PaletteId::Sunset,
        Palette {
            name: "Sunset",
            accent: Color::Rgb(251, 146, 60),
            secondary: Color::Rgb(239, 68, 68),
            text: Color::Rgb(255, 237, 213),
            dimmed: Color::Rgb(120, 80, 70),
        },
    ),
    (
        PaletteId::Matrix,
        Palette {
            name: "Matrix",
            accent: Color::Rgb(74, 222, 128),
            secondary: Color::Rgb(21, 128, 61),
            text: Color::Rgb(220, 252, 231),
            dimmed: Color::Rgb(40, 90, 50),
        },
    ),
    (
        PaletteId::Ocean,
        Palette {
            name: "Ocean",
            accent: Color::Rgb(96, 165, 250),
            secondary: Color::Rgb(45, 212, 191),
            text: Color::White,
            dimmed: Color::Rgb(60, 80, 110),
        },
    ),
];

impl PaletteId {
    fn position(self) -> usize {
        PALETTES.iter().position(|(id, _)| *id == self).unwrap_or(0)
    }

    pub fn palette(self) -> &'static Palette {
        &PALETTES[self.position()].1
    }

    pub fn next(self) -> Self {
        PALETTES[(self.position() + 1) % PALETTES.len()].0
    }

    pub fn prev(self) -> Self {
        PALETTES[(self.position() + PALETTES.len() - 1) % PALETTES.len()].0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    None,
    #[default]
    Stars,
    Fluid,
    Grid,
}

impl Background {
    pub const ALL: [Background; 4] = [
        Background::None,
        Background::Stars,
        Background::Fluid,
        Background::Grid,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Background::None => "None",
            Background::Stars => "Stars",
            Background::Fluid => "Fluid",
            Background::Grid => "Grid",
        }
    }

    fn position(self) -> usize {
        Self::ALL.iter().position(|b| *b == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.position() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.position() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Popup for choosing palette (rows) and background effect (bottom line).
pub fn draw_style_selector(frame: &mut Frame, selected: PaletteId, background: Background) {
    let area = frame.area();
    let popup_w = 46u16.min(area.width);
    let popup_h = (PALETTES.len() as u16 + 6).min(area.height);
    let popup_x = area.width.saturating_sub(popup_w) / 2;
    let popup_y = area.height.saturating_sub(popup_h) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_w, popup_h);

    frame.render_widget(Clear, popup_area);

    let palette = selected.palette();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(palette.accent))
        .title(" Visuals ")
        .title_bottom(" ↑/↓: Palette  ←/→: Background  Esc: Close ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(vec![
        Span::raw("  "),
        Span::styled(
            palette.name,
            Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
        ),
    ]));
    lines.push(Line::raw(""));

    for (id, p) in PALETTES {
        let is_sel = *id == selected;
        let marker = if is_sel { ">> " } else { "   " };
        let name_style = if is_sel {
            Style::default().fg(Color::Black).bg(p.accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(p.text)
        };

        let mut spans = vec![
            Span::styled(marker, Style::default().fg(p.accent)),
            Span::styled(format!("{:<10}", p.name), name_style),
            Span::raw(" "),
            Span::styled("██", Style::default().fg(p.accent)),
            Span::raw(" "),
            Span::styled("██", Style::default().fg(p.secondary)),
        ];
        if is_sel {
            spans.push(Span::styled(" ◄", Style::default().fg(p.accent)));
        }
        lines.push(Line::from(spans));
    }

    lines.push(Line::raw(""));
    let mut bg_spans = vec![Span::styled("  Background ", Style::default().fg(palette.dimmed))];
    for bg in Background::ALL {
        let style = if bg == background {
            Style::default().fg(Color::Black).bg(palette.secondary)
        } else {
            Style::default().fg(palette.text)
        };
        bg_spans.push(Span::styled(format!(" {} ", bg.label()), style));
    }
    lines.push(Line::from(bg_spans));

    frame.render_widget(Paragraph::new(lines), inner);
}
