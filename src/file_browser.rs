use std::path::{Path, PathBuf};

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    Frame,
};
use tui_tree_widget::{Tree, TreeItem, TreeState};

use crate::theme::Palette;

pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "wav", "aac", "m4a"];
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "rar"];

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| allowed.contains(&e.to_ascii_lowercase().as_str()))
}

pub fn is_audio_file(path: &Path) -> bool {
    has_extension(path, AUDIO_EXTENSIONS)
}

/// Same check for names that are not on disk, e.g. archive entries.
pub fn is_audio_name(name: &str) -> bool {
    is_audio_file(Path::new(name))
}

pub fn is_archive_file(path: &Path) -> bool {
    has_extension(path, ARCHIVE_EXTENSIONS)
}

fn is_loadable(path: &Path) -> bool {
    is_audio_file(path) || is_archive_file(path)
}

pub fn scan_directory(root: &Path) -> Vec<TreeItem<'static, PathBuf>> {
    let mut entries: Vec<std::fs::DirEntry> = match std::fs::read_dir(root) {
        Ok(rd) => rd.filter_map(|e| e.ok()).collect(),
        Err(_) => return Vec::new(),
    };
    entries.sort_by(|a, b| {
        let a_dir = a.file_type().map(|t| t.is_dir()).unwrap_or(false);
        let b_dir = b.file_type().map(|t| t.is_dir()).unwrap_or(false);
        b_dir.cmp(&a_dir).then_with(|| {
            a.file_name()
                .to_ascii_lowercase()
                .cmp(&b.file_name().to_ascii_lowercase())
        })
    });

    let mut items = Vec::new();
    for entry in entries {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();

        if path.is_dir() {
            let children = scan_directory(&path);
            if !children.is_empty() {
                if let Ok(item) = TreeItem::new(path, name, children) {
                    items.push(item);
                }
            }
        } else if is_loadable(&path) {
            items.push(TreeItem::new_leaf(path, name));
        }
    }
    items
}

/// Collect all audio and archive paths from the tree in display order (depth-first).
pub fn collect_files(items: &[TreeItem<'static, PathBuf>]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    fn walk(items: &[TreeItem<'_, PathBuf>], out: &mut Vec<PathBuf>) {
        for item in items {
            let path = item.identifier();
            if path.is_file() && is_loadable(path) {
                out.push(path.clone());
            }
            walk(item.children(), out);
        }
    }
    walk(items, &mut files);
    files
}

/// The highlighted entry: a loadable file, or a whole directory.
pub fn selected_path(state: &TreeState<PathBuf>) -> Option<PathBuf> {
    let selected = state.selected();
    let path = selected.last()?;
    if path.is_dir() || is_loadable(path) {
        Some(path.clone())
    } else {
        None
    }
}

pub fn draw_file_browser(
    frame: &mut Frame,
    items: &[TreeItem<'static, PathBuf>],
    state: &mut TreeState<PathBuf>,
    palette: &Palette,
) {
    let area = frame.area();
    let popup_width = (area.width * 80 / 100).max(40).min(area.width);
    let popup_height = (area.height * 80 / 100).max(10).min(area.height);
    let popup_x = area.width.saturating_sub(popup_width) / 2;
    let popup_y = area.height.saturating_sub(popup_height) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(palette.accent))
        .title(" Add Files ")
        .title_bottom(" Enter: Add  ←/→: Expand  Esc: Close ");

    let tree = match Tree::new(items) {
        Ok(tree) => tree,
        Err(_) => {
            frame.render_widget(Paragraph::new(" Unable to list files").block(block), popup_area);
            return;
        }
    };
    let tree = tree
        .block(block)
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(palette.accent)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");

    frame.render_stateful_widget(tree, popup_area, state);
}
