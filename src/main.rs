mod acquire;
mod archive;
mod backdrop;
mod cache;
mod config;
mod controls;
mod error;
mod file_browser;
mod gauge;
mod lrc;
mod lyric_view;
mod now_playing;
mod player;
mod playlist;
mod playlist_view;
mod progress;
mod sync;
mod theme;
mod transcribe;

use std::{
    env, fs, io,
    path::{Path, PathBuf},
    process::Command,
    sync::{Arc, Mutex, mpsc},
    time::{Duration, Instant},
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Layout},
    DefaultTerminal, Frame,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tui_tree_widget::{TreeItem, TreeState};

use crate::acquire::{AcquireEvent, Acquirer, spawn_acquisition};
use crate::cache::{LrcCache, cache_hash};
use crate::config::Settings;
use crate::lyric_view::LyricPanel;
use crate::player::Player;
use crate::playlist::Playlist;
use crate::sync::LyricSync;
use crate::theme::{Background, PaletteId};
use crate::transcribe::{GeminiTranscriber, Transcriber};

/// Terminal audio player with synchronized lyrics.
///
/// Lyrics come from the local cache, a sidecar .lrc file, or are transcribed
/// from the audio by a remote model.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Audio files, .zip archives or directories to load
    paths: Vec<PathBuf>,

    /// Never call the transcription service
    #[arg(long)]
    offline: bool,

    /// API key for the transcription service
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Transcription model name
    #[arg(long)]
    model: Option<String>,

    /// Base URL of the transcription API
    #[arg(long)]
    endpoint: Option<String>,

    /// Directory for cached lyrics
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    #[arg(long, value_enum)]
    palette: Option<PaletteId>,

    #[arg(long, value_enum)]
    background: Option<Background>,

    /// Write .lrc files for all inputs into DIR and exit
    #[arg(long, value_name = "DIR")]
    export: Option<PathBuf>,

    /// With --export, write lyrics sorted and without unparseable lines
    #[arg(long, requires = "export")]
    normalize: bool,

    /// Log file (the terminal is taken by the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_logging(path: &Path) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let file = match fs::OpenOptions::new().create(true).append(true).open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("warning: cannot open log file {}: {e}", path.display());
            return;
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
}

enum Overlay {
    None,
    Browser {
        items: Vec<TreeItem<'static, PathBuf>>,
        state: TreeState<PathBuf>,
    },
    Visuals,
}

enum Action {
    None,
    Quit,
    Edit,
}

struct App {
    playlist: Playlist,
    sync: LyricSync,
    player: Player,
    settings: Settings,
    cache: Option<LrcCache>,
    acquirer: Arc<Acquirer>,
    batches: Vec<mpsc::Receiver<AcquireEvent>>,
    status: Option<String>,
    overlay: Overlay,
    started: Instant,
    line_changed: Instant,
}

impl App {
    fn position_secs(&self) -> f64 {
        self.player.position().as_secs_f64()
    }

    fn add_paths(&mut self, paths: Vec<PathBuf>) {
        if paths.is_empty() {
            return;
        }
        info!(count = paths.len(), "loading inputs");
        self.status = Some("Loading...".into());
        self.batches.push(spawn_acquisition(Arc::clone(&self.acquirer), paths));
    }

    /// Point lyrics and audio at the selected track. Lyric state is reset
    /// before the player reports any position for the new track.
    fn on_selection_changed(&mut self) {
        match self.playlist.selected_lrc() {
            Some(raw) => self.sync.load(raw),
            None => self.sync.clear(),
        }
        self.line_changed = Instant::now();
        match self.playlist.selected() {
            Some(track) => {
                if let Err(e) = self.player.load(track) {
                    error!(error = %e, name = %track.name, "playback failed");
                    self.status = Some(format!("{e:#}"));
                }
            }
            None => self.player.stop(),
        }
    }

    fn drain_batches(&mut self) {
        let mut selection_changed = false;
        let mut batches = std::mem::take(&mut self.batches);
        batches.retain(|rx| loop {
            match rx.try_recv() {
                Ok(AcquireEvent::Progress { done, total, name }) => {
                    self.status = Some(format!("Processing {}/{}: {}", done + 1, total, name));
                }
                Ok(AcquireEvent::Track(track)) => {
                    let had_selection = self.playlist.selected_index().is_some();
                    self.playlist.push(track);
                    selection_changed |= !had_selection;
                }
                Ok(AcquireEvent::Failed { path, error }) => {
                    self.status = Some(format!("{}: {}", path.display(), error));
                }
                Ok(AcquireEvent::Finished { added }) => {
                    if self.status.as_deref().is_some_and(|s| s.starts_with("Processing")) {
                        self.status = Some(format!("Added {added} track(s)"));
                    }
                    break false;
                }
                Err(mpsc::TryRecvError::Empty) => break true,
                Err(mpsc::TryRecvError::Disconnected) => break false,
            }
        });
        self.batches = batches;
        if selection_changed {
            self.on_selection_changed();
        }
    }

    fn tick(&mut self) {
        self.drain_batches();

        if self.player.has_track() && self.player.is_finished() && !self.playlist.is_empty() {
            self.playlist.next();
            self.on_selection_changed();
        }

        if self.sync.update(self.position_secs()) {
            self.line_changed = Instant::now();
        }
    }

    fn remove_selected(&mut self) {
        let Some(index) = self.playlist.selected_index() else {
            return;
        };
        if let Some(track) = self.playlist.remove(index) {
            self.status = Some(format!("Removed {}", track.name));
        }
        self.on_selection_changed();
    }

    fn clear_playlist(&mut self) {
        self.playlist.clear();
        self.on_selection_changed();
        self.status = Some("Playlist cleared".into());
    }

    fn clear_cache(&mut self) {
        let Some(cache) = &self.cache else {
            return;
        };
        self.status = Some(match cache.clear() {
            Ok(n) => format!("Removed {n} cached lyric file(s)"),
            Err(e) => {
                warn!(error = %e, "cache clear failed");
                e.to_string()
            }
        });
    }

    fn save_lrc(&mut self) {
        let Some(track) = self.playlist.selected() else {
            return;
        };
        let dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        self.status = Some(match track.export_lrc(&dir) {
            Ok(path) => format!("Saved {}", path.display()),
            Err(e) => format!("Could not save lyrics: {e}"),
        });
    }

    fn open_browser(&mut self) {
        let root = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let items = file_browser::scan_directory(&root);
        let mut state = TreeState::default();
        if let Some(first) = items.first() {
            state.select(vec![first.identifier().clone()]);
        }
        self.overlay = Overlay::Browser { items, state };
    }

    fn handle_key(&mut self, code: KeyCode) -> Action {
        match &mut self.overlay {
            Overlay::Browser { state, .. } => {
                match code {
                    KeyCode::Esc | KeyCode::Char('q') => self.overlay = Overlay::None,
                    KeyCode::Up => {
                        state.key_up();
                    }
                    KeyCode::Down => {
                        state.key_down();
                    }
                    KeyCode::Left => {
                        state.key_left();
                    }
                    KeyCode::Right => {
                        state.key_right();
                    }
                    KeyCode::Enter => {
                        if let Some(path) = file_browser::selected_path(state) {
                            self.overlay = Overlay::None;
                            self.add_paths(vec![path]);
                        }
                    }
                    _ => {}
                }
                return Action::None;
            }
            Overlay::Visuals => {
                match code {
                    KeyCode::Esc | KeyCode::Enter | KeyCode::Char('v') => self.overlay = Overlay::None,
                    KeyCode::Up => self.settings.palette = self.settings.palette.prev(),
                    KeyCode::Down => self.settings.palette = self.settings.palette.next(),
                    KeyCode::Left => self.settings.background = self.settings.background.prev(),
                    KeyCode::Right => self.settings.background = self.settings.background.next(),
                    _ => {}
                }
                return Action::None;
            }
            Overlay::None => {}
        }

        match code {
            KeyCode::Char('q') => return Action::Quit,
            KeyCode::Char(' ') => self.player.toggle_pause(),
            KeyCode::Up => self.player.volume_up(),
            KeyCode::Down => self.player.volume_down(),
            KeyCode::Right | KeyCode::Left => {
                let offset = if code == KeyCode::Right { 5 } else { -5 };
                if let Err(e) = self.player.seek(offset) {
                    self.status = Some(format!("{e:#}"));
                }
            }
            KeyCode::Char('n') => {
                if self.playlist.next().is_some() {
                    self.on_selection_changed();
                }
            }
            KeyCode::Char('N') => {
                if self.playlist.previous().is_some() {
                    self.on_selection_changed();
                }
            }
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                if index < self.playlist.len() && self.playlist.selected_index() != Some(index) {
                    self.playlist.select(index);
                    self.on_selection_changed();
                }
            }
            KeyCode::Char('e') if self.playlist.selected().is_some() => return Action::Edit,
            KeyCode::Char('w') => self.save_lrc(),
            KeyCode::Char('d') => self.remove_selected(),
            KeyCode::Char('c') => self.clear_playlist(),
            KeyCode::Char('x') => self.clear_cache(),
            KeyCode::Char('a') => self.open_browser(),
            KeyCode::Char('v') => self.overlay = Overlay::Visuals,
            _ => {}
        }
        Action::None
    }

    /// Hand the raw lyrics of the selected track to the user's editor.
    fn edit_lyrics(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let Some(index) = self.playlist.selected_index() else {
            return Ok(());
        };
        let track = &self.playlist.tracks()[index];
        let path = env::temp_dir().join(format!("lrc-player-{}.lrc", cache_hash(&track.name)));
        if let Err(e) = fs::write(&path, &track.lrc) {
            warn!(error = %e, path = %path.display(), "could not write lyrics for editing");
            self.status = Some(format!("Could not write {}: {e}", path.display()));
            return Ok(());
        }

        let editor = env::var("VISUAL")
            .or_else(|_| env::var("EDITOR"))
            .unwrap_or_else(|_| "vi".to_string());
        let mut parts = editor.split_whitespace();
        let program = parts.next().unwrap_or("vi");

        ratatui::restore();
        let status = Command::new(program).args(parts).arg(&path).status();
        *terminal = ratatui::init();
        terminal.clear()?;

        let edited = take_edited(&path);
        let edited = match (status, edited) {
            (Ok(s), Ok(text)) if s.success() => text,
            (Ok(s), Err(e)) if s.success() => {
                warn!(error = %e, "could not read edited lyrics");
                self.status = Some(format!("Could not read edited lyrics: {e}"));
                return Ok(());
            }
            (Ok(s), _) => {
                self.status = Some(format!("Editor exited with {s}, lyrics unchanged"));
                return Ok(());
            }
            (Err(e), _) => {
                self.status = Some(format!("Could not start {program}: {e}"));
                return Ok(());
            }
        };

        if edited == self.playlist.tracks()[index].lrc {
            return Ok(());
        }
        let name = self.playlist.tracks()[index].name.clone();
        if let Some(cache) = &self.cache {
            // An emptied file drops the entry so the next run fetches lyrics again
            let result = if edited.trim().is_empty() {
                cache.remove(&name)
            } else {
                cache.store(&name, &edited)
            };
            if let Err(e) = result {
                warn!(error = %e, %name, "could not update cached lyrics");
            }
        }
        self.sync.load(&edited);
        self.playlist.replace_lrc(index, edited);
        self.sync.update(self.position_secs());
        self.status = Some(format!("Lyrics updated for {name}"));
        info!(%name, "lyrics edited");
        Ok(())
    }
}

/// Read back the editor's temp file, removing it whatever the outcome.
fn take_edited(path: &Path) -> io::Result<String> {
    let text = fs::read_to_string(path);
    let _ = fs::remove_file(path);
    text
}

fn run(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    loop {
        app.tick();
        terminal.draw(|f| draw(f, app))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match app.handle_key(key.code) {
                        Action::Quit => break,
                        Action::Edit => app.edit_lyrics(terminal)?,
                        Action::None => {}
                    }
                }
            }
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, app: &mut App) {
    let palette = app.settings.palette.palette();
    let has_tracks = !app.playlist.is_empty();
    let controls_h = controls::controls_height(frame.area().width, has_tracks, palette);

    let chunks = Layout::vertical([
        Constraint::Length(now_playing::NOW_PLAYING_HEIGHT),
        Constraint::Min(7),
        Constraint::Length(3),
        Constraint::Length(controls_h),
    ])
    .split(frame.area());

    let track_pos = app
        .playlist
        .selected_index()
        .map(|i| (i + 1, app.playlist.len()));
    now_playing::draw_now_playing_bar(
        frame,
        chunks[0],
        app.player.paused(),
        app.playlist.selected(),
        track_pos,
        app.status.as_deref(),
        palette,
    );

    let show_playlist = has_tracks && chunks[1].width >= playlist_view::PLAYLIST_WIDTH * 2 + 20;
    let (lyrics_area, list_area) = if show_playlist {
        let cols = Layout::horizontal([
            Constraint::Min(20),
            Constraint::Length(playlist_view::PLAYLIST_WIDTH),
        ])
        .split(chunks[1]);
        (cols[0], Some(cols[1]))
    } else {
        (chunks[1], None)
    };

    let pulse = 1.0 - (app.line_changed.elapsed().as_secs_f64() / 0.6).min(1.0);
    let panel = LyricPanel {
        sync: &app.sync,
        position: app.position_secs(),
        has_track: app.playlist.selected().is_some(),
        background: app.settings.background,
        palette,
        clock: app.started.elapsed().as_secs_f64(),
        pulse,
    };
    lyric_view::draw_lyrics(frame, lyrics_area, &panel);
    if let Some(area) = list_area {
        playlist_view::draw_playlist(frame, area, &app.playlist, palette);
    }

    let transport = Layout::horizontal([
        Constraint::Min(20),
        Constraint::Length(progress::VOLUME_WIDTH),
    ])
    .split(chunks[2]);
    progress::draw_progress(
        frame,
        transport[0],
        app.player.position(),
        app.player.duration(),
        app.sync.lines(),
        palette,
    );
    progress::draw_volume(frame, transport[1], app.player.volume(), palette);
    controls::draw_controls(frame, chunks[3], has_tracks, palette);

    match &mut app.overlay {
        Overlay::Browser { items, state } => file_browser::draw_file_browser(frame, items, state, palette),
        Overlay::Visuals => theme::draw_style_selector(frame, app.settings.palette, app.settings.background),
        Overlay::None => {}
    }
}

/// Resolve lyrics for every input and write them out without starting the UI.
fn export_all(acquirer: &Acquirer, paths: &[PathBuf], dir: &Path, normalize: bool) -> Result<()> {
    if paths.is_empty() {
        bail!("--export needs at least one input path");
    }
    let (tx, rx) = mpsc::channel();
    acquirer.run(paths, &tx);
    drop(tx);

    let mut written = 0;
    for event in rx {
        match event {
            AcquireEvent::Track(mut track) => {
                if normalize {
                    track.lrc = lrc::to_lrc(&lrc::parse(&track.lrc));
                }
                let path = track
                    .export_lrc(dir)
                    .with_context(|| format!("failed to export lyrics for {}", track.name))?;
                println!("{} ({})", path.display(), track.origin.label());
                written += 1;
            }
            AcquireEvent::Failed { path, error } => eprintln!("skipped {}: {error}", path.display()),
            AcquireEvent::Progress { .. } | AcquireEvent::Finished { .. } => {}
        }
    }
    info!(written, dir = %dir.display(), "export finished");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_file.clone().unwrap_or_else(config::default_log_file));

    let mut settings = Settings::load().unwrap_or_else(|e| {
        warn!(error = %e, "ignoring unreadable settings");
        Settings::default()
    });
    if let Some(palette) = cli.palette {
        settings.palette = palette;
    }
    if let Some(background) = cli.background {
        settings.background = background;
    }
    if let Some(model) = &cli.model {
        settings.model = model.clone();
    }
    if let Some(endpoint) = &cli.endpoint {
        settings.endpoint = endpoint.clone();
    }
    if let Some(dir) = &cli.cache_dir {
        settings.cache_dir = Some(dir.clone());
    }

    let cache = LrcCache::new(settings.cache_dir());
    let env_key = env::var("API_KEY").ok();
    let transcriber: Option<Arc<dyn Transcriber>> = match settings.api_key(cli.api_key.as_deref(), env_key.as_deref()) {
        Some(key) if !cli.offline => Some(Arc::new(GeminiTranscriber::new(
            key,
            settings.model.clone(),
            settings.endpoint.clone(),
            Duration::from_secs(settings.timeout_secs),
        ))),
        _ => {
            info!(offline = cli.offline, "transcription disabled");
            None
        }
    };
    let acquirer = Arc::new(Acquirer::new(Some(cache.clone()), transcriber));

    if let Some(dir) = &cli.export {
        return export_all(&acquirer, &cli.paths, dir, cli.normalize);
    }

    let player = Player::new(settings.volume)?;
    let mut app = App {
        playlist: Playlist::new(),
        sync: LyricSync::new(),
        player,
        settings,
        cache: Some(cache),
        acquirer,
        batches: Vec::new(),
        status: None,
        overlay: Overlay::None,
        started: Instant::now(),
        line_changed: Instant::now(),
    };
    app.add_paths(cli.paths);

    let mut terminal = ratatui::init();
    let result = run(&mut terminal, &mut app);
    ratatui::restore();

    app.settings.volume = app.player.volume();
    if let Err(e) = app.settings.save() {
        warn!(error = %e, "could not save settings");
    }
    result
}
