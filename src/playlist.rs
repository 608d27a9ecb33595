use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Where the audio for a track lives.
#[derive(Debug, Clone)]
pub enum AudioSource {
    File(PathBuf),
    /// Extracted from an archive
    Memory(Arc<[u8]>),
}

/// Where the raw lyric text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LyricOrigin {
    Cache,
    Sidecar,
    Transcribed,
    Failed,
    Edited,
}

impl LyricOrigin {
    pub fn label(self) -> &'static str {
        match self {
            LyricOrigin::Cache => "cached",
            LyricOrigin::Sidecar => "lrc file",
            LyricOrigin::Transcribed => "transcribed",
            LyricOrigin::Failed => "failed",
            LyricOrigin::Edited => "edited",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Track {
    pub name: String,
    pub source: AudioSource,
    pub lrc: String,
    pub origin: LyricOrigin,
}

impl Track {
    /// File name for exported lyrics: the track name with an `.lrc` extension.
    pub fn lrc_file_name(&self) -> String {
        let stem = Path::new(&self.name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.name.clone());
        format!("{stem}.lrc")
    }

    /// Write the raw lyric text into `dir`. Returns the written path.
    pub fn export_lrc(&self, dir: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.lrc_file_name());
        fs::write(&path, &self.lrc)?;
        Ok(path)
    }
}

/// Ordered tracks plus the current selection.
///
/// Every method that can change the selection returns the new selected index
/// so the caller can reload lyric state before the next position update.
#[derive(Debug, Default)]
pub struct Playlist {
    tracks: Vec<Track>,
    selected: Option<usize>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected(&self) -> Option<&Track> {
        self.selected.and_then(|i| self.tracks.get(i))
    }

    pub fn selected_lrc(&self) -> Option<&str> {
        self.selected().map(|t| t.lrc.as_str())
    }

    /// Append tracks. Selects the first new one if nothing was selected.
    pub fn extend(&mut self, tracks: impl IntoIterator<Item = Track>) -> Option<usize> {
        let first_new = self.tracks.len();
        self.tracks.extend(tracks);
        if self.selected.is_none() && self.tracks.len() > first_new {
            self.selected = Some(first_new);
        }
        self.selected
    }

    pub fn push(&mut self, track: Track) -> Option<usize> {
        self.extend(std::iter::once(track))
    }

    pub fn select(&mut self, index: usize) -> Option<usize> {
        if index < self.tracks.len() {
            self.selected = Some(index);
        }
        self.selected
    }

    /// Advance with wrap-around. Used both for the key binding and at end of track.
    pub fn next(&mut self) -> Option<usize> {
        if let Some(i) = self.selected {
            self.selected = Some((i + 1) % self.tracks.len());
        }
        self.selected
    }

    pub fn previous(&mut self) -> Option<usize> {
        if let Some(i) = self.selected {
            let len = self.tracks.len();
            self.selected = Some((i + len - 1) % len);
        }
        self.selected
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.selected = None;
    }

    /// Remove a track. The selection stays on the same track when possible,
    /// otherwise moves to whatever now occupies the removed slot.
    pub fn remove(&mut self, index: usize) -> Option<Track> {
        if index >= self.tracks.len() {
            return None;
        }
        let track = self.tracks.remove(index);
        self.selected = match self.selected {
            _ if self.tracks.is_empty() => None,
            Some(s) if s > index => Some(s - 1),
            Some(s) if s == index => Some(s.min(self.tracks.len() - 1)),
            other => other,
        };
        Some(track)
    }

    /// Replace the raw lyric text of a track after a user edit.
    pub fn replace_lrc(&mut self, index: usize, lrc: String) -> bool {
        match self.tracks.get_mut(index) {
            Some(track) => {
                track.lrc = lrc;
                track.origin = LyricOrigin::Edited;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(name: &str) -> Track {
        Track {
            name: name.to_string(),
            source: AudioSource::File(PathBuf::from(name)),
            lrc: format!("[00:00.00]{name}"),
            origin: LyricOrigin::Cache,
        }
    }

    fn names(p: &Playlist) -> Vec<&str> {
        p.tracks().iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn empty_playlist_has_no_selection() {
        let mut p = Playlist::new();
        assert!(p.selected().is_none());
        assert!(p.selected_lrc().is_none());
        assert_eq!(p.next(), None);
        assert_eq!(p.previous(), None);
        assert_eq!(p.select(0), None);
    }

    #[test]
    fn first_batch_selects_first_track() {
        let mut p = Playlist::new();
        assert_eq!(p.extend(vec![track("a"), track("b")]), Some(0));
        p.select(1);
        // Later batches keep the current selection
        assert_eq!(p.extend(vec![track("c")]), Some(1));
        assert_eq!(p.extend(Vec::new()), Some(1));
        assert_eq!(names(&p), ["a", "b", "c"]);
    }

    #[test]
    fn empty_batch_selects_nothing() {
        let mut p = Playlist::new();
        assert_eq!(p.extend(Vec::new()), None);
        assert_eq!(p.push(track("a")), Some(0));
    }

    #[test]
    fn next_and_previous_wrap() {
        let mut p = Playlist::new();
        p.extend(vec![track("a"), track("b"), track("c")]);
        assert_eq!(p.previous(), Some(2));
        assert_eq!(p.next(), Some(0));
        assert_eq!(p.next(), Some(1));
        assert_eq!(p.selected_lrc(), Some("[00:00.00]b"));
    }

    #[test]
    fn select_out_of_range_is_ignored() {
        let mut p = Playlist::new();
        p.extend(vec![track("a")]);
        assert_eq!(p.select(5), Some(0));
    }

    #[test]
    fn clear_drops_everything() {
        let mut p = Playlist::new();
        p.extend(vec![track("a"), track("b")]);
        p.clear();
        assert!(p.is_empty());
        assert_eq!(p.selected_index(), None);
    }

    #[test]
    fn remove_keeps_selection_consistent() {
        let mut p = Playlist::new();
        p.extend(vec![track("a"), track("b"), track("c")]);
        p.select(2);
        p.remove(0);
        assert_eq!(p.selected().map(|t| t.name.as_str()), Some("c"));

        p.remove(1);
        assert_eq!(p.selected().map(|t| t.name.as_str()), Some("b"));

        assert!(p.remove(9).is_none());
        p.remove(0);
        assert_eq!(p.selected_index(), None);
    }

    #[test]
    fn export_uses_track_stem() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = track("album/01 Intro.mp3");
        assert_eq!(t.lrc_file_name(), "01 Intro.lrc");
        let path = t.export_lrc(dir.path()).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "[00:00.00]album/01 Intro.mp3");

        t.name = "noext".into();
        assert_eq!(t.lrc_file_name(), "noext.lrc");
    }

    #[test]
    fn edit_replaces_text() {
        let mut p = Playlist::new();
        p.extend(vec![track("a")]);
        assert!(p.replace_lrc(0, "[00:01.00]new".into()));
        assert_eq!(p.selected().map(|t| t.lrc.as_str()), Some("[00:01.00]new"));
        assert_eq!(p.tracks()[0].origin, LyricOrigin::Edited);
        assert!(!p.replace_lrc(3, String::new()));
    }
}
