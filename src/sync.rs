//! Playback position tracking for lyric lines.

use crate::lrc::{self, LyricLine};

/// Index of the last line whose timestamp is at or before `position`,
/// or -1 when playback is before the first line or there are no lines.
///
/// `lines` must be sorted by time, which `lrc::parse` guarantees.
pub fn resolve_active_index(lines: &[LyricLine], position: f64) -> isize {
    if position.is_nan() {
        return -1;
    }
    lines.partition_point(|line| line.time <= position) as isize - 1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    NoTrack,
    Loaded,
    Playing,
}

/// Lyric state for the currently selected track.
///
/// The line sequence is replaced wholesale on every track change and the
/// index always goes back to -1, so nothing from the previous track can leak
/// into the first frame of the next one.
#[derive(Debug)]
pub struct LyricSync {
    lines: Vec<LyricLine>,
    index: isize,
    state: SyncState,
}

impl Default for LyricSync {
    fn default() -> Self {
        LyricSync {
            lines: Vec::new(),
            index: -1,
            state: SyncState::NoTrack,
        }
    }
}

impl LyricSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, raw: &str) {
        self.lines = lrc::parse(raw);
        self.index = -1;
        self.state = SyncState::Loaded;
    }

    pub fn clear(&mut self) {
        self.lines = Vec::new();
        self.index = -1;
        self.state = SyncState::NoTrack;
    }

    /// Recompute the active line for `position` seconds. Returns true when the
    /// index changed.
    pub fn update(&mut self, position: f64) -> bool {
        let index = match self.state {
            SyncState::NoTrack => -1,
            SyncState::Loaded | SyncState::Playing => {
                self.state = SyncState::Playing;
                resolve_active_index(&self.lines, position)
            }
        };
        let changed = index != self.index;
        self.index = index;
        changed
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    pub fn active_index(&self) -> isize {
        self.index
    }

    fn line_at(&self, index: isize) -> Option<&LyricLine> {
        usize::try_from(index).ok().and_then(|i| self.lines.get(i))
    }

    pub fn previous(&self) -> Option<&LyricLine> {
        if self.index <= 0 {
            return None;
        }
        self.line_at(self.index - 1)
    }

    pub fn current(&self) -> Option<&LyricLine> {
        self.line_at(self.index)
    }

    pub fn next(&self) -> Option<&LyricLine> {
        self.line_at(self.index + 1)
    }

    /// How far playback has moved from the current line towards the next one,
    /// in `0.0..=1.0`. The last line counts as complete.
    pub fn progress_in_line(&self, position: f64) -> f64 {
        let Some(current) = self.current() else {
            return 0.0;
        };
        let Some(next) = self.next() else {
            return 1.0;
        };
        let span = next.time - current.time;
        if span <= 0.0 {
            return 1.0;
        }
        ((position - current.time) / span).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(time: f64, text: &str) -> LyricLine {
        LyricLine {
            time,
            text: text.to_string(),
        }
    }

    fn three() -> Vec<LyricLine> {
        vec![line(1.0, "a"), line(3.0, "b"), line(5.0, "c")]
    }

    #[test]
    fn empty_sequence_is_always_minus_one() {
        for t in [-1.0, 0.0, 1.0, 1e9, f64::INFINITY] {
            assert_eq!(resolve_active_index(&[], t), -1);
        }
    }

    #[test]
    fn resolves_greatest_started_line() {
        let lines = three();
        assert_eq!(resolve_active_index(&lines, 0.5), -1);
        assert_eq!(resolve_active_index(&lines, 1.0), 0);
        assert_eq!(resolve_active_index(&lines, 3.0), 1);
        assert_eq!(resolve_active_index(&lines, 4.999), 1);
        assert_eq!(resolve_active_index(&lines, 100.0), 2);
    }

    #[test]
    fn nan_position_is_before_start() {
        assert_eq!(resolve_active_index(&three(), f64::NAN), -1);
    }

    #[test]
    fn duplicate_timestamps_pick_the_last() {
        let lines = vec![line(1.0, "a"), line(2.0, "b"), line(2.0, "c"), line(4.0, "d")];
        assert_eq!(resolve_active_index(&lines, 2.0), 2);
        assert_eq!(resolve_active_index(&lines, 1.5), 0);
    }

    #[test]
    fn backward_seek_is_independent_of_call_order() {
        let mut sync = LyricSync::new();
        sync.load("[00:01.00]a\n[00:03.00]b\n[00:05.00]c");
        sync.update(5.0);
        assert_eq!(sync.active_index(), 2);
        sync.update(1.0);
        assert_eq!(sync.active_index(), 0);
        sync.update(0.2);
        assert_eq!(sync.active_index(), -1);
        sync.update(3.5);
        assert_eq!(sync.active_index(), 1);
    }

    #[test]
    fn load_resets_index_before_first_update() {
        let mut sync = LyricSync::new();
        sync.load("[00:01.00]old a\n[00:02.00]old b");
        sync.update(10.0);
        assert_eq!(sync.active_index(), 1);

        sync.load("[00:30.00]new");
        assert_eq!(sync.state(), SyncState::Loaded);
        assert_eq!(sync.active_index(), -1);
        assert!(sync.current().is_none());

        // Stale position from the old track still resolves against the new lines
        sync.update(10.0);
        assert_eq!(sync.active_index(), -1);
        assert_eq!(sync.state(), SyncState::Playing);
    }

    #[test]
    fn clear_goes_back_to_no_track() {
        let mut sync = LyricSync::new();
        sync.load("[00:01.00]a");
        sync.update(2.0);
        sync.clear();
        assert_eq!(sync.state(), SyncState::NoTrack);
        assert_eq!(sync.active_index(), -1);
        assert!(!sync.update(2.0));
        assert_eq!(sync.active_index(), -1);
        assert!(sync.lines().is_empty());
    }

    #[test]
    fn update_reports_changes() {
        let mut sync = LyricSync::new();
        sync.load("[00:01.00]a\n[00:03.00]b");
        assert!(!sync.update(0.5));
        assert!(sync.update(1.0));
        assert!(!sync.update(2.0));
        assert!(sync.update(3.0));
    }

    #[test]
    fn neighbours() {
        let mut sync = LyricSync::new();
        sync.load("[00:01.00]a\n[00:03.00]b\n[00:05.00]c");

        sync.update(0.0);
        assert!(sync.previous().is_none());
        assert!(sync.current().is_none());
        assert_eq!(sync.next().map(|l| l.text.as_str()), Some("a"));

        sync.update(1.0);
        assert!(sync.previous().is_none());
        assert_eq!(sync.current().map(|l| l.text.as_str()), Some("a"));
        assert_eq!(sync.next().map(|l| l.text.as_str()), Some("b"));

        sync.update(6.0);
        assert_eq!(sync.previous().map(|l| l.text.as_str()), Some("b"));
        assert_eq!(sync.current().map(|l| l.text.as_str()), Some("c"));
        assert!(sync.next().is_none());
    }

    #[test]
    fn empty_document_has_no_lines() {
        let mut sync = LyricSync::new();
        sync.load("");
        sync.update(3.0);
        assert_eq!(sync.active_index(), -1);
        assert!(sync.current().is_none() && sync.next().is_none());
    }

    #[test]
    fn line_progress() {
        let mut sync = LyricSync::new();
        sync.load("[00:01.00]a\n[00:03.00]b");
        sync.update(0.0);
        assert_eq!(sync.progress_in_line(0.0), 0.0);
        sync.update(2.0);
        assert!((sync.progress_in_line(2.0) - 0.5).abs() < 1e-9);
        sync.update(4.0);
        assert_eq!(sync.progress_in_line(4.0), 1.0);
    }
}
