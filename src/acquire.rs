//! Turns user-supplied paths into playlist tracks.
//!
//! Paths expand into audio items (directories are scanned, zip archives are
//! unpacked in memory). Each item then gets its lyrics from the cache, a
//! sidecar `.lrc` file or the transcriber, in that order.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, mpsc},
    thread,
};

use tracing::{info, warn};

use crate::archive;
use crate::cache::LrcCache;
use crate::file_browser::{collect_files, is_archive_file, is_audio_file, scan_directory};
use crate::lrc;
use crate::playlist::{AudioSource, LyricOrigin, Track};
use crate::transcribe::Transcriber;

#[derive(Debug)]
pub enum AcquireEvent {
    Progress { done: usize, total: usize, name: String },
    Track(Track),
    Failed { path: PathBuf, error: String },
    Finished { added: usize },
}

/// One playable item before its lyrics are resolved.
#[derive(Debug, Clone)]
struct Pending {
    name: String,
    source: AudioSource,
}

pub fn mime_type(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}

fn sidecar_path(audio: &Path) -> PathBuf {
    audio.with_extension("lrc")
}

pub struct Acquirer {
    cache: Option<LrcCache>,
    transcriber: Option<Arc<dyn Transcriber>>,
}

impl Acquirer {
    pub fn new(cache: Option<LrcCache>, transcriber: Option<Arc<dyn Transcriber>>) -> Self {
        Acquirer { cache, transcriber }
    }

    /// Expand paths into pending items, reporting paths that could not be read.
    fn expand(&self, paths: &[PathBuf], failed: &mut Vec<(PathBuf, String)>) -> Vec<Pending> {
        let mut items = Vec::new();
        for path in paths {
            if path.is_dir() {
                let files = collect_files(&scan_directory(path));
                if files.is_empty() {
                    failed.push((path.clone(), "no audio files found".into()));
                }
                for file in files {
                    self.expand_file(&file, &mut items, failed);
                }
            } else if path.is_file() {
                self.expand_file(path, &mut items, failed);
            } else {
                failed.push((path.clone(), "file not found".into()));
            }
        }
        items
    }

    fn expand_file(&self, path: &Path, items: &mut Vec<Pending>, failed: &mut Vec<(PathBuf, String)>) {
        if is_archive_file(path) {
            match archive::extract_audio_files(path) {
                Ok(entries) => {
                    info!(archive = %path.display(), count = entries.len(), "extracted archive");
                    items.extend(entries.into_iter().map(|e| Pending {
                        name: e.name,
                        source: AudioSource::Memory(e.data),
                    }));
                }
                Err(e) => failed.push((path.to_path_buf(), e.to_string())),
            }
        } else if is_audio_file(path) {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            items.push(Pending {
                name,
                source: AudioSource::File(path.to_path_buf()),
            });
        } else {
            failed.push((path.to_path_buf(), "not an audio file or archive".into()));
        }
    }

    fn cached(&self, name: &str) -> Option<String> {
        let cache = self.cache.as_ref()?;
        match cache.load(name) {
            // Entries written by older runs may hold a failure; retry those
            Ok(Some(text)) if lrc::is_failure_sentinel(&text) => None,
            Ok(hit) => hit,
            Err(e) => {
                warn!(%name, error = %e, "lyrics cache read failed");
                None
            }
        }
    }

    fn store(&self, name: &str, lrc: &str) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store(name, lrc) {
                warn!(%name, error = %e, "lyrics cache write failed");
            }
        }
    }

    fn transcribe(&self, item: &Pending) -> Option<String> {
        let transcriber = self.transcriber.as_ref()?;
        let bytes: Arc<[u8]> = match &item.source {
            AudioSource::Memory(data) => Arc::clone(data),
            AudioSource::File(path) => match fs::read(path) {
                Ok(data) => data.into(),
                Err(e) => {
                    warn!(name = %item.name, error = %e, "could not read audio for transcription");
                    return None;
                }
            },
        };
        match transcriber.transcribe(&bytes, mime_type(&item.name), &item.name) {
            Ok(text) if lrc::is_failure_sentinel(&text) => {
                warn!(name = %item.name, "model reported transcription failure");
                None
            }
            Ok(text) => Some(text),
            Err(e) => {
                warn!(name = %item.name, error = %e, "transcription failed");
                None
            }
        }
    }

    fn resolve(&self, item: Pending) -> Track {
        let (lrc, origin) = if let Some(text) = self.cached(&item.name) {
            (text, LyricOrigin::Cache)
        } else if let Some(text) = match &item.source {
            AudioSource::File(path) => fs::read_to_string(sidecar_path(path)).ok(),
            AudioSource::Memory(_) => None,
        } {
            (text, LyricOrigin::Sidecar)
        } else if let Some(text) = self.transcribe(&item) {
            self.store(&item.name, &text);
            (text, LyricOrigin::Transcribed)
        } else {
            (lrc::failure_sentinel(&item.name), LyricOrigin::Failed)
        };

        Track {
            name: item.name,
            source: item.source,
            lrc,
            origin,
        }
    }

    /// Process every path, sending events as work progresses. Always ends
    /// with `Finished`, unless the receiver hangs up first.
    pub fn run(&self, paths: &[PathBuf], tx: &mpsc::Sender<AcquireEvent>) {
        let mut failed = Vec::new();
        let items = self.expand(paths, &mut failed);
        for (path, error) in failed {
            warn!(path = %path.display(), %error, "skipping input");
            if tx.send(AcquireEvent::Failed { path, error }).is_err() {
                return;
            }
        }

        let total = items.len();
        let mut added = 0;
        for (i, item) in items.into_iter().enumerate() {
            let progress = AcquireEvent::Progress {
                done: i,
                total,
                name: item.name.clone(),
            };
            if tx.send(progress).is_err() {
                return;
            }
            let track = self.resolve(item);
            info!(name = %track.name, origin = track.origin.label(), "track ready");
            if tx.send(AcquireEvent::Track(track)).is_err() {
                return;
            }
            added += 1;
        }
        let _ = tx.send(AcquireEvent::Finished { added });
    }
}

/// Run acquisition on a worker thread.
pub fn spawn_acquisition(acquirer: Arc<Acquirer>, paths: Vec<PathBuf>) -> mpsc::Receiver<AcquireEvent> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || acquirer.run(&paths, &tx));
    rx
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Cursor, Write},
        sync::atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::error::TranscribeError;

    struct FakeTranscriber {
        calls: AtomicUsize,
        reply: Option<&'static str>,
    }

    impl FakeTranscriber {
        fn new(reply: Option<&'static str>) -> Arc<Self> {
            Arc::new(FakeTranscriber {
                calls: AtomicUsize::new(0),
                reply,
            })
        }
    }

    impl Transcriber for FakeTranscriber {
        fn transcribe(&self, _audio: &[u8], _mime: &str, _name: &str) -> Result<String, TranscribeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .map(str::to_string)
                .ok_or(TranscribeError::InvalidFormat)
        }
    }

    fn collect(acquirer: &Acquirer, paths: &[PathBuf]) -> Vec<AcquireEvent> {
        let (tx, rx) = mpsc::channel();
        acquirer.run(paths, &tx);
        drop(tx);
        rx.into_iter().collect()
    }

    fn tracks(events: Vec<AcquireEvent>) -> Vec<Track> {
        events
            .into_iter()
            .filter_map(|e| match e {
                AcquireEvent::Track(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn mime_types() {
        assert_eq!(mime_type("a.MP3"), "audio/mpeg");
        assert_eq!(mime_type("dir/b.m4a"), "audio/mp4");
        assert_eq!(mime_type("c.flac"), "audio/flac");
        assert_eq!(mime_type("noext"), "application/octet-stream");
    }

    #[test]
    fn cache_hit_skips_transcription() {
        let dir = tempfile::tempdir().unwrap();
        let song = dir.path().join("song.mp3");
        fs::write(&song, b"audio").unwrap();
        let cache = LrcCache::new(dir.path().join("cache"));
        cache.store("song.mp3", "[00:01.00]cached").unwrap();

        let fake = FakeTranscriber::new(Some("[00:01.00]fresh"));
        let acquirer = Acquirer::new(Some(cache), Some(fake.clone()));
        let got = tracks(collect(&acquirer, &[song]));

        assert_eq!(got.len(), 1);
        assert_eq!(got[0].lrc, "[00:01.00]cached");
        assert_eq!(got[0].origin, LyricOrigin::Cache);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn miss_transcribes_and_stores() {
        let dir = tempfile::tempdir().unwrap();
        let song = dir.path().join("song.mp3");
        fs::write(&song, b"audio").unwrap();
        let cache = LrcCache::new(dir.path().join("cache"));

        let fake = FakeTranscriber::new(Some("[00:01.00]fresh"));
        let acquirer = Acquirer::new(Some(cache.clone()), Some(fake.clone()));
        let got = tracks(collect(&acquirer, &[song.clone()]));

        assert_eq!(got[0].lrc, "[00:01.00]fresh");
        assert_eq!(got[0].origin, LyricOrigin::Transcribed);
        assert_eq!(cache.load("song.mp3").unwrap().as_deref(), Some("[00:01.00]fresh"));

        // Second run is served from the cache
        tracks(collect(&acquirer, &[song]));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failure_yields_sentinel_and_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let song = dir.path().join("song.mp3");
        fs::write(&song, b"audio").unwrap();
        let cache = LrcCache::new(dir.path().join("cache"));

        let acquirer = Acquirer::new(Some(cache.clone()), Some(FakeTranscriber::new(None)));
        let got = tracks(collect(&acquirer, &[song]));

        assert_eq!(got[0].lrc, "[00:00.00]Transcription failed for song.mp3.");
        assert_eq!(got[0].origin, LyricOrigin::Failed);
        assert_eq!(cache.load("song.mp3").unwrap(), None);
    }

    #[test]
    fn offline_without_sidecar_fails_softly() {
        let dir = tempfile::tempdir().unwrap();
        let song = dir.path().join("a.wav");
        fs::write(&song, b"audio").unwrap();
        let got = tracks(collect(&Acquirer::new(None, None), &[song]));
        assert_eq!(got[0].origin, LyricOrigin::Failed);
        assert!(lrc::is_failure_sentinel(&got[0].lrc));
    }

    #[test]
    fn sidecar_beats_transcription() {
        let dir = tempfile::tempdir().unwrap();
        let song = dir.path().join("song.flac");
        fs::write(&song, b"audio").unwrap();
        fs::write(dir.path().join("song.lrc"), "[00:02.00]side").unwrap();

        let fake = FakeTranscriber::new(Some("[00:01.00]fresh"));
        let acquirer = Acquirer::new(None, Some(fake.clone()));
        let got = tracks(collect(&acquirer, &[song]));
        assert_eq!(got[0].lrc, "[00:02.00]side");
        assert_eq!(got[0].origin, LyricOrigin::Sidecar);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn archives_and_directories_expand_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for name in ["z.mp3", "m.ogg", "readme.md"] {
            writer.start_file(name, options).unwrap();
            writer.write_all(name.as_bytes()).unwrap();
        }
        let zip_bytes = writer.finish().unwrap().into_inner();

        let album = dir.path().join("album");
        fs::create_dir(&album).unwrap();
        fs::write(album.join("bundle.zip"), zip_bytes).unwrap();
        fs::write(album.join("a.mp3"), b"a").unwrap();

        let acquirer = Acquirer::new(None, Some(FakeTranscriber::new(Some("[00:00.00]Instrumental"))));
        let events = collect(&acquirer, &[album]);
        assert!(matches!(events.last(), Some(AcquireEvent::Finished { added: 3 })));

        let got = tracks(events);
        let names: Vec<&str> = got.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["a.mp3", "m.ogg", "z.mp3"]);
        assert!(matches!(&got[1].source, AudioSource::Memory(data) if &**data == b"m.ogg"));
    }

    #[test]
    fn bad_inputs_are_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.mp3");
        let rar = dir.path().join("set.rar");
        fs::write(&rar, b"rar").unwrap();
        let song = dir.path().join("ok.mp3");
        fs::write(&song, b"audio").unwrap();

        let events = collect(&Acquirer::new(None, None), &[missing, rar, song]);
        let failures = events
            .iter()
            .filter(|e| matches!(e, AcquireEvent::Failed { .. }))
            .count();
        assert_eq!(failures, 2);
        assert!(matches!(events.last(), Some(AcquireEvent::Finished { added: 1 })));
    }

    #[test]
    fn spawned_worker_finishes() {
        let dir = tempfile::tempdir().unwrap();
        let song = dir.path().join("x.mp3");
        fs::write(&song, b"audio").unwrap();
        let rx = spawn_acquisition(Arc::new(Acquirer::new(None, None)), vec![song]);
        let events: Vec<AcquireEvent> = rx.into_iter().collect();
        assert!(matches!(events[0], AcquireEvent::Progress { done: 0, total: 1, .. }));
        assert!(matches!(events.last(), Some(AcquireEvent::Finished { added: 1 })));
    }
}
