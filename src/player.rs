use std::{
    fs,
    io::{self, Cursor},
    path::Path,
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use symphonia::core::{
    formats::FormatOptions,
    io::{MediaSource, MediaSourceStream},
    meta::MetadataOptions,
    probe::Hint,
};
use tracing::{debug, warn};

use crate::playlist::{AudioSource, Track};

/// Read the track length from container metadata without decoding.
pub fn probe_duration(source: &AudioSource, name: &str) -> Option<Duration> {
    let media: Box<dyn MediaSource> = match source {
        AudioSource::File(path) => Box::new(fs::File::open(path).ok()?),
        AudioSource::Memory(data) => Box::new(Cursor::new(Arc::clone(data))),
    };
    let mss = MediaSourceStream::new(media, Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = Path::new(name).extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .ok()?;

    let reader = probed.format;
    let track = reader.default_track()?;
    let time_base = track.codec_params.time_base?;
    let n_frames = track.codec_params.n_frames?;
    let time = time_base.calc_time(n_frames);

    Some(Duration::from_secs_f64(time.seconds as f64 + time.frac))
}

/// The playback device: one output stream, one sink per loaded track.
pub struct Player {
    stream: OutputStream,
    sink: Option<Sink>,
    source: Option<AudioSource>,
    paused: bool,
    volume: f32,
    total_duration: Option<Duration>,
    seek_base: Duration,
}

impl Player {
    pub fn new(volume: f32) -> Result<Self> {
        let stream = OutputStreamBuilder::from_default_device()
            .context("failed to find audio device")?
            .open_stream_or_fallback()
            .context("failed to open audio stream")?;
        Ok(Player {
            stream,
            sink: None,
            source: None,
            paused: false,
            volume: volume.clamp(0.0, 2.0),
            total_duration: None,
            seek_base: Duration::ZERO,
        })
    }

    /// Start playing `track` from the beginning, replacing whatever was loaded.
    pub fn load(&mut self, track: &Track) -> Result<()> {
        self.stop();
        self.total_duration = probe_duration(&track.source, &track.name);
        self.source = Some(track.source.clone());
        self.paused = false;
        let started = self.start_at(Duration::ZERO);
        if started.is_err() {
            // Nothing is playing, so the track must not look finished either
            self.stop();
        }
        started.with_context(|| format!("failed to play {}", track.name))
    }

    pub fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.source = None;
        self.total_duration = None;
        self.seek_base = Duration::ZERO;
    }

    fn start_at(&mut self, at: Duration) -> Result<()> {
        let Some(source) = self.source.clone() else {
            return Ok(());
        };
        match source {
            AudioSource::File(path) => {
                let file = fs::File::open(&path)
                    .with_context(|| format!("failed to open {}", path.display()))?;
                let decoder = Decoder::new(io::BufReader::new(file)).context("failed to decode audio file")?;
                self.attach(decoder, at);
            }
            AudioSource::Memory(data) => {
                let decoder = Decoder::new(Cursor::new(data)).context("failed to decode audio data")?;
                self.attach(decoder, at);
            }
        }
        Ok(())
    }

    // A fresh sink per start avoids clear() leaving stale samples queued
    fn attach<S: Source + Send + 'static>(&mut self, mut source: S, at: Duration) {
        if let Some(old) = self.sink.take() {
            old.stop();
        }
        if !at.is_zero() {
            if let Err(e) = source.try_seek(at) {
                warn!(error = ?e, "seek failed");
            }
        }
        let sink = Sink::connect_new(self.stream.mixer());
        sink.set_volume(self.volume);
        sink.append(source);
        if self.paused {
            sink.pause();
        }
        self.sink = Some(sink);
        self.seek_base = at;
    }

    pub fn has_track(&self) -> bool {
        self.source.is_some()
    }

    pub fn position(&self) -> Duration {
        match &self.sink {
            Some(sink) => self.seek_base + sink.get_pos(),
            None => Duration::ZERO,
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        self.total_duration
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn toggle_pause(&mut self) {
        let Some(sink) = &self.sink else {
            return;
        };
        if self.paused {
            sink.play();
        } else {
            sink.pause();
        }
        self.paused = !self.paused;
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 2.0);
        if let Some(sink) = &self.sink {
            sink.set_volume(self.volume);
        }
    }

    pub fn volume_up(&mut self) {
        self.set_volume(((self.volume * 20.0).round() + 1.0) / 20.0);
    }

    pub fn volume_down(&mut self) {
        self.set_volume(((self.volume * 20.0).round() - 1.0) / 20.0);
    }

    /// Seek relative to the current position, clamped to the track bounds.
    pub fn seek(&mut self, offset_secs: i64) -> Result<()> {
        if self.source.is_none() {
            return Ok(());
        }
        let current = self.position();
        let delta = Duration::from_secs(offset_secs.unsigned_abs());
        let target = if offset_secs >= 0 {
            current + delta
        } else {
            current.saturating_sub(delta)
        };
        let clamped = self.total_duration.map(|t| target.min(t)).unwrap_or(target);
        debug!(from = ?current, to = ?clamped, "seek");
        self.start_at(clamped)
    }

    /// True once a loaded track has played to the end.
    pub fn is_finished(&self) -> bool {
        self.source.is_some() && reached_end(self.paused, self.sink.as_ref().map(Sink::empty))
    }
}

/// A track has ended when its sink exists and has drained while not paused.
/// No sink means playback never started.
fn reached_end(paused: bool, sink_empty: Option<bool>) -> bool {
    !paused && sink_empty == Some(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_started_is_not_finished() {
        assert!(!reached_end(false, None));
        assert!(!reached_end(true, None));
    }

    #[test]
    fn drained_sink_is_finished_unless_paused() {
        assert!(reached_end(false, Some(true)));
        assert!(!reached_end(true, Some(true)));
        assert!(!reached_end(false, Some(false)));
    }

    #[test]
    fn undecodable_audio_has_no_duration() {
        let source = AudioSource::Memory(Arc::from(&b"not audio at all"[..]));
        assert_eq!(probe_duration(&source, "broken.mp3"), None);
    }
}
