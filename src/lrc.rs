//! LRC parser
//!
//! Handles the `[mm:ss.xx]text` line format. Anything that does not match is
//! dropped silently, so a half-broken document degrades to fewer lines.

use std::fmt::Write;

/// Returned by the transcriber for tracks without vocals.
pub const INSTRUMENTAL: &str = "[00:00.00]Instrumental";

const FAILURE_PREFIX: &str = "[00:00.00]Transcription failed";

/// A single timestamped line of lyrics.
#[derive(Debug, Clone, PartialEq)]
pub struct LyricLine {
    /// Start time in seconds
    pub time: f64,
    pub text: String,
}

/// The one-line document stored when transcription of `name` fails.
pub fn failure_sentinel(name: &str) -> String {
    format!("{FAILURE_PREFIX} for {name}.")
}

pub fn is_failure_sentinel(raw: &str) -> bool {
    raw.trim_start().starts_with(FAILURE_PREFIX)
}

fn two_digits(b: &[u8]) -> Option<u32> {
    match b {
        [hi @ b'0'..=b'9', lo @ b'0'..=b'9'] => Some(u32::from(hi - b'0') * 10 + u32::from(lo - b'0')),
        _ => None,
    }
}

/// Parse `[mm:ss.xx]` or `[mm:ss.xxx]` at the start of `src`.
/// Returns the time in seconds and the remainder of the line.
fn parse_stamp(src: &str) -> Option<(f64, &str)> {
    let b = src.as_bytes();
    if b.len() < 10 || b[0] != b'[' || b[3] != b':' || b[6] != b'.' {
        return None;
    }
    let minutes = two_digits(&b[1..3])?;
    let seconds = two_digits(&b[4..6])?;

    let frac_len = b[7..].iter().take_while(|c| c.is_ascii_digit()).count();
    if !(2..=3).contains(&frac_len) || b.get(7 + frac_len) != Some(&b']') {
        return None;
    }
    // Two digits are hundredths: pad on the right to get milliseconds.
    let millis = b[7..7 + frac_len]
        .iter()
        .chain(std::iter::repeat(&b'0'))
        .take(3)
        .fold(0u32, |acc, d| acc * 10 + u32::from(d - b'0'));

    let time = f64::from(minutes) * 60.0 + f64::from(seconds) + f64::from(millis) / 1000.0;
    Some((time, &src[8 + frac_len..]))
}

/// Trim whitespace plus U+FEFF, which `str::trim` keeps.
fn trim_line(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}')
}

/// Parse a single trimmed line. The timestamp may appear anywhere in the line;
/// the first well-formed one wins.
fn parse_line(line: &str) -> Option<LyricLine> {
    let (time, rest) = line
        .match_indices('[')
        .find_map(|(start, _)| parse_stamp(&line[start..]))?;

    // Text stops at the first line terminator left after splitting on '\n'
    let text = trim_line(
        rest.split(['\r', '\u{2028}', '\u{2029}'])
            .next()
            .unwrap_or_default(),
    );
    if text.is_empty() {
        return None;
    }
    Some(LyricLine {
        time,
        text: text.to_string(),
    })
}

/// Parse LRC content into lyric lines sorted by time.
///
/// Lines with equal timestamps keep their order from the source.
pub fn parse(src: &str) -> Vec<LyricLine> {
    let mut lines: Vec<LyricLine> = src
        .split('\n')
        .filter_map(|line| parse_line(trim_line(line)))
        .collect();
    lines.sort_by(|a, b| a.time.total_cmp(&b.time));
    lines
}

/// Format seconds as an LRC timestamp with hundredths: `[mm:ss.xx]`
pub fn format_timestamp(seconds: f64) -> String {
    let centis = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 100.0).round() as u64
    } else {
        0
    };
    format!(
        "[{:02}:{:02}.{:02}]",
        centis / 6000,
        (centis / 100) % 60,
        centis % 100
    )
}

/// Convert lyric lines back to LRC text, one line per entry.
pub fn to_lrc(lines: &[LyricLine]) -> String {
    let capacity: usize = lines.iter().map(|l| l.text.len() + 11).sum();
    let mut out = String::with_capacity(capacity);
    for line in lines {
        let _ = writeln!(out, "{}{}", format_timestamp(line.time), line.text);
    }
    out
}
