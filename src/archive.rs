use std::{
    fs,
    io::{self, Read, Seek},
    path::Path,
    sync::Arc,
};

use tracing::debug;

use crate::error::ArchiveError;
use crate::file_browser::is_audio_name;

/// An audio file pulled out of an archive, kept in memory.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Arc<[u8]>,
}

/// Extract every audio file from the archive at `path`, sorted by name.
///
/// Only `.zip` is supported; `.rar` is recognised so the user gets a useful
/// message instead of a generic one.
pub fn extract_audio_files(path: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "zip" => {
            let file = fs::File::open(path)?;
            extract_from_reader(io::BufReader::new(file))
        }
        "rar" => Err(ArchiveError::Unsupported("RAR".into())),
        "" => Err(ArchiveError::Unsupported("Unknown".into())),
        other => Err(ArchiveError::Unsupported(format!(".{other}"))),
    }
}

/// Entry sizes come from the archive header and are untrusted.
const MAX_PREALLOC: u64 = 64 << 20;

fn capacity_hint(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}

pub fn extract_from_reader<R: Read + Seek>(reader: R) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let mut zip = zip::ZipArchive::new(reader)?;
    let mut entries = Vec::new();

    for i in 0..zip.len() {
        let mut file = zip.by_index(i)?;
        if file.is_dir() || !is_audio_name(file.name()) {
            continue;
        }
        let name = file.name().to_string();
        let mut data = Vec::with_capacity(capacity_hint(file.size()));
        file.read_to_end(&mut data)?;
        debug!(%name, bytes = data.len(), "extracted archive entry");
        entries.push(ArchiveEntry {
            name,
            data: data.into(),
        });
    }

    entries.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(entries)
}
