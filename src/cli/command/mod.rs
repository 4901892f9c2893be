pub mod climatology;
pub mod convert;
pub mod export;
pub mod summary;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use stormtrack::{LayoutKind, LoadOptions, Track, TrackReader};

use super::create_progress_bar;

pub use climatology::climatology;
pub use convert::convert;
pub use export::export;
pub use summary::summary;

/// Loads every track of `file`, showing progress against the declared count.
pub fn read_tracks(file: &Path, options: &LoadOptions) -> Result<(Vec<Track>, LayoutKind)> {
    let reader = TrackReader::open(file, options)
        .with_context(|| format!("cannot open `{}`", file.display()))?;
    let kind = reader.layout().kind;

    let bar = create_progress_bar(
        reader.header().track_count as u64,
        format!("Reading {}", file.display()),
    );
    let mut tracks = Vec::with_capacity(reader.header().track_count);
    for track in reader {
        tracks.push(track?);
        bar.inc(1);
    }
    bar.finish_with_message(format!("Read {} tracks", tracks.len()));

    Ok((tracks, kind))
}

/// `<stem>-tracks` beside the input file, with any `.gz` suffix dropped first.
pub fn make_container_dir(file: &Path) -> PathBuf {
    let name = file
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    let stem = Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "storms".to_string());

    file.with_file_name(format!("{}-tracks", stem))
}

// -- Tests -------------------------------------------------------------------
