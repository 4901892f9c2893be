use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use stormtrack::{LoadOptions, TrackContainer};
use tracing::info;

use super::{make_container_dir, read_tracks};
use crate::cli::create_spinner;

/// Converts a track file into a container directory and returns its path.
pub fn convert(file: &Path, dir: Option<&Path>, options: &LoadOptions) -> Result<PathBuf> {
    let dir = dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| make_container_dir(file));

    let (tracks, _) = read_tracks(file, options)?;

    let bar = create_spinner("Writing track container...".to_string());
    let container = TrackContainer::from_tracks(&tracks);
    container
        .write(&dir)
        .with_context(|| format!("cannot write container `{}`", dir.display()))?;
    bar.finish_with_message("Track container written");

    info!(
        tracks = container.track_count(),
        records = container.record_count(),
        "converted {}",
        file.display()
    );

    Ok(dir)
}

// -- Tests -------------------------------------------------------------------
