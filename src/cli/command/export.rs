use std::path::Path;

use anyhow::{Context, Result};
use stormtrack::{save_tracks, FieldSpec, TrackContainer};

use crate::cli::create_spinner;

/// Writes the tracks of a container directory out as a TRACK text file.
pub fn export(dir: &Path, file: &Path) -> Result<String> {
    let bar = create_spinner("Reading track container...".to_string());
    let tracks = TrackContainer::read(dir)
        .and_then(|container| container.to_tracks())
        .with_context(|| format!("cannot read container `{}`", dir.display()))?;
    bar.finish_with_message(format!("Read {} tracks", tracks.len()));

    let fields = FieldSpec::infer(&tracks);
    save_tracks(file, &tracks, &fields)?;

    Ok(file.to_string_lossy().to_string())
}

// -- Tests -------------------------------------------------------------------
