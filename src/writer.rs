//! Writes tracks back out in TRACK text layout.
//!
//! Values are written with the shortest representation that parses back to
//! the same `f64`, so a file written here and reloaded with
//! [`Dialect::NoAssumptions`](crate::options::Dialect) and the same field
//! names reproduces the tracks exactly. Missing values are written as the
//! `1e25` sentinel, which the decoder reads back as missing.

use std::{
    collections::BTreeSet,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use flate2::{write::GzEncoder, Compression};

use crate::{
    error::TrackResult,
    header::Header,
    model::{Observation, Track},
};

const MISSING_VALUE: &str = "1.000000e+25";
const DERIVED_EXTRAS: [&str; 1] = ["vmax_kts"];

/// One added field of the output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub has_coords: bool,
}

impl FieldSpec {
    pub fn new(name: &str, has_coords: bool) -> Self {
        FieldSpec {
            name: name.to_string(),
            has_coords,
        }
    }

    /// Every quantity carried by the tracks: `mslp`, `vmax`, then the extras
    /// in name order. A field has coordinates when `<name>_lon` and
    /// `<name>_lat` are present too.
    pub fn infer(tracks: &[Track]) -> Vec<FieldSpec> {
        let mut names = BTreeSet::new();
        let mut has_pressure = false;
        let mut has_wind = false;

        for ob in tracks.iter().flat_map(|t| t.obs.iter()) {
            has_pressure |= ob.pressure.is_some();
            has_wind |= ob.wind_speed.is_some();
            names.extend(ob.extras.keys().map(String::as_str));
        }

        let is_coordinate = |name: &str| {
            ["_lon", "_lat"].iter().any(|suffix| {
                name.strip_suffix(suffix).map_or(false, |base| {
                    names.contains(base) || base == "mslp" || base == "vmax"
                })
            })
        };
        let field = |name: &str| {
            let has_coords = names.contains(format!("{}_lon", name).as_str())
                && names.contains(format!("{}_lat", name).as_str());
            FieldSpec::new(name, has_coords)
        };

        let mut fields = vec![];
        if has_pressure {
            fields.push(field("mslp"));
        }
        if has_wind {
            fields.push(field("vmax"));
        }
        fields.extend(
            names
                .iter()
                .copied()
                .filter(|name| !DERIVED_EXTRAS.contains(name) && !is_coordinate(*name))
                .map(field),
        );
        fields
    }
}

/// Writes the preamble, the declaration line and every track.
pub fn write_tracks<W: Write>(
    out: &mut W,
    tracks: &[Track],
    fields: &[FieldSpec],
) -> TrackResult<()> {
    let header = Header::new(tracks.len(), fields.iter().map(|f| f.has_coords).collect());

    writeln!(out, "0")?;
    writeln!(out, "0 0")?;
    writeln!(out, "{}", header.to_line())?;

    for track in tracks {
        match track.start_time.or_else(|| track.genesis_date()) {
            Some(start) => {
                writeln!(out, "TRACK_ID {} START_TIME {}", track.id, start.to_token())?
            }
            None => writeln!(out, "TRACK_ID {}", track.id)?,
        }
        writeln!(out, "POINT_NUM {}", track.len())?;

        for ob in &track.obs {
            writeln!(out, "{}", observation_line(ob, fields))?;
        }
    }

    Ok(())
}

/// Writes a file, gzipped when the name ends in `.gz`.
pub fn save_tracks(
    path: impl AsRef<Path>,
    tracks: &[Track],
    fields: &[FieldSpec],
) -> TrackResult<()> {
    let path = path.as_ref();
    let file = BufWriter::new(File::create(path)?);

    if path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("gz")) {
        let mut encoder = GzEncoder::new(file, Compression::default());
        write_tracks(&mut encoder, tracks, fields)?;
        encoder.finish()?.flush()?;
    } else {
        let mut file = file;
        write_tracks(&mut file, tracks, fields)?;
        file.flush()?;
    }

    Ok(())
}

fn observation_line(ob: &Observation, fields: &[FieldSpec]) -> String {
    let mut line = format!(
        "{} {} {} {} ",
        ob.time.to_token(),
        ob.lon,
        ob.lat,
        ob.vorticity
    );

    for field in fields {
        if field.has_coords {
            let lon = ob.extras.get(&format!("{}_lon", field.name)).copied();
            let lat = ob.extras.get(&format!("{}_lat", field.name)).copied();
            line.push_str(&format!("&{} &{} ", format_value(lon), format_value(lat)));
        }
        line.push_str(&format!("&{} ", format_value(field_value(ob, &field.name))));
    }
    line.push('&');

    line
}

fn field_value(ob: &Observation, name: &str) -> Option<f64> {
    match name {
        "mslp" => ob.pressure,
        "vmax" => ob.wind_speed,
        _ => ob.extras.get(name).copied(),
    }
}

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => MISSING_VALUE.to_string(),
    }
}

// -- Tests -------------------------------------------------------------------
