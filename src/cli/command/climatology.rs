//! Monthly storm counts for one season.

use std::{fmt, path::Path};

use anyhow::{anyhow, Result};
use stormtrack::{
    monthly_storm_count, storm_locations, storms_in_time_range, time_range, LoadOptions, Track,
    TrackPoint,
};

use super::read_tracks;

#[derive(Debug, PartialEq)]
pub struct Climatology {
    pub year: i32,
    /// (month, storms forming in it)
    pub monthly: Vec<(u32, usize)>,
    pub storms: usize,
    /// Mean genesis (lat, lon). Longitude is a circular mean in 0..360.
    pub mean_genesis: Option<(f64, f64)>,
}

impl fmt::Display for Climatology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "season {}: {} storms", self.year, self.storms)?;
        for (month, count) in &self.monthly {
            writeln!(f, "  {:>2}  {:>5}", month, count)?;
        }
        match self.mean_genesis {
            Some((lat, lon)) => write!(f, "mean genesis {:.2}N {:.2}E", lat, lon),
            None => write!(f, "mean genesis -"),
        }
    }
}

pub fn climatology(
    file: &Path,
    year: i32,
    months: &[u32],
    options: &LoadOptions,
) -> Result<Climatology> {
    time_range(year, months).ok_or_else(|| anyhow!("invalid season months {:?}", months))?;

    let (tracks, _) = read_tracks(file, options)?;
    Ok(season(&tracks, year, months))
}

fn season(tracks: &[Track], year: i32, months: &[u32]) -> Climatology {
    let in_season: Vec<Track> = storms_in_time_range(tracks, year, months)
        .cloned()
        .collect();

    let counts = monthly_storm_count(&in_season, &[year, year + 1], months, |_| true);
    let genesis = storm_locations(tracks, &[year], months, |_| true, TrackPoint::Genesis);

    let mean_genesis = (genesis.count > 0).then(|| {
        let n = genesis.count as f64;
        (
            genesis.lats.iter().sum::<f64>() / n,
            mean_longitude(&genesis.lons),
        )
    });

    Climatology {
        year,
        monthly: months.iter().copied().zip(counts).collect(),
        storms: in_season.len(),
        mean_genesis,
    }
}

/// Mean of the unit vectors, so 350 and 10 average to 0 rather than 180.
fn mean_longitude(lons: &[f64]) -> f64 {
    let (sin, cos) = lons.iter().fold((0.0, 0.0), |(sin, cos), lon: &f64| {
        let rad = lon.to_radians();
        (sin + rad.sin(), cos + rad.cos())
    });
    sin.atan2(cos).to_degrees().rem_euclid(360.0)
}

// -- Tests -------------------------------------------------------------------
