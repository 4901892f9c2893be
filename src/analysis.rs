//! Climatology helpers over loaded tracks.
//!
//! Basins are plain predicates over a whole track, so any geometry library
//! can be plugged in; [`BoundingBox`] covers the simple lat/lon box case.

use crate::{
    calendar::Timestamp,
    model::{LonConvention, Observation, Track},
};

/// Half-open range of calendar months, `[start, end)`, as (year, month).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: (i32, u32),
    pub end: (i32, u32),
}

impl TimeRange {
    pub fn contains(&self, time: &Timestamp) -> bool {
        match time.ymdh() {
            Some((year, month, _, _)) => {
                let ym = (year, month);
                self.start <= ym && ym < self.end
            }
            None => false,
        }
    }
}

/// The range covering `months` of `year`. A month list that runs past
/// December (e.g. `[11, 12, 1]`) ends in the following year.
pub fn time_range(year: i32, months: &[u32]) -> Option<TimeRange> {
    let first = *months.first()?;
    let last = *months.last()?;
    if !(1..=12).contains(&first) || !(1..=12).contains(&last) {
        return None;
    }

    let next = last + 1;
    let end_year = if next < first || next == 13 || months.len() >= 12 {
        year + 1
    } else {
        year
    };
    let end_month = if next == 13 { 1 } else { next };

    Some(TimeRange {
        start: (year, first),
        end: (end_year, end_month),
    })
}

/// Tracks whose first observation falls in the months of `year`.
pub fn storms_in_time_range<'a>(
    tracks: &'a [Track],
    year: i32,
    months: &[u32],
) -> impl Iterator<Item = &'a Track> + 'a {
    let range = time_range(year, months);
    tracks.iter().filter(move |track| {
        match (range, track.genesis_date()) {
            (Some(range), Some(time)) => range.contains(&time),
            _ => false,
        }
    })
}

/// Genesis month of every track that formed in `years` inside `basin`.
pub fn genesis_months<F>(tracks: &[Track], years: &[i32], basin: F) -> Vec<u32>
where
    F: Fn(&Track) -> bool,
{
    tracks
        .iter()
        .filter_map(|track| {
            let (year, month, _, _) = track.genesis_date()?.ymdh()?;
            (years.contains(&year) && basin(track)).then_some(month)
        })
        .collect()
}

/// Storm counts per entry of `months`.
pub fn monthly_storm_count<F>(
    tracks: &[Track],
    years: &[i32],
    months: &[u32],
    basin: F,
) -> Vec<usize>
where
    F: Fn(&Track) -> bool,
{
    let genesis = genesis_months(tracks, years, basin);
    months
        .iter()
        .map(|month| genesis.iter().filter(|m| *m == month).count())
        .collect()
}

/// Which point of each track [`storm_locations`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackPoint {
    Genesis,
    Lysis,
    MaxIntensity,
    #[default]
    All,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StormLocations {
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    /// Number of storms contributing points.
    pub count: usize,
}

/// Positions of the storms formed in `years`/`months` inside `basin`, with
/// longitudes normalised into 0..360.
pub fn storm_locations<F>(
    tracks: &[Track],
    years: &[i32],
    months: &[u32],
    basin: F,
    point: TrackPoint,
) -> StormLocations
where
    F: Fn(&Track) -> bool,
{
    let mut locations = StormLocations::default();

    for year in years {
        for track in storms_in_time_range(tracks, *year, months).filter(|t| basin(t)) {
            let obs: Vec<&Observation> = match point {
                TrackPoint::Genesis => track.genesis().into_iter().collect(),
                TrackPoint::Lysis => track.lysis().into_iter().collect(),
                TrackPoint::MaxIntensity => track.obs_at_vmax().into_iter().collect(),
                TrackPoint::All => track.obs.iter().collect(),
            };
            for ob in obs {
                locations.lats.push(ob.lat);
                locations.lons.push(LonConvention::ZeroTo360.wrap(ob.lon));
            }
            locations.count += 1;
        }
    }

    locations
}

/// A lat/lon box. Longitudes are compared in the 0..360 convention and the
/// box may straddle the prime meridian (`lon_min > lon_max`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl BoundingBox {
    pub fn new(lon_min: f64, lon_max: f64, lat_min: f64, lat_max: f64) -> Self {
        let wrap = |lon| LonConvention::ZeroTo360.wrap(lon);
        BoundingBox {
            lon_min: wrap(lon_min),
            lon_max: wrap(lon_max),
            lat_min,
            lat_max,
        }
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        let lon = LonConvention::ZeroTo360.wrap(lon);
        let lon_inside = if self.lon_min <= self.lon_max {
            self.lon_min <= lon && lon <= self.lon_max
        } else {
            lon >= self.lon_min || lon <= self.lon_max
        };
        lon_inside && self.lat_min <= lat && lat <= self.lat_max
    }

    /// True when any point of the track lies inside the box.
    pub fn hits(&self, track: &Track) -> bool {
        track
            .coordinates(LonConvention::ZeroTo360)
            .into_iter()
            .any(|(lon, lat)| self.contains(lon, lat))
    }
}

// -- Tests -------------------------------------------------------------------
