//! Describe the contents of a track file.

use std::{fmt, path::Path};

use anyhow::Result;
use stormtrack::{LayoutKind, LoadOptions, Timestamp, Track};

use super::read_tracks;

#[derive(Debug, PartialEq)]
pub struct Summary {
    pub layout: LayoutKind,
    pub tracks: usize,
    pub observations: usize,
    pub first_time: Option<Timestamp>,
    pub last_time: Option<Timestamp>,
    pub max_wind_speed: Option<f64>,
    pub min_pressure: Option<f64>,
}

impl Summary {
    fn from_tracks(layout: LayoutKind, tracks: &[Track]) -> Self {
        let obs = || tracks.iter().flat_map(|t| t.obs.iter());

        Summary {
            layout,
            tracks: tracks.len(),
            observations: obs().count(),
            first_time: obs().map(|ob| ob.time).min(),
            last_time: obs().map(|ob| ob.time).max(),
            max_wind_speed: obs().filter_map(|ob| ob.wind_speed).reduce(f64::max),
            min_pressure: obs().filter_map(|ob| ob.pressure).reduce(f64::min),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let time = |t: Option<Timestamp>| t.map_or("-".to_string(), |t| t.to_string());
        let value = |v: Option<f64>| v.map_or("-".to_string(), |v| format!("{:.1}", v));

        writeln!(f, "layout        {:?}", self.layout)?;
        writeln!(f, "tracks        {}", self.tracks)?;
        writeln!(f, "observations  {}", self.observations)?;
        writeln!(f, "first time    {}", time(self.first_time))?;
        writeln!(f, "last time     {}", time(self.last_time))?;
        writeln!(f, "max wind      {} m/s", value(self.max_wind_speed))?;
        write!(f, "min pressure  {} hPa", value(self.min_pressure))
    }
}

pub fn summary(file: &Path, options: &LoadOptions) -> Result<Summary> {
    let (tracks, layout) = read_tracks(file, options)?;

    Ok(Summary::from_tracks(layout, &tracks))
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use std::fs;

    use stormtrack::{CalendarKind, Dialect};
    use tempfile::TempDir;

    use super::*;

    const FILE: &str = "0
0 0
TRACK_NUM        2 ADD_FLD    2    2 &00
TRACK_ID 1
POINT_NUM 2
2000050600 285.4 22.4 1.57 &101662.2 &14.0 &
2000050606 285.1 22.9 1.60 &1002.5 &18.5 &
TRACK_ID 2
POINT_NUM 1
2000060100 300.0 15.0 2.10 &1008.2 &11.0 &
";

    #[test]
    fn should_summarise_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tracks.txt");
        fs::write(&path, FILE).unwrap();

        let options = LoadOptions::new(
            Dialect::NoAssumptions {
                variable_names: vec!["mslp".into(), "vmax".into()],
            },
            0,
            CalendarKind::Day360,
        );
        let summary = summary(&path, &options).unwrap();

        assert_eq!(summary.layout, LayoutKind::NoAssumptions);
        assert_eq!(summary.tracks, 2);
        assert_eq!(summary.observations, 3);
        assert_eq!(summary.max_wind_speed, Some(18.5));
        assert_eq!(summary.min_pressure, Some(1002.5));
        assert_eq!(
            summary.last_time.map(|t| t.to_token()),
            Some("2000060100".to_string())
        );
        assert!(summary.to_string().contains("tracks        2"));
    }
}
