//! Storm tracks and their observations.

use std::collections::BTreeMap;

use crate::calendar::Timestamp;

/// One sampled point of a storm track.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub time: Timestamp,
    pub lon: f64,
    pub lat: f64,
    /// Relative vorticity (s-1, scaled as written by TRACK).
    pub vorticity: f64,
    /// Maximum wind speed (m/s).
    pub wind_speed: Option<f64>,
    /// Minimum sea-level pressure, always hPa.
    pub pressure: Option<f64>,
    pub extras: BTreeMap<String, f64>,
}

impl Observation {
    pub fn new(time: Timestamp, lon: f64, lat: f64, vorticity: f64) -> Self {
        Observation {
            time,
            lon,
            lat,
            vorticity,
            wind_speed: None,
            pressure: None,
            extras: BTreeMap::new(),
        }
    }

    /// True for records taken at 00, 06, 12 or 18Z.
    pub fn six_hourly_timestep(&self) -> bool {
        matches!(self.time.ymdh(), Some((_, _, _, hour)) if hour % 6 == 0)
    }
}

/// Longitude convention requested by geometry consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LonConvention {
    /// 0 to 360 degrees east.
    ZeroTo360,
    /// -180 to 180 degrees.
    Signed,
}

impl LonConvention {
    pub fn wrap(&self, lon: f64) -> f64 {
        match self {
            LonConvention::ZeroTo360 => (lon + 720.0) % 360.0,
            LonConvention::Signed => {
                let wrapped = (lon + 540.0) % 360.0 - 180.0;
                if wrapped < -180.0 {
                    wrapped + 360.0
                } else {
                    wrapped
                }
            }
        }
    }
}

/// A storm: the observations sharing one track identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: u64,
    pub start_time: Option<Timestamp>,
    pub obs: Vec<Observation>,
    pub extras: BTreeMap<String, f64>,
}

impl Track {
    pub fn new(id: u64, start_time: Option<Timestamp>, obs: Vec<Observation>) -> Self {
        Track {
            id,
            start_time,
            obs,
            extras: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.obs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obs.is_empty()
    }

    /// The first observation, when the storm becomes active.
    pub fn genesis(&self) -> Option<&Observation> {
        self.obs.first()
    }

    pub fn lysis(&self) -> Option<&Observation> {
        self.obs.last()
    }

    pub fn genesis_date(&self) -> Option<Timestamp> {
        self.genesis().map(|ob| ob.time)
    }

    /// The observation of strongest wind; the first one on ties.
    pub fn obs_at_vmax(&self) -> Option<&Observation> {
        self.obs
            .iter()
            .filter(|ob| ob.wind_speed.is_some())
            .fold(None, |best: Option<&Observation>, ob| match best {
                Some(b) if b.wind_speed >= ob.wind_speed => Some(b),
                _ => Some(ob),
            })
    }

    pub fn longitudes(&self) -> Vec<f64> {
        self.obs.iter().map(|ob| ob.lon).collect()
    }

    pub fn latitudes(&self) -> Vec<f64> {
        self.obs.iter().map(|ob| ob.lat).collect()
    }

    /// Ordered (lon, lat) pairs in degrees for geometry tests.
    pub fn coordinates(&self, convention: LonConvention) -> Vec<(f64, f64)> {
        self.obs
            .iter()
            .map(|ob| (convention.wrap(ob.lon), ob.lat))
            .collect()
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{parse_date, CalendarKind};

    fn ob(token: &str, lon: f64, wind: Option<f64>) -> Observation {
        let time = parse_date(token, CalendarKind::Day360).unwrap();
        let mut ob = Observation::new(time, lon, 10.0, 1.0);
        ob.wind_speed = wind;
        ob
    }

    #[test]
    fn should_find_genesis_lysis_and_peak() {
        let track = Track::new(
            7,
            None,
            vec![
                ob("2000010100", 300.0, Some(12.0)),
                ob("2000010106", 301.0, Some(30.5)),
                ob("2000010112", 302.0, Some(30.5)),
                ob("2000010118", 303.0, None),
            ],
        );

        assert_eq!(track.len(), 4);
        assert_eq!(track.genesis().unwrap().lon, 300.0);
        assert_eq!(track.lysis().unwrap().lon, 303.0);
        assert_eq!(track.obs_at_vmax().unwrap().lon, 301.0);
        assert_eq!(track.genesis_date(), Some(track.obs[0].time));
    }

    #[test]
    fn should_wrap_longitudes() {
        let track = Track::new(
            1,
            None,
            vec![ob("2000010100", 350.0, None), ob("2000010106", -5.0, None)],
        );

        assert_eq!(
            track.coordinates(LonConvention::ZeroTo360),
            vec![(350.0, 10.0), (355.0, 10.0)]
        );
        assert_eq!(
            track.coordinates(LonConvention::Signed),
            vec![(-10.0, 10.0), (-5.0, 10.0)]
        );
        assert_eq!(LonConvention::Signed.wrap(180.0), -180.0);
        assert_eq!(LonConvention::ZeroTo360.wrap(360.0), 0.0);
    }

    #[test]
    fn should_detect_six_hourly_records() {
        assert!(ob("2000010106", 0.0, None).six_hourly_timestep());
        assert!(!ob("2000010103", 0.0, None).six_hourly_timestep());
    }
}
