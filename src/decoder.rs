//! Decodes one observation line into an [`Observation`].
//!
//! The reported position is the one in group 0. A value equal to a
//! missing-data sentinel (`1e12` or `1e25`, compared exactly) is absent:
//! pressure and wind decode to `None` and named extras are left out.
//!
//! Three corrections are applied silently, in this order, to every line:
//!
//! 1. a group-0 position holding a sentinel falls back to the full-resolution
//!    position of the first added field, unless that one is missing too;
//! 2. a pressure above 10 000 is taken to be Pa and divided by 100, then
//!    rounded to one decimal;
//! 3. a pressure below 500 together with a wind above 500 means the two
//!    columns were written the wrong way round, so they are swapped.

use tracing::trace;

use crate::{
    calendar::{parse_date, CalendarKind},
    error::{TrackError, TrackResult},
    header::ColumnLayout,
    model::Observation,
    tokenizer::{tokenize, Group, RecordTokens},
};

pub const MISSING_SENTINELS: [f64; 2] = [1e12, 1.0e25];
pub const PA_THRESHOLD: f64 = 1.0e4;
pub const SWAP_PRESSURE_BELOW: f64 = 500.0;
pub const SWAP_WIND_ABOVE: f64 = 500.0;
pub const KNOTS_PER_M_S: f64 = 1.944;

pub fn is_missing(value: f64) -> bool {
    MISSING_SENTINELS.contains(&value)
}

/// Converts Pa to hPa where needed and rounds to one decimal.
pub fn normalise_pressure(raw: f64) -> f64 {
    let hpa = if raw > PA_THRESHOLD { raw / 100.0 } else { raw };
    (hpa * 10.0).round() / 10.0
}

/// Decodes lines against one resolved layout and calendar.
#[derive(Debug, Clone)]
pub struct FieldDecoder {
    layout: ColumnLayout,
    calendar: CalendarKind,
}

impl FieldDecoder {
    pub fn new(layout: ColumnLayout, calendar: CalendarKind) -> Self {
        FieldDecoder { layout, calendar }
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn decode(&self, line_no: usize, line: &str) -> TrackResult<Observation> {
        let tokens = tokenize(line_no, line)?;
        let value = |token: &str| parse_value(line_no, line, token);
        let group = |group: Group| group_value(&tokens, group, line_no, line);

        let time = parse_date(tokens.date, self.calendar)
            .map_err(|e| TrackError::parse(line_no, line, e.to_string()))?;

        let mut lon = value(tokens.lon)?;
        let mut lat = value(tokens.lat)?;
        if is_missing(lon) || is_missing(lat) {
            if let Some((lon_group, lat_group)) = self.layout.position {
                let (field_lon, field_lat) = (group(lon_group)?, group(lat_group)?);
                if !is_missing(field_lon) && !is_missing(field_lat) {
                    trace!(line_no, "position missing, using full-resolution position");
                    lon = field_lon;
                    lat = field_lat;
                }
            }
        }

        let vorticity = if self.layout.zero_vorticity {
            0.0
        } else {
            value(tokens.vort)?
        };

        let present = |g: Group| -> TrackResult<Option<f64>> {
            group(g).map(|v| Some(v).filter(|v| !is_missing(*v)))
        };
        let mut pressure = match self.layout.pressure {
            Some(g) => present(g)?.map(normalise_pressure),
            None => None,
        };
        let mut wind_speed = match self.layout.wind {
            Some(g) => present(g)?,
            None => None,
        };

        if let (Some(p), Some(w)) = (pressure, wind_speed) {
            if p < SWAP_PRESSURE_BELOW && w > SWAP_WIND_ABOVE {
                trace!(line_no, pressure = p, wind = w, "swapping pressure and wind");
                pressure = Some(if w > PA_THRESHOLD {
                    normalise_pressure(w)
                } else {
                    w
                });
                wind_speed = Some(p);
            }
        }

        let mut ob = Observation::new(time, lon, lat, vorticity);
        ob.pressure = pressure;
        ob.wind_speed = wind_speed;

        if let Some(w) = wind_speed {
            ob.extras.insert("vmax_kts".to_string(), w * KNOTS_PER_M_S);
        }
        for extra in &self.layout.extras {
            if let Some(v) = present(extra.group)? {
                ob.extras.insert(extra.name.clone(), v);
            }
        }

        Ok(ob)
    }
}

fn parse_value(line_no: usize, line: &str, token: &str) -> TrackResult<f64> {
    token
        .trim()
        .parse::<f64>()
        .map_err(|_| TrackError::parse(line_no, line, format!("invalid number `{}`", token)))
}

fn group_value(
    tokens: &RecordTokens,
    group: Group,
    line_no: usize,
    line: &str,
) -> TrackResult<f64> {
    let token = tokens.group(group).ok_or_else(|| {
        TrackError::parse(
            line_no,
            line,
            format!("no column at {:?}: line has {} groups", group, tokens.groups.len()),
        )
    })?;
    parse_value(line_no, line, token)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        calendar::{Datetime360, Timestamp},
        header::{ColumnLayout, Header},
        options::{Dialect, LoadOptions},
    };

    /// Nine added fields with coordinates: seven vorticity levels, MSLP, wind.
    fn extended_line(position: (f64, f64), pressure: f64, wind: f64) -> String {
        let mut line = String::from("2000050600 285.375793 22.385307 1.569625e+00 ");
        line.push_str(&format!("&{} &{} &1.6e+00 ", position.0, position.1));
        for _ in 1..7 {
            line.push_str("&285.4 &22.4 &1.2e+00 ");
        }
        line.push_str(&format!("&285.4 &22.4 &{} ", pressure));
        line.push_str(&format!("&285.4 &22.4 &{} &", wind));
        line
    }

    fn decoder(dialect: Dialect, declaration: &str, ex_cols: usize) -> FieldDecoder {
        let header = Header::parse(1, declaration).unwrap();
        let options = LoadOptions::new(dialect, ex_cols, CalendarKind::Day360);
        let layout = ColumnLayout::resolve(&header, &options).unwrap();
        FieldDecoder::new(layout, options.calendar)
    }

    fn extended() -> FieldDecoder {
        decoder(Dialect::Track, "TRACK_NUM 1 ADD_FLD 9 27 &111111111", 3)
    }

    #[test]
    fn should_decode_extended_line() {
        let line = extended_line((285.375793, 22.385307), 101662.2, 15.0);
        let ob = extended().decode(4, &line).unwrap();

        assert_eq!(
            ob.time,
            Timestamp::Day360(Datetime360::from_ymdh_opt(2000, 5, 6, 0).unwrap())
        );
        assert_eq!(ob.lon, 285.375793);
        assert_eq!(ob.lat, 22.385307);
        assert_eq!(ob.vorticity, 1.569625);
        assert_eq!(ob.pressure, Some(1016.6));
        assert_eq!(ob.wind_speed, Some(15.0));
        assert_eq!(ob.extras["vmax_kts"], 15.0 * 1.944);
    }

    #[test]
    fn should_normalise_pressure() {
        assert_eq!(normalise_pressure(101662.2), 1016.6);
        assert_eq!(normalise_pressure(100822.9), 1008.2);
        assert_eq!(normalise_pressure(1004.26), 1004.3);
        assert_eq!(normalise_pressure(10000.0), 10000.0);
    }

    #[test]
    fn should_report_group_zero_position() {
        let line = extended_line((286.0, 23.5), 101000.0, 12.0);
        let ob = extended().decode(4, &line).unwrap();

        assert_eq!((ob.lon, ob.lat), (285.375793, 22.385307));
    }

    #[test]
    fn should_keep_group_zero_position_when_field_position_is_missing() {
        for position in [(1e12, 23.5), (286.0, 1e12), (1.0e25, 1.0e25)] {
            let line = extended_line(position, 101000.0, 12.0);
            let ob = extended().decode(4, &line).unwrap();

            assert_eq!((ob.lon, ob.lat), (285.375793, 22.385307));
        }
    }

    #[test]
    fn should_fall_back_to_field_position_for_sentinels() {
        for (lon, lat) in [("1e12", "22.385307"), ("285.375793", "1.0e25")] {
            let line = extended_line((286.0, 23.5), 101000.0, 12.0).replacen(
                "285.375793 22.385307",
                &format!("{} {}", lon, lat),
                1,
            );
            let ob = extended().decode(4, &line).unwrap();

            assert_eq!((ob.lon, ob.lat), (286.0, 23.5));
        }
    }

    #[test]
    fn should_keep_sentinel_position_without_a_fallback() {
        let line = extended_line((1e12, 1e12), 101000.0, 12.0).replacen(
            "285.375793 22.385307",
            "1e12 1e12",
            1,
        );
        let ob = extended().decode(4, &line).unwrap();

        assert!(is_missing(ob.lon) && is_missing(ob.lat));
    }

    #[test]
    fn should_not_treat_nearby_values_as_sentinels() {
        assert!(is_missing(1e12));
        assert!(is_missing(1.0e25));
        assert!(!is_missing(0.999999e12));

        let line = extended_line((286.0, 23.5), 101000.0, 12.0).replacen(
            "22.385307",
            "999999000000",
            1,
        );
        let ob = extended().decode(4, &line).unwrap();

        assert_eq!(ob.lat, 0.999999e12);
    }

    #[test]
    fn should_treat_sentinel_values_as_missing() {
        let line = extended_line((286.0, 23.5), 1.0e25, 1e12);
        let ob = extended().decode(4, &line).unwrap();

        assert_eq!(ob.pressure, None);
        assert_eq!(ob.wind_speed, None);
        assert!(!ob.extras.contains_key("vmax_kts"));
    }

    #[test]
    fn should_swap_mixed_up_pressure_and_wind() {
        let line = extended_line((286.0, 23.5), 35.2, 1005.3);
        let ob = extended().decode(4, &line).unwrap();

        assert_eq!(ob.pressure, Some(1005.3));
        assert_eq!(ob.wind_speed, Some(35.2));
        assert_eq!(ob.extras["vmax_kts"], 35.2 * 1.944);
    }

    #[test]
    fn should_keep_swapped_pressure_in_hpa() {
        let line = extended_line((286.0, 23.5), 35.2, 100530.0);
        let ob = extended().decode(4, &line).unwrap();

        assert_eq!(ob.pressure, Some(1005.3));
        assert_eq!(ob.wind_speed, Some(35.2));
    }

    #[test]
    fn should_not_swap_plausible_values() {
        let line = extended_line((286.0, 23.5), 990.0, 45.0);
        let ob = extended().decode(4, &line).unwrap();

        assert_eq!(ob.pressure, Some(990.0));
        assert_eq!(ob.wind_speed, Some(45.0));
    }

    #[test]
    fn should_fail_on_malformed_number() {
        let line = extended_line((286.0, 23.5), 990.0, 45.0).replace("&990 ", "&9x0 ");
        let err = extended().decode(9, &line).unwrap_err();

        match err {
            TrackError::Parse { line, content, .. } => {
                assert_eq!(line, 9);
                assert!(content.contains("9x0"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn should_fail_on_missing_columns() {
        let err = extended()
            .decode(2, "2000050600 285.3 22.3 1.5 &285.3 &22.3 &1.5 &")
            .unwrap_err();
        assert!(matches!(err, TrackError::Parse { line: 2, .. }));
    }

    #[test]
    fn should_decode_hart_parameters() {
        let mut line = String::from("2000050600 300.0 15.0 5.0 ");
        for level in 1..=7 {
            line.push_str(&format!("&300.0 &15.0 &{}.0 ", level));
        }
        line.push_str("&300.0 &15.0 &99850.0 &300.0 &15.0 &25.0 &300.5 &15.5 &18.0 ");
        line.push_str("&-40.0 &-20.0 &5.0 &");

        let hart = decoder(Dialect::Hart, "TRACK_NUM 1 ADD_FLD 13 33", 0);
        let ob = hart.decode(1, &line).unwrap();

        assert_eq!(ob.pressure, Some(998.5));
        assert_eq!(ob.wind_speed, Some(25.0));
        assert_eq!(ob.extras["v10m"], 18.0);
        assert_eq!(ob.extras["v10m_lon"], 300.5);
        assert_eq!(ob.extras["v10m_lat"], 15.5);
        assert_eq!(ob.extras["TL"], -40.0);
        assert_eq!(ob.extras["TU"], -20.0);
        assert_eq!(ob.extras["B"], 5.0);
    }

    #[test]
    fn should_decode_hurdat2_line() {
        // ex_cols = 0: wind is 7th and pressure 4th group from the end.
        let line = "1851062500 265.2 28.0 0 &265.2 &80.0 &0 &0 &1005.0 &0 &0 &0 &";
        let hurdat2 = decoder(Dialect::Hurdat2, "TRACK_NUM 1 ADD_FLD 3 8", 0);
        let ob = hurdat2.decode(1, line).unwrap();

        assert_eq!(ob.vorticity, 0.0);
        assert_eq!((ob.lon, ob.lat), (265.2, 28.0));
        assert_eq!(ob.pressure, Some(1005.0));
        assert_eq!(ob.wind_speed, Some(80.0));
        assert_eq!(ob.extras["v10m"], 80.0);
    }

    #[test]
    fn should_decode_named_fields() {
        let dialect = Dialect::NoAssumptions {
            variable_names: vec!["vorticity".into(), "mslp".into(), "v10m".into()],
        };
        let named = decoder(dialect, "TRACK_NUM 1 ADD_FLD 3 5 &100", 0);
        let line = "2000050612 285.3 22.3 1.5 &1.0e25 &1.0e25 &1.7 &101662.2 &12.5 &";
        let ob = named.decode(1, line).unwrap();

        assert_eq!((ob.lon, ob.lat), (285.3, 22.3));
        assert_eq!(ob.pressure, Some(1016.6));
        assert_eq!(ob.wind_speed, None);
        assert_eq!(ob.extras["vorticity"], 1.7);
        assert!(!ob.extras.contains_key("vorticity_lon"));
        assert!(!ob.extras.contains_key("vorticity_lat"));
        assert_eq!(ob.extras["v10m"], 12.5);
        assert!(!ob.extras.contains_key("vmax_kts"));
    }
}
