//! Splits an observation line into its `&`-delimited groups.
//!
//! The first group holds `date lon lat vort`; every later group holds one
//! value. A line ends with `&`, so the final group is empty. Nothing here
//! interprets values.

use crate::error::{TrackError, TrackResult};

#[derive(Debug, PartialEq)]
pub struct RecordTokens<'a> {
    pub date: &'a str,
    pub lon: &'a str,
    pub lat: &'a str,
    pub vort: &'a str,
    /// All groups, including group 0 and the trailing empty group.
    pub groups: Vec<&'a str>,
}

/// Position of a value among a line's groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    /// Index counted from the start, group 0 being `date lon lat vort`.
    Forward(usize),
    /// Index counted from the end, 0 being the trailing empty group.
    FromEnd(usize),
}

impl<'a> RecordTokens<'a> {
    pub fn group(&self, group: Group) -> Option<&'a str> {
        let index = match group {
            Group::Forward(index) => index,
            Group::FromEnd(index) => self.groups.len().checked_sub(index + 1)?,
        };
        self.groups.get(index).copied()
    }
}

pub fn tokenize(line_no: usize, line: &str) -> TrackResult<RecordTokens<'_>> {
    let groups: Vec<&str> = line.trim().split('&').map(str::trim).collect();

    let first: &str = groups[0];
    let centre: Vec<&str> = first.split_whitespace().collect();
    match centre.as_slice() {
        &[date, lon, lat, vort] => Ok(RecordTokens {
            date,
            lon,
            lat,
            vort,
            groups,
        }),
        _ => Err(TrackError::parse(
            line_no,
            line,
            format!(
                "expected `date lon lat vorticity` before the first `&`, found {} tokens",
                centre.len()
            ),
        )),
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_split_groups() {
        let line =
            "2000050600 285.375793 22.385307 1.569625e+00 &285.4 &22.4 &1.57e+00 &101662.2 &";
        let tokens = tokenize(1, line).unwrap();

        assert_eq!(tokens.date, "2000050600");
        assert_eq!(tokens.lon, "285.375793");
        assert_eq!(tokens.lat, "22.385307");
        assert_eq!(tokens.vort, "1.569625e+00");
        assert_eq!(tokens.groups.len(), 6);
        assert_eq!(tokens.group(Group::Forward(4)), Some("101662.2"));
        assert_eq!(tokens.group(Group::FromEnd(0)), Some(""));
        assert_eq!(tokens.group(Group::FromEnd(1)), Some("101662.2"));
        assert_eq!(tokens.group(Group::FromEnd(6)), None);
        assert_eq!(tokens.group(Group::Forward(6)), None);
    }

    #[test]
    fn should_tolerate_irregular_spacing() {
        let line = "   2000050600   285.3\t22.3  1.5   &  1.0  &  \n";
        let tokens = tokenize(1, line).unwrap();

        assert_eq!(tokens.lon, "285.3");
        assert_eq!(tokens.group(Group::Forward(1)), Some("1.0"));
        assert_eq!(tokens.group(Group::FromEnd(0)), Some(""));
    }

    #[test]
    fn should_reject_short_centre_record() {
        let err = tokenize(7, "2000050600 285.3 22.3 &1.0 &").unwrap_err();
        assert!(matches!(err, TrackError::Parse { line: 7, .. }));
    }
}
