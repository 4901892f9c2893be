//! Declaration line parsing and column layout resolution.
//!
//! A TRACK file declares its contents once, on the `TRACK_NUM` line:
//!
//! ```text
//! TRACK_NUM      540 ADD_FLD    9  27 &111111111
//! ```
//!
//! i.e. the number of tracks, the number of added fields, the number of data
//! columns those fields occupy, and one flag per field telling whether the
//! field carries its own longitude/latitude. Older files omit the flags.
//!
//! The declared field count alone does not say where MSLP and wind live on an
//! observation line. Which layout applies is an empirical lookup on the field
//! count and dialect, captured once in a [`ColumnLayout`].

use tracing::{debug, warn};

use crate::{
    error::{TrackError, TrackResult},
    options::{Dialect, LoadOptions},
    tokenizer::Group,
};

pub const DECLARATION_MARKER: &str = "TRACK_NUM";
const FIELD_MARKER: &str = "ADD_FLD";

/// Field count of files with seven vorticity levels, MSLP and wind.
const EXTENDED_FIELD_COUNT: usize = 9;
/// Field count of files carrying Hart phase space parameters.
const HART_FIELD_COUNT: usize = 13;
const EXTENDED_VORTICITY_LEVELS: usize = 7;
const STANDARD_EX_COLS: usize = 3;
/// ex_cols above which the last three groups hold 10 m wind and its position.
const TEN_METRE_WIND_EX_COLS: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub track_count: usize,
    pub field_count: usize,
    pub column_count: Option<usize>,
    pub coord_flags: Option<Vec<bool>>,
    line_no: usize,
    raw: String,
}

impl Header {
    /// Parses the declaration line, first with the trailing coordinate flag
    /// annotation and then without it.
    pub fn parse(line_no: usize, line: &str) -> TrackResult<Self> {
        let tokens: Vec<&str> = line.split_whitespace().collect();

        if tokens.first() != Some(&DECLARATION_MARKER) || tokens.get(2) != Some(&FIELD_MARKER) {
            return Err(TrackError::format(
                line_no,
                line,
                "unexpected declaration line in TRACK output file",
            ));
        }

        let count = |index: usize, what: &str| -> TrackResult<usize> {
            tokens[index].parse().map_err(|_| {
                TrackError::parse(line_no, line, format!("invalid {} `{}`", what, tokens[index]))
            })
        };

        let (column_count, coord_flags) = match tokens.len() {
            6 => {
                let flags = parse_coord_flags(tokens[5])
                    .ok_or_else(|| TrackError::format(line_no, line, "malformed field flags"))?;
                (Some(count(4, "column count")?), Some(flags))
            }
            5 => (Some(count(4, "column count")?), None),
            4 => (None, None),
            _ => {
                return Err(TrackError::format(
                    line_no,
                    line,
                    "declaration line matches no known layout",
                ))
            }
        };

        let header = Header {
            track_count: count(1, "track count")?,
            field_count: count(3, "field count")?,
            column_count,
            coord_flags,
            line_no,
            raw: line.trim_end().to_string(),
        };

        if let Some(flags) = &header.coord_flags {
            if flags.len() != header.field_count {
                return Err(TrackError::format(
                    line_no,
                    line,
                    format!(
                        "{} field flags declared for {} fields",
                        flags.len(),
                        header.field_count
                    ),
                ));
            }
        }

        Ok(header)
    }

    pub fn new(track_count: usize, coord_flags: Vec<bool>) -> Self {
        let column_count = coord_flags.iter().map(|c| if *c { 3 } else { 1 }).sum();
        Header {
            track_count,
            field_count: coord_flags.len(),
            column_count: Some(column_count),
            coord_flags: Some(coord_flags),
            line_no: 0,
            raw: String::new(),
        }
    }

    /// Coordinate flags, inferred from the column count when not annotated.
    pub fn field_has_coords(&self) -> Option<Vec<bool>> {
        if let Some(flags) = &self.coord_flags {
            return Some(flags.clone());
        }
        match self.column_count {
            _ if self.field_count == 0 => Some(vec![]),
            Some(columns) if columns == 3 * self.field_count => Some(vec![true; self.field_count]),
            Some(columns) if columns == self.field_count => Some(vec![false; self.field_count]),
            _ => None,
        }
    }

    /// The declaration line in its annotated form.
    pub fn to_line(&self) -> String {
        let flags: String = self
            .field_has_coords()
            .unwrap_or_default()
            .iter()
            .map(|c| if *c { '1' } else { '0' })
            .collect();

        format!(
            "{} {:>8} {} {:>4} {:>4} &{}",
            DECLARATION_MARKER,
            self.track_count,
            FIELD_MARKER,
            self.field_count,
            self.column_count.unwrap_or(self.field_count),
            flags
        )
    }

    fn error(&self, reason: impl Into<String>) -> TrackError {
        TrackError::format(self.line_no, &self.raw, reason)
    }
}

fn parse_coord_flags(token: &str) -> Option<Vec<bool>> {
    token
        .strip_prefix('&')?
        .chars()
        .map(|c| match c {
            '0' => Some(false),
            '1' => Some(true),
            _ => None,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    Standard,
    Extended,
    Hart,
    Hurdat2,
    NoAssumptions,
    Generic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtraColumn {
    pub name: String,
    pub group: Group,
}

impl ExtraColumn {
    fn new(name: &str, group: Group) -> Self {
        ExtraColumn {
            name: name.to_string(),
            group,
        }
    }
}

/// Where each decoded quantity sits on an observation line.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLayout {
    pub kind: LayoutKind,
    /// Full-resolution (lon, lat), used only when the group-0 position is missing.
    pub position: Option<(Group, Group)>,
    pub pressure: Option<Group>,
    pub wind: Option<Group>,
    /// HURDAT2 tracks carry no vorticity.
    pub zero_vorticity: bool,
    pub extras: Vec<ExtraColumn>,
}

impl ColumnLayout {
    pub fn resolve(header: &Header, options: &LoadOptions) -> TrackResult<Self> {
        let fields = header.field_count;

        let layout = match &options.dialect {
            Dialect::Track if fields == EXTENDED_FIELD_COUNT => {
                ColumnLayout::vorticity_levels(LayoutKind::Extended, EXTENDED_VORTICITY_LEVELS)
            }
            Dialect::Track | Dialect::Hart if fields == HART_FIELD_COUNT => ColumnLayout::hart(),
            Dialect::Track if options.ex_cols == STANDARD_EX_COLS => {
                ColumnLayout::vorticity_levels(LayoutKind::Standard, fields.saturating_sub(3))
            }
            Dialect::Track | Dialect::Hart => ColumnLayout::generic(fields, options.ex_cols),
            Dialect::Hurdat2 => ColumnLayout::hurdat2(options.ex_cols),
            Dialect::NoAssumptions { variable_names } => {
                let flags = header.field_has_coords().ok_or_else(|| {
                    header.error("cannot tell which fields carry coordinates")
                })?;
                ColumnLayout::no_assumptions(&flags, variable_names)
            }
        };

        debug!(
            kind = ?layout.kind,
            fields,
            ex_cols = options.ex_cols,
            "resolved column layout"
        );

        Ok(layout)
    }

    /// Vorticity at `levels` levels, each with its own position, then MSLP
    /// and maximum wind.
    fn vorticity_levels(kind: LayoutKind, levels: usize) -> Self {
        let pressure = 1 + 3 * levels + 2;

        ColumnLayout {
            kind,
            position: Some((Group::Forward(1), Group::Forward(2))),
            pressure: Some(Group::Forward(pressure)),
            wind: Some(Group::Forward(pressure + 3)),
            zero_vorticity: false,
            extras: vec![],
        }
    }

    fn hart() -> Self {
        let mut layout =
            ColumnLayout::vorticity_levels(LayoutKind::Hart, EXTENDED_VORTICITY_LEVELS);
        layout.extras = vec![
            ExtraColumn::new("v10m_lon", Group::Forward(28)),
            ExtraColumn::new("v10m_lat", Group::Forward(29)),
            ExtraColumn::new("v10m", Group::Forward(30)),
            ExtraColumn::new("TL", Group::FromEnd(3)),
            ExtraColumn::new("TU", Group::FromEnd(2)),
            ExtraColumn::new("B", Group::FromEnd(1)),
        ];
        layout
    }

    fn generic(fields: usize, ex_cols: usize) -> Self {
        warn!(
            fields,
            ex_cols, "unrecognised field count, using generic column offsets"
        );

        let mut layout =
            ColumnLayout::vorticity_levels(LayoutKind::Generic, fields.saturating_sub(2));
        if ex_cols > TEN_METRE_WIND_EX_COLS {
            layout.extras = vec![
                ExtraColumn::new("v10m_lon", Group::FromEnd(3)),
                ExtraColumn::new("v10m_lat", Group::FromEnd(2)),
                ExtraColumn::new("v10m", Group::FromEnd(1)),
            ];
        }
        layout
    }

    fn hurdat2(ex_cols: usize) -> Self {
        let wind = Group::FromEnd(7 + ex_cols);

        ColumnLayout {
            kind: LayoutKind::Hurdat2,
            position: None,
            pressure: Some(Group::FromEnd(4 + ex_cols)),
            wind: Some(wind),
            zero_vorticity: true,
            extras: vec![ExtraColumn::new("v10m", wind)],
        }
    }

    fn no_assumptions(flags: &[bool], variable_names: &[String]) -> Self {
        if !variable_names.is_empty() && variable_names.len() != flags.len() {
            warn!(
                names = variable_names.len(),
                fields = flags.len(),
                "variable names do not match the declared fields"
            );
        }

        let mut layout = ColumnLayout {
            kind: LayoutKind::NoAssumptions,
            position: None,
            pressure: None,
            wind: None,
            zero_vorticity: false,
            extras: vec![],
        };

        let mut group = 1;
        for (n, has_coords) in flags.iter().enumerate() {
            let name = variable_names
                .get(n)
                .cloned()
                .unwrap_or_else(|| format!("feature_{}", n));

            if *has_coords {
                if n == 0 {
                    layout.position = Some((Group::Forward(group), Group::Forward(group + 1)));
                }
                layout
                    .extras
                    .push(ExtraColumn::new(&format!("{}_lon", name), Group::Forward(group)));
                layout
                    .extras
                    .push(ExtraColumn::new(&format!("{}_lat", name), Group::Forward(group + 1)));
                group += 2;
            }

            let value = Group::Forward(group);
            match name.as_str() {
                "mslp" => layout.pressure = Some(value),
                "vmax" => layout.wind = Some(value),
                _ => layout.extras.push(ExtraColumn::new(&name, value)),
            }
            group += 1;
        }

        layout
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::CalendarKind;

    fn options(dialect: Dialect, ex_cols: usize) -> LoadOptions {
        LoadOptions::new(dialect, ex_cols, CalendarKind::Day360)
    }

    #[test]
    fn should_parse_annotated_header() {
        let header = Header::parse(3, "TRACK_NUM      540 ADD_FLD    9  27 &111111111").unwrap();

        assert_eq!(header.track_count, 540);
        assert_eq!(header.field_count, 9);
        assert_eq!(header.column_count, Some(27));
        assert_eq!(header.coord_flags, Some(vec![true; 9]));
    }

    #[test]
    fn should_parse_header_without_annotation() {
        let header = Header::parse(1, "TRACK_NUM  12 ADD_FLD  0  0").unwrap();

        assert_eq!(header.track_count, 12);
        assert_eq!(header.field_count, 0);
        assert_eq!(header.coord_flags, None);
        assert_eq!(header.field_has_coords(), Some(vec![]));
    }

    #[test]
    fn should_infer_coordinate_flags_from_column_count() {
        let all = Header::parse(1, "TRACK_NUM 2 ADD_FLD 3 9").unwrap();
        let none = Header::parse(1, "TRACK_NUM 2 ADD_FLD 3 3").unwrap();
        let mixed = Header::parse(1, "TRACK_NUM 2 ADD_FLD 3 5").unwrap();

        assert_eq!(all.field_has_coords(), Some(vec![true; 3]));
        assert_eq!(none.field_has_coords(), Some(vec![false; 3]));
        assert_eq!(mixed.field_has_coords(), None);
    }

    #[test]
    fn should_reject_unknown_declarations() {
        assert!(matches!(
            Header::parse(1, "TRACK_NUM 540 FIELDS 9 27"),
            Err(TrackError::Format { .. })
        ));
        assert!(matches!(
            Header::parse(1, "TRACK_NUM 540 ADD_FLD 2 4 &10 extra"),
            Err(TrackError::Format { .. })
        ));
        assert!(matches!(
            Header::parse(1, "TRACK_NUM 540 ADD_FLD 2 4 &101"),
            Err(TrackError::Format { .. })
        ));
        assert!(matches!(
            Header::parse(1, "TRACK_NUM many ADD_FLD 2 4 &10"),
            Err(TrackError::Parse { .. })
        ));
    }

    #[test]
    fn should_write_annotated_line() {
        let header = Header::new(540, vec![true, true, false]);
        let line = header.to_line();

        assert_eq!(Header::parse(1, &line).unwrap().coord_flags, header.coord_flags);
        assert!(line.ends_with("ADD_FLD    3    7 &110"));
    }

    #[test]
    fn should_select_extended_layout_for_nine_fields() {
        let header = Header::parse(1, "TRACK_NUM 540 ADD_FLD 9 27 &111111111").unwrap();
        let layout = ColumnLayout::resolve(&header, &options(Dialect::Track, 3)).unwrap();

        assert_eq!(layout.kind, LayoutKind::Extended);
        assert_eq!(layout.pressure, Some(Group::Forward(24)));
        assert_eq!(layout.wind, Some(Group::Forward(27)));
        assert!(layout.extras.is_empty());
    }

    #[test]
    fn should_select_standard_layout_for_three_extra_columns() {
        let header = Header::parse(1, "TRACK_NUM 5 ADD_FLD 7 21 &1111111").unwrap();
        let layout = ColumnLayout::resolve(&header, &options(Dialect::Track, 3)).unwrap();

        assert_eq!(layout.kind, LayoutKind::Standard);
        assert_eq!(layout.pressure, Some(Group::Forward(1 + 3 * 4 + 2)));
        assert_eq!(layout.wind, Some(Group::Forward(1 + 3 * 4 + 5)));
    }

    #[test]
    fn should_fall_back_to_generic_layout() {
        let header = Header::parse(1, "TRACK_NUM 5 ADD_FLD 7 21 &1111111").unwrap();
        let layout = ColumnLayout::resolve(&header, &options(Dialect::Track, 9)).unwrap();

        assert_eq!(layout.kind, LayoutKind::Generic);
        assert_eq!(layout.pressure, Some(Group::Forward(1 + 3 * 5 + 2)));
        assert_eq!(layout.extras.len(), 3);
        assert_eq!(layout.extras[2].group, Group::FromEnd(1));
    }

    #[test]
    fn should_select_hart_layout_for_thirteen_fields() {
        let header = Header::parse(1, "TRACK_NUM 5 ADD_FLD 13 33").unwrap();

        for dialect in [Dialect::Track, Dialect::Hart] {
            let layout = ColumnLayout::resolve(&header, &options(dialect, 0)).unwrap();
            assert_eq!(layout.kind, LayoutKind::Hart);
            assert_eq!(layout.pressure, Some(Group::Forward(24)));
            assert_eq!(layout.extras[5], ExtraColumn::new("B", Group::FromEnd(1)));
        }
    }

    #[test]
    fn should_read_hurdat2_from_the_end() {
        let header = Header::parse(1, "TRACK_NUM 5 ADD_FLD 3 5").unwrap();
        let layout = ColumnLayout::resolve(&header, &options(Dialect::Hurdat2, 0)).unwrap();

        assert_eq!(layout.kind, LayoutKind::Hurdat2);
        assert_eq!(layout.position, None);
        assert_eq!(layout.pressure, Some(Group::FromEnd(4)));
        assert_eq!(layout.wind, Some(Group::FromEnd(7)));
        assert!(layout.zero_vorticity);
    }

    #[test]
    fn should_name_fields_without_assumptions() {
        let header = Header::parse(1, "TRACK_NUM 5 ADD_FLD 3 7 &101").unwrap();
        let names = vec!["vorticity".to_string(), "mslp".to_string(), "vmax".to_string()];
        let dialect = Dialect::NoAssumptions {
            variable_names: names,
        };
        let layout = ColumnLayout::resolve(&header, &options(dialect, 0)).unwrap();

        assert_eq!(layout.position, Some((Group::Forward(1), Group::Forward(2))));
        assert_eq!(layout.pressure, Some(Group::Forward(4)));
        assert_eq!(layout.wind, Some(Group::Forward(7)));
        let names: Vec<&str> = layout.extras.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["vorticity_lon", "vorticity_lat", "vorticity", "vmax_lon", "vmax_lat"]
        );
    }

    #[test]
    fn should_default_feature_names() {
        let header = Header::parse(1, "TRACK_NUM 5 ADD_FLD 2 2 &00").unwrap();
        let dialect = Dialect::NoAssumptions {
            variable_names: vec![],
        };
        let layout = ColumnLayout::resolve(&header, &options(dialect, 0)).unwrap();

        assert_eq!(layout.position, None);
        assert_eq!(layout.extras[1], ExtraColumn::new("feature_1", Group::Forward(2)));
    }
}
