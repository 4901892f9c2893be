//! Options controlling how a TRACK file is interpreted.

use crate::calendar::CalendarKind;

/// Which family of TRACK output a file belongs to.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Dialect {
    /// Vorticity levels followed by MSLP and maximum wind, possibly 10 m wind.
    #[default]
    Track,
    /// The 13-field layout carrying Hart cyclone phase space parameters.
    Hart,
    /// HURDAT2 best tracks reformatted into TRACK layout.
    Hurdat2,
    /// Decode every declared field by name, using the header's coordinate flags.
    NoAssumptions { variable_names: Vec<String> },
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub dialect: Dialect,
    /// Number of data columns after the standard fields. Only consulted when
    /// the declared field count does not identify the layout.
    pub ex_cols: usize,
    pub calendar: CalendarKind,
}

impl LoadOptions {
    pub fn new(dialect: Dialect, ex_cols: usize, calendar: CalendarKind) -> Self {
        LoadOptions {
            dialect,
            ex_cols,
            calendar,
        }
    }

    pub fn with_calendar(mut self, calendar: CalendarKind) -> Self {
        self.calendar = calendar;
        self
    }
}
