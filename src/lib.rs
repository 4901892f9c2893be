//! Reader, writer and columnar container for TRACK tropical storm output.
//!
//! ```no_run
//! use stormtrack::{load, CalendarKind, Dialect, LoadOptions};
//!
//! let options = LoadOptions::new(Dialect::Track, 3, CalendarKind::Day360);
//! let tracks = load("ff_trs_pos.tcident.new.gz", &options)?;
//! println!("{} storms", tracks.len());
//! # Ok::<(), stormtrack::TrackError>(())
//! ```

pub mod analysis;
pub mod calendar;
pub mod container;
pub mod decoder;
pub mod error;
pub mod header;
pub mod model;
pub mod options;
pub mod reader;
pub mod tokenizer;
pub mod writer;

pub use analysis::{
    genesis_months, monthly_storm_count, storm_locations, storms_in_time_range, time_range,
    BoundingBox, StormLocations, TimeRange, TrackPoint,
};
pub use calendar::{parse_date, CalendarKind, Datetime360, DateError, Timestamp};
pub use container::{TimeEncoding, TrackContainer};
pub use decoder::FieldDecoder;
pub use error::{TrackError, TrackResult};
pub use header::{ColumnLayout, Header, LayoutKind};
pub use model::{LonConvention, Observation, Track};
pub use options::{Dialect, LoadOptions};
pub use reader::{load, load_from, read_header, TrackReader};
pub use writer::{save_tracks, write_tracks, FieldSpec};
