//! Assembles decoded observations into tracks.
//!
//! A file is read in one forward pass:
//!
//! ```text
//! 0
//! 0 0
//! TRACK_NUM      540 ADD_FLD    9  27 &111111111
//! TRACK_ID  1 START_TIME 2000050600
//! POINT_NUM   85
//! 2000050600 285.375793 22.385307 1.569625e+00 &... &
//! ...
//! ```
//!
//! [`TrackReader`] yields one [`Track`] per `next()`, so only the track being
//! assembled is held in memory. Blank or unrecognised lines ahead of a
//! `TRACK_ID` line are skipped.

use std::{
    fs::File,
    io::{BufRead, BufReader, Lines},
    path::Path,
};

use flate2::read::MultiGzDecoder;
use tracing::{debug, info};

use crate::{
    calendar::{parse_date, CalendarKind, Timestamp},
    decoder::FieldDecoder,
    error::{TrackError, TrackResult},
    header::{ColumnLayout, Header, DECLARATION_MARKER},
    model::{Observation, Track},
    options::LoadOptions,
};

const TRACK_MARKER: &str = "TRACK_ID";
const START_TIME_MARKER: &str = "START_TIME";
const POINT_MARKER: &str = "POINT_NUM";

/// A lazy, forward-only sequence of tracks read from one source.
pub struct TrackReader<R: BufRead> {
    lines: Lines<R>,
    line_no: usize,
    header: Header,
    decoder: FieldDecoder,
    calendar: CalendarKind,
    yielded: usize,
    done: bool,
}

impl TrackReader<Box<dyn BufRead>> {
    /// Opens a TRACK file, gunzipping it when the name ends in `.gz`. The file
    /// stays open until the reader is dropped.
    pub fn open(path: impl AsRef<Path>, options: &LoadOptions) -> TrackResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let reader: Box<dyn BufRead> = if is_gzipped(path) {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        debug!(path = %path.display(), "opened track file");
        TrackReader::new(reader, options)
    }
}

impl<R: BufRead> TrackReader<R> {
    /// Reads up to and including the declaration line.
    pub fn new(reader: R, options: &LoadOptions) -> TrackResult<Self> {
        let mut lines = reader.lines();
        let mut line_no = 0;

        let header = loop {
            let line = match lines.next() {
                Some(line) => line?,
                None => {
                    return Err(TrackError::format(
                        line_no,
                        "",
                        format!("no {} declaration found", DECLARATION_MARKER),
                    ))
                }
            };
            line_no += 1;

            if line.trim_start().starts_with(DECLARATION_MARKER) {
                break Header::parse(line_no, line.trim())?;
            }
        };

        let layout = ColumnLayout::resolve(&header, options)?;
        info!(
            tracks = header.track_count,
            fields = header.field_count,
            layout = ?layout.kind,
            "reading TRACK file"
        );

        Ok(TrackReader {
            lines,
            line_no,
            header,
            decoder: FieldDecoder::new(layout, options.calendar),
            calendar: options.calendar,
            yielded: 0,
            done: false,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn layout(&self) -> &ColumnLayout {
        self.decoder.layout()
    }

    fn next_line(&mut self) -> TrackResult<Option<String>> {
        match self.lines.next() {
            Some(line) => {
                self.line_no += 1;
                Ok(Some(line?))
            }
            None => Ok(None),
        }
    }

    fn expect_line(&mut self, what: &str) -> TrackResult<String> {
        self.next_line()?.ok_or_else(|| {
            TrackError::format(
                self.line_no,
                "",
                format!("unexpected end of file, expected {}", what),
            )
        })
    }

    fn read_track(&mut self) -> TrackResult<Track> {
        let mut line = self.expect_line(TRACK_MARKER)?;
        while line.split_whitespace().next() != Some(TRACK_MARKER) {
            if !line.trim().is_empty() {
                debug!(line = self.line_no, content = %line, "skipping line between tracks");
            }
            line = self.expect_line(TRACK_MARKER)?;
        }
        let (id, start_time) = self.parse_track_line(&line)?;

        let line = self.expect_line(POINT_MARKER)?;
        let point_count = self.parse_point_line(&line)?;

        let mut obs: Vec<Observation> = Vec::with_capacity(point_count);
        for _ in 0..point_count {
            let line = self.expect_line("an observation")?;
            let ob = self.decoder.decode(self.line_no, &line)?;

            if let Some(previous) = obs.last() {
                if ob.time < previous.time {
                    return Err(TrackError::format(
                        self.line_no,
                        &line,
                        format!("observation time goes backwards in track {}", id),
                    ));
                }
            }
            obs.push(ob);
        }

        Ok(Track::new(id, start_time, obs))
    }

    /// `TRACK_ID <id>` or `TRACK_ID <id> START_TIME <date>`.
    fn parse_track_line(&self, line: &str) -> TrackResult<(u64, Option<Timestamp>)> {
        let tokens: Vec<&str> = line.split_whitespace().collect();

        let (id, start) = match tokens.as_slice() {
            &[TRACK_MARKER, id] => (id, None),
            &[TRACK_MARKER, id, START_TIME_MARKER, start] => (id, Some(start)),
            _ => {
                return Err(TrackError::format(
                    self.line_no,
                    line,
                    format!("expected {} line", TRACK_MARKER),
                ))
            }
        };

        let id = id.parse::<u64>().map_err(|_| {
            TrackError::parse(self.line_no, line, format!("invalid track id `{}`", id))
        })?;
        let start_time = start
            .map(|token| parse_date(token, self.calendar))
            .transpose()
            .map_err(|e| TrackError::parse(self.line_no, line, e.to_string()))?;

        Ok((id, start_time))
    }

    /// `POINT_NUM <n>`.
    fn parse_point_line(&self, line: &str) -> TrackResult<usize> {
        let tokens: Vec<&str> = line.split_whitespace().collect();

        match tokens.as_slice() {
            &[POINT_MARKER, count] => match count.parse::<usize>() {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(TrackError::format(
                    self.line_no,
                    line,
                    format!("invalid point count `{}`", count),
                )),
            },
            _ => Err(TrackError::format(
                self.line_no,
                line,
                format!("expected {} line", POINT_MARKER),
            )),
        }
    }
}

impl<R: BufRead> Iterator for TrackReader<R> {
    type Item = TrackResult<Track>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.yielded == self.header.track_count {
            return None;
        }

        match self.read_track() {
            Ok(track) => {
                self.yielded += 1;
                Some(Ok(track))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn is_gzipped(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("gz"))
}

/// Loads every track of a file; the first error aborts the load.
pub fn load(path: impl AsRef<Path>, options: &LoadOptions) -> TrackResult<Vec<Track>> {
    TrackReader::open(path, options)?.collect()
}

/// Loads every track from an already-open source.
pub fn load_from<R: BufRead>(reader: R, options: &LoadOptions) -> TrackResult<Vec<Track>> {
    TrackReader::new(reader, options)?.collect()
}

/// Reads only the declaration of a file.
pub fn read_header(path: impl AsRef<Path>) -> TrackResult<Header> {
    let reader = TrackReader::open(path, &LoadOptions::default())?;
    Ok(reader.header().clone())
}

// -- Tests -------------------------------------------------------------------
