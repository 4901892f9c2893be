//! Flattened, column-per-variable form of a track collection.
//!
//! All observations are concatenated in track order into one array per
//! variable. Track `t` occupies `first_index[t] .. first_index[t] + point_count[t]`
//! of every record array; per-track attributes live in their own arrays
//! indexed by track position.
//!
//! On disk a container is a directory with two Parquet files:
//!
//! - `records.parquet`, one row per observation: `time`, `longitude`,
//!   `latitude`, `vorticity`, `wind_speed`, `pressure`, then the extras.
//! - `tracks.parquet`, one row per track: `track_id`, `first_index`,
//!   `point_count`, `start_time`, then the track extras.
//!
//! Times are stored as `Int64`; the schema metadata key `time_encoding` says
//! how to read them back.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fs::{self, File},
    path::Path,
    sync::Arc,
};

use arrow::{
    array::{Array, ArrayRef, Float64Array, Int64Array, PrimitiveArray, UInt64Array},
    compute::concat_batches,
    datatypes::{ArrowPrimitiveType, DataType, Field, Float64Type, Int64Type, Schema, UInt64Type},
    error::ArrowError,
    record_batch::RecordBatch,
};
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    basic::Compression,
    file::properties::WriterProperties,
};
use tracing::debug;

use crate::{
    calendar::{gregorian_from_seconds, gregorian_to_seconds, Datetime360, Timestamp},
    error::{TrackError, TrackResult},
    model::{Observation, Track},
};

pub const RECORDS_FILE: &str = "records.parquet";
pub const TRACKS_FILE: &str = "tracks.parquet";
const TIME_ENCODING_KEY: &str = "time_encoding";
const CHUNK_SIZE: usize = 100_000;

const RECORD_COLUMNS: [&str; 6] = [
    "time",
    "longitude",
    "latitude",
    "vorticity",
    "wind_speed",
    "pressure",
];
const TRACK_COLUMNS: [&str; 4] = ["track_id", "first_index", "point_count", "start_time"];

/// How timestamps are mapped onto `Int64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeEncoding {
    /// Seconds since 1970-01-01 in the Gregorian calendar.
    GregorianSeconds,
    /// Hours since 0000-01-01 in the 360-day calendar.
    Day360Hours,
    /// Bare TRACK timesteps.
    Timestep,
}

impl TimeEncoding {
    pub fn of(timestamp: &Timestamp) -> Self {
        match timestamp {
            Timestamp::Gregorian(_) => TimeEncoding::GregorianSeconds,
            Timestamp::Day360(_) => TimeEncoding::Day360Hours,
            Timestamp::Step(_) => TimeEncoding::Timestep,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TimeEncoding::GregorianSeconds => "gregorian_seconds_since_epoch",
            TimeEncoding::Day360Hours => "360_day_hours",
            TimeEncoding::Timestep => "timestep",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            TimeEncoding::GregorianSeconds,
            TimeEncoding::Day360Hours,
            TimeEncoding::Timestep,
        ]
        .into_iter()
        .find(|encoding| encoding.name() == name)
    }

    fn encode(&self, timestamp: &Timestamp) -> TrackResult<i64> {
        match (self, timestamp) {
            (TimeEncoding::GregorianSeconds, Timestamp::Gregorian(dt)) => {
                Ok(gregorian_to_seconds(dt))
            }
            (TimeEncoding::Day360Hours, Timestamp::Day360(dt)) => Ok(dt.hours_since_origin()),
            (TimeEncoding::Timestep, Timestamp::Step(step)) => Ok(*step),
            _ => Err(TrackError::Container(format!(
                "cannot store {} alongside {} times",
                timestamp,
                self.name()
            ))),
        }
    }

    fn decode(&self, value: i64) -> TrackResult<Timestamp> {
        let timestamp = match self {
            TimeEncoding::GregorianSeconds => {
                gregorian_from_seconds(value).map(Timestamp::Gregorian)
            }
            TimeEncoding::Day360Hours => {
                Datetime360::from_hours_since_origin(value).map(Timestamp::Day360)
            }
            TimeEncoding::Timestep => Some(Timestamp::Step(value)),
        };
        timestamp.ok_or_else(|| {
            TrackError::Container(format!("time {} out of range for {}", value, self.name()))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackContainer {
    pub time: Vec<Timestamp>,
    pub longitude: Vec<f64>,
    pub latitude: Vec<f64>,
    pub vorticity: Vec<f64>,
    pub wind_speed: Vec<Option<f64>>,
    pub pressure: Vec<Option<f64>>,
    pub extras: BTreeMap<String, Vec<Option<f64>>>,
    pub first_index: Vec<u64>,
    pub point_count: Vec<u64>,
    pub track_id: Vec<u64>,
    pub start_time: Vec<Option<Timestamp>>,
    pub track_extras: BTreeMap<String, Vec<Option<f64>>>,
}

impl TrackContainer {
    pub fn from_tracks(tracks: &[Track]) -> Self {
        let records: usize = tracks.iter().map(Track::len).sum();
        let ob_names: BTreeSet<&String> = tracks
            .iter()
            .flat_map(|t| t.obs.iter().flat_map(|ob| ob.extras.keys()))
            .collect();
        let track_names: BTreeSet<&String> =
            tracks.iter().flat_map(|t| t.extras.keys()).collect();

        let mut container = TrackContainer {
            time: Vec::with_capacity(records),
            longitude: Vec::with_capacity(records),
            latitude: Vec::with_capacity(records),
            vorticity: Vec::with_capacity(records),
            wind_speed: Vec::with_capacity(records),
            pressure: Vec::with_capacity(records),
            extras: ob_names
                .into_iter()
                .map(|name| (name.clone(), Vec::with_capacity(records)))
                .collect(),
            first_index: Vec::with_capacity(tracks.len()),
            point_count: Vec::with_capacity(tracks.len()),
            track_id: Vec::with_capacity(tracks.len()),
            start_time: Vec::with_capacity(tracks.len()),
            track_extras: track_names
                .into_iter()
                .map(|name| (name.clone(), Vec::with_capacity(tracks.len())))
                .collect(),
        };

        for track in tracks {
            container.first_index.push(container.time.len() as u64);
            container.point_count.push(track.len() as u64);
            container.track_id.push(track.id);
            container.start_time.push(track.start_time);
            for (name, values) in container.track_extras.iter_mut() {
                values.push(track.extras.get(name).copied());
            }

            for ob in &track.obs {
                container.time.push(ob.time);
                container.longitude.push(ob.lon);
                container.latitude.push(ob.lat);
                container.vorticity.push(ob.vorticity);
                container.wind_speed.push(ob.wind_speed);
                container.pressure.push(ob.pressure);
                for (name, values) in container.extras.iter_mut() {
                    values.push(ob.extras.get(name).copied());
                }
            }
        }

        container
    }

    pub fn track_count(&self) -> usize {
        self.track_id.len()
    }

    pub fn record_count(&self) -> usize {
        self.time.len()
    }

    /// Rebuilds the tracks in their original order.
    pub fn to_tracks(&self) -> TrackResult<Vec<Track>> {
        self.validate()?;

        let tracks = (0..self.track_count())
            .map(|t| {
                let start = self.first_index[t] as usize;
                let end = start + self.point_count[t] as usize;
                let obs = (start..end).map(|i| self.observation(i)).collect();

                let mut track = Track::new(self.track_id[t], self.start_time[t], obs);
                for (name, values) in &self.track_extras {
                    if let Some(value) = values[t] {
                        track.extras.insert(name.clone(), value);
                    }
                }
                track
            })
            .collect();

        Ok(tracks)
    }

    fn observation(&self, i: usize) -> Observation {
        let mut ob = Observation::new(
            self.time[i],
            self.longitude[i],
            self.latitude[i],
            self.vorticity[i],
        );
        ob.wind_speed = self.wind_speed[i];
        ob.pressure = self.pressure[i];
        for (name, values) in &self.extras {
            if let Some(value) = values[i] {
                ob.extras.insert(name.clone(), value);
            }
        }
        ob
    }

    fn validate(&self) -> TrackResult<()> {
        let records = self.record_count();
        let tracks = self.track_count();

        let record_lengths = [
            self.longitude.len(),
            self.latitude.len(),
            self.vorticity.len(),
            self.wind_speed.len(),
            self.pressure.len(),
        ];
        if record_lengths.iter().any(|len| *len != records)
            || self.extras.values().any(|v| v.len() != records)
        {
            return Err(TrackError::Container(
                "record arrays have different lengths".to_string(),
            ));
        }

        let track_lengths = [
            self.first_index.len(),
            self.point_count.len(),
            self.start_time.len(),
        ];
        if track_lengths.iter().any(|len| *len != tracks)
            || self.track_extras.values().any(|v| v.len() != tracks)
        {
            return Err(TrackError::Container(
                "track arrays have different lengths".to_string(),
            ));
        }

        for (t, (first, count)) in self.first_index.iter().zip(&self.point_count).enumerate() {
            if *count == 0 {
                return Err(TrackError::Container(format!(
                    "track {} has no records",
                    self.track_id[t]
                )));
            }
            match first.checked_add(*count) {
                Some(end) if end <= records as u64 => {}
                _ => {
                    return Err(TrackError::Container(format!(
                        "track {} spans records {} plus {} of {}",
                        self.track_id[t], first, count, records
                    )))
                }
            }
        }

        Ok(())
    }

    /// The single time encoding shared by every timestamp.
    pub fn time_encoding(&self) -> TrackResult<TimeEncoding> {
        let mut times = self.time.iter().chain(self.start_time.iter().flatten());

        let encoding = match times.next() {
            Some(first) => TimeEncoding::of(first),
            None => return Ok(TimeEncoding::Timestep),
        };
        for timestamp in times {
            if TimeEncoding::of(timestamp) != encoding {
                return Err(TrackError::Container(format!(
                    "cannot store {} alongside {} times",
                    timestamp,
                    encoding.name()
                )));
            }
        }

        Ok(encoding)
    }

    /// Writes `records.parquet` and `tracks.parquet` into `dir`, creating it
    /// if needed.
    pub fn write(&self, dir: impl AsRef<Path>) -> TrackResult<()> {
        let dir = dir.as_ref();
        self.validate()?;
        let encoding = self.time_encoding()?;
        fs::create_dir_all(dir)?;

        let metadata = HashMap::from([(
            TIME_ENCODING_KEY.to_string(),
            encoding.name().to_string(),
        )]);

        write_parquet(&dir.join(RECORDS_FILE), self.records_batch(encoding, &metadata)?)?;
        write_parquet(&dir.join(TRACKS_FILE), self.tracks_batch(encoding, &metadata)?)?;

        debug!(
            dir = %dir.display(),
            tracks = self.track_count(),
            records = self.record_count(),
            "wrote track container"
        );
        Ok(())
    }

    fn records_batch(
        &self,
        encoding: TimeEncoding,
        metadata: &HashMap<String, String>,
    ) -> TrackResult<RecordBatch> {
        let times = self
            .time
            .iter()
            .map(|t| encoding.encode(t))
            .collect::<TrackResult<Vec<i64>>>()?;

        let mut fields = vec![
            Field::new("time", DataType::Int64, false),
            Field::new("longitude", DataType::Float64, false),
            Field::new("latitude", DataType::Float64, false),
            Field::new("vorticity", DataType::Float64, false),
            Field::new("wind_speed", DataType::Float64, true),
            Field::new("pressure", DataType::Float64, true),
        ];
        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from(times)),
            Arc::new(Float64Array::from(self.longitude.clone())),
            Arc::new(Float64Array::from(self.latitude.clone())),
            Arc::new(Float64Array::from(self.vorticity.clone())),
            Arc::new(Float64Array::from(self.wind_speed.clone())),
            Arc::new(Float64Array::from(self.pressure.clone())),
        ];
        append_extras(&mut fields, &mut columns, &self.extras, &RECORD_COLUMNS)?;

        let schema = Arc::new(Schema::new(fields).with_metadata(metadata.clone()));
        Ok(RecordBatch::try_new(schema, columns)?)
    }

    fn tracks_batch(
        &self,
        encoding: TimeEncoding,
        metadata: &HashMap<String, String>,
    ) -> TrackResult<RecordBatch> {
        let start_times = self
            .start_time
            .iter()
            .map(|t| t.as_ref().map(|t| encoding.encode(t)).transpose())
            .collect::<TrackResult<Vec<Option<i64>>>>()?;

        let mut fields = vec![
            Field::new("track_id", DataType::UInt64, false),
            Field::new("first_index", DataType::UInt64, false),
            Field::new("point_count", DataType::UInt64, false),
            Field::new("start_time", DataType::Int64, true),
        ];
        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(UInt64Array::from(self.track_id.clone())),
            Arc::new(UInt64Array::from(self.first_index.clone())),
            Arc::new(UInt64Array::from(self.point_count.clone())),
            Arc::new(Int64Array::from(start_times)),
        ];
        append_extras(&mut fields, &mut columns, &self.track_extras, &TRACK_COLUMNS)?;

        let schema = Arc::new(Schema::new(fields).with_metadata(metadata.clone()));
        Ok(RecordBatch::try_new(schema, columns)?)
    }

    /// Reads a container written by [`TrackContainer::write`].
    pub fn read(dir: impl AsRef<Path>) -> TrackResult<Self> {
        let dir = dir.as_ref();
        let records = read_parquet(&dir.join(RECORDS_FILE))?;
        let tracks = read_parquet(&dir.join(TRACKS_FILE))?;

        let encoding = records
            .schema()
            .metadata()
            .get(TIME_ENCODING_KEY)
            .and_then(|name| TimeEncoding::from_name(name))
            .ok_or_else(|| TrackError::Container("missing or unknown time encoding".to_string()))?;

        let time = required::<Int64Type>(&records, "time")?
            .into_iter()
            .map(|t| encoding.decode(t))
            .collect::<TrackResult<Vec<_>>>()?;
        let start_time = column::<Int64Type>(&tracks, "start_time")?
            .into_iter()
            .map(|t| t.map(|t| encoding.decode(t)).transpose())
            .collect::<TrackResult<Vec<_>>>()?;

        let container = TrackContainer {
            time,
            longitude: required::<Float64Type>(&records, "longitude")?,
            latitude: required::<Float64Type>(&records, "latitude")?,
            vorticity: required::<Float64Type>(&records, "vorticity")?,
            wind_speed: column::<Float64Type>(&records, "wind_speed")?,
            pressure: column::<Float64Type>(&records, "pressure")?,
            extras: read_extras(&records, &RECORD_COLUMNS)?,
            first_index: required::<UInt64Type>(&tracks, "first_index")?,
            point_count: required::<UInt64Type>(&tracks, "point_count")?,
            track_id: required::<UInt64Type>(&tracks, "track_id")?,
            start_time,
            track_extras: read_extras(&tracks, &TRACK_COLUMNS)?,
        };
        container.validate()?;

        Ok(container)
    }
}

fn append_extras(
    fields: &mut Vec<Field>,
    columns: &mut Vec<ArrayRef>,
    extras: &BTreeMap<String, Vec<Option<f64>>>,
    reserved: &[&str],
) -> TrackResult<()> {
    for (name, values) in extras {
        if reserved.contains(&name.as_str()) {
            return Err(TrackError::Container(format!(
                "extra `{}` clashes with a standard column",
                name
            )));
        }
        fields.push(Field::new(name, DataType::Float64, true));
        columns.push(Arc::new(Float64Array::from(values.clone())));
    }
    Ok(())
}

fn read_extras(
    batch: &RecordBatch,
    reserved: &[&str],
) -> TrackResult<BTreeMap<String, Vec<Option<f64>>>> {
    batch
        .schema()
        .fields()
        .iter()
        .filter(|field| !reserved.contains(&field.name().as_str()))
        .map(|field| -> TrackResult<(String, Vec<Option<f64>>)> {
            Ok((field.name().clone(), column::<Float64Type>(batch, field.name())?))
        })
        .collect()
}

fn write_parquet(path: &Path, batch: RecordBatch) -> TrackResult<()> {
    let file = File::create(path)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;

    let rows = batch.num_rows();
    let mut offset = 0;
    while offset < rows {
        let length = CHUNK_SIZE.min(rows - offset);
        writer.write(&batch.slice(offset, length))?;
        offset += length;
    }

    writer.close()?;
    Ok(())
}

fn read_parquet(path: &Path) -> TrackResult<RecordBatch> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();

    let batches = builder
        .build()?
        .collect::<Result<Vec<RecordBatch>, ArrowError>>()?;

    Ok(concat_batches(&schema, &batches)?)
}

fn column<T: ArrowPrimitiveType>(
    batch: &RecordBatch,
    name: &str,
) -> TrackResult<Vec<Option<T::Native>>> {
    let array = batch
        .column_by_name(name)
        .ok_or_else(|| TrackError::Container(format!("missing column `{}`", name)))?;

    let values = array
        .as_any()
        .downcast_ref::<PrimitiveArray<T>>()
        .ok_or_else(|| {
            TrackError::Container(format!(
                "column `{}` has type {}",
                name,
                array.data_type()
            ))
        })?;

    Ok(values.iter().collect())
}

fn required<T: ArrowPrimitiveType>(batch: &RecordBatch, name: &str) -> TrackResult<Vec<T::Native>> {
    column::<T>(batch, name)?
        .into_iter()
        .map(|v| v.ok_or_else(|| TrackError::Container(format!("null in column `{}`", name))))
        .collect()
}

// -- Tests -------------------------------------------------------------------
