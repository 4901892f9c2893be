//! Command line interface.

pub mod command;

use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use stormtrack::{CalendarKind, Dialect, LoadOptions};

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Reads TRACK storm track files
pub struct Cli {
    /// Log filter, e.g. `info` or `stormtrack=debug`
    #[arg(long, global = true, default_value = "warn", env = "RUST_LOG")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Summarise a track file
    Summary {
        file: PathBuf,
        #[command(flatten)]
        load: LoadArgs,
    },
    /// Convert a track file to a Parquet track container
    Convert {
        file: PathBuf,
        /// Output directory, `<file stem>-tracks` by default
        dir: Option<PathBuf>,
        #[command(flatten)]
        load: LoadArgs,
    },
    /// Write a track container back out as a track file
    Export { dir: PathBuf, file: PathBuf },
    /// Count storms forming in each month of a season
    Climatology {
        file: PathBuf,
        #[arg(long)]
        year: i32,
        /// Season months, may run into the next year (e.g. 11,12,1)
        #[arg(long, value_delimiter = ',', default_value = "1,2,3,4,5,6,7,8,9,10,11,12")]
        months: Vec<u32>,
        #[command(flatten)]
        load: LoadArgs,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DialectArg {
    Track,
    Hart,
    Hurdat2,
    NoAssumptions,
}

/// How to interpret the input file.
#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
    #[arg(long, value_enum, default_value_t = DialectArg::Track)]
    pub dialect: DialectArg,

    /// Extra data columns, used when the field count is not recognised
    #[arg(long, default_value_t = 0)]
    pub ex_cols: usize,

    #[arg(long, default_value = "gregorian", env = "STORMTRACK_CALENDAR")]
    pub calendar: CalendarKind,

    /// Field names for the no-assumptions dialect
    #[arg(long, value_delimiter = ',')]
    pub names: Vec<String>,
}

impl LoadArgs {
    pub fn options(&self) -> LoadOptions {
        let dialect = match self.dialect {
            DialectArg::Track => Dialect::Track,
            DialectArg::Hart => Dialect::Hart,
            DialectArg::Hurdat2 => Dialect::Hurdat2,
            DialectArg::NoAssumptions => Dialect::NoAssumptions {
                variable_names: self.names.clone(),
            },
        };

        LoadOptions::new(dialect, self.ex_cols, self.calendar)
    }
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

/// Creates a progress bar.
pub fn create_progress_bar(size: u64, message: String) -> ProgressBar {
    let style = ProgressStyle::with_template("[{eta_precise}] {bar:40.cyan/blue} {msg}")
        .map(|style| style.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());

    ProgressBar::new(size).with_message(message).with_style(style)
}

// -- Tests -------------------------------------------------------------------
