mod cli;

use anyhow::{Error, Result};
use clap::Parser;
use cli::{command, Cli, Commands};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<(), Error> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Summary { file, load } => match command::summary(file, &load.options()) {
            Ok(summary) => println!("{}", summary),
            Err(e) => eprintln!("Error: {:#}", e),
        },
        Commands::Convert { file, dir, load } => {
            match command::convert(file, dir.as_deref(), &load.options()) {
                Ok(dir) => println!("Container saved to `{}`", dir.display()),
                Err(e) => eprintln!("Error: {:#}", e),
            }
        }
        Commands::Export { dir, file } => match command::export(dir, file) {
            Ok(filename) => println!("File saved to `{}`", filename),
            Err(e) => eprintln!("Error: {:#}", e),
        },
        Commands::Climatology {
            file,
            year,
            months,
            load,
        } => match command::climatology(file, *year, months, &load.options()) {
            Ok(climatology) => println!("{}", climatology),
            Err(e) => eprintln!("Error: {:#}", e),
        },
    }

    Ok(())
}
