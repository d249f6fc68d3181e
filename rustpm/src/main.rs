use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use rustpm::data::kr::KrWriter;
use rustpm::run::config::RunConfig;
use rustpm::run::driver::RunDriver;

/// Select events from reconstructed PMap files and write the accepted
/// summary records.
#[derive(Debug, Parser)]
#[command(name = "rustpm", version, about)]
struct Cli {
    /// Path to the run configuration file (JSON).
    config: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("rustpm: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = RunConfig::from_file(&cli.config)?;

    println!("Input files         : {}", config.files_in.len());
    println!("Output file         : {}", config.file_out);
    println!("Max events          : {}", config.nmax());

    let mut driver = RunDriver::new(config.selector(), config.nmax(), config.nprint);
    let mut writer = KrWriter::create(Path::new(&config.file_out))?;

    let t0 = Instant::now();
    let counters = driver.run(&config.files_in, &mut writer)?;
    writer.finish()?;
    let dt = t0.elapsed().as_secs_f64();

    driver.print_summary();
    if counters.nevt_in > 0 {
        println!(
            "run {} evts in {} s, time/event = {}",
            counters.nevt_in,
            dt,
            dt / counters.nevt_in as f64
        );
    } else {
        println!("run 0 evts in {} s", dt);
    }

    Ok(())
}
