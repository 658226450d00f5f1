#[macro_use]
extern crate log;

use clap::{App, Arg, ArgMatches};
use log::LevelFilter;
use rrscan::probe::{ScanConfig, Scanner, DEFAULT_WORKERS};
use rrscan::report::{self, CsvWriter};
use rrscan::source::SourceAddrs;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::process;
use std::time::Duration;

fn main() {
    let default_workers = DEFAULT_WORKERS.to_string();
    let matches = App::new("rrscan")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Checks HTTP servers for HTTP/2 Rapid Reset (CVE-2023-44487) exposure")
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Sets the level of verbosity (-v progress, -vv protocol steps, -vvv frames)"),
        )
        .arg(
            Arg::with_name("input")
                .help("File with one URL per line")
                .short("i")
                .long("input")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::with_name("output")
                .help("Writes results to this file instead of stdout")
                .short("o")
                .long("output")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("proxy")
                .help("Sends every connection through an HTTP CONNECT proxy, e.g. http://127.0.0.1:8080")
                .long("proxy")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("timeout")
                .help("Seconds to wait for each connect, handshake and response")
                .short("t")
                .long("timeout")
                .takes_value(true)
                .default_value("5"),
        )
        .arg(
            Arg::with_name("workers")
                .help("Number of targets scanned concurrently")
                .short("w")
                .long("workers")
                .takes_value(true)
                .default_value(&default_workers),
        )
        .arg(
            Arg::with_name("json")
                .help("Writes a JSON array instead of CSV")
                .long("json"),
        )
        .get_matches();

    init_logger(matches.occurrences_of("verbose"));

    if let Err(e) = run(&matches) {
        error!("{}", e);
        process::exit(1);
    }
}

fn init_logger(verbosity: u64) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn run(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let timeout: f64 = matches
        .value_of("timeout")
        .unwrap_or("5")
        .parse()
        .map_err(|_| "timeout must be a number of seconds")?;
    if !timeout.is_finite() || !(0.0..=3600.0).contains(&timeout) {
        return Err("timeout must be between 0 and 3600 seconds".into());
    }
    let workers: usize = matches
        .value_of("workers")
        .unwrap_or_default()
        .parse()
        .map_err(|_| "workers must be a positive integer")?;

    let mut builder = ScanConfig::builder()
        .timeout(Duration::from_secs_f64(timeout))
        .workers(workers);
    if let Some(proxy) = matches.value_of("proxy") {
        builder = builder.proxy(proxy);
    }
    let config = builder.build()?;

    let input = matches.value_of("input").unwrap_or_default();
    let file = File::open(input).map_err(|e| format!("cannot open {}: {}", input, e))?;
    let targets = report::read_targets(BufReader::new(file))?;
    if targets.is_empty() {
        warn!("{} contains no URLs", input);
    }

    let out: Box<dyn Write> = match matches.value_of("output") {
        Some(path) => Box::new(File::create(path).map_err(|e| format!("cannot create {}: {}", path, e))?),
        None => Box::new(io::stdout().lock()),
    };

    let source = SourceAddrs::discover(&config);
    let scanner = Scanner::new(config, source);

    let scanned = if matches.is_present("json") {
        let results = scanner.scan_all(&targets);
        report::write_json(out, &results)?;
        results.len()
    } else {
        write_csv(&scanner, &targets, out)?
    };

    info!("scanned {} targets", scanned);
    Ok(())
}

/// Write each CSV row as soon as its target, and every one before it, is done
fn write_csv<W: Write>(scanner: &Scanner, targets: &[String], out: W) -> Result<usize, Box<dyn Error>> {
    let mut writer = CsvWriter::new(out);
    writer.write_header()?;

    let mut written = 0;
    let mut failure = None;
    scanner.scan_each(targets, |result| {
        if failure.is_some() {
            return;
        }
        match writer.write_result(&result) {
            Ok(()) => written += 1,
            Err(e) => failure = Some(e),
        }
    });

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(written),
    }
}
