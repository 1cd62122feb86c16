// Convert local rec{YYYYMMDD}.txt[.gz] archive files to one CSV

use anyhow::Context;
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use tracing::{info, warn, Level};

use envlog::core::calendar::DayClock;
use envlog::core::export::write_csv;
use envlog::core::reader::ArchiveFile;
use envlog::Sample;

/// Archive to CSV converter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Local UTC offset in minutes (defaults to the host timezone)
    #[arg(long, allow_negative_numbers = true)]
    offset: Option<i64>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    out: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Archive files to convert
    #[arg(required = true)]
    files: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.debug { Level::DEBUG } else { Level::INFO })
        .with_writer(io::stderr)
        .init();

    let mut archives = Vec::with_capacity(args.files.len());
    for path in &args.files {
        match ArchiveFile::open(path) {
            Ok(a) => {
                info!("{}: {} samples", path, a.samples.len());
                archives.push(a);
            }
            Err(e) => warn!("Skipping {}: {}", path, e),
        }
    }
    archives.sort_by(|a, b| (&a.day_key, &a.path).cmp(&(&b.day_key, &b.path)));

    let samples: Vec<Sample> = archives.into_iter().flat_map(|a| a.samples).collect();
    let clock = args.offset.map(DayClock::new).unwrap_or_else(DayClock::local);

    let writer: Box<dyn Write> = match &args.out {
        Some(path) => Box::new(File::create(path).with_context(|| format!("create {path}"))?),
        None => Box::new(io::stdout().lock()),
    };
    let rows = write_csv(BufWriter::new(writer), &samples, &clock)?;
    info!("Wrote {} rows", rows);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_flags_and_files() {
        let args = Args::try_parse_from([
            "arc2csv", "--offset", "-300", "-o", "out.csv", "--debug", "rec20240101.txt.gz", "rec20240102.txt",
        ])
        .unwrap();
        assert_eq!(args.offset, Some(-300));
        assert_eq!(args.out.as_deref(), Some("out.csv"));
        assert!(args.debug);
        assert_eq!(args.files, vec!["rec20240101.txt.gz", "rec20240102.txt"]);
    }

    #[test]
    fn test_files_required() {
        assert!(Args::try_parse_from(["arc2csv", "--debug"]).is_err());
    }
}
