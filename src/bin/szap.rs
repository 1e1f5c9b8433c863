//! szap - Superuser ZAP
//!
//! Reads control cards from stdin (or `--input`) and applies them to a file
//! or block device.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use superzap::app::{Config, Session};

/// Patch bytes in a file or device from control cards
///
/// Control cards:
///   name <filename>
///   ver  <offset> <data>
///   rep  <offset> <data>
///   dump <filename> [<length> [<skip>]]
///   reset
/// (anything unrecognised is ignored)
///
/// Place name and ver cards before rep cards: a failed ver forces
/// read-only mode until reset.
#[derive(Parser, Debug)]
#[command(name = "szap")]
#[command(author, version, about, verbatim_doc_comment)]
struct Args {
    /// Print debug info (hex dumps of operands)
    #[arg(short = 'x', long, env = "SZAP_DEBUG")]
    debug: bool,

    /// Dry run: no writes are performed until a reset card
    #[arg(short, long, conflicts_with = "write")]
    dryrun: bool,

    /// Start with writes enabled
    #[arg(short, long)]
    write: bool,

    /// Read control cards from FILE instead of stdin
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // ロガー初期化
    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if args.verbose > 0 {
        logger.filter_level(match args.verbose {
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        });
    } else if args.quiet {
        logger.filter_level(log::LevelFilter::Error);
    }
    logger.init();

    if args.debug {
        println!("**  debug mode set  **");
    }
    if args.dryrun {
        println!("**  dryrun mode set  **");
    }

    let config = Config {
        debug: args.debug,
        write_enabled: args.write && !args.dryrun,
    };

    println!(
        "***  Superuser ZAP, '{}', version {}  ***",
        env!("CARGO_BIN_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let mut session = Session::new(config, io::stdout().lock());
    let result = match args.input {
        Some(ref path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open card file '{}'", path.display()))?;
            session.run(BufReader::new(file))
        }
        None => session.run(io::stdin().lock()),
    };

    if let Err(e) = result {
        drop(session);
        io::stdout().flush()?;
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }

    Ok(())
}
