//! xdb-region: CLI tool for searching, verifying and benchmarking xdb files.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use xdb_region::{CachePolicy, IpVersion, SearchResult, Searcher, SearcherConfig};

#[derive(Parser)]
#[command(name = "xdb-region")]
#[command(version)]
#[command(about = "Look up IP regions in xdb database files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search one or more IP addresses
    Search {
        /// xdb database file
        #[arg(short, long)]
        db: PathBuf,

        /// Cache policy: file, vectorIndex or content
        #[arg(short, long, default_value = "vectorIndex")]
        policy: CachePolicy,

        /// IP family of the database: v4 or v6
        #[arg(short = 'v', long, default_value = "v4")]
        ip_version: IpVersion,

        /// Print one JSON object per address
        #[arg(long)]
        json: bool,

        /// Addresses to look up
        #[arg(required = true)]
        ips: Vec<String>,
    },

    /// Verify the structure of xdb files
    Verify {
        /// Files to check
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Print one JSON report per file
        #[arg(long)]
        json: bool,
    },

    /// Compare cache policies over a list of addresses
    Bench {
        /// xdb database file
        #[arg(short, long)]
        db: PathBuf,

        /// Passes over the address list per policy
        #[arg(short = 'n', long, default_value_t = 10_000)]
        iterations: u32,

        /// IP family of the database: v4 or v6
        #[arg(short = 'v', long, default_value = "v4")]
        ip_version: IpVersion,

        /// Addresses to look up
        #[arg(required = true)]
        ips: Vec<String>,
    },
}

#[derive(Serialize)]
struct SearchLine<'a> {
    ip: &'a str,
    #[serde(flatten)]
    result: &'a SearchResult,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Search {
            db,
            policy,
            ip_version,
            json,
            ips,
        } => search(&db, SearcherConfig::new(policy, ip_version), &ips, json),
        Commands::Verify { paths, json } => verify(&paths, json),
        Commands::Bench {
            db,
            iterations,
            ip_version,
            ips,
        } => bench(&db, iterations, ip_version, &ips),
    };

    match outcome {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn search(
    db: &Path,
    config: SearcherConfig,
    ips: &[String],
    json: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let searcher = Searcher::open(db, config)?;
    let mut all_ok = true;

    for ip in ips {
        match searcher.search(ip) {
            Ok(result) if json => {
                let line = SearchLine {
                    ip,
                    result: &result,
                };
                println!("{}", serde_json::to_string(&line)?);
            }
            Ok(result) => println!(
                "{}\t{}\tio={}\ttook={:.2}µs",
                ip,
                result.region.as_deref().unwrap_or("(not found)"),
                result.io_count,
                result.took_micros()
            ),
            Err(e) if e.is_fatal_for_searcher() => return Err(e.into()),
            Err(e) => {
                eprintln!("{}: {}", ip, e);
                all_ok = false;
            }
        }
    }

    searcher.close();
    Ok(all_ok)
}

fn verify(paths: &[PathBuf], json: bool) -> Result<bool, Box<dyn std::error::Error>> {
    let mut all_valid = true;

    for path in paths {
        let report = xdb_region::verify(path);
        all_valid &= report.valid;

        if json {
            println!("{}", serde_json::to_string(&report)?);
        } else if report.valid {
            println!("{}: valid", path.display());
        } else {
            println!(
                "{}: invalid (errorCode {}): {}",
                path.display(),
                report.error_code,
                report.message.as_deref().unwrap_or("")
            );
        }
    }

    Ok(all_valid)
}

fn bench(
    db: &Path,
    iterations: u32,
    ip_version: IpVersion,
    ips: &[String],
) -> Result<bool, Box<dyn std::error::Error>> {
    if iterations == 0 {
        return Err("iterations must be positive".into());
    }

    println!("| policy | ops | avg µs/op | avg io | qps |");
    println!("|---|---:|---:|---:|---:|");

    for policy in CachePolicy::ALL {
        let searcher = Searcher::open(db, SearcherConfig::new(policy, ip_version))?;

        let mut ops = 0u64;
        let mut total_io = 0u64;
        let mut total_time = Duration::ZERO;
        for _ in 0..iterations {
            for ip in ips {
                let result = searcher.search(ip)?;
                ops += 1;
                total_io += result.io_count as u64;
                total_time += result.took;
            }
        }
        searcher.close();

        let avg_micros = total_time.as_secs_f64() * 1_000_000.0 / ops as f64;
        let qps = if total_time.is_zero() {
            f64::INFINITY
        } else {
            ops as f64 / total_time.as_secs_f64()
        };
        println!(
            "| {} | {} | {:.3} | {:.2} | {:.0} |",
            policy,
            ops,
            avg_micros,
            total_io as f64 / ops as f64,
            qps
        );
    }

    Ok(true)
}
