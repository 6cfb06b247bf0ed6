//! CLI for the fleetmon time-series store.
//!
//! Provides a synthetic per-minute log generator and an interactive query
//! loop over a loaded log directory.

use std::fmt::Write as _;
use std::fs;
use std::io::{self, BufRead, Write};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use fleetmon::{
    RangeRequest, SAMPLE_INTERVAL_SECS, Sample, SeriesStore, StoreConfig, ingest, timefmt,
};
use rand::Rng;

/// Size of the `192.168.i.j` synthetic address pool (`i` in 0..254,
/// `j` in 1..255).
const ADDRESS_POOL: u32 = 254 * 254;

/// fleetmon — in-memory store for per-minute fleet CPU utilization logs.
#[derive(Parser)]
#[command(name = "fleetmon", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Generate a directory of synthetic per-minute utilization logs.
    Generate {
        /// Destination directory for the `<epoch>.log` files.
        dest_dir: PathBuf,

        /// First minute to generate (inclusive), "YYYY-MM-DD HH:MM" UTC.
        #[arg(long, default_value = "2014-10-31 00:00")]
        start: String,

        /// End of the generated range (exclusive).
        #[arg(long, default_value = "2014-11-01 00:00")]
        end: String,

        /// Number of servers in the synthetic fleet.
        #[arg(long, default_value = "1000")]
        servers: u32,

        /// CPUs per server.
        #[arg(long, default_value = "2")]
        cpus: usize,
    },

    /// Load a log directory and answer interactive range queries.
    Query {
        /// Directory containing `<epoch>.log` files.
        data_dir: PathBuf,

        /// CPUs per server in the ingested fleet.
        #[arg(long, default_value = "2")]
        cpus: usize,

        /// Print query results as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            dest_dir,
            start,
            end,
            servers,
            cpus,
        } => cmd_generate(&dest_dir, &start, &end, servers, cpus),
        Commands::Query {
            data_dir,
            cpus,
            json,
        } => cmd_query(&data_dir, cpus, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Implements `fleetmon generate <dest_dir>`.
fn cmd_generate(
    dest_dir: &Path,
    start: &str,
    end: &str,
    servers: u32,
    cpus: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let start_ts = timefmt::parse_datetime(start)?;
    let end_ts = timefmt::parse_datetime(end)?;
    if start_ts >= end_ts {
        return Err("--start must be before --end".into());
    }
    if servers > ADDRESS_POOL {
        return Err(format!("--servers is capped at {ADDRESS_POOL}").into());
    }
    if cpus == 0 {
        return Err("--cpus must be at least 1".into());
    }

    fs::create_dir_all(dest_dir)?;

    let mut rng = rand::thread_rng();
    let mut files = 0u64;
    let mut ts = start_ts;

    while ts < end_ts {
        let mut contents = String::new();
        contents.push_str("timestamp\tIP\tcpu_id\tusage\n");

        for ip in fleet_ips(servers) {
            for cpu in 0..cpus {
                let usage: u8 = rng.gen_range(0..100);
                let _ = writeln!(contents, "{ts}\t{ip}\t{cpu}\t{usage}");
            }
        }

        fs::write(dest_dir.join(format!("{ts}.log")), contents)?;
        files += 1;
        ts += SAMPLE_INTERVAL_SECS;
    }

    println!(
        "Generated {files} log files for {servers} servers in '{}'",
        dest_dir.display()
    );
    Ok(())
}

/// Yields `count` distinct addresses from the `192.168.i.j` pool.
fn fleet_ips(count: u32) -> impl Iterator<Item = Ipv4Addr> {
    (0u8..=253)
        .flat_map(|i| (1u8..=254).map(move |j| Ipv4Addr::new(192, 168, i, j)))
        .take(count as usize)
}

/// Implements `fleetmon query <data_dir>`: load, finalize, then prompt.
fn cmd_query(data_dir: &Path, cpus: usize, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SeriesStore::new(StoreConfig {
        cpus_per_server: cpus,
    })?;
    let stats = ingest::load_dir(data_dir, &mut store)?;
    store.finalize()?;

    tracing::info!(
        files = stats.files,
        rows = stats.rows,
        skipped = stats.skipped,
        servers = store.server_count(),
        "store ready"
    );

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut stdout = io::stdout();
    let mut line = String::new();

    loop {
        stdout.write_all(b"> ")?;
        stdout.flush()?;

        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break; // EOF
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "EXIT" {
            break;
        }

        match run_query(&store, input) {
            Ok((req, samples)) => print_result(&req, &samples, json)?,
            Err(e) => println!("wrong command or query string: {e}"),
        }
    }

    Ok(())
}

/// Parses and runs one `QUERY <ip> <cpu> <start> <end>` line, where each
/// datetime is two tokens ("YYYY-MM-DD HH:MM").
fn run_query(
    store: &SeriesStore,
    input: &str,
) -> Result<(RangeRequest, Vec<Sample>), Box<dyn std::error::Error>> {
    let fields: Vec<&str> = input.split_whitespace().collect();
    if fields.len() != 7 || fields[0] != "QUERY" {
        return Err("expected QUERY <ip> <cpu> <start> <end>".into());
    }

    let cpu: usize = fields[2]
        .parse()
        .map_err(|_| format!("invalid cpu index '{}'", fields[2]))?;
    let start = format!("{} {}", fields[3], fields[4]);
    let end = format!("{} {}", fields[5], fields[6]);

    let req = RangeRequest::from_text(fields[1], cpu, &start, &end)?;
    let samples = store.query(&req)?.collect_all();
    Ok((req, samples))
}

/// Renders one query result in the text or JSON format.
fn print_result(
    req: &RangeRequest,
    samples: &[Sample],
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        let mut rows = Vec::with_capacity(samples.len());
        for sample in samples {
            rows.push(serde_json::json!({
                "time": timefmt::format_datetime(sample.timestamp)?,
                "usage": sample.usage,
            }));
        }
        let output = serde_json::json!({
            "ip": req.key.to_string(),
            "cpu": req.cpu,
            "count": samples.len(),
            "samples": rows,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let mut rendered = Vec::with_capacity(samples.len());
        for sample in samples {
            rendered.push(format!(
                "({}, {}%)",
                timefmt::format_datetime(sample.timestamp)?,
                sample.usage
            ));
        }
        println!("CPU{} usage on {}:", req.cpu, req.key);
        println!("{}", rendered.join(", "));
    }

    Ok(())
}
