use anyhow::{bail, Result};
use epathway_scraper::{
    authorities::{self, Authority},
    HttpClient, Scraper,
};
use std::env;
use std::io::Write;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

fn usage() -> ! {
    eprintln!("usage: epathway_scraper <authority|all> [authorities.yaml]");
    eprintln!("known authorities:");
    for authority in authorities::all() {
        eprintln!("  {}", authority.name);
    }
    std::process::exit(2);
}

/// Scrape one authority, writing each record to stdout as a JSON line.
fn run(authority: &Authority) -> Result<usize> {
    info!(name = %authority.name, url = %authority.url, "scraping authority");
    let client = HttpClient::new()?;
    let scraper = Scraper::new(&authority.url, client, authority.options())?;
    let mut out = std::io::stdout();
    let emitted = scraper.scrape(|record| {
        info!(reference = %record.council_reference, address = %record.address, "storing");
        if let Ok(line) = serde_json::to_string(&record) {
            let _ = writeln!(out, "{line}");
        }
    })?;
    Ok(emitted)
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,epathway_scraper=info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    // ─── 2) pick authorities ─────────────────────────────────────────
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        usage();
    }
    let loaded;
    let table: &[Authority] = match args.get(1) {
        Some(path) => {
            loaded = authorities::load_file(Path::new(path))?;
            &loaded
        }
        None => authorities::all(),
    };

    let selected: Vec<&Authority> = if args[0] == "all" {
        table.iter().collect()
    } else {
        match table.iter().find(|a| a.name == args[0]) {
            Some(authority) => vec![authority],
            None => bail!("unknown authority {:?}", args[0]),
        }
    };

    // ─── 3) scrape each one ──────────────────────────────────────────
    let mut failures = 0;
    for authority in selected {
        match run(authority) {
            Ok(emitted) => info!(name = %authority.name, emitted, "done"),
            Err(err) => {
                error!(name = %authority.name, "scrape failed: {err:#}");
                failures += 1;
            }
        }
    }
    if failures > 0 {
        bail!("{failures} authority scrape(s) failed");
    }
    Ok(())
}
