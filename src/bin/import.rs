// src/bin/import.rs
// DOCUMENTATION: Bulk loader for the directory
// PURPOSE: Read a JSON array of place records and post it in batches to /admin/import
//
// Usage: import-places <file.json> [--batch-size N] [--rate N]

use anyhow::{bail, Context, Result};
use clap::Parser;
use dotenv::dotenv;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::env;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};

// --- ANSI terminal colours ---
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";

/// Bulk loader for the antiques directory
#[derive(Debug, Parser)]
#[command(name = "import-places")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Post a JSON array of places to /admin/import in batches")]
struct Args {
    /// JSON file holding an array of place records
    file: PathBuf,

    /// Records per request
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u64).range(1..))]
    batch_size: u64,

    /// Requests per second
    #[arg(long, default_value = "2")]
    rate: NonZeroU32,
}

/// Mirror of the server's import statistics
#[derive(Deserialize, Debug, Default)]
struct ImportResponse {
    #[serde(default)]
    received: u32,
    #[serde(default)]
    created: u32,
    #[serde(default)]
    skipped: u32,
    #[serde(default)]
    failed: u32,
    #[serde(default)]
    errors: Vec<String>,
    #[serde(default)]
    duration_ms: u64,
}

#[derive(Debug)]
struct BatchResult {
    index: usize,
    success: bool,
    stats: ImportResponse,
    duration_secs: f64,
}

struct Importer {
    base_url: String,
    admin_token: String,
    client: Client,
    results: Vec<BatchResult>,
}

impl Importer {
    fn new(base_url: String, admin_token: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            base_url,
            admin_token,
            client,
            results: Vec::new(),
        })
    }

    async fn check_service_health(&self) -> bool {
        match self.client.get(format!("{}/health", self.base_url)).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn post_batch(&self, batch: &[Value]) -> Result<ImportResponse> {
        let url = format!("{}/admin/import", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("X-Admin-Token", &self.admin_token)
            .json(batch)
            .send()
            .await
            .context("request failed")?;

        if response.status().is_success() {
            response
                .json::<ImportResponse>()
                .await
                .context("failed to parse response JSON")
        } else {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            bail!("HTTP {} - {}", status, body)
        }
    }

    async fn run(&mut self, records: Vec<Value>, batch_size: usize, rate: NonZeroU32) -> Result<()> {
        println!("\n{}Checking service status...{}", CYAN, RESET);
        if !self.check_service_health().await {
            bail!(
                "service unavailable at {} (is antiques-trail running?)",
                self.base_url
            );
        }
        println!("{}Service available{}\n", GREEN, RESET);

        let batches: Vec<&[Value]> = records.chunks(batch_size).collect();
        println!(
            "{}Importing {} records in {} batches ({} req/s){}\n",
            BOLD,
            records.len(),
            batches.len(),
            rate,
            RESET
        );

        let limiter = RateLimiter::direct(Quota::per_second(rate));

        for (i, batch) in batches.iter().enumerate() {
            limiter.until_ready().await;
            let start_time = Instant::now();

            let response = self.post_batch(batch).await;
            let duration_secs = start_time.elapsed().as_secs_f64();

            match response {
                Ok(stats) => {
                    println!(
                        "{}[{}/{}] {} new, {} skipped, {} failed ({:.1}s){}",
                        GREEN,
                        i + 1,
                        batches.len(),
                        stats.created,
                        stats.skipped,
                        stats.failed,
                        duration_secs,
                        RESET
                    );
                    for error in &stats.errors {
                        println!("{}    ! {}{}", YELLOW, error, RESET);
                    }
                    self.results.push(BatchResult {
                        index: i + 1,
                        success: true,
                        stats,
                        duration_secs,
                    });
                }
                Err(e) => {
                    println!("{}[{}/{}] batch failed: {:#}{}", RED, i + 1, batches.len(), e, RESET);
                    self.results.push(BatchResult {
                        index: i + 1,
                        success: false,
                        stats: ImportResponse {
                            received: batch.len() as u32,
                            ..Default::default()
                        },
                        duration_secs,
                    });
                }
            }
        }

        self.print_summary();
        Ok(())
    }

    fn print_summary(&self) {
        println!("\n{}Import Summary{}", BOLD, RESET);
        println!("{}", "-".repeat(64));
        println!(
            "{:<8} {:<8} {:>10} {:>10} {:>10} {:>12}",
            "Batch", "Status", "New", "Skipped", "Failed", "Duration"
        );
        println!("{}", "-".repeat(64));

        let mut total = ImportResponse::default();
        let mut failed_batches = 0;

        for res in &self.results {
            let status = if res.success { "ok" } else { "error" };
            println!(
                "{:<8} {:<8} {:>10} {:>10} {:>10} {:>11.1}s",
                res.index, status, res.stats.created, res.stats.skipped, res.stats.failed, res.duration_secs
            );

            total.received += res.stats.received;
            total.created += res.stats.created;
            total.skipped += res.stats.skipped;
            total.failed += res.stats.failed;
            total.duration_ms += res.stats.duration_ms;
            if !res.success {
                failed_batches += 1;
            }
        }

        println!("{}", "-".repeat(64));
        println!("{}Totals:{}", BOLD, RESET);
        println!("  Records sent:       {}", total.received);
        println!("  New places created: {}{}{}", GREEN, total.created, RESET);
        println!("  Duplicates skipped: {}{}{}", YELLOW, total.skipped, RESET);
        println!("  Records rejected:   {}{}{}", RED, total.failed, RESET);
        println!("  Server time:        {:.1}s", total.duration_ms as f64 / 1000.0);
        if failed_batches > 0 {
            println!("{}{} batch(es) could not be delivered{}", RED, failed_batches, RESET);
        }
    }
}

async fn run() -> Result<()> {
    dotenv().ok();

    let args = Args::parse();
    let admin_token = env::var("ADMIN_TOKEN").context("ADMIN_TOKEN must be set in .env")?;
    let base_url =
        env::var("PLACES_API_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("cannot read {}", args.file.display()))?;
    let records: Vec<Value> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of places", args.file.display()))?;

    let mut importer = Importer::new(base_url, admin_token)?;
    importer.run(records, args.batch_size as usize, args.rate).await
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}Error: {:#}{}", RED, e, RESET);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults_and_flags() {
        let parsed = Args::try_parse_from(["import-places", "shops.json"]).unwrap();
        assert_eq!(parsed.file, PathBuf::from("shops.json"));
        assert_eq!(parsed.batch_size, 50);
        assert_eq!(parsed.rate.get(), 2);

        let parsed = Args::try_parse_from([
            "import-places",
            "--batch-size",
            "10",
            "shops.json",
            "--rate",
            "5",
        ])
        .unwrap();
        assert_eq!(parsed.batch_size, 10);
        assert_eq!(parsed.rate.get(), 5);
    }

    #[test]
    fn test_args_errors() {
        assert!(Args::try_parse_from(["import-places"]).is_err());
        assert!(Args::try_parse_from(["import-places", "shops.json", "--batch-size", "0"]).is_err());
        assert!(Args::try_parse_from(["import-places", "shops.json", "--rate", "0"]).is_err());
        assert!(Args::try_parse_from(["import-places", "shops.json", "--rate"]).is_err());
        assert!(Args::try_parse_from(["import-places", "shops.json", "--verbose"]).is_err());
    }
}
