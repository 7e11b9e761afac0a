use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::task::JoinSet;

#[derive(Parser)]
#[command(name = "hol-bench")]
#[command(about = "Concurrent load generator for the testbed servers", long_about = None)]
struct Cli {
    /// Base URL of the server under test
    #[arg(short, long, default_value = "http://localhost:8080")]
    server: String,

    /// Route requests through this forward proxy
    #[arg(short, long)]
    proxy: Option<String>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mix slow and fast requests to observe head-of-line blocking
    Hol {
        /// Requests to the slow resource
        #[arg(long, default_value_t = 640)]
        slow: usize,

        /// Requests to the fast resource
        #[arg(long, default_value_t = 640)]
        fast: usize,

        #[arg(long, default_value = "/slow.html")]
        slow_path: String,

        #[arg(long, default_value = "/test.html")]
        fast_path: String,
    },
    /// Fire N concurrent GETs at one path
    Burst {
        #[arg(short, long, default_value_t = 32)]
        count: usize,

        #[arg(long, default_value = "/test.html")]
        path: String,
    },
}

struct Outcome {
    index: usize,
    path: String,
    result: Result<(u16, Duration), String>,
}

#[derive(Debug, Default, Serialize)]
struct PathSummary {
    requests: usize,
    failures: usize,
    average_secs: f64,
    max_secs: f64,
}

#[derive(Debug, Serialize)]
struct Summary {
    total_requests: usize,
    total_failures: usize,
    elapsed_secs: f64,
    paths: BTreeMap<String, PathSummary>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut builder = reqwest::Client::builder().no_proxy();
    if let Some(proxy) = &cli.proxy {
        builder = builder.proxy(reqwest::Proxy::http(proxy)?);
    }
    let client = builder.build()?;
    let base = cli.server.trim_end_matches('/').to_string();

    let plan: Vec<String> = match &cli.command {
        Commands::Hol {
            slow,
            fast,
            slow_path,
            fast_path,
        } => {
            println!("Starting {} requests:", slow + fast);
            println!("  {} requests to {}", slow, slow_path);
            println!("  {} requests to {}", fast, fast_path);
            std::iter::repeat(slow_path.clone())
                .take(*slow)
                .chain(std::iter::repeat(fast_path.clone()).take(*fast))
                .collect()
        }
        Commands::Burst { count, path } => {
            println!("Starting {} concurrent requests to {}", count, path);
            vec![path.clone(); *count]
        }
    };

    let start = Instant::now();
    let mut tasks = JoinSet::new();
    for (index, path) in plan.into_iter().enumerate() {
        let client = client.clone();
        let url = format!("{}{}", base, path);
        tasks.spawn(async move {
            let sent = Instant::now();
            let result = match client.get(&url).send().await {
                Ok(res) => {
                    let status = res.status().as_u16();
                    // Latency covers the full body.
                    match res.bytes().await {
                        Ok(_) => Ok((status, sent.elapsed())),
                        Err(e) => Err(e.to_string()),
                    }
                }
                Err(e) => Err(e.to_string()),
            };
            Outcome {
                index,
                path,
                result,
            }
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        outcomes.push(joined?);
    }
    let elapsed = start.elapsed();
    outcomes.sort_by_key(|o| o.index);

    let burst = matches!(cli.command, Commands::Burst { .. });
    if !cli.json {
        println!("\nResults:");
        for outcome in &outcomes {
            match &outcome.result {
                Ok((status, latency)) if burst => println!(
                    "Request-{} received response: {} in {:.2} seconds",
                    outcome.index + 1,
                    status,
                    latency.as_secs_f64()
                ),
                Ok((_, latency)) => println!(
                    "Request to {} took {:.2} seconds.",
                    outcome.path,
                    latency.as_secs_f64()
                ),
                Err(e) => println!("Request to {} failed: {}", outcome.path, e),
            }
        }
    }

    let summary = summarize(&outcomes, elapsed);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "All {} requests completed in {:.2} seconds ({} failed).",
            summary.total_requests, summary.elapsed_secs, summary.total_failures
        );
        for (path, stats) in &summary.paths {
            println!(
                "Average query time for {}: {:.3} seconds (max {:.3}, {} failed)",
                path, stats.average_secs, stats.max_secs, stats.failures
            );
        }
    }

    Ok(())
}

fn summarize(outcomes: &[Outcome], elapsed: Duration) -> Summary {
    let mut paths: BTreeMap<String, PathSummary> = BTreeMap::new();
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();

    for outcome in outcomes {
        let stats = paths.entry(outcome.path.clone()).or_default();
        stats.requests += 1;
        match &outcome.result {
            Ok((_, latency)) => {
                let secs = latency.as_secs_f64();
                *totals.entry(outcome.path.clone()).or_default() += secs;
                stats.max_secs = stats.max_secs.max(secs);
            }
            Err(_) => stats.failures += 1,
        }
    }

    for (path, stats) in paths.iter_mut() {
        let succeeded = stats.requests - stats.failures;
        if succeeded > 0 {
            stats.average_secs = totals.get(path).copied().unwrap_or_default() / succeeded as f64;
        }
    }

    Summary {
        total_requests: outcomes.len(),
        total_failures: paths.values().map(|s| s.failures).sum(),
        elapsed_secs: elapsed.as_secs_f64(),
        paths,
    }
}
