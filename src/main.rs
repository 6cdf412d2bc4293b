mod cli;

use remuxer::{batch, config};
use remuxer_av::RemuxReport;
use remuxer_common::paths::output_path_for;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use tokio_util::sync::CancellationToken;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            // Verbose mode: per-packet corrections included
            "remuxer=trace,remuxer_av=trace,remuxer_common=debug".to_string()
        } else {
            "remuxer=info,remuxer_av=info".to_string()
        }
    });

    // Logs go to stderr so `--json` output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Remux {
            input,
            output,
            json,
        } => remux_one(&input, output.as_deref(), cli.config.as_deref(), json),
        Commands::Batch { dir, jobs } => batch_dir(&dir, jobs, cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("remuxer {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn remux_one(
    input: &Path,
    output: Option<&Path>,
    config_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    // Verify input file exists
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", input);
    }

    let output = match output {
        Some(path) => path.to_path_buf(),
        None => output_path_for(input, &config.remux.extension)?,
    };

    let report = remuxer_av::remux_file(input, &output, &config.remux.options())
        .with_context(|| format!("Failed to remux {:?}", input))?;

    if json {
        let json_str = serde_json::to_string_pretty(&report)?;
        println!("{}", json_str);
    } else {
        println!("Output: {}", output.display());
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &RemuxReport) {
    println!("Streams: {} of {} kept", report.streams_out, report.streams_in);
    println!(
        "Packets: {} read, {} written, {} dropped, {} skipped",
        report.packets_read, report.packets_written, report.packets_dropped, report.packets_skipped
    );
    if report.collisions + report.inversions + report.regressions > 0 {
        println!(
            "Repairs: {} equal dts, {} pts inversions, {} backwards dts",
            report.collisions, report.inversions, report.regressions
        );
    }
    println!(
        "Offsets: pts {}, dts {}",
        report.offsets.pts_offset, report.offsets.dts_offset
    );
}

fn batch_dir(dir: &Path, jobs: Option<usize>, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    if !dir.is_dir() {
        anyhow::bail!("Not a directory: {:?}", dir);
    }

    let inputs = batch::discover(dir, &config.batch.extensions);
    let (planned, rejected) = batch::plan_jobs(inputs, &config.remux.extension);
    let limit = batch::concurrency_limit(jobs.unwrap_or(config.batch.max_jobs));

    tracing::info!(
        "Remuxing {} files from {:?} with {} concurrent jobs",
        planned.len(),
        dir,
        limit
    );

    let options = config.remux.options();
    let rt = tokio::runtime::Runtime::new()?;
    let summary = rt.block_on(async move {
        let cancel = CancellationToken::new();
        let signal_task = tokio::spawn(shutdown_signal(cancel.clone()));

        let summary = batch::run_batch(planned, limit, cancel, move |job| {
            remuxer_av::remux_file(&job.input, &job.output, &options)
        })
        .await;

        signal_task.abort();
        summary
    });

    for (job, report) in &summary.succeeded {
        println!(
            "✓ {} -> {} ({} packets)",
            job.input.display(),
            job.output.display(),
            report.packets_written
        );
    }
    for (job, reason) in &summary.failed {
        println!("✗ {}: {}", job.input.display(), reason);
    }
    for (input, reason) in &rejected {
        println!("✗ {}: {}", input.display(), reason);
    }

    let failed = summary.failed.len() + rejected.len();
    let total = summary.total() + rejected.len();
    println!("\n{} succeeded, {} failed", summary.succeeded.len(), failed);

    if failed > 0 {
        anyhow::bail!("{} of {} files failed", failed, total);
    }

    Ok(())
}

/// Cancel `cancel` on Ctrl+C so no further files are started.
async fn shutdown_signal(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::warn!("Interrupted, letting running jobs finish");
            cancel.cancel();
        }
        Err(e) => tracing::warn!("Failed to install Ctrl+C handler: {}", e),
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Lookahead: {} packets", config.remux.lookahead);
            println!("  Faststart: {}", config.remux.faststart);
            println!("  Output extension: {}", config.remux.extension);
            println!(
                "  Batch jobs: {}",
                batch::concurrency_limit(config.batch.max_jobs)
            );
            println!("  Batch extensions: {}", config.batch.extensions.join(", "));
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Lookahead: {} packets", config.remux.lookahead);
            println!("  Output extension: {}", config.remux.extension);
        }
    }

    Ok(())
}
