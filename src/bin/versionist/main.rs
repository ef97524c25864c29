//! Versionist CLI

use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Cli;
use versionist::core::ParseError;
use versionist::ops::{ReconcileOptions, Reconciler, DESCRIPTOR_GLOB};
use versionist::resolver::LookupError;
use versionist::util::diagnostic::{self, suggestions, Diagnostic};
use versionist::util::ParallelMapper;
use versionist::{AggregateError, CancelToken, Manifest, ProxyClient};

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Cancel `token` on Ctrl-C. The handler lives as long as the returned runtime.
fn cancel_on_interrupt(token: &CancelToken) -> Result<tokio::runtime::Runtime> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("versionist-signal")
        .enable_all()
        .build()
        .context("failed to start signal handler")?;

    let token = token.clone();
    runtime.spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Interrupted, cancelling remaining lookups and files");
                token.cancel();
            }
            Err(e) => tracing::warn!("Failed to listen for ctrl-c: {}", e),
        }
    });
    Ok(runtime)
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("versionist=debug")
    } else {
        EnvFilter::new("versionist=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let color = !cli.no_color && std::io::stderr().is_terminal();
    let config = cli.config();
    let mapper = Arc::new(ParallelMapper::new(config.jobs)?);
    let cancel = CancelToken::new();
    let _signals = cancel_on_interrupt(&cancel)?;

    let mut manifest = match Manifest::load(&cli.config_path) {
        Ok(manifest) => manifest,
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            return Ok(ExitCode::FAILURE);
        }
    };

    let client = ProxyClient::from_config(&config, Arc::clone(&mapper))?;
    let lookup_errors = manifest.resolve_latest(&client, &cancel);
    for err in lookup_errors.iter() {
        let diag = match err.downcast_ref::<LookupError>() {
            Some(lookup) => lookup.to_diagnostic(),
            None => Diagnostic::warning(format!("{:#}", err)),
        };
        diagnostic::emit(&diag, color);
    }

    let root = cli.root();
    let opts = ReconcileOptions {
        dry_run: cli.dry_run,
        pattern: DESCRIPTOR_GLOB.to_string(),
    };
    let report = Reconciler::new(&root, &manifest, mapper)
        .with_options(opts)
        .reconcile(&cancel)?;

    for path in &report.modified {
        let verb = if cli.dry_run { "Would update" } else { "Updated" };
        eprintln!("    {} {}", verb, root.join(path).display());
    }
    tracing::info!(
        "Finished processing mod files: {} scanned, {} modified",
        report.scanned,
        report.modified.len()
    );

    let scan_failed = !report.errors.is_empty();
    if scan_failed {
        let failed = report.errors.len();
        let mut unparsed = AggregateError::new();
        for err in report.errors {
            let parse_diag = err
                .chain()
                .find_map(|cause| cause.downcast_ref::<ParseError>())
                .map(ParseError::to_diagnostic);
            match parse_diag {
                Some(diag) => diagnostic::emit(&diag, color),
                None => unparsed.push(err),
            }
        }

        let diag = Diagnostic::from_aggregate(
            format!("{} descriptor files could not be processed", failed),
            &unparsed,
        )
        .with_suggestion(suggestions::SCAN_FAILED);
        diagnostic::emit(&diag, color);
    }

    if !scan_failed && lookup_errors.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
