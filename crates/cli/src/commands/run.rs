//! `run` command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use contracts::ServiceConfig;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{error, info, warn};

use super::load_config;
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let service = resolve_config(args)?;

    info!(
        concurrency = service.store.concurrency,
        save_roots = ?service.store.save_roots,
        success_policy = ?service.store.success_policy,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&service);
        return Ok(());
    }

    let input = open_input(&args.input).await?;

    let pipeline = Pipeline::new(PipelineConfig {
        service,
        wait: args.wait,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    });

    info!(input = %args.input.display(), "Reading upload requests...");

    let stats = pipeline
        .run(input, tokio::io::stdout(), setup_shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        accepted = stats.accepted,
        rejected = stats.rejected,
        succeeded = stats.dispatcher.succeeded,
        failed = stats.dispatcher.failed,
        duration_secs = stats.duration.as_secs_f64(),
        "Pipeline completed"
    );
    stats.print_summary();

    Ok(())
}

/// Config file (or defaults), then CLI overrides, then validation
fn resolve_config(args: &RunArgs) -> Result<ServiceConfig> {
    let mut service = load_config(args.config.as_deref())?;

    if let Some(concurrency) = args.concurrency {
        info!(concurrency, "Overriding concurrency from CLI");
        service.store.concurrency = concurrency;
    }
    if let Some(roots) = args.save_root_overrides() {
        info!(save_roots = ?roots, "Overriding save roots from CLI");
        service.store.save_roots = roots;
    }
    if let Some(policy) = args.success_policy {
        service.store.success_policy = policy.into();
    }

    config_loader::ConfigLoader::validate(&service).context("Invalid effective configuration")?;
    for warning in config_loader::ConfigLoader::warnings(&service) {
        warn!("{}", warning);
    }

    Ok(service)
}

async fn open_input(path: &Path) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }

    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| CliError::input_open(path.display().to_string(), e))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(service: &ServiceConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Store:");
    println!("  Concurrency: {}", service.store.concurrency);
    println!("  Success policy: {:?}", service.store.success_policy);
    println!("\nSave roots ({}):", service.store.save_roots.len());
    for root in &service.store.save_roots {
        println!("  - {}", root.display());
    }
    println!("\nIntake:");
    println!("  Max identifier length: {}", service.intake.max_identifier_len);
    println!("  Default extension: {}", service.intake.default_extension);
    println!();
}
