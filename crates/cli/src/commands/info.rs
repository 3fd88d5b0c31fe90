//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::ServiceConfig;
use serde::Serialize;
use tracing::info;

use super::load_config;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    source: String,
    store: StoreInfo,
    intake: IntakeInfo,
}

#[derive(Serialize)]
struct StoreInfo {
    concurrency: usize,
    success_policy: String,
    save_roots: Vec<String>,
}

#[derive(Serialize)]
struct IntakeInfo {
    max_identifier_len: usize,
    default_extension: String,
    date_partition_format: &'static str,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = ?args.config, "Loading configuration info");

    let service = load_config(args.config.as_deref())?;
    let info = build_config_info(&service, args);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(service: &ServiceConfig, args: &InfoArgs) -> ConfigInfo {
    ConfigInfo {
        version: format!("{:?}", service.version),
        source: args
            .config
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "defaults".to_string()),
        store: StoreInfo {
            concurrency: service.store.concurrency,
            success_policy: format!("{:?}", service.store.success_policy),
            save_roots: service
                .store
                .save_roots
                .iter()
                .map(|r| r.display().to_string())
                .collect(),
        },
        intake: IntakeInfo {
            max_identifier_len: service.intake.max_identifier_len,
            default_extension: service.intake.default_extension.clone(),
            date_partition_format: ingestion::DATE_PARTITION_FORMAT,
        },
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  imgstore Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("⚙️  Store");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Source: {}", info.source);
    println!("   ├─ Concurrency: {}", info.store.concurrency);
    println!("   └─ Success policy: {}", info.store.success_policy);

    println!("\n📁 Save Roots ({})", info.store.save_roots.len());
    for (i, root) in info.store.save_roots.iter().enumerate() {
        let prefix = if i == info.store.save_roots.len() - 1 {
            "└─"
        } else {
            "├─"
        };
        println!("   {} {}", prefix, root);
    }

    println!("\n📥 Intake");
    println!("   ├─ Max identifier length: {}", info.intake.max_identifier_len);
    println!("   ├─ Default extension: {}", info.intake.default_extension);
    println!(
        "   └─ Layout: <root>/<folderId>/<{}>/<name><ext>",
        info.intake.date_partition_format
    );
    println!();
}
