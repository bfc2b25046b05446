//! Offline record file inspector.
//!
//! # Responsibility
//! - Report what a boot-time load would register from a record file.
//! - Keep output machine-readable (one JSON document on stdout).

use scorevault_core::{core_version, summarize, RegistryConfig};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| RegistryConfig::default().record_path);

    let summary = match summarize(&path) {
        Ok(summary) => summary,
        Err(err) => {
            eprintln!("scorevault {}: {err}", core_version());
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&summary) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("scorevault {}: failed to encode summary: {err}", core_version());
            ExitCode::FAILURE
        }
    }
}
