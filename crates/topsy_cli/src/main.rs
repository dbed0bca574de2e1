//! CLI smoke entry point.
//!
//! # Responsibility
//! - Boot the core from `TOPSY_*` environment variables.
//! - Print a deterministic summary for quick local sanity checks.

use log::error;
use std::process::ExitCode;
use std::sync::Arc;
use topsy_core::{init_logging, CoreConfig, LogAuditSink, Storage, Topsy};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_exit module=cli status=error");
            eprintln!("topsy: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir)?;
    }

    let app = Topsy::<dyn Storage>::from_config(&config, Arc::new(LogAuditSink))
        .map_err(|err| err.to_string())?;

    println!("topsy_core ping={}", topsy_core::ping());
    println!("topsy_core version={}", topsy_core::core_version());
    println!("topsy_core backend={}", app.storage().backend_name());
    Ok(())
}
