//! Scanning-station entry point.
//!
//! # Responsibility
//! - Load configuration, initialize logging and dispatch one command.
//! - Print exactly one JSON document per invocation on stdout.
//!
//! Usage:
//! - `rollcall scan <payload>`: payload is a bare token or `{"idno": "..."}`.
//! - `rollcall report [YYYY-MM-DD]`
//! - `rollcall version` | `rollcall ping`

mod api;

use log::warn;
use rollcall_core::{init_logging_from_config, RollcallConfig, SystemClock};
use serde::Serialize;
use std::process::ExitCode;

const USAGE: &str = "usage: rollcall <scan <payload> | report [YYYY-MM-DD] | version | ping>";

fn main() -> ExitCode {
    let config = match RollcallConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("rollcall: {err}");
            return ExitCode::from(2);
        }
    };
    if let Err(err) = init_logging_from_config(&config) {
        // Scanning keeps working without file logs.
        eprintln!("rollcall: logging disabled: {err}");
    }

    let clock = SystemClock::new(config.clock_policy);
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("scan") => {
            let Some(payload) = args.get(1) else {
                eprintln!("{USAGE}");
                return ExitCode::from(2);
            };
            let response = api::scan(&config.db_path, payload, clock);
            if !response.success {
                warn!(
                    "event=scan module=cli status={} http_status={}",
                    response.outcome, response.status
                );
            }
            print_json(&response, response.success)
        }
        Some("report") => {
            let response = api::report(&config.db_path, args.get(1).map(String::as_str), clock);
            print_json(&response, response.ok)
        }
        Some("version") => {
            println!("rollcall_core version={}", rollcall_core::core_version());
            ExitCode::SUCCESS
        }
        Some("ping") => {
            println!("rollcall_core ping={}", rollcall_core::ping());
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("{USAGE}");
            ExitCode::from(2)
        }
    }
}

fn print_json(value: &impl Serialize, ok: bool) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(err) => {
            eprintln!("rollcall: failed to encode response: {err}");
            return ExitCode::FAILURE;
        }
    }
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
