//! CVL — the command-line entry point for Caravel.
//!
//! # Usage
//!
//! ```text
//! cvl update
//! cvl status
//! cvl converge --type web --dry-run
//! cvl --stage staging converge
//! ```
//!
//! Fatal errors abort the run with the triggering message and exit code 1;
//! warnings are logged and the run continues.

use std::process;

use log::error;

use caravel_core::cli::{parse_args, usage, Command};
use caravel_core::engine::{ConvergeOptions, Engine};
use caravel_core::infrastructure::SshRunner;
use caravel_core::types::config::FleetConfig;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let arg_refs: Vec<&str> = args[1..].iter().map(|s| s.as_str()).collect();

    let invocation = match parse_args(&arg_refs) {
        Ok(inv) => inv,
        Err(e) => {
            eprintln!("cvl: {}", e);
            process::exit(1);
        }
    };

    if invocation.command == Command::Help {
        print!("{}", usage());
        return;
    }

    let mut cfg = match FleetConfig::load(&invocation.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };
    if let Some(stage) = invocation.stage {
        cfg.stage = stage;
    }

    let runner = SshRunner::new(cfg.ssh_user.clone());
    let engine = Engine::new(&cfg, &runner);

    let result = match invocation.command {
        Command::Update => engine.update().map(|cloud| {
            for line in cloud.summary() {
                println!("{}", line);
            }
        }),
        Command::Status => engine.status().map(|cloud| {
            for line in cloud.summary() {
                println!("{}", line);
            }
        }),
        Command::Converge {
            types,
            hosts,
            dry_run,
        } => {
            let opts = ConvergeOptions {
                types,
                hosts,
                dry_run,
            };
            engine.converge(&opts).map(|(report, cloud)| {
                println!("{}", report.summary());
                for skipped in &report.skipped {
                    println!("  skipped: {}", skipped);
                }
                for line in cloud.summary() {
                    println!("{}", line);
                }
            })
        }
        Command::Help => unreachable!(),
    };

    if let Err(e) = result {
        error!("{}", e);
        process::exit(1);
    }
}
