//! Argument parsing for the `cvl` binary.

use std::path::PathBuf;

use super::{Command, Invocation};

/// Parse CLI arguments into a typed invocation.
///
/// `args` excludes the program name (i.e. `["converge", "--dry-run"]`, not
/// `["cvl", "converge", "--dry-run"]`). Global flags (`--config`,
/// `--stage`) may appear anywhere.
pub fn parse_args(args: &[&str]) -> Result<Invocation, String> {
    let mut config = PathBuf::from("caravel.yml");
    let mut stage = None;
    let mut positional: Vec<&str> = Vec::new();
    let mut types = None;
    let mut hosts = None;
    let mut dry_run = false;

    let mut i = 0;
    while i < args.len() {
        match args[i] {
            "--config" => {
                config = PathBuf::from(take_value(args, &mut i, "--config")?);
            }
            "--stage" => {
                stage = Some(take_value(args, &mut i, "--stage")?.to_string());
            }
            "--type" => {
                types = Some(split_list(take_value(args, &mut i, "--type")?));
            }
            "--hosts" => {
                hosts = Some(split_list(take_value(args, &mut i, "--hosts")?));
            }
            "--dry-run" => {
                dry_run = true;
            }
            flag if flag.starts_with("--") => {
                return Err(format!("Unknown flag: '{}'", flag));
            }
            word => positional.push(word),
        }
        i += 1;
    }

    let command = match positional.as_slice() {
        [] => return Err("No command specified. Run 'cvl help' for usage.".into()),
        ["update"] => Command::Update,
        ["status"] => Command::Status,
        ["converge"] => Command::Converge {
            types,
            hosts,
            dry_run,
        },
        ["help"] => Command::Help,
        [cmd, ..] if matches!(*cmd, "update" | "status" | "converge" | "help") => {
            return Err(format!("Unexpected argument after '{}'", cmd));
        }
        [cmd, ..] => return Err(format!("Unknown command: '{}'", cmd)),
    };

    Ok(Invocation {
        config,
        stage,
        command,
    })
}

fn take_value<'a>(args: &[&'a str], i: &mut usize, flag: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .copied()
        .ok_or_else(|| format!("{} requires a value", flag))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn usage() -> &'static str {
    "Usage: cvl [--config <file>] [--stage <stage>] <command>\n\
     \n\
     Commands:\n\
       update                       refresh the inventory and cache\n\
       status                       print the cached inventory summary\n\
       converge [--type t[,t]] [--hosts h[,h]] [--dry-run]\n\
                                    reconcile running containers with config\n\
       help                         show this message\n"
}
