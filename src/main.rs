// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Operator CLI for the sealed records gateway.
//!
//! Results go to stdout as JSON, logs go to stderr. Failures print
//! `ERROR <code> <message>` and exit non-zero.

use std::env;
use std::process;

use base64ct::{Base64, Encoding};
use ring::rand::{SecureRandom, SystemRandom};

use sealed_records::auth::{Group, Session};
use sealed_records::config::{GatewayConfig, LogFormat, AEAD_KEY_ENV, HMAC_KEY_ENV};
use sealed_records::models::NewRecord;
use sealed_records::{AccessGateway, GatewayError};

const USAGE: &str = "\
usage: sealed-records <command>

commands:
  keygen                          print fresh key material as env assignments
  insert <group> <record-json>    insert a record and refresh trust
  refresh-trust                   accept the current dataset root
  query <group> [--id <row-id>]   verify and print records as seen by <group>
  prove <row-id>                  print an inclusion proof for one row

groups: H (write, full view), R (read, identity redacted)";

/// Principal recorded in the audit log for CLI sessions.
const CLI_PRINCIPAL: &str = "operator";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error("row {0} not found")]
    NotFound(u64),

    #[error("{0}")]
    Gateway(#[from] GatewayError),

    #[error("cannot encode output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    fn code(&self) -> &'static str {
        match self {
            CliError::Usage(_) => "usage",
            CliError::NotFound(_) => "not_found",
            CliError::Gateway(e) => e.error_code(),
            CliError::Output(_) => "output",
        }
    }
}

#[derive(Debug)]
enum Command {
    Keygen,
    Gateway(GatewayCommand),
}

/// Commands that open the data directory.
#[derive(Debug)]
enum GatewayCommand {
    Insert { group: Group, record: NewRecord },
    RefreshTrust,
    Query { group: Group, row_id: Option<u64> },
    Prove { row_id: u64 },
}

impl Command {
    fn parse(args: &[String]) -> Result<Self, CliError> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match args.as_slice() {
            ["keygen"] => return Ok(Command::Keygen),
            ["insert", group, record] => Ok(GatewayCommand::Insert {
                group: parse_group(group)?,
                record: serde_json::from_str(record)
                    .map_err(|e| CliError::Usage(format!("invalid record json: {e}")))?,
            }),
            ["refresh-trust"] => Ok(GatewayCommand::RefreshTrust),
            ["query", group] => Ok(GatewayCommand::Query {
                group: parse_group(group)?,
                row_id: None,
            }),
            ["query", group, "--id", id] => Ok(GatewayCommand::Query {
                group: parse_group(group)?,
                row_id: Some(parse_row_id(id)?),
            }),
            ["prove", id] => Ok(GatewayCommand::Prove {
                row_id: parse_row_id(id)?,
            }),
            _ => Err(CliError::Usage(USAGE.to_string())),
        }
        .map(Command::Gateway)
    }
}

fn parse_group(label: &str) -> Result<Group, CliError> {
    Group::from_label(label).ok_or_else(|| CliError::Usage(format!("unknown group '{label}'")))
}

fn parse_row_id(raw: &str) -> Result<u64, CliError> {
    raw.parse()
        .map_err(|_| CliError::Usage(format!("invalid row id '{raw}'")))
}

fn main() {
    let log_format = match LogFormat::from_lookup(|name| env::var(name).ok()) {
        Ok(format) => format,
        Err(err) => exit_with(&CliError::from(err)),
    };
    init_tracing(log_format);

    let args: Vec<String> = env::args().skip(1).collect();
    let result = Command::parse(&args).and_then(run);
    if let Err(err) = result {
        exit_with(&err);
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn exit_with(err: &CliError) -> ! {
    eprintln!("ERROR {} {}", err.code(), err);
    process::exit(1);
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Keygen => keygen(),
        Command::Gateway(command) => run_gateway(command),
    }
}

fn run_gateway(command: GatewayCommand) -> Result<(), CliError> {
    let config = GatewayConfig::from_env()?;
    let gateway = AccessGateway::open(&config)?;

    match command {
        GatewayCommand::Insert { group, record } => {
            let session = Session::new(CLI_PRINCIPAL, group);
            let row_id = gateway.insert(&session, &record)?;
            gateway.refresh_trust()?;
            print_json(&serde_json::json!({ "row_id": row_id }))
        }
        GatewayCommand::RefreshTrust => {
            let root = gateway.refresh_trust()?;
            print_json(&serde_json::json!({
                "root": sealed_records::crypto::to_hex(&root),
            }))
        }
        GatewayCommand::Query { group, row_id } => {
            let session = Session::new(CLI_PRINCIPAL, group);
            let result = gateway.query(&session)?;
            match row_id {
                None => print_json(&result),
                Some(id) => {
                    let row = result.find(id).ok_or(CliError::NotFound(id))?;
                    print_json(&serde_json::json!({
                        "row": row,
                        "completeness": result.completeness,
                    }))
                }
            }
        }
        GatewayCommand::Prove { row_id } => {
            let proof = gateway
                .prove_inclusion(row_id)?
                .ok_or(CliError::NotFound(row_id))?;
            print_json(&serde_json::json!({
                "proof": proof,
                "verified": proof.verify(),
            }))
        }
    }
}

fn keygen() -> Result<(), CliError> {
    let rng = SystemRandom::new();
    let mut aead_key = [0u8; 32];
    let mut hmac_key = [0u8; 32];
    rng.fill(&mut aead_key)
        .and_then(|_| rng.fill(&mut hmac_key))
        .map_err(|_| GatewayError::Crypto("system random generator failed".to_string()))?;

    println!("{AEAD_KEY_ENV}={}", Base64::encode_string(&aead_key));
    println!("{HMAC_KEY_ENV}={}", Base64::encode_string(&hmac_key));
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
