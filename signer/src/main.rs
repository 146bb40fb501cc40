// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Quill Offline Signer
//!
//! Entry point for the `quill-signer` binary. Parses CLI arguments,
//! initializes logging, loads configuration and dispatches to one of four
//! subcommands:
//!
//! - `keygen`: generate a key pair, optionally sealing it into a wallet
//! - `inspect`: summarize a pending transaction and its signers
//! - `sign`: add local signatures, never touching the network
//! - `broadcast`: submit a fully signed transaction to a node
//!
//! Results go to stdout as JSON; logs go to stderr.

mod cli;
mod commands;
mod config;
mod logging;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use cli::{Commands, QuillSignerCli};
use config::SignerConfig;

fn main() -> Result<()> {
    let cli = QuillSignerCli::parse();
    logging::init_logging("quill_signer=info,quill_protocol=info", cli.log_format);

    let config = SignerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Keygen(args) => emit(&commands::keygen(&args, &config)?, None),
        Commands::Inspect(args) => emit(&commands::inspect(&args, &config)?, None),
        Commands::Sign(args) => {
            let signed = commands::sign(&args, &config)?;
            emit(&signed, args.out.as_deref())
        }
        Commands::Broadcast(args) => emit(&commands::broadcast(&args, &config)?, None),
    }
}

/// Pretty-print `value` to `out`, or to stdout when no path is given.
fn emit<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to encode output")?;
    match out {
        Some(path) => {
            std::fs::write(path, format!("{text}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "output written");
        }
        None => println!("{text}"),
    }
    Ok(())
}
