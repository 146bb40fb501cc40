//! # CLI Interface
//!
//! Command-line structure for `quill-signer`, via `clap` derive. Four
//! subcommands: `keygen`, `inspect`, `sign` and `broadcast`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Offline transaction signer.
///
/// Pending transactions are JSON files: the canonical transaction plus an
/// optional side channel naming the authorities and keys that must sign.
/// `sign` never touches the network; only `broadcast` does.
#[derive(Parser, Debug)]
#[command(
    name = "quill-signer",
    about = "Offline multi-party transaction signer",
    version,
    propagate_version = true
)]
pub struct QuillSignerCli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty, env = "QUILL_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Path to a TOML configuration file with `[client]` and `[transport]`
    /// sections.
    #[arg(long, short = 'c', global = true, env = "QUILL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a fresh private key and print it with its public key.
    Keygen(KeygenArgs),
    /// Show what a pending transaction contains and who still has to sign.
    Inspect(InspectArgs),
    /// Add signatures to a pending transaction using local keys.
    Sign(SignArgs),
    /// Submit a signed transaction to a ledger node.
    Broadcast(BroadcastArgs),
}

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Public-key prefix. Defaults to the configured network prefix.
    #[arg(long)]
    pub prefix: Option<String>,

    /// Seal the new key into this wallet file instead of printing its WIF.
    /// The wallet is created when the file does not exist.
    #[arg(long)]
    pub wallet: Option<PathBuf>,

    /// Passphrase for `--wallet`.
    #[arg(long, env = "QUILL_WALLET_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Pending transaction file.
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct SignArgs {
    /// Pending transaction file.
    pub file: PathBuf,

    /// Private key in WIF. May be repeated.
    ///
    /// Prefer `--key-file`: values on the command line end up in shell
    /// history.
    #[arg(long = "wif")]
    pub wifs: Vec<String>,

    /// File with one WIF per line. Blank lines and `#` comments are skipped.
    #[arg(long)]
    pub key_file: Option<PathBuf>,

    /// Sealed wallet file (JSON) to take keys from instead of plain WIFs.
    #[arg(long, conflicts_with_all = ["wifs", "key_file"])]
    pub wallet: Option<PathBuf>,

    /// Passphrase for `--wallet`.
    #[arg(long, env = "QUILL_WALLET_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,

    /// Where to write the signed transaction. Defaults to stdout.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct BroadcastArgs {
    /// Signed transaction file.
    pub file: PathBuf,

    /// Node URL. May be repeated; overrides the configured node list.
    #[arg(long = "node", env = "QUILL_NODES", value_delimiter = ',')]
    pub nodes: Vec<String>,

    /// Build and sign, but do not submit.
    #[arg(long)]
    pub dry_run: bool,

    /// Return as soon as the node accepts the transaction instead of
    /// waiting for inclusion in a block.
    #[arg(long = "async")]
    pub asynchronous: bool,

    /// Ask the node to verify authority before submitting.
    #[arg(long)]
    pub verify: bool,

    /// Reject if the node's head block is older than this many seconds.
    /// -1 disables the check.
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub max_block_age: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        QuillSignerCli::command().debug_assert();
    }

    #[test]
    fn parses_sign_with_repeated_keys() {
        let cli = QuillSignerCli::try_parse_from([
            "quill-signer",
            "--log-format",
            "json",
            "sign",
            "tx.json",
            "--wif",
            "5Ka",
            "--wif",
            "5Kb",
            "-o",
            "signed.json",
        ])
        .unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Commands::Sign(args) => {
                assert_eq!(args.wifs, vec!["5Ka", "5Kb"]);
                assert_eq!(args.out, Some(PathBuf::from("signed.json")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn wallet_conflicts_with_plain_keys() {
        let result = QuillSignerCli::try_parse_from([
            "quill-signer",
            "sign",
            "tx.json",
            "--wallet",
            "w.json",
            "--wif",
            "5Ka",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn keygen_accepts_wallet() {
        let cli = QuillSignerCli::try_parse_from([
            "quill-signer",
            "keygen",
            "--wallet",
            "w.json",
            "--passphrase",
            "pw",
        ])
        .unwrap();
        match cli.command {
            Commands::Keygen(args) => {
                assert_eq!(args.wallet, Some(PathBuf::from("w.json")));
                assert_eq!(args.passphrase.as_deref(), Some("pw"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn broadcast_accepts_negative_block_age() {
        let cli = QuillSignerCli::try_parse_from([
            "quill-signer",
            "broadcast",
            "tx.json",
            "--node",
            "https://a.example,https://b.example",
            "--max-block-age",
            "-1",
            "--async",
        ])
        .unwrap();
        match cli.command {
            Commands::Broadcast(args) => {
                assert_eq!(args.nodes.len(), 2);
                assert_eq!(args.max_block_age, -1);
                assert!(args.asynchronous);
                assert!(!args.dry_run);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
