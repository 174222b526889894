//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI parser for `harplay`.
#[derive(Debug, Parser)]
#[command(name = "harplay", version, about = "Inspect, record, and replay HTTP interactions stored as HAR")]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the fingerprint of every recorded request.
    Keys {
        /// Replay config whose sources and filters to use.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Header to delete before hashing. Repeatable.
        #[arg(short = 'd', long = "delete-header", value_name = "NAME")]
        delete_headers: Vec<String>,
        /// HAR files or directories.
        sources: Vec<PathBuf>,
    },
    /// Print the canonical form and fingerprint of one recorded request.
    Show {
        /// HAR file or directory.
        source: PathBuf,
        /// Entry index within the source.
        #[arg(long, default_value_t = 0)]
        entry: usize,
        /// Header to delete before hashing. Repeatable.
        #[arg(short = 'd', long = "delete-header", value_name = "NAME")]
        delete_headers: Vec<String>,
    },
    /// Build the transport a replay config describes and report what it holds.
    Check {
        /// Replay config file.
        #[arg(long)]
        config: PathBuf,
        /// Fail on recordings that share a fingerprint.
        #[arg(long)]
        strict: bool,
    },
    /// Send one live request and record the exchange as HAR.
    Record(RecordArgs),
}

/// Arguments for `harplay record`.
#[derive(Debug, Args)]
pub struct RecordArgs {
    /// URL to request.
    pub url: String,
    /// HAR file to write.
    #[arg(short, long)]
    pub output: PathBuf,
    /// Request method.
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,
    /// Request header as `Name: value`. Repeatable.
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    pub headers: Vec<String>,
    /// Request body.
    #[arg(long)]
    pub data: Option<String>,
    /// Header to leave out of the recording. Repeatable.
    #[arg(short = 'd', long = "delete-header", value_name = "NAME")]
    pub delete_headers: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn parses_keys_with_repeated_filters() {
        let cli = Cli::parse_from(["harplay", "keys", "-d", "authorization", "--delete-header", "cookie", "a.har", "dir"]);
        let Command::Keys { config, delete_headers, sources } = cli.command else { panic!("expected keys") };
        assert!(config.is_none());
        assert_eq!(delete_headers, ["authorization", "cookie"]);
        assert_eq!(sources, [PathBuf::from("a.har"), PathBuf::from("dir")]);
    }

    #[test]
    fn parses_show_with_entry() {
        let cli = Cli::parse_from(["harplay", "show", "a.har", "--entry", "2"]);
        assert!(matches!(cli.command, Command::Show { entry: 2, .. }));
    }

    #[test]
    fn check_requires_config() {
        assert!(Cli::try_parse_from(["harplay", "check"]).is_err());
        let cli = Cli::parse_from(["harplay", "check", "--config", "replay.yaml", "--strict"]);
        assert!(matches!(cli.command, Command::Check { strict: true, .. }));
    }

    #[test]
    fn parses_record() {
        let cli = Cli::parse_from([
            "harplay", "record", "-X", "POST", "-H", "content-type: application/json", "--data", "{}", "-o",
            "out.har", "https://example.com/v1/resource/new",
        ]);
        let Command::Record(args) = cli.command else { panic!("expected record") };
        assert_eq!(args.method, "POST");
        assert_eq!(args.headers, ["content-type: application/json"]);
        assert_eq!(args.data.as_deref(), Some("{}"));
        assert_eq!(args.output, PathBuf::from("out.har"));
    }
}
