//! The reference driver's CLI surface, per `spec.md` §6: `--config` xor
//! `--config-url` (exactly one required), `--dry-run`, `--log-to-stdout`,
//! `--max-run-time-sec`, `--early-errors`. Malformed combinations are a
//! usage error (exit code 2), distinct from a configuration error (exit 1)
//! raised once a source has actually been chosen and fails to load.

use clap::Parser;

use wharf_store::ConfigSource;

#[derive(Parser, Debug)]
#[command(
    name = "wharf",
    version,
    about = "Wharf — a configurable, reloadable, multi-endpoint HTTP/HTTPS/HTTP2 web server"
)]
pub struct Cli {
    /// Path to a YAML configuration document.
    #[arg(long, value_name = "FILE")]
    pub config: Option<String>,

    /// URL to fetch the configuration document from.
    #[arg(long = "config-url", value_name = "URL")]
    pub config_url: Option<String>,

    /// Load and validate configuration, wire the component tree, then exit
    /// without binding any sockets.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Log structured events to stdout as plain text instead of JSON.
    #[arg(long = "log-to-stdout")]
    pub log_to_stdout: bool,

    /// Stop the warehouse and exit cleanly after this many seconds.
    #[arg(long = "max-run-time-sec", value_name = "N")]
    pub max_run_time_sec: Option<u64>,

    /// Abort the whole start on the first component wiring failure instead
    /// of skipping the offending subtree.
    #[arg(long = "early-errors")]
    pub early_errors: bool,
}

/// A malformed CLI invocation — exit code 2, per `spec.md` §6.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct UsageError(pub String);

impl Cli {
    pub fn config_source(&self) -> Result<ConfigSource, UsageError> {
        match (&self.config, &self.config_url) {
            (Some(path), None) => Ok(ConfigSource::File(path.clone())),
            (None, Some(url)) => Ok(ConfigSource::Url(url.clone())),
            (Some(_), Some(_)) => {
                Err(UsageError("--config and --config-url are mutually exclusive".into()))
            }
            (None, None) => Err(UsageError("one of --config or --config-url is required".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["wharf"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn neither_flag_is_a_usage_error() {
        let err = cli(&[]).config_source().unwrap_err();
        assert!(err.0.contains("required"));
    }

    #[test]
    fn both_flags_is_a_usage_error() {
        let err = cli(&["--config=a.yaml", "--config-url=http://x/y"]).config_source().unwrap_err();
        assert!(err.0.contains("mutually exclusive"));
    }

    #[test]
    fn config_alone_resolves_to_a_file_source() {
        let source = cli(&["--config=a.yaml"]).config_source().unwrap();
        assert!(matches!(source, ConfigSource::File(p) if p == "a.yaml"));
    }

    #[test]
    fn config_url_alone_resolves_to_a_url_source() {
        let source = cli(&["--config-url=http://x/y"]).config_source().unwrap();
        assert!(matches!(source, ConfigSource::Url(u) if u == "http://x/y"));
    }
}
