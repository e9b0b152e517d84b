use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use passcode::{BatchPolicy, Layout, StoreOptions, layout::MAX_CODE_WIDTH};
use regex::Regex;
use std::path::PathBuf;

/// Runtime configuration for the `passcode-server` binary.
///
/// All values are parsed from CLI arguments or environment variables. A `.env`
/// file in the working directory is loaded before parsing, so deployments can
/// keep provider credentials out of the command line.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "passcode-server",
    version,
    about = "Relays SMS-delivered one-time passcodes to a single trusted caller"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:8080"))]
    pub server_addr: String,

    /// Path of the passcode store file. Created on first start.
    ///
    /// Environment variable: `STORE_PATH`
    #[arg(long, env = "STORE_PATH", default_value = "passcodes.bin")]
    pub store_path: PathBuf,

    /// Width of every passcode, in characters.
    ///
    /// Changing this for an existing store file makes the file unreadable;
    /// move the old file aside first.
    ///
    /// Environment variable: `CODE_WIDTH`
    #[arg(long, env = "CODE_WIDTH", default_value_t = passcode::layout::DEFAULT_CODE_WIDTH)]
    pub code_width: usize,

    /// What happens to slots past the end of a batch shorter than ten codes.
    ///
    /// `bounded` clears them so dispensing stops at the end of the batch.
    /// `legacy` leaves older codes in place and keeps dispensing them.
    ///
    /// Environment variable: `BATCH_POLICY`
    #[arg(long, env = "BATCH_POLICY", value_enum, default_value_t = BatchPolicyArg::Bounded)]
    pub batch_policy: BatchPolicyArg,

    /// Text that starts every codes-delivery message.
    ///
    /// Environment variable: `INGEST_MARKER`
    #[arg(long, env = "INGEST_MARKER", default_value_t = String::from("SMS passcodes:"))]
    pub ingest_marker: String,

    /// Regular expression the caller's `Tab-Url` (or `Origin`) must match.
    /// When unset every caller is allowed.
    ///
    /// Environment variable: `ALLOWED_ORIGIN`
    #[arg(long, env = "ALLOWED_ORIGIN")]
    pub allowed_origin: Option<String>,

    /// Messaging account identifier expected on inbound webhooks. When unset
    /// the `AccountSid` field is not checked.
    ///
    /// Environment variable: `MESSAGING_ACCOUNT_SID`
    #[arg(long, env = "MESSAGING_ACCOUNT_SID")]
    pub account_sid: Option<String>,

    /// Also append plain-text logs to this file.
    ///
    /// Environment variable: `LOG_FILE`
    #[arg(long, env = "LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPolicyArg {
    Bounded,
    Legacy,
}

impl From<BatchPolicyArg> for BatchPolicy {
    fn from(arg: BatchPolicyArg) -> Self {
        match arg {
            BatchPolicyArg::Bounded => Self::Bounded,
            BatchPolicyArg::Legacy => Self::Legacy,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub store_path: PathBuf,
    pub store_options: StoreOptions,
    pub ingest_marker: String,
    pub allowed_origin: Option<Regex>,
    pub account_sid: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let layout = Layout::new(args.code_width).with_context(|| {
            format!(
                "CODE_WIDTH ({}) must be between 1 and {MAX_CODE_WIDTH}",
                args.code_width
            )
        })?;

        let ingest_marker = args.ingest_marker.trim().to_string();
        if ingest_marker.is_empty() {
            bail!("INGEST_MARKER must not be empty");
        }

        let allowed_origin = args
            .allowed_origin
            .filter(|pattern| !pattern.trim().is_empty())
            .map(|pattern| {
                Regex::new(&pattern)
                    .with_context(|| format!("ALLOWED_ORIGIN is not a valid pattern: {pattern}"))
            })
            .transpose()?;

        let account_sid = args.account_sid.filter(|sid| !sid.trim().is_empty());

        Ok(Self {
            server_addr: args.server_addr,
            store_path: args.store_path,
            store_options: StoreOptions::new(layout, args.batch_policy.into()),
            ingest_marker,
            allowed_origin,
            account_sid,
            log_file: args.log_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every flag that feeds `ServerConfig`, so values in the environment
    /// running the tests never leak in through the `env` fallbacks.
    const BASE: &[(&str, &str)] = &[
        ("--server-addr", "0.0.0.0:8080"),
        ("--store-path", "passcodes.bin"),
        ("--code-width", "7"),
        ("--batch-policy", "bounded"),
        ("--ingest-marker", "SMS passcodes:"),
        ("--allowed-origin", ""),
        ("--account-sid", ""),
    ];

    fn parse(extra: &[&str]) -> anyhow::Result<ServerConfig> {
        let mut argv = vec!["passcode-server"];
        for (flag, value) in BASE {
            if !extra.contains(flag) {
                argv.extend([*flag, *value]);
            }
        }
        argv.extend_from_slice(extra);
        ServerConfig::try_from(CliArgs::try_parse_from(argv)?)
    }

    #[test]
    fn base_flags_give_reference_config() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.store_options, StoreOptions::default());
        assert_eq!(config.ingest_marker, "SMS passcodes:");
        assert!(config.allowed_origin.is_none());
        assert!(config.account_sid.is_none());
    }

    #[test]
    fn explicit_flags_are_applied() {
        let config = parse(&[
            "--server-addr",
            "127.0.0.1:9000",
            "--store-path",
            "/tmp/codes.bin",
            "--code-width",
            "6",
            "--batch-policy",
            "legacy",
            "--ingest-marker",
            "  Codes:  ",
            "--allowed-origin",
            r"^https://example\.com/",
            "--account-sid",
            "AC123",
        ])
        .unwrap();

        assert_eq!(config.server_addr, "127.0.0.1:9000");
        assert_eq!(config.store_path, PathBuf::from("/tmp/codes.bin"));
        assert_eq!(config.store_options.layout.width(), 6);
        assert_eq!(config.store_options.batch_policy, BatchPolicy::Legacy);
        assert_eq!(config.ingest_marker, "Codes:");
        assert!(
            config
                .allowed_origin
                .unwrap()
                .is_match("https://example.com/login")
        );
        assert_eq!(config.account_sid.as_deref(), Some("AC123"));
    }

    #[test]
    fn zero_width_is_rejected() {
        for width in ["0", "65"] {
            let err = parse(&["--code-width", width]).unwrap_err();
            assert!(err.to_string().contains("CODE_WIDTH"), "{err}");
        }
    }

    #[test]
    fn blank_marker_is_rejected() {
        let err = parse(&["--ingest-marker", "   "]).unwrap_err();
        assert!(err.to_string().contains("INGEST_MARKER"), "{err}");
    }

    #[test]
    fn invalid_origin_pattern_is_rejected() {
        let err = parse(&["--allowed-origin", "(unclosed"]).unwrap_err();
        assert!(err.to_string().contains("ALLOWED_ORIGIN"));
    }

    #[test]
    fn unknown_batch_policy_is_rejected() {
        assert!(parse(&["--batch-policy", "circular"]).is_err());
    }
}
