use std::{
    path::PathBuf,
    time::Duration,
};

use clap::Parser;
use thiserror::Error;
use url::Url;

use crate::{
    api::DEFAULT_API_URL,
    identity::{
        self,
        Identity,
        IdentityError,
    },
    locale::Locale,
};

pub const DEFAULT_LOG_DIR: &str = "~/.bingo-client/logs";

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Terminal client for the bingo mini-app", long_about = None)]
pub struct Args {
    /// Base URL of the bingo backend API.
    #[arg(long, env = "BINGO_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Init data handed over by the host container (signed query string or
    /// decoded JSON object).
    #[arg(long, env = "TELEGRAM_INIT_DATA")]
    pub init_data: Option<String>,

    /// Launch URL; its `user_id` query parameter is used when the init data
    /// carries no user.
    #[arg(long, env = "BINGO_LAUNCH_URL")]
    pub launch_url: Option<String>,

    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_secs: u64,

    /// Overrides the bot username used in referral links.
    #[arg(long)]
    pub bot_username: Option<String>,

    #[arg(long, value_enum, default_value_t = Locale::En)]
    pub locale: Locale,

    #[arg(long, default_value = DEFAULT_LOG_DIR)]
    pub log_dir: String,

    /// Write logs to a daily file under the log directory.
    #[arg(short, long, default_value = "false")]
    pub tracing: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid API URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("API URL must use http or https, got {0}")]
    UnsupportedScheme(String),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_url: Url,
    pub identity: Identity,
    pub poll_interval: Duration,
    pub locale: Locale,
    pub log_dir: PathBuf,
    pub tracing: bool,
}

impl AppConfig {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let api_url = Url::parse(&args.api_url).map_err(|source| ConfigError::InvalidUrl {
            url: args.api_url.clone(),
            source,
        })?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(api_url.scheme().to_string()));
        }
        let mut identity =
            identity::resolve(args.init_data.as_deref(), args.launch_url.as_deref())?;
        if let Some(bot) = args.bot_username.filter(|bot| !bot.is_empty()) {
            identity.bot_username = bot;
        }
        Ok(AppConfig {
            api_url,
            identity,
            poll_interval: Duration::from_secs(args.poll_interval_secs),
            locale: args.locale,
            log_dir: resolve_log_dir(&args.log_dir),
            tracing: args.tracing,
        })
    }
}

pub fn resolve_log_dir(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::api::UserId;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["bingo-client"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn from_args__uses_defaults_and_launch_url() {
        // given
        let args = args(&[
            "--api-url",
            "https://bingo.example/api",
            "--launch-url",
            "https://app.example/?user_id=42",
        ]);

        // when
        let config = AppConfig::from_args(args).unwrap();

        // then
        assert_eq!(config.identity.user_id, UserId::new("42"));
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.locale, Locale::En);
        assert!(!config.tracing);
    }

    #[test]
    fn from_args__rejects_non_http_api() {
        let args = args(&["--api-url", "ftp://bingo.example", "--launch-url", "?user_id=1"]);
        assert!(matches!(
            AppConfig::from_args(args),
            Err(ConfigError::UnsupportedScheme(scheme)) if scheme == "ftp"
        ));
    }

    #[test]
    fn from_args__requires_identity() {
        let args = args(&["--api-url", "https://bingo.example/api"]);
        assert!(matches!(
            AppConfig::from_args(args),
            Err(ConfigError::Identity(IdentityError::Missing))
        ));
    }

    #[test]
    fn from_args__bot_override_wins() {
        let args = args(&[
            "--api-url",
            "http://localhost:5000/api",
            "--init-data",
            r#"{"user": {"id": 5}, "botUsername": "HostBot"}"#,
            "--bot-username",
            "CliBot",
            "--locale",
            "am",
        ]);
        let config = AppConfig::from_args(args).unwrap();
        assert_eq!(config.identity.bot_username, "CliBot");
        assert_eq!(config.locale, Locale::Am);
    }

    #[test]
    fn args__zero_poll_interval_is_rejected() {
        let parsed = Args::try_parse_from([
            "bingo-client",
            "--poll-interval-secs",
            "0",
        ]);
        assert!(parsed.is_err());
    }
}
