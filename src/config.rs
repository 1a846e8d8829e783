/// file: src/config.rs
/// description: Configuration management built from CLI arguments and environment
use crate::{cli::Args, error::EventlyError, formatter::OutputFormat};
use anyhow::Result;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendConfig,
    pub session: SessionConfig,
    pub admin: AdminConfig,
    pub metrics: MetricsConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub user_id: i64,
}

#[derive(Clone, Default)]
pub struct AdminConfig {
    pub api_key: Option<String>,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub colored: bool,
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Self> {
        let base_url = Url::parse(&args.url).map_err(EventlyError::UrlError)?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(EventlyError::Config(format!(
                "backend url must be http or https, got '{}'",
                base_url.scheme()
            ))
            .into());
        }
        if args.user_id <= 0 {
            return Err(EventlyError::Config("user id must be positive".to_string()).into());
        }
        if args.timeout == 0 {
            return Err(
                EventlyError::Config("timeout must be at least 1 second".to_string()).into(),
            );
        }

        Ok(Config {
            backend: BackendConfig {
                base_url,
                timeout: Duration::from_secs(args.timeout),
            },
            session: SessionConfig {
                user_id: args.user_id,
            },
            admin: AdminConfig {
                api_key: args.admin_key.clone(),
            },
            metrics: MetricsConfig {
                enabled: args.metrics,
                port: args.metrics_port,
            },
            output: OutputConfig {
                format: OutputFormat::from(args.format.as_str()),
                colored: !args.no_color,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["evently", "--url", "http://localhost:5000"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).expect("args")
    }

    #[test]
    fn builds_from_defaults() {
        let config = Config::from_args(&args(&["--admin-key", "k"])).expect("config");
        assert_eq!(config.backend.base_url.as_str(), "http://localhost:5000/");
        assert_eq!(config.backend.timeout, Duration::from_secs(10));
        assert_eq!(config.session.user_id, 1);
        assert!(!format!("{:?}", config.admin).contains("\"k\""));
    }

    #[test]
    fn rejects_non_http_url_and_bad_numbers() {
        let mut bad_scheme = args(&[]);
        bad_scheme.url = "ftp://localhost".to_string();
        assert!(Config::from_args(&bad_scheme).is_err());

        assert!(Config::from_args(&args(&["--user-id", "0"])).is_err());
        assert!(Config::from_args(&args(&["--timeout", "0"])).is_err());
    }

    #[test]
    fn unparsable_url_is_reported_as_url_error() {
        let mut bad_url = args(&[]);
        bad_url.url = "not a url".to_string();
        let err = Config::from_args(&bad_url).expect_err("bad url");
        assert!(matches!(
            err.downcast_ref::<EventlyError>(),
            Some(EventlyError::UrlError(_))
        ));
    }
}
