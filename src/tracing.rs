use std::str::FromStr;

use anyhow::Result;
use sentry::{integrations::tracing::EventFilter, types::Dsn};
use tracing::{Level, Metadata, level_filters::LevelFilter};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    filter::ParseError,
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LogLevel, LoggerConfig, SentryConfig};

const MODULE_WHITELIST: &[&str] = &["tower_http", "unicorn_vote"];

fn init_env_filter(
    override_filter: Option<&String>,
    level: &LogLevel,
) -> Result<EnvFilter, ParseError> {
    EnvFilter::try_from_default_env().or_else(|_| {
        // an explicit override wins over the whitelist
        override_filter.map_or_else(
            || {
                EnvFilter::try_new(
                    MODULE_WHITELIST
                        .iter()
                        .map(|m| format!("{m}={level}"))
                        .collect::<Vec<_>>()
                        .join(","),
                )
            },
            EnvFilter::try_new,
        )
    })
}

fn init_layer<W2>(
    make_writer: W2,
    format: &LogFormat,
    ansi: bool,
) -> Box<dyn Layer<Registry> + Sync + Send>
where
    W2: for<'writer> MakeWriter<'writer> + Sync + Send + 'static,
{
    match format {
        LogFormat::Compact => fmt::Layer::default()
            .with_ansi(ansi)
            .with_writer(make_writer)
            .compact()
            .boxed(),
        LogFormat::Pretty => fmt::Layer::default()
            .with_ansi(ansi)
            .with_writer(make_writer)
            .pretty()
            .boxed(),
        LogFormat::Json => fmt::Layer::default()
            .with_ansi(ansi)
            .with_writer(make_writer)
            .json()
            .boxed(),
    }
}

fn event_filter(metadata: &Metadata<'_>) -> EventFilter {
    match metadata.level() {
        &Level::ERROR | &Level::WARN => EventFilter::Event,
        _ => EventFilter::Ignore,
    }
}

pub fn init_tracing(config: &LoggerConfig) -> Result<()> {
    if !config.enable {
        return Ok(());
    }

    let stdout_layer = init_layer(std::io::stdout, &config.format, true);
    let env_filter = init_env_filter(config.override_filter.as_ref(), &config.level)?;
    let sentry_layer = sentry::integrations::tracing::layer()
        .event_filter(event_filter)
        .with_filter(LevelFilter::INFO);

    tracing_subscriber::registry()
        .with(vec![stdout_layer])
        .with(env_filter)
        .with(sentry_layer)
        .try_init()?;
    Ok(())
}

pub fn init_sentry(sentry_cfg: &SentryConfig) -> Result<sentry::ClientInitGuard> {
    Ok(sentry::init(sentry::ClientOptions {
        dsn: Some(Dsn::from_str(&sentry_cfg.dsn)?),
        release: sentry::release_name!(),
        traces_sample_rate: sentry_cfg.traces_sample_rate,
        ..Default::default()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_filter_must_parse() {
        let bad = "unicorn_vote=notalevel".to_string();
        // RUST_LOG takes precedence when set, so only assert when it is absent
        if std::env::var("RUST_LOG").is_err() {
            assert!(init_env_filter(Some(&bad), &LogLevel::Info).is_err());
            assert!(init_env_filter(None, &LogLevel::Debug).is_ok());
        }
    }
}
