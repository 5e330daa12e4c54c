use std::str::FromStr;

use colored::Colorize;
use common::env_config::Config;

/// What `setup` installs.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: log::LevelFilter,
    pub console: bool,
    pub file: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: log::LevelFilter::Info,
            console: true,
            file: None,
        }
    }
}

impl LogConfig {
    /// Unknown level names fall back to `info`.
    pub fn from_config(config: &Config) -> Self {
        LogConfig {
            level: log::LevelFilter::from_str(&config.log_level).unwrap_or(log::LevelFilter::Info),
            console: config.console_logging_enabled,
            file: config.log_file.clone(),
        }
    }
}

fn level_color(level: log::Level) -> &'static str {
    match level {
        log::Level::Info => "green",
        log::Level::Warn => "yellow",
        log::Level::Error => "red",
        log::Level::Debug => "magenta",
        log::Level::Trace => "bright black",
    }
}

/// Installs the global logger. Fails if one is already installed.
pub fn setup(config: &LogConfig) -> Result<(), fern::InitError> {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%H:%M:%S]"),
                record.target(),
                record.level().to_string().color(level_color(record.level())),
                message
            ))
        })
        .level(config.level)
        .level_for("hyper", log::LevelFilter::Off)
        .level_for("hyper_util", log::LevelFilter::Off);

    if config.console {
        dispatch = dispatch.chain(std::io::stdout());
    }
    if let Some(file) = &config.file {
        dispatch = dispatch.chain(fern::log_file(file)?);
    }
    dispatch.apply()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_from_config() {
        let mut config = Config::new("sk_test_123");
        config.log_level = "debug".to_string();
        config.log_file = Some("subscriptions.log".to_string());

        let log_config = LogConfig::from_config(&config);
        assert_eq!(log_config.level, log::LevelFilter::Debug);
        assert!(log_config.console);
        assert_eq!(log_config.file.as_deref(), Some("subscriptions.log"));
    }

    #[test]
    fn test_unknown_level_falls_back_to_info() {
        let mut config = Config::new("sk_test_123");
        config.log_level = "loud".to_string();
        assert_eq!(LogConfig::from_config(&config).level, log::LevelFilter::Info);
    }
}
