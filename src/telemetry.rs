//! Telemetry initialization (tracing/tracing-subscriber).
//!
//! - LOG_LEVEL holds filter directives, e.g. "debug" or
//!   "info,generation=debug,scoring=info". Invalid directives fall back to the default.
//! - LOG_FORMAT selects "pretty" (default) or "json" structured logs.
//!
//! Targets used by the engine: `drill_engine`, `generation`, `scoring`, `wordle`.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,drill_engine=debug,generation=debug,scoring=info,wordle=info,reqwest=info";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Filter from LOG_LEVEL-style directives; blank or unparseable input uses the default.
pub fn build_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

pub fn init_tracing() {
    let level = std::env::var("LOG_LEVEL").ok();
    let format = LogFormat::from_env_value(std::env::var("LOG_FORMAT").ok().as_deref());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_filter(level.as_deref()))
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // The json and pretty builders are distinct types.
    let installed = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    if installed.is_err() {
        tracing::debug!(target: "drill_engine", "Tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_is_json_only_when_asked() {
        assert_eq!(LogFormat::from_env_value(Some(" JSON ")), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value(Some("pretty")), LogFormat::Pretty);
        assert_eq!(LogFormat::from_env_value(Some("xml")), LogFormat::Pretty);
        assert_eq!(LogFormat::from_env_value(None), LogFormat::Pretty);
    }

    #[test]
    fn blank_or_missing_directives_use_default_filter() {
        for input in [None, Some(""), Some("   ")] {
            let filter = build_filter(input).to_string();
            assert!(filter.contains("generation=debug"), "{filter}");
        }
    }

    #[test]
    fn explicit_directives_replace_default() {
        let filter = build_filter(Some("warn,wordle=trace")).to_string();
        assert!(filter.contains("wordle=trace"), "{filter}");
        assert!(!filter.contains("generation=debug"), "{filter}");
    }
}
