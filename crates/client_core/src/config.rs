use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use shared::domain::DEFAULT_PAGE_LIMIT;
use tracing::warn;
use url::Url;

use crate::error::ClientError;

pub const SETTINGS_FILE: &str = "session-desk.toml";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub credentials_path: Option<PathBuf>,
    pub filter_debounce: Duration,
    pub login_redirect_delay: Duration,
    pub page_limit: u32,
    pub request_timeout: Duration,
    pub export_dir: Option<PathBuf>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            credentials_path: None,
            filter_debounce: Duration::from_millis(500),
            login_redirect_delay: Duration::from_millis(2000),
            page_limit: DEFAULT_PAGE_LIMIT,
            request_timeout: Duration::from_secs(30),
            export_dir: None,
        }
    }
}

pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(SETTINGS_FILE))
}

/// Defaults, then the TOML file at `path` when it exists, then `APP__*`
/// variables, then `SESSIONS_API_URL`.
pub fn load_settings_from(path: &Path) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match file_values(&raw) {
            Ok(file_cfg) => apply_overrides(&mut settings, |key| file_cfg.get(key).cloned()),
            Err(err) => warn!(path = %path.display(), "ignoring unreadable settings file: {err}"),
        }
    }

    apply_overrides(&mut settings, |key| {
        std::env::var(format!("APP__{}", key.to_ascii_uppercase())).ok()
    });
    if let Ok(v) = std::env::var("SESSIONS_API_URL") {
        settings.api_base_url = v;
    }

    settings
}

/// Flattens top-level scalars to strings so file and env values share one
/// parser. Tables and arrays are skipped.
fn file_values(raw: &str) -> Result<HashMap<String, String>, toml::de::Error> {
    let table: toml::Table = toml::from_str(raw)?;
    Ok(table
        .into_iter()
        .filter_map(|(key, value)| {
            let text = match value {
                toml::Value::String(text) => text,
                toml::Value::Integer(n) => n.to_string(),
                toml::Value::Float(n) => n.to_string(),
                toml::Value::Boolean(flag) => flag.to_string(),
                _ => return None,
            };
            Some((key, text))
        })
        .collect())
}

fn apply_overrides(settings: &mut ClientSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("api_base_url") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("credentials_path") {
        settings.credentials_path = Some(PathBuf::from(v));
    }
    if let Some(ms) = lookup("filter_debounce_ms").and_then(|v| v.parse::<u64>().ok()) {
        settings.filter_debounce = Duration::from_millis(ms);
    }
    if let Some(ms) = lookup("login_redirect_delay_ms").and_then(|v| v.parse::<u64>().ok()) {
        settings.login_redirect_delay = Duration::from_millis(ms);
    }
    if let Some(limit) = lookup("page_limit").and_then(|v| v.parse::<u32>().ok()) {
        if limit > 0 {
            settings.page_limit = limit;
        }
    }
    if let Some(secs) = lookup("request_timeout_secs").and_then(|v| v.parse::<u64>().ok()) {
        settings.request_timeout = Duration::from_secs(secs);
    }
    if let Some(v) = lookup("export_dir") {
        settings.export_dir = Some(PathBuf::from(v));
    }
}

/// Validates the base URL and strips trailing slashes so endpoint paths can be
/// appended verbatim.
pub fn normalize_base_url(raw: &str) -> Result<String, ClientError> {
    let trimmed = raw.trim();
    let candidate = if trimmed.is_empty() {
        DEFAULT_API_BASE_URL
    } else {
        trimmed
    };

    let parsed = Url::parse(candidate).map_err(|e| ClientError::InvalidBaseUrl {
        url: candidate.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ClientError::InvalidBaseUrl {
            url: candidate.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    Ok(candidate.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_slashes() {
        assert_eq!(
            normalize_base_url("https://hr.example.com/api//").expect("url"),
            "https://hr.example.com/api"
        );
    }

    #[test]
    fn blank_url_falls_back_to_default() {
        assert_eq!(normalize_base_url("  ").expect("url"), DEFAULT_API_BASE_URL);
    }

    #[test]
    fn rejects_non_http_schemes() {
        let err = normalize_base_url("ftp://files.example.com").expect_err("must fail");
        assert!(err.to_string().contains("unsupported scheme"));
        assert!(normalize_base_url("not a url").is_err());
    }

    #[test]
    fn settings_file_accepts_numeric_values() {
        let values = file_values(
            "api_base_url = \"http://hr.example.com/api\"\npage_limit = 50\nfilter_debounce_ms = 250\n",
        )
        .expect("valid toml");
        let mut settings = ClientSettings::default();
        apply_overrides(&mut settings, |key| values.get(key).cloned());

        assert_eq!(settings.api_base_url, "http://hr.example.com/api");
        assert_eq!(settings.page_limit, 50);
        assert_eq!(settings.filter_debounce, Duration::from_millis(250));
    }

    #[test]
    fn load_settings_reads_the_file() {
        let path = std::env::temp_dir().join(format!("session-desk-{}.toml", std::process::id()));
        fs::write(&path, "page_limit = 35\nlogin_redirect_delay_ms = 100\n").expect("write");
        let settings = load_settings_from(&path);
        let _ = fs::remove_file(&path);

        assert_eq!(settings.page_limit, 35);
        assert_eq!(settings.login_redirect_delay, Duration::from_millis(100));
    }

    #[test]
    fn broken_settings_file_keeps_defaults() {
        let path = std::env::temp_dir().join(format!("session-desk-bad-{}.toml", std::process::id()));
        fs::write(&path, "page_limit = = 3").expect("write");
        let settings = load_settings_from(&path);
        let _ = fs::remove_file(&path);

        assert_eq!(settings.page_limit, DEFAULT_PAGE_LIMIT);
    }

    #[test]
    fn overrides_parse_numbers_and_ignore_garbage() {
        let mut settings = ClientSettings::default();
        let values: HashMap<&str, &str> = [
            ("filter_debounce_ms", "250"),
            ("page_limit", "0"),
            ("request_timeout_secs", "soon"),
            ("export_dir", "/tmp/exports"),
        ]
        .into_iter()
        .collect();
        apply_overrides(&mut settings, |key| values.get(key).map(|v| v.to_string()));

        assert_eq!(settings.filter_debounce, Duration::from_millis(250));
        assert_eq!(settings.page_limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.export_dir, Some(PathBuf::from("/tmp/exports")));
    }
}
