//! Viewer configuration from a URL query string or the environment.
//!
//! Nothing here fails: missing or malformed values fall back to the
//! defaults below.

use url::form_urlencoded;

use crate::history::DEFAULT_MAX_ROWS;

/// Channel the viewers connect to unless told otherwise.
pub const DEFAULT_WS_URL: &str = "ws://127.0.0.1:8787";

pub const DEFAULT_VIEWER_NAME: &str = "Meike";
pub const DEFAULT_VIEWER_AGE: f64 = 7.0;

// ---------------------------------------------------------------------------
// Graphical viewer
// ---------------------------------------------------------------------------

/// Settings of the graphical viewer, read from its page's query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    pub ws_url: String,
    pub max_rows: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            max_rows: DEFAULT_MAX_ROWS,
        }
    }
}

impl ViewerConfig {
    /// Parse `ws` and `rows` from a query string, with or without the
    /// leading `?`. Unknown keys are ignored; the first occurrence wins.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut ws = None;
        let mut rows = None;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "ws" if ws.is_none() => ws = Some(value.into_owned()),
                "rows" if rows.is_none() => rows = Some(value.into_owned()),
                _ => {}
            }
        }

        let mut config = Self::default();
        if let Some(url) = ws.filter(|u| !u.trim().is_empty()) {
            config.ws_url = url;
        }
        if let Some(raw) = rows {
            config.max_rows = parse_rows(&raw).unwrap_or(DEFAULT_MAX_ROWS);
        }
        config
    }
}

/// Row count as a number, floored and raised to at least 1. `None` unless
/// finite and positive.
pub fn parse_rows(raw: &str) -> Option<usize> {
    let n: f64 = raw.trim().parse().ok()?;
    if !n.is_finite() || n <= 0.0 {
        return None;
    }
    Some(n.floor().max(1.0) as usize)
}

/// Viewer page URL with the channel passed as `?ws=`.
pub fn viewer_url(page: &str, ws_url: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("ws", ws_url)
        .finish();
    format!("{page}?{query}")
}

// ---------------------------------------------------------------------------
// Terminal viewer
// ---------------------------------------------------------------------------

/// Settings of the terminal viewer. The name and age only decorate the
/// banner.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalConfig {
    pub ws_url: String,
    pub viewer_name: String,
    /// `None` when the configured age is not a number.
    pub viewer_age: Option<f64>,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            viewer_name: DEFAULT_VIEWER_NAME.to_string(),
            viewer_age: Some(DEFAULT_VIEWER_AGE),
        }
    }
}

impl TerminalConfig {
    /// Read `WS_URL`, `VIEWER_NAME` and `VIEWER_AGE` through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            ws_url: lookup("WS_URL").unwrap_or(defaults.ws_url),
            viewer_name: lookup("VIEWER_NAME").unwrap_or(defaults.viewer_name),
            viewer_age: match lookup("VIEWER_AGE") {
                Some(raw) => parse_age(&raw),
                None => defaults.viewer_age,
            },
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// The age as shown in the banner.
    pub fn age_label(&self) -> String {
        match self.viewer_age {
            Some(age) => age.to_string(),
            None => "?".to_string(),
        }
    }
}

/// Blank counts as 0; anything else must parse to a finite number.
fn parse_age(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(0.0);
    }
    raw.parse::<f64>().ok().filter(|n| n.is_finite())
}
