use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// Environment variable holding the default base URL.
pub const BASE_URL_ENV: &str = "HTTP_EASY_BASE_URL";

/// Environment variable holding the default timeout in milliseconds.
pub const TIMEOUT_MS_ENV: &str = "HTTP_EASY_TIMEOUT_MS";

/// Transport options.
///
/// The same type serves as the instance defaults and as the per-call overlay.
/// Unset fields in an overlay leave the defaults alone. Header names are
/// case-insensitive and stored lowercase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub base_url: Option<String>,
    #[serde(deserialize_with = "lowercase_keys")]
    pub headers: HashMap<String, String>,
    #[serde(rename = "timeoutMs", with = "timeout_ms")]
    pub timeout: Option<Duration>,
    /// Transport-specific options, forwarded to the transport untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_header(name, value);
        self
    }

    /// Sets a header, replacing any existing one whose name differs only in case.
    pub fn insert_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Returns these options with `overlay` applied on top.
    ///
    /// Headers and extra options merge key by key; scalar options are replaced
    /// only when the overlay sets them.
    pub fn merged(&self, overlay: &Config) -> Config {
        let mut merged = self.clone();
        merged.headers = HashMap::new();

        if let Some(base_url) = &overlay.base_url {
            merged.base_url = Some(base_url.clone());
        }
        if let Some(timeout) = overlay.timeout {
            merged.timeout = Some(timeout);
        }
        for (name, value) in self.headers.iter().chain(&overlay.headers) {
            merged.insert_header(name.as_str(), value.as_str());
        }
        for (key, value) in &overlay.extra {
            merged.extra.insert(key.clone(), value.clone());
        }

        merged
    }

    /// Parses options from a JSON document, e.g. `{"baseUrl": "...", "timeoutMs": 5000}`.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse client configuration")
    }

    /// Reads the base URL and timeout from the environment.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(base_url) = env::var(BASE_URL_ENV) {
            debug!("Using base URL from {}: {}", BASE_URL_ENV, base_url);
            config.base_url = Some(base_url);
        }

        if let Ok(raw) = env::var(TIMEOUT_MS_ENV) {
            let millis: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid {} value: {:?}", TIMEOUT_MS_ENV, raw))?;
            debug!("Using timeout from {}: {}ms", TIMEOUT_MS_ENV, millis);
            config.timeout = Some(Duration::from_millis(millis));
        }

        Ok(config)
    }
}

fn lowercase_keys<'de, D>(d: D) -> std::result::Result<HashMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = HashMap::<String, String>::deserialize(d)?;
    Ok(raw
        .into_iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value))
        .collect())
}

mod timeout_ms {
    use serde::{Deserialize, Deserializer, Serializer, ser::Error};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => {
                let millis = u64::try_from(d.as_millis())
                    .map_err(|_| S::Error::custom("timeout does not fit in u64 milliseconds"))?;
                s.serialize_some(&millis)
            }
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
