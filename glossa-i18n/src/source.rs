//! Dictionary sources
//!
//! The engine only needs one capability from its environment: fetch the
//! dictionary document for a locale. [`HttpSource`] does that over HTTP;
//! [`MemorySource`] serves dictionaries held in memory.

use crate::{Dictionary, I18nError, LocaleId, Result};
use async_trait::async_trait;
use glossa_log::debug;
use parking_lot::RwLock;
use reqwest::header::{CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Fetch capability for locale dictionaries.
#[async_trait]
pub trait DictionarySource: Send + Sync {
    /// Fetch and decode the dictionary for `locale`.
    ///
    /// Errors are reported, never recovered here; fallback is the store's job.
    async fn fetch(&self, locale: &LocaleId) -> Result<Dictionary>;
}

// ============================================================================
// Retry policy
// ============================================================================

/// Delay between retry attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Retry immediately.
    None,
    /// Same delay before every retry.
    Constant {
        #[serde(with = "millis")]
        delay: Duration,
    },
    /// Delay doubles per attempt, capped at `max`.
    Exponential {
        #[serde(with = "millis")]
        initial: Duration,
        #[serde(with = "millis")]
        max: Duration,
    },
}

impl BackoffStrategy {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            BackoffStrategy::None => Duration::ZERO,
            BackoffStrategy::Constant { delay } => *delay,
            BackoffStrategy::Exponential { initial, max } => {
                let factor = 2u32.saturating_pow(attempt);
                initial.saturating_mul(factor).min(*max)
            }
        }
    }
}

/// Bounded retry before a load is reported as failed.
///
/// The default performs no retries: a failed load falls straight back to the
/// default locale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: BackoffStrategy::None,
        }
    }

    pub fn constant(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            backoff: BackoffStrategy::Constant { delay },
        }
    }

    pub fn exponential(max_retries: u32, initial: Duration) -> Self {
        Self {
            max_retries,
            backoff: BackoffStrategy::Exponential {
                initial,
                max: Duration::from_secs(10),
            },
        }
    }

    /// Server errors, rate limiting and transport failures are worth retrying;
    /// client errors and malformed payloads are not.
    pub fn should_retry(&self, err: &I18nError) -> bool {
        match err {
            I18nError::Fetch { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            I18nError::Transport { .. } => true,
            _ => false,
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

// ============================================================================
// HTTP source
// ============================================================================

/// Fetches `GET <base_url>/<locale>.json`, bypassing any HTTP caches.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpSource {
    /// Create a source for dictionaries under `base_url` (e.g. `https://example.org/i18n`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self::with_client(client, base_url)
    }

    /// Use a preconfigured client; cache-busting headers are still sent per request.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Resource URL for a locale, without the cache-busting query.
    pub fn url_for(&self, locale: &LocaleId) -> String {
        format!("{}/{}.json", self.base_url, locale)
    }

    async fn fetch_once(&self, locale: &LocaleId) -> Result<Dictionary> {
        let url = self.url_for(locale);
        let stamp = chrono::Utc::now().timestamp_millis().to_string();

        let response = self
            .client
            .get(&url)
            .query(&[("v", stamp.as_str())])
            .header(CACHE_CONTROL, "no-store, no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await
            .map_err(|e| I18nError::Transport {
                locale: locale.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(I18nError::Fetch {
                locale: locale.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| I18nError::Transport {
            locale: locale.to_string(),
            message: e.to_string(),
        })?;

        let value: Value =
            serde_json::from_slice(&body).map_err(|e| I18nError::MalformedDictionary {
                locale: locale.to_string(),
                message: e.to_string(),
            })?;

        Dictionary::for_locale(locale, value)
    }
}

#[async_trait]
impl DictionarySource for HttpSource {
    async fn fetch(&self, locale: &LocaleId) -> Result<Dictionary> {
        let mut attempt = 0;
        loop {
            debug!(target: "glossa::source", "GET {} (attempt {})", self.url_for(locale), attempt + 1);
            match self.fetch_once(locale).await {
                Ok(dict) => return Ok(dict),
                Err(err) if attempt < self.retry.max_retries && self.retry.should_retry(&err) => {
                    let delay = self.retry.backoff.delay_for_attempt(attempt);
                    debug!(
                        target: "glossa::source",
                        "Retrying {} in {:?}: {}", locale, delay, err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

// ============================================================================
// In-memory source
// ============================================================================

#[derive(Debug, Clone)]
enum Entry {
    Ready(Value),
    Failing(u16),
}

/// Serves dictionaries from memory.
///
/// Locales without an entry fail with HTTP 404. Entries can be made to fail
/// with a given status or to respond after a delay, which makes this source
/// suitable for embedding bundled dictionaries and for exercising fallback
/// and race behaviour.
#[derive(Debug, Default)]
pub struct MemorySource {
    entries: RwLock<HashMap<LocaleId, Entry>>,
    latency: RwLock<HashMap<LocaleId, Duration>>,
    fetches: RwLock<HashMap<LocaleId, usize>>,
    total: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `value` for `locale`.
    pub fn with_dictionary(self, locale: impl Into<LocaleId>, value: Value) -> Self {
        self.insert(locale, value);
        self
    }

    /// Answer every fetch of `locale` with `status`.
    pub fn with_failure(self, locale: impl Into<LocaleId>, status: u16) -> Self {
        self.entries
            .write()
            .insert(locale.into(), Entry::Failing(status));
        self
    }

    /// Delay responses for `locale`.
    pub fn with_latency(self, locale: impl Into<LocaleId>, latency: Duration) -> Self {
        self.latency.write().insert(locale.into(), latency);
        self
    }

    pub fn insert(&self, locale: impl Into<LocaleId>, value: Value) {
        self.entries.write().insert(locale.into(), Entry::Ready(value));
    }

    /// Number of fetches issued for `locale`.
    pub fn fetch_count(&self, locale: &str) -> usize {
        self.fetches
            .read()
            .get(&LocaleId::new(locale))
            .copied()
            .unwrap_or(0)
    }

    /// Number of fetches issued for all locales.
    pub fn total_fetches(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DictionarySource for MemorySource {
    async fn fetch(&self, locale: &LocaleId) -> Result<Dictionary> {
        *self.fetches.write().entry(locale.clone()).or_default() += 1;
        self.total.fetch_add(1, Ordering::SeqCst);

        let latency = self.latency.read().get(locale).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let entry = self.entries.read().get(locale).cloned();
        match entry {
            Some(Entry::Ready(value)) => Dictionary::for_locale(locale, value),
            Some(Entry::Failing(status)) => Err(I18nError::Fetch {
                locale: locale.to_string(),
                status,
            }),
            None => Err(I18nError::Fetch {
                locale: locale.to_string(),
                status: 404,
            }),
        }
    }
}
