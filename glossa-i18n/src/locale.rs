//! Locales and their static configuration
//!
//! A [`LocaleId`] is the short identifier dictionaries and preferences are
//! keyed by; a [`LocaleConfig`] carries its presentation metadata; the
//! [`LocaleRegistry`] is the immutable supported set with its default.

use crate::{I18nError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Identifier of a supported locale, e.g. `"en"` or `"fr"`.
///
/// Stored trimmed and lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct LocaleId(String);

impl LocaleId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocaleId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for LocaleId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<LocaleId> for String {
    fn from(id: LocaleId) -> Self {
        id.0
    }
}

impl AsRef<str> for LocaleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for LocaleId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for LocaleId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

// ============================================================================
// Language tags
// ============================================================================

/// A parsed BCP 47 language tag (language + optional script and region).
///
/// # Examples
///
/// ```
/// use glossa_i18n::Locale;
///
/// let zh = Locale::parse("zh-Hans-CN").unwrap();
/// assert_eq!(zh.language, "zh");
/// assert_eq!(zh.tag(), "zh-Hans-CN");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locale {
    /// Language code (ISO 639, e.g., "en", "fr")
    pub language: String,
    /// Optional script (e.g., "Latn", "Hans")
    pub script: Option<String>,
    /// Optional region code (e.g., "US", "419")
    pub region: Option<String>,
}

impl Locale {
    /// Parse from a BCP 47 tag (e.g., "en-US", "zh-Hans-CN"); `_` is accepted as separator.
    pub fn parse(tag: &str) -> Result<Self> {
        let parts: Vec<&str> = tag.trim().split(['-', '_']).collect();

        let language = parts[0].to_lowercase();
        if language.len() < 2
            || language.len() > 3
            || !language.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(I18nError::InvalidLocale(tag.to_string()));
        }

        let mut script = None;
        let mut region = None;

        for part in parts.iter().skip(1) {
            if part.len() == 4 && part.chars().all(|c| c.is_ascii_alphabetic()) {
                let mut chars = part.chars();
                script = chars.next().map(|first| {
                    first
                        .to_uppercase()
                        .chain(chars.flat_map(char::to_lowercase))
                        .collect()
                });
            } else if part.len() == 2 && part.chars().all(|c| c.is_ascii_alphabetic()) {
                region = Some(part.to_uppercase());
            } else if part.len() == 3 && part.chars().all(|c| c.is_ascii_digit()) {
                // UN M.49 area code
                region = Some(part.to_string());
            } else {
                return Err(I18nError::InvalidLocale(tag.to_string()));
            }
        }

        Ok(Self {
            language,
            script,
            region,
        })
    }

    /// Canonical tag string (e.g., "en-US").
    pub fn tag(&self) -> String {
        let mut tag = self.language.clone();
        if let Some(ref script) = self.script {
            tag.push('-');
            tag.push_str(script);
        }
        if let Some(ref region) = self.region {
            tag.push('-');
            tag.push_str(region);
        }
        tag
    }

    /// Match score against another tag (higher is better, 0 = different language).
    ///
    /// - 100: identical
    /// - 50: language + region
    /// - 25: language + script
    /// - 10: language only
    pub fn match_score(&self, other: &Locale) -> u32 {
        if self.language != other.language {
            return 0;
        }
        if self == other {
            return 100;
        }

        let mut score = 10;
        if self.region.is_some() && self.region == other.region {
            score += 40;
        }
        if self.script.is_some() && self.script == other.script {
            score += 15;
        }
        score
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

impl FromStr for Locale {
    type Err = I18nError;

    fn from_str(s: &str) -> Result<Self> {
        Locale::parse(s)
    }
}

// ============================================================================
// Locale configuration
// ============================================================================

/// Writing direction of a locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDirection {
    Ltr,
    Rtl,
}

impl TextDirection {
    /// Value for the document's `dir` attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            TextDirection::Ltr => "ltr",
            TextDirection::Rtl => "rtl",
        }
    }
}

/// Static presentation metadata for one supported locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleConfig {
    pub id: LocaleId,
    /// Language tag written to the document instead of the id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default)]
    pub rtl: bool,
    /// Display name for pickers
    #[serde(default)]
    pub label: String,
    /// Short picker symbol, typically a flag
    #[serde(default)]
    pub glyph: String,
}

impl LocaleConfig {
    pub fn new(id: impl Into<LocaleId>, label: impl Into<String>, glyph: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag: None,
            rtl: false,
            label: label.into(),
            glyph: glyph.into(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn right_to_left(mut self) -> Self {
        self.rtl = true;
        self
    }

    /// Value for the document's `lang` attribute.
    pub fn html_lang(&self) -> &str {
        self.tag.as_deref().unwrap_or(self.id.as_str())
    }

    pub fn direction(&self) -> TextDirection {
        if self.rtl {
            TextDirection::Rtl
        } else {
            TextDirection::Ltr
        }
    }
}

/// The supported locale set and its default, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleRegistry {
    default: LocaleId,
    locales: Vec<LocaleConfig>,
}

impl LocaleRegistry {
    /// Build a registry, rejecting empty sets, duplicates, malformed tags and
    /// a default outside the set.
    pub fn new(default: impl Into<LocaleId>, locales: Vec<LocaleConfig>) -> Result<Self> {
        let default = default.into();
        if locales.is_empty() {
            return Err(I18nError::Config("no locales configured".to_string()));
        }

        let mut seen = HashSet::new();
        for locale in &locales {
            if locale.id.as_str().is_empty() {
                return Err(I18nError::InvalidLocale(String::new()));
            }
            if !seen.insert(locale.id.clone()) {
                return Err(I18nError::Config(format!("duplicate locale id: {}", locale.id)));
            }
            Locale::parse(locale.html_lang())?;
        }

        if !seen.contains(&default) {
            return Err(I18nError::Config(format!(
                "default locale {} is not in the supported set",
                default
            )));
        }

        Ok(Self { default, locales })
    }

    /// English, Spanish, French, German, Chinese and Japanese, defaulting to English.
    pub fn builtin() -> Self {
        Self {
            default: LocaleId::new("en"),
            locales: builtin_locales(),
        }
    }

    pub fn default_locale(&self) -> &LocaleId {
        &self.default
    }

    pub fn default_config(&self) -> &LocaleConfig {
        self.get(self.default.as_str())
            .unwrap_or(&self.locales[0])
    }

    pub fn get(&self, id: &str) -> Option<&LocaleConfig> {
        let id = LocaleId::new(id);
        self.locales.iter().find(|l| l.id == id)
    }

    pub fn is_supported(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// The supported id for `id`, or the default when unsupported.
    pub fn normalize(&self, id: &str) -> LocaleId {
        self.get(id)
            .map(|l| l.id.clone())
            .unwrap_or_else(|| self.default.clone())
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocaleConfig> {
        self.locales.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &LocaleId> {
        self.locales.iter().map(|l| &l.id)
    }

    pub fn len(&self) -> usize {
        self.locales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locales.is_empty()
    }
}

impl Default for LocaleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

pub(crate) fn builtin_locales() -> Vec<LocaleConfig> {
    vec![
        LocaleConfig::new("en", "English", "🇺🇸").with_tag("en"),
        LocaleConfig::new("es", "Español", "🇪🇸"),
        LocaleConfig::new("fr", "Français", "🇫🇷"),
        LocaleConfig::new("de", "Deutsch", "🇩🇪"),
        LocaleConfig::new("zh", "中文", "🇨🇳").with_tag("zh-Hans"),
        LocaleConfig::new("ja", "日本語", "🇯🇵"),
    ]
}

// ============================================================================
// Accept-Language Parsing
// ============================================================================

#[derive(Debug, Clone)]
struct AcceptLanguageEntry {
    locale: Locale,
    quality: f32,
}

/// Parse an Accept-Language style list (or `navigator.languages` joined by
/// commas) into tags, highest quality first. Wildcards and invalid tags are dropped.
///
/// ```
/// use glossa_i18n::parse_accept_language;
///
/// let locales = parse_accept_language("fr-CA,fr;q=0.9,*;q=0.1,en;q=0.8");
/// assert_eq!(locales.len(), 3);
/// assert_eq!(locales[0].tag(), "fr-CA");
/// assert_eq!(locales[2].tag(), "en");
/// ```
pub fn parse_accept_language(header: &str) -> Vec<Locale> {
    let mut entries: Vec<AcceptLanguageEntry> = header
        .split(',')
        .filter_map(|part| {
            let mut split = part.trim().splitn(2, ';');
            let tag = split.next()?.trim();
            if tag.is_empty() || tag == "*" {
                return None;
            }

            let quality = split
                .next()
                .and_then(|q| q.trim().strip_prefix("q="))
                .and_then(|q| q.parse::<f32>().ok())
                .unwrap_or(1.0);

            let locale = Locale::parse(tag).ok()?;
            Some(AcceptLanguageEntry { locale, quality })
        })
        .collect();

    // Stable sort keeps header order among equal qualities.
    entries.sort_by(|a, b| {
        b.quality
            .partial_cmp(&a.quality)
            .unwrap_or(Ordering::Equal)
    });

    entries.into_iter().map(|e| e.locale).collect()
}

/// Pick the first supported locale for a preference list.
///
/// Each requested tag is tried against the configured tags (exact match
/// first, then best language match) before moving on to the next one.
pub fn negotiate_locale(requested: &[Locale], registry: &LocaleRegistry) -> Option<LocaleId> {
    let available: Vec<(Locale, &LocaleId)> = registry
        .iter()
        .filter_map(|config| {
            Locale::parse(config.html_lang())
                .ok()
                .map(|tag| (tag, &config.id))
        })
        .collect();

    requested.iter().find_map(|req| {
        available
            .iter()
            .map(|(tag, id)| (tag.match_score(req), *id))
            .filter(|(score, _)| *score > 0)
            .max_by_key(|(score, _)| *score)
            .map(|(_, id)| id.clone())
    })
}
