use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fmt;

pub const DEFAULT_LOCALE: &str = "en";

const EMBEDDED: &[(&str, &str)] = &[
    ("en", include_str!("en.json")),
    ("es", include_str!("es.json")),
];

/// Primary language subtag picked from an `Accept-Language` header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locale(String);

impl Locale {
    pub fn new(tag: impl Into<String>) -> Self {
        Locale(tag.into())
    }

    /// `"es-MX,en;q=0.8"` becomes `es`; a missing or empty header becomes `en`.
    pub fn from_accept_language(header: Option<&str>) -> Self {
        let tag = header
            .and_then(|h| h.split(',').next())
            .and_then(|first| first.split(';').next())
            .and_then(|range| range.split('-').next())
            .map(|primary| primary.trim().to_ascii_lowercase())
            .filter(|primary| !primary.is_empty() && primary != "*");
        Locale(tag.unwrap_or_else(|| DEFAULT_LOCALE.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LOCALE.to_string())
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message dictionaries keyed by language. Built once at startup and only
/// read afterwards.
#[derive(Debug)]
pub struct Translator {
    dictionaries: HashMap<String, HashMap<String, String>>,
}

impl Translator {
    pub fn load_embedded() -> Result<Self> {
        Self::from_sources(EMBEDDED)
    }

    pub fn from_sources(sources: &[(&str, &str)]) -> Result<Self> {
        let mut dictionaries = HashMap::new();
        for (lang, json) in sources {
            let dict: HashMap<String, String> = serde_json::from_str(json)
                .with_context(|| format!("parsing translations for {}", lang))?;
            dictionaries.insert(lang.to_string(), dict);
        }
        Ok(Translator { dictionaries })
    }

    /// Unknown locales fall back to English; missing keys render a visible marker.
    pub fn t(&self, locale: &Locale, key: &str) -> String {
        let dict = self
            .dictionaries
            .get(locale.as_str())
            .or_else(|| self.dictionaries.get(DEFAULT_LOCALE));
        match dict.and_then(|d| d.get(key)) {
            Some(val) => val.clone(),
            None => format!("[Missing translation for {} in {}]", key, locale),
        }
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.dictionaries.keys().map(String::as_str)
    }
}
