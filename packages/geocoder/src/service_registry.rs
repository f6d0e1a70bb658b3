//! Compile-time registry of geocoding service configurations.
//!
//! Each geocoding provider is defined in a TOML file under `services/`.
//! The registry embeds these at compile time and exposes them via
//! [`all_services`] and [`find_service`].

use serde::Deserialize;

/// A geocoding service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingService {
    /// Unique identifier (e.g., `"nominatim"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether this service may be used.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Nominatim / `OpenStreetMap` geocoder.
    Nominatim {
        /// Search endpoint (e.g., `"https://nominatim.openstreetmap.org/search"`).
        base_url: String,
        /// Minimum delay before every request in milliseconds.
        #[serde(default = "default_rate_limit_ms")]
        rate_limit_ms: u64,
        /// `User-Agent` identifying this client to the service.
        user_agent: String,
        /// Comma-separated ISO country codes results are restricted to.
        #[serde(default = "default_country_codes")]
        country_codes: String,
    },
}

const fn default_true() -> bool {
    true
}

const fn default_rate_limit_ms() -> u64 {
    100
}

fn default_country_codes() -> String {
    "us".to_string()
}

impl GeocodingService {
    /// Returns the provider's base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::Nominatim { base_url, .. } => base_url,
        }
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[("nominatim", include_str!("../services/nominatim.toml"))];

#[cfg(test)]
const EXPECTED_SERVICE_COUNT: usize = 1;

/// Returns all geocoding service configurations (enabled and disabled).
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_services() -> Vec<GeocodingService> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse geocoding service '{name}': {e}"))
        })
        .collect()
}

/// Returns the enabled service with the given id.
#[must_use]
pub fn find_service(id: &str) -> Option<GeocodingService> {
    all_services()
        .into_iter()
        .find(|s| s.enabled && s.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn loads_all_services() {
        let services = all_services();
        assert_eq!(services.len(), EXPECTED_SERVICE_COUNT);
    }

    #[test]
    fn service_ids_are_unique() {
        let services = all_services();
        let mut seen = BTreeSet::new();
        for svc in &services {
            assert!(seen.insert(&svc.id), "Duplicate service ID: {}", svc.id);
        }
    }

    #[test]
    fn nominatim_defaults() {
        let svc = find_service("nominatim").expect("nominatim service configured");
        assert!(!svc.base_url().is_empty());
        let ProviderConfig::Nominatim {
            rate_limit_ms,
            user_agent,
            country_codes,
            ..
        } = &svc.provider;
        assert_eq!(*rate_limit_ms, 100);
        assert!(!user_agent.is_empty());
        assert_eq!(country_codes, "us");
    }

    #[test]
    fn unknown_service_is_none() {
        assert!(find_service("census").is_none());
    }
}
