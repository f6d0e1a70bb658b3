//! Nominatim / OpenStreetMap geocoder client.
//!
//! The public instance asks clients to stay polite, so [`NominatimClient`]
//! sleeps for its politeness interval before **every** request, whether the
//! previous one succeeded or not. Requests are never retried here.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use std::time::Duration;

use async_trait::async_trait;
use incident_map_incident_models::Coordinate;

use crate::service_registry::{GeocodingService, ProviderConfig};
use crate::{GeocodeError, Geocoder};

/// Upper bound on a single request, so a stalled connection cannot hang the
/// batch.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Free-form search client for a Nominatim instance.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
    country_codes: String,
    politeness: Duration,
}

impl NominatimClient {
    /// Creates a client for `base_url`, identifying itself with
    /// `user_agent`.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        user_agent: &str,
        country_codes: impl Into<String>,
        politeness: Duration,
    ) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            country_codes: country_codes.into(),
            politeness,
        })
    }

    /// Creates a client from a registry entry, optionally overriding its
    /// politeness interval.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn from_service(
        service: &GeocodingService,
        rate_limit_override_ms: Option<u64>,
    ) -> Result<Self, GeocodeError> {
        let ProviderConfig::Nominatim {
            base_url,
            rate_limit_ms,
            user_agent,
            country_codes,
        } = &service.provider;
        let delay = rate_limit_override_ms.unwrap_or(*rate_limit_ms);
        log::debug!(
            "Using {} at {base_url} with a {delay}ms politeness interval",
            service.name
        );
        Self::new(
            base_url.clone(),
            user_agent,
            country_codes.clone(),
            Duration::from_millis(delay),
        )
    }

    /// The delay applied before every request.
    #[must_use]
    pub const fn politeness(&self) -> Duration {
        self.politeness
    }

    /// Geocodes a free-form query, reporting why a lookup failed.
    ///
    /// Returns `Ok(None)` when the service has no match.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the HTTP request fails, the service
    /// answers with a non-success status, or the response cannot be parsed.
    pub async fn try_resolve(&self, query: &str) -> Result<Option<Coordinate>, GeocodeError> {
        tokio::time::sleep(self.politeness).await;

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("limit", "1"),
                ("countrycodes", self.country_codes.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }
        if !status.is_success() {
            return Err(GeocodeError::Status {
                status: status.as_u16(),
            });
        }

        let body: serde_json::Value = resp.json().await?;
        parse_response(&body)
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn resolve(&self, query: &str) -> Option<Coordinate> {
        match self.try_resolve(query).await {
            Ok(Some(coordinate)) => Some(coordinate),
            Ok(None) => {
                log::warn!("No coordinates found for '{query}'");
                None
            }
            Err(e) => {
                log::warn!("Error geocoding '{query}': {e}");
                None
            }
        }
    }
}

/// Parses a Nominatim search response.
///
/// Only the first result is used. `lat`/`lon` are strings in the `json`
/// format, but plain numbers are accepted too.
fn parse_response(body: &serde_json::Value) -> Result<Option<Coordinate>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = number_field(first, "lat")?;
    let lon = number_field(first, "lon")?;

    Coordinate::new(lat, lon)
        .map(Some)
        .map_err(|e| GeocodeError::Parse {
            message: e.to_string(),
        })
}

fn number_field(result: &serde_json::Value, name: &str) -> Result<f64, GeocodeError> {
    let value = &result[name];
    value
        .as_str()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .or_else(|| value.as_f64())
        .ok_or_else(|| GeocodeError::Parse {
            message: format!("Missing {name} in Nominatim response"),
        })
}
