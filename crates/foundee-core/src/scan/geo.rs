//! Best-effort geolocation for scans.
//!
//! Location is never required: any failure, denial, or timeout yields no
//! coordinates and the scan proceeds.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use foundee_types::Coordinates;
use futures_util::future::BoxFuture;
use serde::Deserialize;
use url::Url;

use crate::config::GeolocationConfig;

pub trait Geolocator: Send + Sync {
    fn locate(&self) -> BoxFuture<'_, Result<Coordinates>>;
}

/// Location is unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

impl Geolocator for NoLocation {
    fn locate(&self) -> BoxFuture<'_, Result<Coordinates>> {
        Box::pin(futures_util::future::ready(Err(anyhow!("location unavailable"))))
    }
}

/// Always reports the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinates);

impl Geolocator for FixedLocation {
    fn locate(&self) -> BoxFuture<'_, Result<Coordinates>> {
        let coords = self.0;
        Box::pin(async move { Ok(coords) })
    }
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(alias = "lat")]
    latitude: f64,
    #[serde(alias = "lon", alias = "lng")]
    longitude: f64,
}

/// Asks an HTTP endpoint (IP geolocation services and the like) for the
/// current position. Accepts `latitude`/`longitude` or `lat`/`lon` keys.
#[derive(Debug, Clone)]
pub struct HttpGeolocator {
    http: reqwest::Client,
    url: Url,
}

impl HttpGeolocator {
    /// # Errors
    /// Returns an error if `url` is invalid.
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("Invalid geolocation lookup_url: {url}"))?;
        Ok(Self {
            http: reqwest::Client::new(),
            url,
        })
    }
}

impl Geolocator for HttpGeolocator {
    fn locate(&self) -> BoxFuture<'_, Result<Coordinates>> {
        Box::pin(async move {
            let response = self
                .http
                .get(self.url.clone())
                .send()
                .await
                .context("Geolocation lookup failed")?
                .error_for_status()
                .context("Geolocation lookup failed")?;
            let body: LookupResponse = response
                .json()
                .await
                .context("Failed to parse geolocation response")?;
            Ok(Coordinates {
                latitude: body.latitude,
                longitude: body.longitude,
            })
        })
    }
}

/// Picks a geolocator from configuration: fixed coordinates win, then a
/// lookup endpoint, otherwise none.
///
/// # Errors
/// Returns an error if the lookup URL is invalid.
pub fn from_config(config: &GeolocationConfig) -> Result<Box<dyn Geolocator>> {
    if let (Some(latitude), Some(longitude)) = (config.latitude, config.longitude) {
        return Ok(Box::new(FixedLocation(Coordinates {
            latitude,
            longitude,
        })));
    }
    if let Some(url) = config.lookup_url.as_deref().filter(|u| !u.trim().is_empty()) {
        return Ok(Box::new(HttpGeolocator::new(url.trim())?));
    }
    Ok(Box::new(NoLocation))
}

/// Waits at most `timeout` for a position. Never fails.
pub async fn locate_best_effort(geo: &dyn Geolocator, timeout: Duration) -> Option<Coordinates> {
    match tokio::time::timeout(timeout, geo.locate()).await {
        Ok(Ok(coords)) => Some(coords),
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "proceeding without location");
            None
        }
        Err(_) => {
            tracing::debug!(?timeout, "location timed out; proceeding without it");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::test_support::can_bind_localhost;

    struct NeverLocates;

    impl Geolocator for NeverLocates {
        fn locate(&self) -> BoxFuture<'_, Result<Coordinates>> {
            Box::pin(futures_util::future::pending::<Result<Coordinates>>())
        }
    }

    #[tokio::test]
    async fn test_no_location_yields_none() {
        assert_eq!(locate_best_effort(&NoLocation, Duration::from_secs(1)).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_geolocator_times_out() {
        let coords = locate_best_effort(&NeverLocates, Duration::from_millis(50)).await;
        assert_eq!(coords, None);
    }

    #[test]
    fn test_from_config_prefers_fixed() {
        let config = GeolocationConfig {
            latitude: Some(1.0),
            longitude: Some(2.0),
            lookup_url: Some("http://example.invalid/geo".to_string()),
            ..GeolocationConfig::default()
        };
        assert!(from_config(&config).is_ok());

        let bad = GeolocationConfig {
            lookup_url: Some("not a url".to_string()),
            ..GeolocationConfig::default()
        };
        assert!(from_config(&bad).is_err());
    }

    #[tokio::test]
    async fn test_http_geolocator_accepts_short_keys() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"lat": 48.85, "lon": 2.35})),
            )
            .mount(&server)
            .await;

        let geo = HttpGeolocator::new(&format!("{}/json", server.uri())).unwrap();
        let coords = locate_best_effort(&geo, Duration::from_secs(5)).await.unwrap();
        assert!((coords.latitude - 48.85).abs() < f64::EPSILON);
        assert!((coords.longitude - 2.35).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_http_geolocator_error_is_swallowed() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let geo = HttpGeolocator::new(&server.uri()).unwrap();
        assert_eq!(locate_best_effort(&geo, Duration::from_secs(5)).await, None);
    }
}
