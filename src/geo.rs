//! IP and geo lookup against public HTTP services.
//!
//! Two chained GETs: the IP echo service first, then the geo service keyed by
//! that IP. Either call failing leaves the corresponding part of the report
//! absent — lookups never error out of this module.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_IP_URL: &str = "https://api.ipify.org?format=json";
pub const DEFAULT_GEO_URL: &str = "https://ipwho.is";

/// Geo addendum attached to the visitor context once the lookup resolves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoInfo {
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub timezone: Option<String>,
}

/// Result of a lookup. Partial success is normal: an IP without geo data when
/// the second call fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoReport {
    pub ip: Option<String>,
    pub geo: Option<GeoInfo>,
}

#[derive(Deserialize)]
struct IpBody {
    ip: Option<String>,
}

/// Response shape of the geo service. `success: false` bodies carry a
/// `message` instead of location fields.
#[derive(Deserialize)]
struct GeoBody {
    #[serde(default)]
    success: bool,
    message: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
    region: Option<String>,
    city: Option<String>,
    timezone: Option<GeoTimezone>,
}

#[derive(Deserialize)]
struct GeoTimezone {
    id: Option<String>,
}

/// Client for the chained IP → geo lookup.
pub struct GeoClient {
    client: reqwest::Client,
    ip_url: String,
    geo_url: String,
}

impl GeoClient {
    /// Client against the default public endpoints with a 10 s per-request
    /// timeout.
    pub fn new() -> Self {
        Self::with_endpoints(DEFAULT_IP_URL, DEFAULT_GEO_URL)
    }

    /// Client against custom endpoints (tests, self-hosted lookups).
    pub fn with_endpoints(ip_url: impl Into<String>, geo_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        GeoClient {
            client,
            ip_url: ip_url.into(),
            geo_url: geo_url.into(),
        }
    }

    /// Run the chained lookup. Never fails: each unavailable part is logged
    /// at warn level and left absent in the report.
    pub async fn lookup(&self) -> GeoReport {
        let ip = match self.fetch_ip().await {
            Ok(Some(ip)) => ip,
            Ok(None) => {
                warn!(url = %self.ip_url, "IP echo returned no address");
                return GeoReport::default();
            }
            Err(e) => {
                warn!(error = %e, url = %self.ip_url, "IP lookup failed");
                return GeoReport::default();
            }
        };
        debug!(ip = %ip, "public IP resolved");

        let geo = match self.fetch_geo(&ip).await {
            Ok(geo) => geo,
            Err(e) => {
                warn!(error = %e, ip = %ip, "geo lookup failed");
                None
            }
        };

        GeoReport { ip: Some(ip), geo }
    }

    async fn fetch_ip(&self) -> Result<Option<String>, reqwest::Error> {
        let body: IpBody = self
            .client
            .get(&self.ip_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.ip.filter(|ip| !ip.trim().is_empty()))
    }

    async fn fetch_geo(&self, ip: &str) -> Result<Option<GeoInfo>, reqwest::Error> {
        let url = format!("{}/{}", self.geo_url.trim_end_matches('/'), ip);
        let body: GeoBody = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !body.success {
            warn!(
                message = body.message.as_deref().unwrap_or("unknown"),
                "geo service reported failure"
            );
            return Ok(None);
        }

        Ok(Some(GeoInfo {
            country: body.country,
            country_code: body.country_code,
            region: body.region,
            city: body.city,
            timezone: body.timezone.and_then(|tz| tz.id),
        }))
    }
}

impl Default for GeoClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_body_success_parse() {
        let json = r#"{
            "success": true,
            "country": "Germany",
            "country_code": "DE",
            "region": "Berlin",
            "city": "Berlin",
            "timezone": { "id": "Europe/Berlin" }
        }"#;
        let body: GeoBody = serde_json::from_str(json).expect("parse");
        assert!(body.success);
        assert_eq!(body.country.as_deref(), Some("Germany"));
        assert_eq!(body.timezone.and_then(|t| t.id).as_deref(), Some("Europe/Berlin"));
    }

    #[test]
    fn test_geo_body_failure_parse() {
        let json = r#"{ "success": false, "message": "reserved range" }"#;
        let body: GeoBody = serde_json::from_str(json).expect("parse");
        assert!(!body.success);
        assert_eq!(body.message.as_deref(), Some("reserved range"));
    }

    #[test]
    fn test_geo_body_missing_success_defaults_false() {
        let body: GeoBody = serde_json::from_str("{}").expect("parse");
        assert!(!body.success);
    }

    #[test]
    fn test_ip_body_parse() {
        let body: IpBody = serde_json::from_str(r#"{ "ip": "203.0.113.9" }"#).expect("parse");
        assert_eq!(body.ip.as_deref(), Some("203.0.113.9"));
    }
}
