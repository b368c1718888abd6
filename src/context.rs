//! Visitor context: everything we know about the current page load, built
//! synchronously at load time and augmented once the async geo lookup lands.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::geo::{GeoInfo, GeoReport};
use crate::locale::{self, Locale};
use crate::session::SessionRecord;

/// Viewport width below which a visitor counts as mobile.
pub const MOBILE_BREAKPOINT_PX: u32 = 768;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Mobile,
    Desktop,
}

impl DeviceClass {
    pub fn from_viewport_width(px: u32) -> Self {
        if px < MOBILE_BREAKPOINT_PX {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceClass::Mobile => write!(f, "mobile"),
            DeviceClass::Desktop => write!(f, "desktop"),
        }
    }
}

/// Campaign attribution carried in the page URL's query string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UtmParams {
    pub source: Option<String>,
    pub medium: Option<String>,
    pub campaign: Option<String>,
    pub term: Option<String>,
    pub content: Option<String>,
}

impl UtmParams {
    /// Extract the five standard `utm_*` keys from a parsed URL. Absent keys
    /// stay `None`; repeated keys keep the first occurrence.
    pub fn from_url(url: &Url) -> Self {
        let pick = |key: &str| {
            url.query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
        };
        UtmParams {
            source: pick("utm_source"),
            medium: pick("utm_medium"),
            campaign: pick("utm_campaign"),
            term: pick("utm_term"),
            content: pick("utm_content"),
        }
    }

    pub fn any_present(&self) -> bool {
        self.source.is_some()
            || self.medium.is_some()
            || self.campaign.is_some()
            || self.term.is_some()
            || self.content.is_some()
    }
}

/// Per-load visitor context. Rebuilt on every page load; only the session
/// record behind it persists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorContext {
    pub device: DeviceClass,
    #[serde(with = "locale_serde")]
    pub locale: Locale,
    /// Language tag handed to the widget (`en_US`, `fr`, `de`).
    pub widget_language: String,
    pub page_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    pub utm: UtmParams,
    pub session_id: String,
    pub first_seen: String,
    pub last_seen: String,
    /// Absent until the async lookup resolves or fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoInfo>,
}

mod locale_serde {
    use super::Locale;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(locale: &Locale, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(locale.path_segment())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Locale, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(Locale::from_path_segment(&raw).unwrap_or_default())
    }
}

impl VisitorContext {
    /// Build the synchronous part of the context from the current page load.
    ///
    /// `page_url` that fails to parse still yields a usable context: UTMs are
    /// empty and the locale falls back, matching the "always leave the UI
    /// usable" rule.
    pub fn build(
        page_url: &str,
        viewport_width: u32,
        referrer: Option<&str>,
        repo: &str,
        session: &SessionRecord,
    ) -> Self {
        let parsed = Url::parse(page_url).ok();
        let (loc, utm) = match &parsed {
            Some(url) => (locale::detect(url.path(), repo), UtmParams::from_url(url)),
            None => (Locale::default(), UtmParams::default()),
        };

        VisitorContext {
            device: DeviceClass::from_viewport_width(viewport_width),
            locale: loc,
            widget_language: loc.widget_tag().to_string(),
            page_url: page_url.to_string(),
            referrer: referrer
                .map(str::to_string)
                .filter(|r| !r.trim().is_empty()),
            utm,
            session_id: session.id.clone(),
            first_seen: session.first_seen.clone(),
            last_seen: session.last_seen.clone(),
            ip: None,
            geo: None,
        }
    }

    /// Merge the async geo addendum into the context.
    pub fn attach_geo(&mut self, report: GeoReport) {
        self.ip = report.ip;
        self.geo = report.geo;
    }

    /// The hidden pre-chat field set delivered to the widget.
    ///
    /// Only non-empty values are included; a field whose value is absent or
    /// whitespace-only is excluded entirely rather than sent blank.
    pub fn prechat_fields(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        let mut put = |key: &str, value: Option<&str>| {
            if let Some(v) = value {
                if !v.trim().is_empty() {
                    fields.insert(key.to_string(), v.to_string());
                }
            }
        };

        let device = self.device.to_string();
        put("Device", Some(&device));
        put("Site_Language", Some(&self.widget_language));
        put("Page_URL", Some(&self.page_url));
        put("Referrer_URL", self.referrer.as_deref());
        put("UTM_Source", self.utm.source.as_deref());
        put("UTM_Medium", self.utm.medium.as_deref());
        put("UTM_Campaign", self.utm.campaign.as_deref());
        put("UTM_Term", self.utm.term.as_deref());
        put("UTM_Content", self.utm.content.as_deref());
        put("Session_ID", Some(&self.session_id));
        put("First_Seen_At", Some(&self.first_seen));
        put("Last_Seen_At", Some(&self.last_seen));
        put("IP_Address", self.ip.as_deref());

        if let Some(geo) = &self.geo {
            put("Country", geo.country.as_deref());
            put("Country_Code", geo.country_code.as_deref());
            put("Region", geo.region.as_deref());
            put("City", geo.city.as_deref());
            put("Timezone", geo.timezone.as_deref());
        }

        fields
    }
}
