//! Local time-zone resolution.
//!
//! Report options carry the caller's IANA zone id under `tz`. The id is taken
//! from config when set, otherwise detected from the system.

use crate::config::ClientConfig;

const FALLBACK_ZONE: &str = "UTC";

/// Where the time-zone id comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TimeZoneSource {
    /// Always this id.
    Fixed(String),

    /// Detected from the system on every call.
    #[default]
    System,
}

impl TimeZoneSource {
    pub fn from_config(client: &ClientConfig) -> Self {
        match client.timezone.as_deref().map(str::trim) {
            Some(tz) if !tz.is_empty() => {
                if !is_zone_id(tz) {
                    tracing::warn!("Configured time zone {:?} is not an IANA zone id", tz);
                }
                TimeZoneSource::Fixed(tz.to_string())
            }
            _ => TimeZoneSource::System,
        }
    }

    pub fn resolve(&self) -> String {
        match self {
            TimeZoneSource::Fixed(tz) => tz.clone(),
            TimeZoneSource::System => local_timezone(),
        }
    }
}

/// Detect the local IANA zone id, falling back to "UTC".
pub fn local_timezone() -> String {
    match iana_time_zone::get_timezone() {
        Ok(tz) if is_zone_id(&tz) => tz,
        Ok(tz) => {
            tracing::debug!("Ignoring non-IANA system zone {:?}, using {}", tz, FALLBACK_ZONE);
            FALLBACK_ZONE.to_string()
        }
        Err(e) => {
            tracing::debug!("Could not detect local time zone ({}), using {}", e, FALLBACK_ZONE);
            FALLBACK_ZONE.to_string()
        }
    }
}

/// Shape check for ids like `Europe/Brussels`, `Etc/GMT+5` or `UTC`.
///
/// Rejects POSIX rule strings (`EST5EDT,M3.2.0,M11.1.0`) and paths.
fn is_zone_id(tz: &str) -> bool {
    !tz.is_empty()
        && !tz.starts_with('/')
        && tz
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-' | '+'))
}
