// ── Gateway configuration ──
//
// Describes one mirrored device: COV usage, lease time, and the poll
// fallback interval. Built by the embedding application; the engine
// never reads config files. The attribute round-trip (`to_attrs` /
// `from_attrs`) is the persisted-connection contract: a stored
// connection node missing a required attribute is pruned on restore.

use std::time::Duration;

use serde_json::{Map, Value as Json, json};

// ── COV usage ───────────────────────────────────────────────────────

/// Whether and how COV subscriptions are used for this device.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum CovMode {
    /// Never subscribe; every point is polled.
    #[default]
    None,
    Unconfirmed,
    Confirmed,
}

/// Resolved COV settings handed to the subscription manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CovConfig {
    pub mode: CovMode,
    pub lease: Duration,
}

// ── GatewayConfig ───────────────────────────────────────────────────

/// Configuration for mirroring a single remote device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Root folder name for this device's subtree.
    pub name: String,
    pub cov_mode: CovMode,
    /// COV subscription lease, configured in minutes (wire lifetime is
    /// seconds; renewal is scheduled strictly before expiry).
    pub cov_lease_minutes: u32,
    /// Poll fallback interval for points not under COV.
    pub poll_interval: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            name: "device".to_owned(),
            cov_mode: CovMode::None,
            cov_lease_minutes: 60,
            poll_interval: Duration::from_secs(5),
        }
    }
}

impl GatewayConfig {
    pub fn cov(&self) -> CovConfig {
        CovConfig {
            mode: self.cov_mode,
            lease: Duration::from_secs(u64::from(self.cov_lease_minutes) * 60),
        }
    }

    /// Flat attribute form persisted on the root node.
    pub fn to_attrs(&self) -> Map<String, Json> {
        let mut attrs = Map::new();
        attrs.insert("cov usage".to_owned(), json!(self.cov_mode.to_string()));
        attrs.insert(
            "cov lease time (minutes)".to_owned(),
            json!(self.cov_lease_minutes),
        );
        attrs.insert(
            "default polling interval".to_owned(),
            json!(self.poll_interval.as_millis()),
        );
        attrs
    }

    /// Rebuild from persisted attributes. `None` when a required
    /// attribute is absent — the caller prunes that node.
    pub fn from_attrs(name: &str, attrs: &Map<String, Json>) -> Option<Self> {
        let cov_mode = attrs
            .get("cov usage")?
            .as_str()?
            .parse::<CovMode>()
            .unwrap_or_default();
        let cov_lease_minutes = u32::try_from(attrs.get("cov lease time (minutes)")?.as_u64()?)
            .unwrap_or(60);
        let poll_ms = attrs.get("default polling interval")?.as_u64()?;
        Some(Self {
            name: name.to_owned(),
            cov_mode,
            cov_lease_minutes,
            poll_interval: Duration::from_millis(poll_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn attrs_round_trip() {
        let config = GatewayConfig {
            name: "ahu-1".to_owned(),
            cov_mode: CovMode::Confirmed,
            cov_lease_minutes: 15,
            poll_interval: Duration::from_millis(2500),
        };
        let restored =
            GatewayConfig::from_attrs("ahu-1", &config.to_attrs()).expect("complete attrs");
        assert_eq!(restored, config);
    }

    #[test]
    fn missing_required_attr_yields_none() {
        let mut attrs = GatewayConfig::default().to_attrs();
        attrs.remove("default polling interval");
        assert!(GatewayConfig::from_attrs("x", &attrs).is_none());
    }

    #[test]
    fn lease_converts_to_seconds() {
        let config = GatewayConfig {
            cov_lease_minutes: 2,
            ..GatewayConfig::default()
        };
        assert_eq!(config.cov().lease, Duration::from_secs(120));
    }
}
