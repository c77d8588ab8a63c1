//! Catalog domain types shared by the graph adapter, the path engine and the
//! JSON request/response contract.
//!
//! Entities are keyed by their case-sensitive `name`; no surrogate id is
//! exposed to callers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

// ── Entity Kinds ──────────────────────────────────────────────────

/// A node label in the catalog graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Metric,
    Domain,
    Dashboard,
}

impl EntityKind {
    /// The Neo4j label for this kind.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Metric => "Metric",
            Self::Domain => "Domain",
            Self::Dashboard => "Dashboard",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Accepts exactly the lowercase serde form, so CLI and JSON inputs spell
/// kinds the same way.
impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "metric" => Ok(Self::Metric),
            "domain" => Ok(Self::Domain),
            "dashboard" => Ok(Self::Dashboard),
            _ => Err(format!(
                "unknown entity kind: {s} (expected metric, domain or dashboard)"
            )),
        }
    }
}

// ── Entities ──────────────────────────────────────────────────────

/// Name and description of any catalog entity, as returned by listings and
/// substring searches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntitySummary {
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
}

/// Descriptive attributes of a Domain or Dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityDetail {
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    /// Only dashboards carry this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

/// A metric node with all of its catalog attributes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Metric {
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    /// Name of the owning domain, if any.
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub data_source: String,
}

/// Members of a domain reached over `CONTAINS`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainMetrics {
    pub domain: String,
    pub metrics: Vec<Metric>,
}

/// Members of a dashboard reached over `CONTAINS`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DashboardMetrics {
    pub dashboard: String,
    pub metrics: Vec<Metric>,
}

// ── Paths ─────────────────────────────────────────────────────────

/// One traversed relationship, named by its endpoints as stored (the
/// direction of the edge, not the direction of traversal).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PathRelationship {
    pub start: String,
    pub end: String,
    #[serde(rename = "type")]
    pub rel_type: String,
}

/// A path through the catalog graph: node names in traversal order plus the
/// relationships between consecutive nodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GraphPath {
    pub nodes: Vec<String>,
    pub relationships: Vec<PathRelationship>,
}

impl GraphPath {
    /// A zero-edge path consisting of a single node.
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            nodes: vec![name.into()],
            relationships: Vec::new(),
        }
    }

    /// Number of traversed edges.
    pub fn hops(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `nodes.len() == relationships.len() + 1`, or both empty.
    pub fn is_well_formed(&self) -> bool {
        if self.nodes.is_empty() {
            return self.relationships.is_empty();
        }
        self.nodes.len() == self.relationships.len() + 1
    }
}

// ── Hop Limit ─────────────────────────────────────────────────────

/// Upper bound on the number of edges a path search may traverse.
///
/// Neo4j cannot bind a parameter inside a variable-length pattern, so the
/// bound is rendered into the query text. Construction is the only place the
/// value is validated.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HopLimit(u32);

impl HopLimit {
    pub const DEFAULT: HopLimit = HopLimit(5);
    pub const MAX: u32 = 15;

    /// Returns `None` unless `1 <= hops <= MAX`.
    pub fn new(hops: u32) -> Option<Self> {
        (1..=Self::MAX).contains(&hops).then_some(Self(hops))
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for HopLimit {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl<'de> Deserialize<'de> for HopLimit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hops = u32::deserialize(deserializer)?;
        HopLimit::new(hops).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "hop limit {hops} out of range 1..={}",
                HopLimit::MAX
            ))
        })
    }
}

impl fmt::Display for HopLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Missing and null properties both read as the empty string.
fn nullable<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_kind_labels_and_parsing() {
        assert_eq!(EntityKind::Dashboard.label(), "Dashboard");
        assert_eq!("metric".parse::<EntityKind>(), Ok(EntityKind::Metric));
        assert!("host".parse::<EntityKind>().is_err());
    }

    #[test]
    fn entity_kind_parse_matches_serde_form() {
        for raw in ["metric", "domain", "dashboard", "Domain", "DASHBOARD", "Metric"] {
            let parsed = raw.parse::<EntityKind>().ok();
            let decoded = serde_json::from_value::<EntityKind>(serde_json::json!(raw)).ok();
            assert_eq!(parsed, decoded, "{raw}");
        }
        assert!("Domain".parse::<EntityKind>().is_err());
    }

    #[test]
    fn entity_kind_serializes_lowercase() {
        let json = serde_json::to_string(&EntityKind::Dashboard).unwrap();
        assert_eq!(json, "\"dashboard\"");
    }

    #[test]
    fn relationship_type_field_is_named_type() {
        let rel = PathRelationship {
            start: "A".to_string(),
            end: "C".to_string(),
            rel_type: "LINKS_TO".to_string(),
        };
        let value = serde_json::to_value(&rel).unwrap();
        assert_eq!(value["type"], "LINKS_TO");
        assert!(value.get("rel_type").is_none());
    }

    #[test]
    fn path_well_formedness() {
        assert!(GraphPath::default().is_well_formed());
        assert!(GraphPath::single("X").is_well_formed());
        assert_eq!(GraphPath::single("X").hops(), 0);

        let broken = GraphPath {
            nodes: vec!["A".to_string(), "B".to_string()],
            relationships: Vec::new(),
        };
        assert!(!broken.is_well_formed());
    }

    #[test]
    fn hop_limit_bounds() {
        assert_eq!(HopLimit::default().get(), 5);
        assert!(HopLimit::new(0).is_none());
        assert!(HopLimit::new(1).is_some());
        assert!(HopLimit::new(HopLimit::MAX).is_some());
        assert!(HopLimit::new(HopLimit::MAX + 1).is_none());
    }

    #[test]
    fn hop_limit_deserialize_rejects_out_of_range() {
        assert_eq!(
            serde_json::from_str::<HopLimit>("3").unwrap(),
            HopLimit::new(3).unwrap()
        );
        assert!(serde_json::from_str::<HopLimit>("0").is_err());
        assert!(serde_json::from_str::<HopLimit>("99").is_err());
    }

    #[test]
    fn metric_tolerates_null_properties() {
        let metric: Metric = serde_json::from_value(serde_json::json!({
            "name": "mrr",
            "description": null,
            "owner": "finance",
            "owner_email": null,
            "domain": "billing",
        }))
        .unwrap();
        assert_eq!(metric.description, "");
        assert_eq!(metric.owner_email, None);
        assert_eq!(metric.data_source, "");
        assert_eq!(metric.domain.as_deref(), Some("billing"));
    }

    #[test]
    fn detail_omits_absent_optional_fields() {
        let detail = EntityDetail {
            name: "billing".to_string(),
            description: "Revenue metrics".to_string(),
            owner: "finance".to_string(),
            owner_email: None,
            last_updated: None,
        };
        let value = serde_json::to_value(&detail).unwrap();
        assert!(value.get("owner_email").is_none());
        assert!(value.get("last_updated").is_none());
    }
}
