//! Traffic rule records and validation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a rule splits traffic between the two versions.
///
/// Only `WEIGHTED` has dedicated generation today; the other two are
/// accepted and stored but currently materialize the same weighted shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleType {
    #[default]
    Weighted,
    HeaderMatch,
    PathBased,
}

impl RuleType {
    /// True when the rule materializes as a plain weighted split.
    pub fn is_weighted(&self) -> bool {
        matches!(self, RuleType::Weighted)
    }
}

/// A rule payload failed an invariant check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("service name must not be empty")]
    EmptyServiceName,
    #[error("version names must not be empty")]
    EmptyVersionName,
    #[error("version names must differ")]
    DuplicateVersionNames,
    #[error("weight {0} is out of range (0-100)")]
    WeightOutOfRange(u32),
    #[error("weights must sum to 100, got {0}")]
    WeightSumMismatch(u32),
}

/// The declared traffic-split policy, as submitted by a caller.
///
/// This is the write payload for create and update requests. It carries no
/// identity or timestamps; those belong to [`TrafficRule`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSpec {
    pub service_name: String,
    pub version1_name: String,
    pub version2_name: String,
    pub version1_weight: u32,
    pub version2_weight: u32,
    #[serde(default)]
    pub rule_type: RuleType,
}

impl RuleSpec {
    /// Check the split invariants: non-empty names, distinct versions,
    /// weights in [0, 100] summing to exactly 100.
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.service_name.trim().is_empty() {
            return Err(RuleError::EmptyServiceName);
        }
        if self.version1_name.trim().is_empty() || self.version2_name.trim().is_empty() {
            return Err(RuleError::EmptyVersionName);
        }
        if self.version1_name == self.version2_name {
            return Err(RuleError::DuplicateVersionNames);
        }
        for weight in [self.version1_weight, self.version2_weight] {
            if weight > 100 {
                return Err(RuleError::WeightOutOfRange(weight));
            }
        }
        let sum = self.version1_weight + self.version2_weight;
        if sum != 100 {
            return Err(RuleError::WeightSumMismatch(sum));
        }
        Ok(())
    }
}

/// A stored traffic rule record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficRule {
    pub id: String,
    pub service_name: String,
    pub version1_name: String,
    pub version2_name: String,
    pub version1_weight: u32,
    pub version2_weight: u32,
    pub rule_type: RuleType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployed_at: Option<DateTime<Utc>>,
}

impl TrafficRule {
    /// Build a rule record from a spec, enforcing the split invariants at
    /// construction time. Invalid payloads never become records.
    pub fn new(id: impl Into<String>, spec: RuleSpec) -> Result<Self, RuleError> {
        spec.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: id.into(),
            service_name: spec.service_name,
            version1_name: spec.version1_name,
            version2_name: spec.version2_name,
            version1_weight: spec.version1_weight,
            version2_weight: spec.version2_weight,
            rule_type: spec.rule_type,
            created_at: now,
            updated_at: now,
            deployed_at: None,
        })
    }

    /// Replace the declared policy with a new spec, revalidating and bumping
    /// `updated_at`. Identity, creation time and deploy stamp are kept.
    pub fn update_spec(mut self, spec: RuleSpec) -> Result<Self, RuleError> {
        spec.validate()?;
        self.service_name = spec.service_name;
        self.version1_name = spec.version1_name;
        self.version2_name = spec.version2_name;
        self.version1_weight = spec.version1_weight;
        self.version2_weight = spec.version2_weight;
        self.rule_type = spec.rule_type;
        self.updated_at = Utc::now();
        Ok(self)
    }

    /// Mesh host and object-name prefix for this rule's service.
    pub fn mesh_host(&self) -> String {
        self.service_name.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> RuleSpec {
        RuleSpec {
            service_name: "payments".to_string(),
            version1_name: "v1".to_string(),
            version2_name: "v2".to_string(),
            version1_weight: 80,
            version2_weight: 20,
            rule_type: RuleType::Weighted,
        }
    }

    #[test]
    fn valid_spec_becomes_rule() {
        let rule = TrafficRule::new("r1", spec()).unwrap();
        assert_eq!(rule.id, "r1");
        assert_eq!(rule.version1_weight + rule.version2_weight, 100);
        assert!(rule.deployed_at.is_none());
    }

    #[test]
    fn weight_sum_mismatch_is_rejected() {
        let mut bad = spec();
        bad.version1_weight = 70;
        bad.version2_weight = 20;
        assert_eq!(bad.validate(), Err(RuleError::WeightSumMismatch(90)));
    }

    #[test]
    fn weight_over_100_is_rejected() {
        let mut bad = spec();
        bad.version1_weight = 130;
        bad.version2_weight = 0;
        assert_eq!(bad.validate(), Err(RuleError::WeightOutOfRange(130)));
    }

    #[test]
    fn empty_names_are_rejected() {
        let mut bad = spec();
        bad.service_name = "  ".to_string();
        assert_eq!(bad.validate(), Err(RuleError::EmptyServiceName));

        let mut bad = spec();
        bad.version2_name = String::new();
        assert_eq!(bad.validate(), Err(RuleError::EmptyVersionName));
    }

    #[test]
    fn identical_version_names_are_rejected() {
        let mut bad = spec();
        bad.version2_name = "v1".to_string();
        assert_eq!(bad.validate(), Err(RuleError::DuplicateVersionNames));
    }

    #[test]
    fn mesh_host_is_lowercased() {
        let mut s = spec();
        s.service_name = "Checkout".to_string();
        let rule = TrafficRule::new("r1", s).unwrap();
        assert_eq!(rule.mesh_host(), "checkout");
    }

    #[test]
    fn rule_type_uses_screaming_snake_wire_format() {
        assert_eq!(
            serde_json::to_string(&RuleType::HeaderMatch).unwrap(),
            "\"HEADER_MATCH\""
        );
        let parsed: RuleType = serde_json::from_str("\"PATH_BASED\"").unwrap();
        assert_eq!(parsed, RuleType::PathBased);
    }

    #[test]
    fn update_spec_keeps_identity_and_bumps_updated_at() {
        let rule = TrafficRule::new("r1", spec()).unwrap();
        let created = rule.created_at;

        let mut next = spec();
        next.version1_weight = 50;
        next.version2_weight = 50;
        let updated = rule.update_spec(next).unwrap();

        assert_eq!(updated.id, "r1");
        assert_eq!(updated.created_at, created);
        assert_eq!(updated.version1_weight, 50);
        assert!(updated.updated_at >= created);
    }
}
