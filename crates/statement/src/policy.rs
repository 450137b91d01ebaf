//! Metadata policies.
//!
//! A superior constrains the effective metadata of its subordinates through
//! a `metadata_policy` claim in the subordinate statements it issues. Along
//! a trust chain the policies are combined pairwise from the trust anchor
//! down, and the combined policy is applied to the leaf entity's metadata.
//! A combination or application failure invalidates the chain, never the
//! resolution as a whole.
//!
//! Operators per claim: `value`, `add`, `default`, `one_of`, `subset_of`,
//! `superset_of`, `essential`. Combination rules:
//!
//! | operator | combination |
//! |----------|-------------|
//! | `value`, `default` | must agree, else conflict |
//! | `add`, `superset_of` | union |
//! | `one_of`, `subset_of` | intersection; empty is a conflict |
//! | `essential` | logical or |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error::PolicyError, metadata::Metadata, set_ops};

/// A metadata policy: entity type tag → claim → operators.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataPolicy(pub BTreeMap<String, BTreeMap<String, PolicyOperators>>);

impl MetadataPolicy {
    /// Returns true iff the policy constrains nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Combines this policy (the superior) with a subordinate's policy.
    ///
    /// Tags and claims present on only one side carry over unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Conflict`] when operators cannot be
    /// reconciled.
    pub fn combine(&self, subordinate: &MetadataPolicy) -> Result<MetadataPolicy, PolicyError> {
        let mut out = self.0.clone();
        for (tag, claims) in &subordinate.0 {
            let merged = out.entry(tag.clone()).or_default();
            for (claim, ops) in claims {
                let combined = match merged.get(claim) {
                    Some(existing) => existing.combine(ops, claim)?,
                    None => ops.clone(),
                };
                merged.insert(claim.clone(), combined);
            }
        }
        Ok(MetadataPolicy(out))
    }

    /// Applies the policy to metadata, returning the effective metadata.
    ///
    /// Only partitions present in the metadata are constrained; a policy
    /// for an absent entity type is ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`PolicyError`] when a claim violates the policy or a
    /// partition is not a JSON object.
    pub fn apply_to(&self, metadata: &Metadata) -> Result<Metadata, PolicyError> {
        let mut map = metadata.to_map();
        for (tag, claims) in &self.0 {
            let Some(partition) = map.get_mut(tag) else {
                continue;
            };
            let Value::Object(obj) = partition else {
                return Err(PolicyError::InvalidPartition(tag.clone()));
            };
            for (claim, ops) in claims {
                match ops.apply(claim, obj.get(claim).cloned())? {
                    Some(value) => {
                        obj.insert(claim.clone(), value);
                    },
                    None => {
                        obj.remove(claim);
                    },
                }
            }
        }
        Ok(Metadata::from_map(map))
    }
}

/// The policy operators attached to a single metadata claim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyOperators {
    /// Fixed value: overrides whatever the entity declared. An explicit
    /// `null` removes the claim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Values unioned into the (slicified) claim value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add: Option<Value>,

    /// Value used when the claim is absent.
    #[serde(rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    /// The claim value must be one of these.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Value>>,

    /// The (slicified) claim value must be a subset of these.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subset_of: Option<Vec<Value>>,

    /// The (slicified) claim value must be a superset of these.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superset_of: Option<Vec<Value>>,

    /// The claim must be present after application.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub essential: Option<bool>,
}

impl PolicyOperators {
    /// Combines with a subordinate's operators for the same claim.
    fn combine(&self, other: &Self, claim: &str) -> Result<Self, PolicyError> {
        Ok(Self {
            value: merge_agreeing(self.value.as_ref(), other.value.as_ref(), claim, "value")?,
            add: merge_union_values(self.add.as_ref(), other.add.as_ref()),
            default_value: merge_agreeing(
                self.default_value.as_ref(),
                other.default_value.as_ref(),
                claim,
                "default",
            )?,
            one_of: merge_intersecting(
                self.one_of.as_deref(),
                other.one_of.as_deref(),
                claim,
                "one_of",
            )?,
            subset_of: merge_intersecting(
                self.subset_of.as_deref(),
                other.subset_of.as_deref(),
                claim,
                "subset_of",
            )?,
            superset_of: match (&self.superset_of, &other.superset_of) {
                (Some(a), Some(b)) => Some(set_ops::union(a, b)),
                (a, b) => a.clone().or_else(|| b.clone()),
            },
            essential: match (self.essential, other.essential) {
                (None, None) => None,
                (a, b) => Some(a.unwrap_or(false) || b.unwrap_or(false)),
            },
        })
    }

    /// Applies the operators to a claim value, yielding the effective value
    /// (`None` removes the claim).
    fn apply(&self, claim: &str, current: Option<Value>) -> Result<Option<Value>, PolicyError> {
        let mut effective = current;

        if let Some(value) = &self.value {
            effective = if value.is_null() { None } else { Some(value.clone()) };
        }

        if let Some(add) = &self.add {
            let existing = effective.as_ref().map(set_ops::slicify).unwrap_or_default();
            effective = Some(Value::Array(set_ops::union(&existing, &set_ops::slicify(add))));
        }

        if effective.is_none()
            && let Some(default) = &self.default_value
        {
            effective = Some(default.clone());
        }

        if self.essential == Some(true) && effective.is_none() {
            return Err(PolicyError::EssentialClaimAbsent { claim: claim.to_string() });
        }

        if let Some(value) = &effective {
            if let Some(one_of) = &self.one_of
                && !set_ops::contains(value, one_of)
            {
                return Err(PolicyError::Violation { claim: claim.to_string(), operator: "one_of" });
            }
            if let Some(subset_of) = &self.subset_of
                && !set_ops::is_subset(&set_ops::slicify(value), subset_of)
            {
                return Err(PolicyError::Violation {
                    claim: claim.to_string(),
                    operator: "subset_of",
                });
            }
            if let Some(superset_of) = &self.superset_of
                && !set_ops::is_superset(&set_ops::slicify(value), superset_of)
            {
                return Err(PolicyError::Violation {
                    claim: claim.to_string(),
                    operator: "superset_of",
                });
            }
        }

        Ok(effective)
    }
}

/// Both sides may set the operator, but they must agree.
fn merge_agreeing(
    a: Option<&Value>,
    b: Option<&Value>,
    claim: &str,
    operator: &'static str,
) -> Result<Option<Value>, PolicyError> {
    match (a, b) {
        (Some(a), Some(b)) if a != b => {
            Err(PolicyError::Conflict { claim: claim.to_string(), operator })
        },
        (a, b) => Ok(a.or(b).cloned()),
    }
}

/// Union of two slicified `add` values.
fn merge_union_values(a: Option<&Value>, b: Option<&Value>) -> Option<Value> {
    match (a, b) {
        (Some(a), Some(b)) => {
            Some(Value::Array(set_ops::union(&set_ops::slicify(a), &set_ops::slicify(b))))
        },
        (a, b) => a.or(b).cloned(),
    }
}

/// Intersection of two operator value lists; an empty intersection of two
/// present lists is a conflict.
fn merge_intersecting(
    a: Option<&[Value]>,
    b: Option<&[Value]>,
    claim: &str,
    operator: &'static str,
) -> Result<Option<Vec<Value>>, PolicyError> {
    match (a, b) {
        (Some(a), Some(b)) => {
            let merged = set_ops::intersect(a, b);
            if merged.is_empty() {
                return Err(PolicyError::Conflict { claim: claim.to_string(), operator });
            }
            Ok(Some(merged))
        },
        (a, b) => Ok(a.or(b).map(<[Value]>::to_vec)),
    }
}
