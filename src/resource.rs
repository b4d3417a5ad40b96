//! Sparse, typed, multi-dimensional resource vectors.
//!
//! A [`Resource`] maps resource type names (`memory`, `vcore`, or any
//! user-defined type) to non-negative integer quantities. Absent keys read
//! as zero. All arithmetic clamps at zero — a [`Resource`] can never hold a
//! negative component once an operation returns.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SchedulerError};

/// Name of a resource type, e.g. `"memory"` or `"vcore"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceName(String);

impl ResourceName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ResourceName {
    fn from(s: &str) -> Self {
        ResourceName(s.to_string())
    }
}

impl From<String> for ResourceName {
    fn from(s: String) -> Self {
        ResourceName(s)
    }
}

/// A sparse multi-dimensional resource vector.
///
/// `None` (absence of a `Resource`, used via `Option<Resource>` at call
/// sites such as `max`) means "unbounded"; a present but empty `Resource`
/// means "exactly zero everywhere". The two are not interchangeable — see
/// `spec.md` §4.1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    quantities: BTreeMap<ResourceName, i64>,
}

impl Resource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(name: impl Into<ResourceName>, value: i64) -> Self {
        let mut r = Self::new();
        r.set(name, value);
        r
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<ResourceName>,
    {
        let mut r = Self::new();
        for (k, v) in pairs {
            r.set(k, v);
        }
        r
    }

    pub fn get(&self, name: &ResourceName) -> i64 {
        self.quantities.get(name).copied().unwrap_or(0)
    }

    pub fn set(&mut self, name: impl Into<ResourceName>, value: i64) {
        let name = name.into();
        if value == 0 {
            self.quantities.remove(&name);
        } else {
            self.quantities.insert(name, value);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &ResourceName> {
        self.quantities.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceName, i64)> {
        self.quantities.iter().map(|(k, v)| (k, *v))
    }

    pub fn is_zero(&self) -> bool {
        self.quantities.values().all(|v| *v == 0)
    }

    fn union_keys<'a>(a: &'a Resource, b: &'a Resource) -> impl Iterator<Item = &'a ResourceName> {
        let mut keys: Vec<&ResourceName> = a.quantities.keys().chain(b.quantities.keys()).collect();
        keys.sort();
        keys.dedup();
        keys.into_iter()
    }

    /// Element-wise add. Absent inputs behave as a zero vector (the identity
    /// for addition) — callers typically pass `Option<&Resource>`, see
    /// [`add_opt`](Self::add_opt).
    pub fn add(&self, other: &Resource) -> Resource {
        let mut out = Resource::new();
        for k in Self::union_keys(self, other) {
            out.set(k.clone(), self.get(k) + other.get(k));
        }
        out
    }

    pub fn add_opt(a: Option<&Resource>, b: Option<&Resource>) -> Option<Resource> {
        match (a, b) {
            (None, None) => None,
            (Some(x), None) => Some(x.clone()),
            (None, Some(y)) => Some(y.clone()),
            (Some(x), Some(y)) => Some(x.add(y)),
        }
    }

    /// Element-wise subtract, clamped at zero per component. Never returns a
    /// negative quantity — an attempt to go below zero silently resets that
    /// component to zero (`spec.md` §3 invariant 4, §9 open question).
    pub fn sub_clamped(&self, other: &Resource) -> Resource {
        let mut out = Resource::new();
        for k in Self::union_keys(self, other) {
            let delta = self.get(k) - other.get(k);
            if delta < 0 {
                tracing::debug!(resource = %k, self_value = self.get(k), other_value = other.get(k), "resource subtraction clamped at zero");
            }
            out.set(k.clone(), delta.max(0));
        }
        out
    }

    pub fn scalar_mul(&self, factor: i64) -> Resource {
        let mut out = Resource::new();
        for (k, v) in self.iter() {
            out.set(k.clone(), (v * factor).max(0));
        }
        out
    }

    /// Element-wise integer division by a positive scalar, floored. Used to
    /// compute an equal per-leaf share of remaining slack during DRF
    /// water-filling (`spec.md` §4.8 step C.3) — `divisor` is clamped to at
    /// least 1 so a caller passing a leftover count of zero can't panic.
    pub fn div_floor(&self, divisor: i64) -> Resource {
        let divisor = divisor.max(1);
        let mut out = Resource::new();
        for (k, v) in self.iter() {
            out.set(k.clone(), v / divisor);
        }
        out
    }

    /// Element-wise min across the union of keys. A key missing from one
    /// side reads as zero, so `min` with a sparser vector only ever produces
    /// a subset or zero, never invents a larger value.
    pub fn min(&self, other: &Resource) -> Resource {
        let mut out = Resource::new();
        for k in Self::union_keys(self, other) {
            out.set(k.clone(), self.get(k).min(other.get(k)));
        }
        out
    }

    pub fn max(&self, other: &Resource) -> Resource {
        let mut out = Resource::new();
        for k in Self::union_keys(self, other) {
            out.set(k.clone(), self.get(k).max(other.get(k)));
        }
        out
    }

    /// `self fits within limit` iff for every key `k` in `self`,
    /// `self[k] <= limit[k]` (missing limit keys read as zero). `limit =
    /// None` means unbounded and always fits (`spec.md` §4.1).
    pub fn fits_within(&self, limit: Option<&Resource>) -> bool {
        match limit {
            None => true,
            Some(limit) => self.iter().all(|(k, v)| v <= limit.get(k)),
        }
    }

    /// Element-wise `self <= other` across the union of keys, the
    /// comparison primitive used outside the headroom-specific `fits_within`
    /// (e.g. `used <= guaranteed` in the preemption engine).
    pub fn le(&self, other: &Resource) -> bool {
        Self::union_keys(self, other).all(|k| self.get(k) <= other.get(k))
    }

    pub fn gt(&self, other: &Resource) -> bool {
        !self.le(other)
    }

    /// Dominant share of `self` relative to `capacity`: the maximum, over
    /// every resource type present in either vector, of `self[k] /
    /// capacity[k]`. A capacity of zero for a key that `self` also reads as
    /// zero for contributes `0.0`; a capacity of zero for a key where `self`
    /// is positive contributes `f64::INFINITY` (that type is fully
    /// saturated and then some).
    pub fn dominant_share(&self, capacity: &Resource) -> f64 {
        let mut dominant = 0.0_f64;
        for k in Self::union_keys(self, capacity) {
            let used = self.get(k) as f64;
            let cap = capacity.get(k) as f64;
            let share = if cap == 0.0 {
                if used == 0.0 {
                    0.0
                } else {
                    f64::INFINITY
                }
            } else {
                used / cap
            };
            if share > dominant {
                dominant = share;
            }
        }
        dominant
    }

    /// Parse a configuration mapping of string -> decimal string into a
    /// `Resource`, rejecting negative or non-numeric values (`spec.md`
    /// §4.1).
    pub fn parse(values: &BTreeMap<String, String>) -> Result<Resource, SchedulerError> {
        let mut out = Resource::new();
        for (k, v) in values {
            let parsed: i64 = v.trim().parse().map_err(|_| {
                SchedulerError::Config(ConfigError::InvalidResourceValue {
                    resource: k.clone(),
                    value: v.clone(),
                })
            })?;
            if parsed < 0 {
                return Err(SchedulerError::Config(ConfigError::InvalidResourceValue {
                    resource: k.clone(),
                    value: v.clone(),
                }));
            }
            out.set(k.as_str(), parsed);
        }
        Ok(out)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", k, v)?;
        }
        write!(f, "}}")
    }
}

/// A resource delta that may be negative per component, used only as an
/// intermediate value while propagating ask changes up the queue chain
/// (`spec.md` §4.9). `Resource` itself is always non-negative once an
/// operation completes; `SignedResource` exists so a net-negative delta
/// (e.g. shrinking an ask) can be applied against an accumulator with a
/// single clamped-add instead of a separate add/subtract branch at every
/// call site.
#[derive(Debug, Clone, Default)]
pub struct SignedResource(BTreeMap<ResourceName, i64>);

impl Resource {
    pub fn into_signed(self) -> SignedResource {
        SignedResource(self.quantities.into_iter().collect())
    }

    /// `self - other`, allowed to go negative (unlike `sub_clamped`).
    pub fn sub_signed(&self, other: &Resource) -> SignedResource {
        let mut out = BTreeMap::new();
        for k in Self::union_keys(self, other) {
            out.insert(k.clone(), self.get(k) - other.get(k));
        }
        SignedResource(out)
    }

    /// Apply a signed delta, clamping the result at zero per component
    /// (`spec.md` §3 invariant 4).
    pub fn add_signed_clamped(&self, delta: &SignedResource) -> Resource {
        let mut out = self.clone();
        for (k, d) in &delta.0 {
            let new_val = out.get(k) + d;
            if new_val < 0 {
                tracing::debug!(resource = %k, "pending accumulator clamped at zero");
            }
            out.set(k.clone(), new_val.max(0));
        }
        out
    }
}

impl SignedResource {
    pub fn negate(&self) -> SignedResource {
        SignedResource(self.0.iter().map(|(k, v)| (k.clone(), -v)).collect())
    }

    pub fn is_zero(&self) -> bool {
        self.0.values().all(|v| *v == 0)
    }
}

/// Total ordering wrapper over `f64` used for deterministic priority-queue
/// keys (dominant shares). `f64` is never `NaN` in this codebase (shares are
/// always ratios of non-negative integers), so `total_cmp` is sufficient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderedShare(pub f64);

impl Eq for OrderedShare {}

impl PartialOrd for OrderedShare {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedShare {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_elementwise() {
        let a = Resource::from_pairs([("memory", 10), ("vcore", 2)]);
        let b = Resource::from_pairs([("memory", 5)]);
        let sum = a.add(&b);
        assert_eq!(sum.get(&"memory".into()), 15);
        assert_eq!(sum.get(&"vcore".into()), 2);
    }

    #[test]
    fn div_floor_splits_evenly_and_clamps_divisor_at_one() {
        let r = Resource::from_pairs([("memory", 12), ("vcore", 5)]);
        let split = r.div_floor(2);
        assert_eq!(split.get(&"memory".into()), 6);
        assert_eq!(split.get(&"vcore".into()), 2);

        let unsplit = r.div_floor(0);
        assert_eq!(unsplit, r);
    }

    #[test]
    fn sub_clamps_at_zero() {
        let a = Resource::single("memory", 100);
        let b = Resource::single("memory", 200);
        let diff = a.sub_clamped(&b);
        assert_eq!(diff.get(&"memory".into()), 0);
        assert!(diff.is_zero());
    }

    #[test]
    fn fits_within_none_is_unbounded() {
        let r = Resource::single("memory", 1_000_000);
        assert!(r.fits_within(None));
    }

    #[test]
    fn fits_within_respects_missing_keys_as_zero() {
        let request = Resource::from_pairs([("memory", 1), ("vcore", 1)]);
        let headroom = Resource::single("memory", 10);
        assert!(!request.fits_within(Some(&headroom)));
    }

    #[test]
    fn dominant_share_picks_max_ratio() {
        let used = Resource::from_pairs([("memory", 50), ("vcore", 20)]);
        let capacity = Resource::from_pairs([("memory", 100), ("vcore", 40)]);
        assert_eq!(used.dominant_share(&capacity), 0.5);
    }

    #[test]
    fn parse_rejects_negative_and_non_numeric() {
        let mut m = BTreeMap::new();
        m.insert("memory".to_string(), "-1".to_string());
        assert!(Resource::parse(&m).is_err());

        let mut m2 = BTreeMap::new();
        m2.insert("memory".to_string(), "abc".to_string());
        assert!(Resource::parse(&m2).is_err());

        let mut m3 = BTreeMap::new();
        m3.insert("memory".to_string(), "1024".to_string());
        let r = Resource::parse(&m3).unwrap();
        assert_eq!(r.get(&"memory".into()), 1024);
    }
}
