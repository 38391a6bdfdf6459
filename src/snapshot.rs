//! Serializable snapshots of adder totals.
//!
//! # Feature Flag
//!
//! This module requires the `serde` feature:
//!
//! ```toml
//! [dependencies]
//! sommatori = { version = "0.1", features = ["serde"] }
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use sommatori::adders::{Adder, LongAdder};
//! use sommatori::snapshot::AdderSnapshot;
//!
//! let requests = LongAdder::new().with_name("requests");
//! requests.add(42);
//!
//! let snapshot = AdderSnapshot::from_adder(&requests);
//! let json = serde_json::to_string(&snapshot).unwrap();
//! assert_eq!(json, r#"{"name":"requests","value":42}"#);
//! ```

use serde::{Deserialize, Serialize};

use crate::adders::Adder;
use crate::value::Value;

/// The total of one adder at the moment it was read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdderSnapshot<V> {
    /// The name of the adder.
    pub name: String,
    /// The total read from the adder.
    pub value: V,
}

impl<V: Value> AdderSnapshot<V> {
    /// Creates a new snapshot.
    pub fn new(name: impl Into<String>, value: V) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Reads the total of `adder`.
    pub fn from_adder(adder: &dyn Adder<V>) -> Self {
        Self::new(display_name(adder), adder.sum())
    }

    /// Reads and resets the total of `adder`.
    pub fn from_adder_and_reset(adder: &dyn Adder<V>) -> Self {
        Self::new(display_name(adder), adder.sum_and_reset())
    }

    /// Reads every adder in `adders`.
    pub fn collect<'a>(adders: impl Iterator<Item = &'a dyn Adder<V>>) -> Vec<Self> {
        adders.map(Self::from_adder).collect()
    }

    /// Reads and resets every adder in `adders`.
    pub fn collect_and_reset<'a>(adders: impl Iterator<Item = &'a dyn Adder<V>>) -> Vec<Self> {
        adders.map(Self::from_adder_and_reset).collect()
    }
}

fn display_name<V: Value>(adder: &dyn Adder<V>) -> String {
    if adder.name().is_empty() {
        "(unnamed)".to_string()
    } else {
        adder.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adders::{AdderKind, DoubleAdder, LongAdder, MutexAdder};

    #[test]
    fn test_from_adder() {
        let adder = LongAdder::new().with_name("requests");
        adder.add(100);

        let snapshot = AdderSnapshot::<i64>::from_adder(&adder);
        assert_eq!(snapshot, AdderSnapshot::new("requests", 100));
        assert_eq!(adder.sum(), 100);
    }

    #[test]
    fn test_from_adder_unnamed() {
        let adder = MutexAdder::<i64>::new();
        adder.add(50);
        assert_eq!(AdderSnapshot::<i64>::from_adder(&adder).name, "(unnamed)");
    }

    #[test]
    fn test_from_adder_and_reset() {
        let adder = LongAdder::new().with_name("errors");
        adder.add(5);
        let snapshot = AdderSnapshot::<i64>::from_adder_and_reset(&adder);
        assert_eq!(snapshot.value, 5);
        assert_eq!(adder.sum(), 0);
    }

    #[test]
    fn test_collect() {
        let a = LongAdder::new().with_name("a");
        let b = LongAdder::new().with_name("b");
        a.inc();
        b.dec();
        let adders: Vec<&dyn Adder<i64>> = vec![&a, &b];

        let snapshots = AdderSnapshot::collect(adders.iter().copied());
        assert_eq!(
            snapshots,
            vec![AdderSnapshot::new("a", 1), AdderSnapshot::new("b", -1)]
        );

        let drained = AdderSnapshot::collect_and_reset(adders.into_iter());
        assert_eq!(drained.len(), 2);
        assert_eq!(a.sum(), 0);
        assert_eq!(b.sum(), 0);
    }

    #[test]
    fn test_json_roundtrip() {
        let adder = DoubleAdder::new().with_name("seconds");
        adder.add(1.5);

        let json = serde_json::to_string(&AdderSnapshot::<f64>::from_adder(&adder)).unwrap();
        assert_eq!(json, r#"{"name":"seconds","value":1.5}"#);

        let back: AdderSnapshot<f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AdderSnapshot::new("seconds", 1.5));
    }

    #[test]
    fn test_kind_serde() {
        let json = serde_json::to_string(&AdderKind::FixedStripe).unwrap();
        assert_eq!(json, r#""fixed-stripe""#);
        let kind: AdderKind = serde_json::from_str(r#""single-value""#).unwrap();
        assert_eq!(kind, AdderKind::SingleValue);
    }
}
