//! Snapshot reconciliation.
//!
//! # Responsibilities
//! - Normalize every incoming key into a configuration path
//! - Decide, per key, whether the incoming value replaces the current one
//!
//! # Design Decisions
//! - Reconciliation is a pure function of (current snapshot, incoming snapshot)
//! - Overwrite mode never looks at the current snapshot
//! - Safe mode only lets a value change when it still parses as the kind
//!   inferred from the current value; mismatches are logged and skipped

use std::collections::BTreeMap;

use crate::convert::infer::{infer, PrimitiveKind};
use crate::convert::key_path::KeyPathNormalizer;
use crate::convert::{AcceptedSnapshot, FlatSnapshot};

/// How incoming values are merged with the current snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcileMode {
    /// Take every incoming value as is.
    #[default]
    Overwrite,
    /// Refuse updates that change the inferred type of a value.
    Safe,
}

impl ReconcileMode {
    pub fn from_safe_update(safe_update: bool) -> Self {
        if safe_update {
            ReconcileMode::Safe
        } else {
            ReconcileMode::Overwrite
        }
    }
}

/// What happened to a single key during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The incoming value was taken.
    AcceptedNew,
    /// The incoming value equals the current one.
    Unchanged,
    /// The incoming value was incompatible; the current value was kept.
    ConflictSkipped,
}

/// A skipped update in safe mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub key: String,
    pub rejected: String,
    pub retained: String,
    /// Kind inferred from the retained value.
    pub kind: PrimitiveKind,
}

/// Result of reconciling one incoming snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// The snapshot to publish.
    pub snapshot: AcceptedSnapshot,
    /// One outcome per normalized key.
    pub outcomes: BTreeMap<String, KeyOutcome>,
    pub conflicts: Vec<Conflict>,
}

impl Reconciliation {
    /// Number of keys whose value was taken from the incoming snapshot.
    pub fn accepted(&self) -> usize {
        self.count(KeyOutcome::AcceptedNew)
    }

    /// Number of keys whose update was refused.
    pub fn skipped(&self) -> usize {
        self.count(KeyOutcome::ConflictSkipped)
    }

    fn count(&self, outcome: KeyOutcome) -> usize {
        self.outcomes.values().filter(|o| **o == outcome).count()
    }
}

/// Converts raw ConfigMap data into the accepted configuration snapshot.
#[derive(Debug, Clone, Default)]
pub struct DataConverter {
    mode: ReconcileMode,
    normalizer: KeyPathNormalizer,
}

impl DataConverter {
    pub fn new(mode: ReconcileMode, normalizer: KeyPathNormalizer) -> Self {
        Self { mode, normalizer }
    }

    /// Reconcile and return only the resulting snapshot.
    pub fn convert(&self, current: &AcceptedSnapshot, incoming: &FlatSnapshot) -> AcceptedSnapshot {
        self.reconcile(current, incoming).snapshot
    }

    /// Reconcile `incoming` against `current`.
    ///
    /// The returned snapshot holds exactly the normalized keys of `incoming`.
    /// Keys of `current` missing from `incoming` are dropped.
    pub fn reconcile(&self, current: &AcceptedSnapshot, incoming: &FlatSnapshot) -> Reconciliation {
        let mut result = Reconciliation::default();

        for (key, new_value) in self.normalize_keys(incoming) {
            let (value, outcome) = match self.mode {
                ReconcileMode::Overwrite => (new_value.to_string(), KeyOutcome::AcceptedNew),
                ReconcileMode::Safe => {
                    let (value, outcome, conflict) = self.arbitrate(current, &key, new_value);
                    result.conflicts.extend(conflict);
                    (value, outcome)
                }
            };

            result.snapshot.insert(key.clone(), Some(value));
            result.outcomes.insert(key, outcome);
        }

        result
    }

    /// Normalize every key of `incoming`, keeping the last raw key (in key
    /// order) when several map to the same path.
    fn normalize_keys<'a>(&self, incoming: &'a FlatSnapshot) -> BTreeMap<String, &'a str> {
        let mut normalized = BTreeMap::new();
        for (raw_key, value) in incoming {
            let key = self.normalizer.normalize(raw_key);
            if normalized.insert(key.clone(), value.as_str()).is_some() {
                tracing::warn!(
                    key = %key,
                    raw_key = %raw_key,
                    "ConfigMap keys collide after normalization, last key wins"
                );
            }
        }
        normalized
    }

    fn arbitrate(
        &self,
        current: &AcceptedSnapshot,
        key: &str,
        new_value: &str,
    ) -> (String, KeyOutcome, Option<Conflict>) {
        let Some(current_value) = current.get(key).and_then(|v| v.as_deref()) else {
            return (new_value.to_string(), KeyOutcome::AcceptedNew, None);
        };

        if current_value == new_value {
            return (current_value.to_string(), KeyOutcome::Unchanged, None);
        }

        let kind = infer(current_value).kind();
        if kind == PrimitiveKind::String || kind.accepts(new_value) {
            return (new_value.to_string(), KeyOutcome::AcceptedNew, None);
        }

        tracing::warn!(
            key = %key,
            new_value = %new_value,
            current_value = %current_value,
            kind = %kind,
            "ConfigMap item is incompatible with the current value, update skipped"
        );

        let conflict = Conflict {
            key: key.to_string(),
            rejected: new_value.to_string(),
            retained: current_value.to_string(),
            kind,
        };
        (current_value.to_string(), KeyOutcome::ConflictSkipped, Some(conflict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn safe() -> DataConverter {
        DataConverter::new(ReconcileMode::Safe, KeyPathNormalizer::default())
    }

    fn overwrite() -> DataConverter {
        DataConverter::new(ReconcileMode::Overwrite, KeyPathNormalizer::default())
    }

    fn current(entries: &[(&str, &str)]) -> AcceptedSnapshot {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), Some(v.to_string())))
            .collect()
    }

    fn flat(entries: &[(&str, &str)]) -> FlatSnapshot {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn value<'a>(snapshot: &'a AcceptedSnapshot, key: &str) -> Option<&'a str> {
        snapshot.get(key).and_then(|v| v.as_deref())
    }

    #[test]
    fn test_empty_snapshots() {
        for converter in [safe(), overwrite()] {
            let result = converter.convert(&AcceptedSnapshot::new(), &FlatSnapshot::new());
            assert!(result.is_empty());
        }
    }

    #[test]
    fn test_nested_keys_into_empty_snapshot() {
        let incoming = flat(&[("Foo", "foo"), ("Foo__Bar", "foo bar"), ("Foo__Bar__Baz", "foo bar baz")]);
        for converter in [safe(), overwrite()] {
            let result = converter.convert(&AcceptedSnapshot::new(), &incoming);
            let keys: Vec<&str> = result.keys().map(String::as_str).collect();
            assert_eq!(keys, vec!["Foo", "Foo:Bar", "Foo:Bar:Baz"]);
        }
    }

    #[test]
    fn test_safe_update_of_string_values() {
        let result = safe().convert(
            &current(&[("Foo", "bar"), ("Foo:Bar", "foo bar")]),
            &flat(&[("Foo", "baz"), ("Foo__Bar", "foo baz")]),
        );
        assert_eq!(value(&result, "Foo"), Some("baz"));
        assert_eq!(value(&result, "Foo:Bar"), Some("foo baz"));
    }

    #[test]
    fn test_safe_update_skips_type_mismatch() {
        let result = safe().reconcile(
            &current(&[("Foo", "true"), ("Foo:Bar", "1"), ("Foo:Bar:Baz", "foo bar baz")]),
            &flat(&[
                ("Foo", "foo"),
                ("Foo__Bar", "foo bar"),
                ("Foo__Bar__Baz", "foo bar baz updated"),
            ]),
        );
        assert_eq!(value(&result.snapshot, "Foo"), Some("true"));
        assert_eq!(value(&result.snapshot, "Foo:Bar"), Some("1"));
        assert_eq!(value(&result.snapshot, "Foo:Bar:Baz"), Some("foo bar baz updated"));
        assert_eq!(result.skipped(), 2);
        assert_eq!(result.accepted(), 1);
        assert_eq!(result.conflicts[0].kind, PrimitiveKind::Boolean);
        assert_eq!(result.conflicts[1].kind, PrimitiveKind::Int32);
    }

    #[test]
    fn test_compatible_updates_for_every_kind() {
        let pairs = [
            ("FooBoolean", "true", "false"),
            ("FooString", "foo", "bar"),
            ("FooInt32", "2147483647", "-2147483648"),
            ("FooInt64", "9223372036854775807", "-9223372036854775808"),
            ("FooSingle", "3.4028235E+38", "1E-45"),
            ("FooDouble", "1.7976931348623157E+308", "5E-324"),
            ("FooTimeOfDay", "23:59:59.9999999", "00:00:00"),
            ("FooDate", "9999-12-31", "0001-01-01"),
            ("FooDateTime", "9999-12-31T23:59:59", "0001-01-01T00:00:00"),
            ("FooDuration", "10675199.02:48:05.4775807", "-10675199.02:48:05.4775808"),
        ];
        let before: AcceptedSnapshot = pairs
            .iter()
            .map(|(k, old, _)| (k.to_string(), Some(old.to_string())))
            .collect();
        let incoming: FlatSnapshot = pairs
            .iter()
            .map(|(k, _, new)| (k.to_string(), new.to_string()))
            .collect();

        let result = safe().reconcile(&before, &incoming);

        assert!(result.conflicts.is_empty(), "{:?}", result.conflicts);
        for (key, _, new) in pairs {
            assert_eq!(value(&result.snapshot, key), Some(new), "key {key}");
        }
    }

    #[test]
    fn test_new_key_or_missing_value_accepts_incoming() {
        let mut before = current(&[("Foo", "bar")]);
        before.insert("Foo:Bar".to_string(), None);

        let result = safe().reconcile(&before, &flat(&[("Foo", "bar"), ("Foo__Bar", "foo bar"), ("Baz", "1")]));

        assert_eq!(value(&result.snapshot, "Foo"), Some("bar"));
        assert_eq!(value(&result.snapshot, "Foo:Bar"), Some("foo bar"));
        assert_eq!(value(&result.snapshot, "Baz"), Some("1"));
        assert_eq!(result.outcomes["Foo"], KeyOutcome::Unchanged);
        assert_eq!(result.outcomes["Foo:Bar"], KeyOutcome::AcceptedNew);
        assert_eq!(result.outcomes["Baz"], KeyOutcome::AcceptedNew);
    }

    #[test]
    fn test_integer_accepts_integer() {
        let result = safe().convert(&current(&[("Port", "1")]), &flat(&[("Port", "42")]));
        assert_eq!(value(&result, "Port"), Some("42"));
    }

    #[test]
    fn test_integer_rejects_wider_value() {
        let result = safe().reconcile(&current(&[("Port", "1")]), &flat(&[("Port", "3000000000")]));
        assert_eq!(value(&result.snapshot, "Port"), Some("1"));
        assert_eq!(result.outcomes["Port"], KeyOutcome::ConflictSkipped);
    }

    #[test]
    fn test_time_of_day_rejects_leap_second() {
        let result = safe().reconcile(&current(&[("Cron:At", "10:00")]), &flat(&[("Cron__At", "23:59:60")]));
        assert_eq!(value(&result.snapshot, "Cron:At"), Some("10:00"));
        assert_eq!(result.skipped(), 1);
    }

    #[test]
    fn test_time_of_day_rejects_date() {
        let result = safe().reconcile(&current(&[("At", "10:00")]), &flat(&[("At", "2024-01-01")]));
        assert_eq!(value(&result.snapshot, "At"), Some("10:00"));
    }

    #[test]
    fn test_stale_keys_are_dropped() {
        let before = current(&[("Old", "x"), ("Kept", "y")]);
        for converter in [safe(), overwrite()] {
            let result = converter.convert(&before, &flat(&[("Kept", "y")]));
            assert_eq!(result.len(), 1);
            assert!(result.contains_key("Kept"));
        }
    }

    #[test]
    fn test_overwrite_skips_verification() {
        let before = current(&[("Foo", "true"), ("Foo:Bar", "1"), ("Foo:Bar:Baz", "foo bar baz")]);
        let incoming = flat(&[("Foo", "foo"), ("Foo__Bar", "foo bar"), ("Foo__Bar__Baz", "foo bar baz")]);

        let result = overwrite().reconcile(&before, &incoming);

        assert_eq!(value(&result.snapshot, "Foo"), Some("foo"));
        assert_eq!(value(&result.snapshot, "Foo:Bar"), Some("foo bar"));
        assert_eq!(result.conflicts.len(), 0);
        assert_eq!(result.accepted(), 3);
    }

    #[test]
    fn test_safe_scenario_mixed_outcomes() {
        let result = safe().convert(
            &current(&[("Foo", "true"), ("Foo:Bar", "1")]),
            &flat(&[("Foo", "foo"), ("Foo__Bar", "2")]),
        );
        assert_eq!(result, current(&[("Foo", "true"), ("Foo:Bar", "2")]));
    }

    #[test]
    fn test_colliding_keys_keep_one_entry() {
        let result = overwrite().convert(&AcceptedSnapshot::new(), &flat(&[("A:B", "colon"), ("A__B", "underscore")]));
        assert_eq!(result.len(), 1);
        assert_eq!(value(&result, "A:B"), Some("underscore"));
    }

    #[test]
    #[traced_test]
    fn test_colliding_keys_are_resolved_before_safe_check() {
        let result = safe().reconcile(
            &current(&[("A:B", "true")]),
            &flat(&[("A:B", "notabool"), ("A__B", "false")]),
        );

        assert_eq!(value(&result.snapshot, "A:B"), Some("false"));
        assert_eq!(result.outcomes.get("A:B"), Some(&KeyOutcome::AcceptedNew));
        assert!(result.conflicts.is_empty());
        assert_eq!(result.skipped(), 0);
        assert!(logs_contain("last key wins"));
        assert!(!logs_contain("update skipped"));
    }

    #[test]
    #[traced_test]
    fn test_incompatible_value_logs_one_warning() {
        let result = safe().convert(&current(&[("Foo", "true")]), &flat(&[("Foo", "notabool")]));

        assert_eq!(value(&result, "Foo"), Some("true"));
        logs_assert(|lines: &[&str]| {
            let warnings = lines
                .iter()
                .filter(|line| line.contains("WARN") && line.contains("update skipped"))
                .count();
            match warnings {
                1 => Ok(()),
                n => Err(format!("expected exactly one warning, got {n}")),
            }
        });
    }

    #[test]
    #[traced_test]
    fn test_unchanged_value_logs_nothing() {
        safe().convert(&current(&[("Foo", "true")]), &flat(&[("Foo", "true")]));
        assert!(!logs_contain("update skipped"));
    }
}
