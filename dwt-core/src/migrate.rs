//! One-way migration of legacy (v1) records to the current v2 schema, plus
//! the date normalization pass that runs on every load.
//!
//! v1 stored dogs as bare names and entries as `{id, dog, date, weight,
//! notes}`. v2 gives dogs generated ids and entries a `dogId` reference and
//! a `dtISO` field. An intermediate v2 generation kept date+time in `dtISO`;
//! the current one keeps only `YYYY-MM-DD`, so every date written here is
//! cut to its first ten characters.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;
use tracing::{info, warn};

use crate::domain::{Dog, Entry, date_prefix, new_id, parse_decimal, round_weight};
use crate::error::Result;
use crate::store::KvStore;

pub const LEGACY_DOGS_KEY: &str = "dwt_dogs";
pub const LEGACY_ENTRIES_KEY: &str = "dwt_entries";
pub const DOGS_KEY: &str = "dwt_dogs_v2";
pub const ENTRIES_KEY: &str = "dwt_entries_v2";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// v2 data already present; nothing touched.
    AlreadyCurrent,
    /// No legacy data and no v2 data.
    Fresh,
    Migrated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Dog,
    Entry,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropReason {
    NotAString,
    NotAnObject,
    MissingField(&'static str),
    BadWeight(String),
    /// Entry references a dog name (v1) or id (v2) that does not exist.
    UnknownDog(String),
    /// Stored v2 value that no longer decodes.
    Undecodable(String),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::NotAString => write!(f, "not a string"),
            DropReason::NotAnObject => write!(f, "not an object"),
            DropReason::MissingField(field) => write!(f, "missing field `{field}`"),
            DropReason::BadWeight(w) => write!(f, "unusable weight {w}"),
            DropReason::UnknownDog(d) => write!(f, "no dog matches {d:?}"),
            DropReason::Undecodable(e) => write!(f, "undecodable: {e}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DroppedRecord {
    pub kind: RecordKind,
    /// Position in the source collection.
    pub index: usize,
    pub id: Option<String>,
    pub reason: DropReason,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MigrationReport {
    pub outcome: MigrationOutcome,
    pub dogs: usize,
    pub entries: usize,
    pub dropped: Vec<DroppedRecord>,
}

impl MigrationReport {
    fn untouched(outcome: MigrationOutcome) -> Self {
        Self {
            outcome,
            dogs: 0,
            entries: 0,
            dropped: Vec::new(),
        }
    }
}

/// Result of converting v1 collections; nothing is persisted.
#[derive(Clone, Debug, Default)]
pub struct Converted {
    pub dogs: Vec<Dog>,
    pub entries: Vec<Entry>,
    pub dropped: Vec<DroppedRecord>,
}

fn legacy_weight(v: Option<&Value>) -> std::result::Result<f64, DropReason> {
    let w = match v {
        None | Some(Value::Null) => return Err(DropReason::MissingField("weight")),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_decimal(s),
        Some(_) => None,
    };
    match w {
        Some(w) if w.is_finite() => Ok(round_weight(w)),
        _ => Err(DropReason::BadWeight(v.map(Value::to_string).unwrap_or_default())),
    }
}

fn legacy_entry(
    index: usize,
    raw: &Value,
    by_name: &HashMap<&str, &str>,
) -> std::result::Result<Entry, DroppedRecord> {
    let id = raw
        .get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let reject = |reason| DroppedRecord {
        kind: RecordKind::Entry,
        index,
        id: id.clone(),
        reason,
    };

    let obj = raw.as_object().ok_or_else(|| reject(DropReason::NotAnObject))?;
    let dog = obj
        .get("dog")
        .and_then(Value::as_str)
        .ok_or_else(|| reject(DropReason::MissingField("dog")))?;
    let dog_id = by_name
        .get(dog)
        .ok_or_else(|| reject(DropReason::UnknownDog(dog.to_string())))?;
    let date = obj
        .get("date")
        .and_then(Value::as_str)
        .ok_or_else(|| reject(DropReason::MissingField("date")))?;
    let weight = legacy_weight(obj.get("weight")).map_err(reject)?;
    let notes = obj
        .get("notes")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(Entry {
        id: id.clone().unwrap_or_else(new_id),
        dog_id: dog_id.to_string(),
        date: date_prefix(date).to_string(),
        weight,
        notes,
    })
}

/// Pure v1 → v2 transform. Dogs sharing a name all survive, but entries map
/// to whichever of them was registered last.
pub fn convert_legacy(dogs: &[Value], entries: &[Value]) -> Converted {
    let mut out = Converted::default();

    for (index, raw) in dogs.iter().enumerate() {
        match raw.as_str() {
            Some(name) => out.dogs.push(Dog::new(name, "", "")),
            None => out.dropped.push(DroppedRecord {
                kind: RecordKind::Dog,
                index,
                id: None,
                reason: DropReason::NotAString,
            }),
        }
    }

    let by_name: HashMap<&str, &str> = out
        .dogs
        .iter()
        .map(|d| (d.name.as_str(), d.id.as_str()))
        .collect();

    let mut kept = Vec::with_capacity(entries.len());
    for (index, raw) in entries.iter().enumerate() {
        match legacy_entry(index, raw, &by_name) {
            Ok(e) => kept.push(e),
            Err(d) => out.dropped.push(d),
        }
    }
    out.entries = kept;
    out
}

fn legacy_array<S: KvStore + ?Sized>(store: &S, key: &str) -> Result<Vec<Value>> {
    Ok(match store.get(key)? {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            warn!(key, kind = %json_kind(&other), "legacy value is not an array; treating as empty");
            Vec::new()
        }
    })
}

pub(crate) fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Migrate legacy records once. Existing v2 data is never overwritten, and
/// the legacy keys are left as they were.
pub fn migrate_if_needed<S: KvStore + ?Sized>(store: &mut S) -> Result<MigrationReport> {
    if store.contains(DOGS_KEY)? || store.contains(ENTRIES_KEY)? {
        return Ok(MigrationReport::untouched(MigrationOutcome::AlreadyCurrent));
    }
    if !store.contains(LEGACY_DOGS_KEY)? && !store.contains(LEGACY_ENTRIES_KEY)? {
        return Ok(MigrationReport::untouched(MigrationOutcome::Fresh));
    }

    let legacy_dogs = legacy_array(store, LEGACY_DOGS_KEY)?;
    let legacy_entries = legacy_array(store, LEGACY_ENTRIES_KEY)?;
    let Converted {
        dogs,
        entries,
        dropped,
    } = convert_legacy(&legacy_dogs, &legacy_entries);

    for d in &dropped {
        warn!(kind = ?d.kind, index = d.index, id = ?d.id, reason = %d.reason, "dropped legacy record");
    }

    store.set(DOGS_KEY, &serde_json::to_value(&dogs)?)?;
    store.set(ENTRIES_KEY, &serde_json::to_value(&entries)?)?;

    info!(
        dogs = dogs.len(),
        entries = entries.len(),
        dropped = dropped.len(),
        "migrated legacy records to v2"
    );
    Ok(MigrationReport {
        outcome: MigrationOutcome::Migrated,
        dogs: dogs.len(),
        entries: entries.len(),
        dropped,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct Normalized {
    pub entries: Vec<Entry>,
    /// How many dates were cut.
    pub truncated: usize,
}

/// Cut every date longer than ten characters down to `YYYY-MM-DD`.
/// Idempotent.
pub fn normalize_entries(mut entries: Vec<Entry>) -> Normalized {
    let mut truncated = 0;
    for e in &mut entries {
        let prefix = date_prefix(&e.date);
        if prefix.len() != e.date.len() {
            e.date = prefix.to_string();
            truncated += 1;
        }
    }
    Normalized { entries, truncated }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store_mem::MemStore;
    use proptest::prelude::*;
    use serde_json::json;

    fn stored<T: serde::de::DeserializeOwned>(s: &MemStore, key: &str) -> T {
        serde_json::from_value(s.get(key).unwrap().unwrap()).unwrap()
    }

    #[test]
    fn migrates_single_dog_and_entry() {
        let mut s = MemStore::new()
            .with(LEGACY_DOGS_KEY, json!(["Rex"]))
            .with(
                LEGACY_ENTRIES_KEY,
                json!([{"dog": "Rex", "date": "2023-05-01", "weight": 21.3}]),
            );
        let report = migrate_if_needed(&mut s).unwrap();
        assert_eq!(report.outcome, MigrationOutcome::Migrated);
        assert!(report.dropped.is_empty());

        let dogs: Vec<Dog> = stored(&s, DOGS_KEY);
        let entries: Vec<Entry> = stored(&s, ENTRIES_KEY);
        assert_eq!(dogs.len(), 1);
        assert_eq!(dogs[0].name, "Rex");
        assert_eq!(dogs[0].owner, "");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].dog_id, dogs[0].id);
        assert_eq!(entries[0].date, "2023-05-01");
        assert_eq!(entries[0].weight, 21.3);
        assert!(!entries[0].id.is_empty());
    }

    #[test]
    fn second_run_is_a_no_op() {
        let mut s = MemStore::new().with(LEGACY_DOGS_KEY, json!(["Rex", "Pip"]));
        migrate_if_needed(&mut s).unwrap();
        let before: Vec<Dog> = stored(&s, DOGS_KEY);

        let again = migrate_if_needed(&mut s).unwrap();
        assert_eq!(again.outcome, MigrationOutcome::AlreadyCurrent);
        let after: Vec<Dog> = stored(&s, DOGS_KEY);
        assert_eq!(before, after);
    }

    #[test]
    fn existing_v2_data_is_never_overwritten() {
        let mut s = MemStore::new()
            .with(LEGACY_DOGS_KEY, json!(["Rex"]))
            .with(DOGS_KEY, json!([]));
        let report = migrate_if_needed(&mut s).unwrap();
        assert_eq!(report.outcome, MigrationOutcome::AlreadyCurrent);
        assert_eq!(s.get(DOGS_KEY).unwrap(), Some(json!([])));
        assert!(!s.contains(ENTRIES_KEY).unwrap());
    }

    #[test]
    fn fresh_store_is_left_alone() {
        let mut s = MemStore::new();
        let report = migrate_if_needed(&mut s).unwrap();
        assert_eq!(report.outcome, MigrationOutcome::Fresh);
        assert_eq!(s.keys().count(), 0);
    }

    #[test]
    fn legacy_keys_are_kept() {
        let mut s = MemStore::new().with(LEGACY_DOGS_KEY, json!(["Rex"]));
        migrate_if_needed(&mut s).unwrap();
        assert_eq!(s.get(LEGACY_DOGS_KEY).unwrap(), Some(json!(["Rex"])));
    }

    #[test]
    fn unresolved_entries_are_dropped_and_reported() {
        let mut s = MemStore::new()
            .with(LEGACY_DOGS_KEY, json!(["Rex"]))
            .with(
                LEGACY_ENTRIES_KEY,
                json!([
                    {"id": "a", "dog": "Rex", "date": "2023-05-01", "weight": 21.3},
                    {"id": "b", "dog": "Ghost", "date": "2023-05-02", "weight": 9.0}
                ]),
            );
        let report = migrate_if_needed(&mut s).unwrap();
        assert_eq!(report.entries, 1);
        assert_eq!(
            report.dropped,
            vec![DroppedRecord {
                kind: RecordKind::Entry,
                index: 1,
                id: Some("b".into()),
                reason: DropReason::UnknownDog("Ghost".into()),
            }]
        );
        let entries: Vec<Entry> = stored(&s, ENTRIES_KEY);
        assert_eq!(entries[0].id, "a");
    }

    #[test]
    fn malformed_records_fail_softly() {
        let c = convert_legacy(
            &[json!("Rex"), json!(42)],
            &[
                json!("nonsense"),
                json!({"dog": "Rex", "weight": 3}),
                json!({"date": "2023-01-01", "weight": 3}),
                json!({"dog": "Rex", "date": "2023-01-01", "weight": "lots"}),
                json!({"dog": "Rex", "date": "2023-01-01", "weight": "12,5", "notes": "ok"}),
            ],
        );
        assert_eq!(c.dogs.len(), 1);
        assert_eq!(c.entries.len(), 1);
        assert_eq!(c.entries[0].weight, 12.5);
        assert_eq!(c.entries[0].notes, "ok");
        let reasons: Vec<_> = c.dropped.iter().map(|d| (d.kind, d.reason.clone())).collect();
        assert_eq!(
            reasons,
            vec![
                (RecordKind::Dog, DropReason::NotAString),
                (RecordKind::Entry, DropReason::NotAnObject),
                (RecordKind::Entry, DropReason::MissingField("date")),
                (RecordKind::Entry, DropReason::MissingField("dog")),
                (RecordKind::Entry, DropReason::BadWeight("\"lots\"".into())),
            ]
        );
    }

    #[test]
    fn duplicate_legacy_names_resolve_to_last() {
        let c = convert_legacy(
            &[json!("Rex"), json!("Rex")],
            &[json!({"dog": "Rex", "date": "2023-01-01", "weight": 3})],
        );
        assert_eq!(c.dogs.len(), 2);
        assert_eq!(c.entries[0].dog_id, c.dogs[1].id);
    }

    #[test]
    fn text_and_numeric_weights_follow_the_same_rule() {
        let entries: Vec<Value> = [json!(0), json!("0"), json!(-1.5), json!(" -1,5 "), json!("NaN")]
            .into_iter()
            .map(|w| json!({"dog": "Rex", "date": "2023-01-01", "weight": w}))
            .collect();
        let c = convert_legacy(&[json!("Rex")], &entries);
        let kept: Vec<f64> = c.entries.iter().map(|e| e.weight).collect();
        assert_eq!(kept, [0.0, 0.0, -1.5, -1.5]);
        assert_eq!(c.dropped.len(), 1);
        assert_eq!(c.dropped[0].index, 4);
    }

    #[test]
    fn datetime_values_are_cut_to_dates() {
        let c = convert_legacy(
            &[json!("Rex")],
            &[json!({"dog": "Rex", "date": "2023-05-01T08:30:00.000Z", "weight": 3})],
        );
        assert_eq!(c.entries[0].date, "2023-05-01");
    }

    #[test]
    fn non_array_legacy_value_counts_as_empty() {
        let mut s = MemStore::new()
            .with(LEGACY_DOGS_KEY, json!({"oops": true}))
            .with(LEGACY_ENTRIES_KEY, json!(null));
        let report = migrate_if_needed(&mut s).unwrap();
        assert_eq!(report.outcome, MigrationOutcome::Migrated);
        assert_eq!(s.get(DOGS_KEY).unwrap(), Some(json!([])));
    }

    fn entry(date: &str) -> Entry {
        Entry {
            id: new_id(),
            dog_id: "d".into(),
            date: date.into(),
            weight: 1.0,
            notes: String::new(),
        }
    }

    #[test]
    fn normalize_counts_truncations() {
        let n = normalize_entries(vec![entry("2023-05-01T00:00"), entry("2023-05-02")]);
        assert_eq!(n.truncated, 1);
        assert_eq!(n.entries[0].date, "2023-05-01");
        assert_eq!(n.entries[1].date, "2023-05-02");
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(dates in proptest::collection::vec(".{0,24}", 0..8)) {
            let once = normalize_entries(dates.iter().map(|d| entry(d)).collect());
            for e in &once.entries {
                prop_assert!(e.date.chars().count() <= 10);
            }
            let twice = normalize_entries(once.entries.clone());
            prop_assert_eq!(twice.truncated, 0);
            prop_assert_eq!(twice.entries, once.entries);
        }

        #[test]
        fn migration_leaves_no_dangling_refs(
            names in proptest::collection::vec("[abc]{1,2}", 0..5),
            refs in proptest::collection::vec("[abcd]{1,2}", 0..10),
        ) {
            let dogs: Vec<Value> = names.iter().map(|n| json!(n)).collect();
            let entries: Vec<Value> = refs
                .iter()
                .map(|r| json!({"dog": r, "date": "2024-01-01T12:00", "weight": 5.5}))
                .collect();
            let mut s = MemStore::new()
                .with(LEGACY_DOGS_KEY, Value::Array(dogs))
                .with(LEGACY_ENTRIES_KEY, Value::Array(entries));
            let report = migrate_if_needed(&mut s).unwrap();
            let out_dogs: Vec<Dog> = stored(&s, DOGS_KEY);
            let out_entries: Vec<Entry> = stored(&s, ENTRIES_KEY);
            for e in &out_entries {
                prop_assert!(out_dogs.iter().any(|d| d.id == e.dog_id));
                prop_assert_eq!(e.date.as_str(), "2024-01-01");
            }
            prop_assert_eq!(out_entries.len() + report.dropped.len(), refs.len());

            let again = migrate_if_needed(&mut s).unwrap();
            prop_assert_eq!(again.outcome, MigrationOutcome::AlreadyCurrent);
            let still: Vec<Entry> = stored(&s, ENTRIES_KEY);
            prop_assert_eq!(still, out_entries);
        }
    }
}
