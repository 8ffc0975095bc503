use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info, warn};

use crate::domain::{
    Dog, Entry, SNAPSHOT_VERSION, Snapshot, date_prefix, new_id, parse_date, validate_weight,
};
use crate::error::{DwtError, Result};
use crate::migrate::{
    DOGS_KEY, DropReason, DroppedRecord, ENTRIES_KEY, MigrationReport, Normalized, RecordKind,
    convert_legacy, json_kind, migrate_if_needed, normalize_entries,
};
use crate::store::KvStore;

#[derive(Clone, Debug, Default)]
pub struct DogPatch {
    pub name: Option<String>,
    pub owner: Option<String>,
    pub breed: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct EntryPatch {
    pub dog_id: Option<String>,
    pub date: Option<String>,
    pub weight: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestoreReport {
    pub dogs: usize,
    pub entries: usize,
    pub dropped: Vec<DroppedRecord>,
}

/// Owns the dog and entry collections and mirrors every change to the store.
pub struct Tracker<S: KvStore> {
    store: S,
    dogs: Vec<Dog>,
    entries: Vec<Entry>,
    skipped: Vec<DroppedRecord>,
}

/// Suffix of the key that keeps the raw value of a collection with
/// undecodable records, so the next save cannot lose them.
pub const UNREADABLE_SUFFIX: &str = "_unreadable";

/// Decode a stored array element by element. Bad elements are skipped and
/// reported; the raw value is copied under `<key>_unreadable` first.
fn read_collection<S: KvStore + ?Sized, T: DeserializeOwned>(
    store: &mut S,
    key: &str,
    kind: RecordKind,
    dropped: &mut Vec<DroppedRecord>,
) -> Result<Vec<T>> {
    let raw = match store.get(key)? {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(raw) => raw,
    };
    let mut out = Vec::new();
    let mut skipped = Vec::new();
    match &raw {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                match serde_json::from_value(item.clone()) {
                    Ok(v) => out.push(v),
                    Err(e) => skipped.push(DroppedRecord {
                        kind,
                        index,
                        id: item.get("id").and_then(Value::as_str).map(str::to_string),
                        reason: DropReason::Undecodable(e.to_string()),
                    }),
                }
            }
        }
        other => skipped.push(DroppedRecord {
            kind,
            index: 0,
            id: None,
            reason: DropReason::Undecodable(format!("expected an array, found {}", json_kind(other))),
        }),
    }
    if !skipped.is_empty() {
        let backup_key = format!("{key}{UNREADABLE_SUFFIX}");
        store.set(&backup_key, &raw)?;
        for d in &skipped {
            warn!(key, index = d.index, reason = %d.reason, backup = %backup_key, "skipping stored record");
        }
        dropped.extend(skipped);
    }
    Ok(out)
}

fn backup_error(msg: String) -> DwtError {
    DwtError::InvalidBackupFormat(msg)
}

/// Check v2 backup records against the rules the tracker enforces for new
/// data. Weights only need to be finite: migrated history may hold values
/// that new input would refuse.
fn check_backup(dogs: &[Dog], entries: &mut [Entry]) -> Result<()> {
    let mut ids = HashSet::new();
    for (i, d) in dogs.iter().enumerate() {
        if d.name.trim().is_empty() {
            return Err(backup_error(format!("dogs[{i}]: empty name")));
        }
        if !ids.insert(d.id.as_str()) {
            return Err(backup_error(format!("dogs[{i}]: duplicate id {:?}", d.id)));
        }
        if dogs[..i].iter().any(|o| o.same_identity(&d.name, &d.owner)) {
            return Err(backup_error(format!(
                "dogs[{i}]: {:?} (owner {:?}) appears twice",
                d.name, d.owner
            )));
        }
    }
    let mut entry_ids = HashSet::new();
    for (i, e) in entries.iter_mut().enumerate() {
        if !entry_ids.insert(e.id.clone()) {
            return Err(backup_error(format!("entries[{i}]: duplicate id {:?}", e.id)));
        }
        e.date = parse_date(date_prefix(&e.date))
            .map_err(|err| backup_error(format!("entries[{i}]: {err}")))?;
        if !e.weight.is_finite() {
            return Err(backup_error(format!("entries[{i}]: weight is not a number")));
        }
    }
    Ok(())
}

/// `(has legacy records, has current records)`.
fn backup_shape(dogs: &[Value], entries: &[Value]) -> (bool, bool) {
    let legacy = dogs.iter().any(Value::is_string)
        || entries
            .iter()
            .any(|e| e.get("dogId").is_none() && e.get("dog").is_some());
    let current = dogs.iter().any(Value::is_object)
        || entries.iter().any(|e| e.get("dogId").is_some());
    (legacy, current)
}

fn clean(s: &str) -> String {
    s.trim().to_string()
}

impl<S: KvStore> Tracker<S> {
    /// Migrate if needed, read the v2 collections and normalize their dates.
    pub fn load(mut store: S) -> Result<(Self, MigrationReport)> {
        let report = migrate_if_needed(&mut store)?;
        let mut skipped = Vec::new();
        let dogs: Vec<Dog> = read_collection(&mut store, DOGS_KEY, RecordKind::Dog, &mut skipped)?;
        let entries: Vec<Entry> =
            read_collection(&mut store, ENTRIES_KEY, RecordKind::Entry, &mut skipped)?;
        let Normalized { entries, truncated } = normalize_entries(entries);

        let mut t = Self {
            store,
            dogs,
            entries,
            skipped,
        };
        if truncated > 0 {
            info!(truncated, "normalized entry dates");
            t.save_entries()?;
        }
        debug!(dogs = t.dogs.len(), entries = t.entries.len(), "loaded records");
        Ok((t, report))
    }

    /// Stored records that could not be decoded during `load`.
    pub fn skipped_on_load(&self) -> &[DroppedRecord] {
        &self.skipped
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    fn save_dogs(&mut self) -> Result<()> {
        self.store.set(DOGS_KEY, &serde_json::to_value(&self.dogs)?)
    }

    fn save_entries(&mut self) -> Result<()> {
        self.store.set(ENTRIES_KEY, &serde_json::to_value(&self.entries)?)
    }

    fn save_all(&mut self) -> Result<()> {
        self.save_dogs()?;
        self.save_entries()
    }

    pub fn dogs(&self) -> &[Dog] {
        &self.dogs
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn dog(&self, id: &str) -> Option<&Dog> {
        self.dogs.iter().find(|d| d.id == id)
    }

    /// Look a dog up by id, falling back to a case-insensitive name match.
    pub fn find_dog(&self, id_or_name: &str) -> Option<&Dog> {
        let wanted = id_or_name.trim();
        self.dog(wanted).or_else(|| {
            let lower = wanted.to_lowercase();
            self.dogs.iter().find(|d| d.name.to_lowercase() == lower)
        })
    }

    pub fn entry(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    fn check_unique(&self, name: &str, owner: &str, except: Option<&str>) -> Result<()> {
        let clash = self
            .dogs
            .iter()
            .filter(|d| Some(d.id.as_str()) != except)
            .any(|d| d.same_identity(name, owner));
        if clash {
            return Err(DwtError::DuplicateDog {
                name: name.to_string(),
                owner: owner.to_string(),
            });
        }
        Ok(())
    }

    pub fn add_dog(&mut self, name: &str, owner: &str, breed: &str) -> Result<Dog> {
        let (name, owner, breed) = (clean(name), clean(owner), clean(breed));
        if name.is_empty() {
            return Err(DwtError::InvalidInput("dog name must not be empty".into()));
        }
        self.check_unique(&name, &owner, None)?;
        let dog = Dog::new(name, owner, breed);
        self.dogs.push(dog.clone());
        self.save_dogs()?;
        info!(id = %dog.id, name = %dog.name, "added dog");
        Ok(dog)
    }

    pub fn update_dog(&mut self, id: &str, patch: DogPatch) -> Result<Dog> {
        let current = self
            .dog(id)
            .cloned()
            .ok_or_else(|| DwtError::UnknownDog(id.to_string()))?;
        let name = patch.name.as_deref().map(clean).unwrap_or(current.name);
        let owner = patch.owner.as_deref().map(clean).unwrap_or(current.owner);
        let breed = patch.breed.as_deref().map(clean).unwrap_or(current.breed);
        if name.is_empty() {
            return Err(DwtError::InvalidInput("dog name must not be empty".into()));
        }
        self.check_unique(&name, &owner, Some(id))?;

        let updated = Dog {
            id: current.id,
            name,
            owner,
            breed,
        };
        if let Some(d) = self.dogs.iter_mut().find(|d| d.id == id) {
            *d = updated.clone();
        }
        self.save_dogs()?;
        Ok(updated)
    }

    /// Remove a dog and every entry referencing it. Returns the number of
    /// entries removed.
    pub fn delete_dog(&mut self, id: &str) -> Result<usize> {
        let before = self.dogs.len();
        self.dogs.retain(|d| d.id != id);
        if self.dogs.len() == before {
            return Err(DwtError::UnknownDog(id.to_string()));
        }
        let entries_before = self.entries.len();
        self.entries.retain(|e| e.dog_id != id);
        let removed = entries_before - self.entries.len();
        self.save_all()?;
        info!(id, removed, "deleted dog");
        Ok(removed)
    }

    pub fn add_entry(&mut self, dog_id: &str, date: &str, weight: f64, notes: &str) -> Result<Entry> {
        if self.dog(dog_id).is_none() {
            return Err(DwtError::UnknownDog(dog_id.to_string()));
        }
        let entry = Entry {
            id: new_id(),
            dog_id: dog_id.to_string(),
            date: parse_date(date)?,
            weight: validate_weight(weight)?,
            notes: clean(notes),
        };
        self.entries.push(entry.clone());
        self.save_entries()?;
        debug!(id = %entry.id, dog_id, date = %entry.date, weight = entry.weight, "added entry");
        Ok(entry)
    }

    pub fn update_entry(&mut self, id: &str, patch: EntryPatch) -> Result<Entry> {
        let mut e = self
            .entry(id)
            .cloned()
            .ok_or_else(|| DwtError::UnknownEntry(id.to_string()))?;
        if let Some(dog_id) = patch.dog_id {
            if self.dog(&dog_id).is_none() {
                return Err(DwtError::UnknownDog(dog_id));
            }
            e.dog_id = dog_id;
        }
        if let Some(date) = patch.date {
            e.date = parse_date(&date)?;
        }
        if let Some(w) = patch.weight {
            e.weight = validate_weight(w)?;
        }
        if let Some(notes) = patch.notes {
            e.notes = clean(&notes);
        }
        if let Some(slot) = self.entries.iter_mut().find(|x| x.id == id) {
            *slot = e.clone();
        }
        self.save_entries()?;
        Ok(e)
    }

    pub fn delete_entry(&mut self, id: &str) -> Result<()> {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        if self.entries.len() == before {
            return Err(DwtError::UnknownEntry(id.to_string()));
        }
        self.save_entries()
    }

    /// Entries of one dog, newest first.
    pub fn entries_for(&self, dog_id: &str) -> Vec<&Entry> {
        let mut v: Vec<&Entry> = self.entries.iter().filter(|e| e.dog_id == dog_id).collect();
        v.sort_by(|a, b| b.date.cmp(&a.date));
        v
    }

    pub fn clear_all(&mut self) -> Result<()> {
        self.dogs.clear();
        self.entries.clear();
        self.save_all()?;
        info!("cleared all records");
        Ok(())
    }

    /// Replace everything with the contents of a backup. Nothing is touched
    /// unless the whole backup is usable.
    pub fn restore(&mut self, backup: &Value) -> Result<RestoreReport> {
        let (dogs, entries) = match (backup.get("dogs"), backup.get("entries")) {
            (Some(Value::Array(d)), Some(Value::Array(e))) => (d, e),
            _ => {
                return Err(DwtError::InvalidBackupFormat(
                    "expected an object with `dogs` and `entries` arrays".into(),
                ));
            }
        };

        let legacy = match backup_shape(dogs, entries) {
            (true, true) => {
                return Err(backup_error(
                    "backup mixes legacy and current records".into(),
                ));
            }
            (legacy, _) => legacy,
        };

        let (dogs, entries, mut dropped) = if legacy {
            let c = convert_legacy(dogs, entries);
            (c.dogs, c.entries, c.dropped)
        } else {
            let dogs: Vec<Dog> = serde_json::from_value(Value::Array(dogs.clone()))
                .map_err(|e| backup_error(format!("dogs: {e}")))?;
            let mut entries: Vec<Entry> = serde_json::from_value(Value::Array(entries.clone()))
                .map_err(|e| backup_error(format!("entries: {e}")))?;
            check_backup(&dogs, &mut entries)?;
            (dogs, entries, Vec::new())
        };

        let ids: HashSet<&str> = dogs.iter().map(|d| d.id.as_str()).collect();
        let mut kept = Vec::with_capacity(entries.len());
        for (index, e) in entries.into_iter().enumerate() {
            if ids.contains(e.dog_id.as_str()) {
                kept.push(e);
            } else {
                dropped.push(DroppedRecord {
                    kind: RecordKind::Entry,
                    index,
                    id: Some(e.id),
                    reason: DropReason::UnknownDog(e.dog_id),
                });
            }
        }
        let Normalized { entries, .. } = normalize_entries(kept);

        for d in &dropped {
            warn!(kind = ?d.kind, index = d.index, reason = %d.reason, "dropped backup record");
        }
        self.dogs = dogs;
        self.entries = entries;
        self.save_all()?;
        info!(dogs = self.dogs.len(), entries = self.entries.len(), legacy, "restored backup");
        Ok(RestoreReport {
            dogs: self.dogs.len(),
            entries: self.entries.len(),
            dropped,
        })
    }

    pub fn snapshot(&self, exported_at: OffsetDateTime) -> Result<Snapshot> {
        Ok(Snapshot {
            dogs: self.dogs.clone(),
            entries: self.entries.clone(),
            exported_at: exported_at.format(&Rfc3339)?,
            version: SNAPSHOT_VERSION,
        })
    }
}
