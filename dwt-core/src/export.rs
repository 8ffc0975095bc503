use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use crate::domain::{Dog, Entry, Snapshot};
use crate::error::{DwtError, Result};
use crate::pack::writer::{ArchiveOptions, NamedPayload, write_archive};

pub const CSV_HEADER: &str = "dog,owner,breed,date,weight_kg,notes";
pub const ALL_CSV_FILENAME: &str = "all-dog-weights.csv";
pub const BACKUP_FILENAME: &str = "dog-weight-backup.json";
pub const DOGS_JSON: &str = "dogs.json";
pub const ENTRIES_JSON: &str = "entries.json";
pub const BUNDLE_FILENAME: &str = "dog-weights.zip";

fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        quoted(s)
    } else {
        s.to_string()
    }
}

fn row(dog: &Dog, e: &Entry) -> String {
    format!(
        "{},{},{},{},{:.2},{}",
        field(&dog.name),
        field(&dog.owner),
        field(&dog.breed),
        field(&e.date),
        e.weight,
        quoted(&e.notes)
    )
}

fn render<'a>(rows: impl Iterator<Item = (&'a Dog, &'a Entry)>) -> String {
    let mut lines = vec![CSV_HEADER.to_string()];
    lines.extend(rows.map(|(d, e)| row(d, e)));
    lines.join("\n")
}

/// CSV of one dog's entries, oldest first.
pub fn csv_for_dog(dogs: &[Dog], entries: &[Entry], dog_id: &str) -> Result<String> {
    let dog = dogs
        .iter()
        .find(|d| d.id == dog_id)
        .ok_or_else(|| DwtError::UnknownDog(dog_id.to_string()))?;
    let mut mine: Vec<&Entry> = entries.iter().filter(|e| e.dog_id == dog_id).collect();
    mine.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(render(mine.into_iter().map(|e| (dog, e))))
}

/// CSV of every entry, ordered by dog name then date. Entries whose dog is
/// missing are left out.
pub fn csv_all(dogs: &[Dog], entries: &[Entry]) -> String {
    let by_id: HashMap<&str, &Dog> = dogs.iter().map(|d| (d.id.as_str(), d)).collect();
    let mut rows: Vec<(&Dog, &Entry)> = entries
        .iter()
        .filter_map(|e| by_id.get(e.dog_id.as_str()).map(|d| (*d, e)))
        .collect();
    rows.sort_by(|(da, ea), (db, eb)| {
        da.name
            .to_lowercase()
            .cmp(&db.name.to_lowercase())
            .then_with(|| ea.date.cmp(&eb.date))
    });
    render(rows.into_iter())
}

pub fn dog_csv_filename(name: &str) -> String {
    let safe: String = name
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{safe}-weights.csv")
}

pub fn snapshot_json(snapshot: &Snapshot) -> Result<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

/// Files making up the export bundle.
pub fn bundle_payloads(snapshot: &Snapshot) -> Result<Vec<NamedPayload>> {
    Ok(vec![
        NamedPayload::new(DOGS_JSON, serde_json::to_string_pretty(&snapshot.dogs)?),
        NamedPayload::new(ENTRIES_JSON, serde_json::to_string_pretty(&snapshot.entries)?),
        NamedPayload::new(ALL_CSV_FILENAME, csv_all(&snapshot.dogs, &snapshot.entries)),
        NamedPayload::new(BACKUP_FILENAME, snapshot_json(snapshot)?),
    ])
}

pub fn export_zip(out: &Path, snapshot: &Snapshot) -> Result<u64> {
    let payloads = bundle_payloads(snapshot)?;
    let written = write_archive(out, &payloads, &ArchiveOptions::default())?;
    info!(path = %out.display(), dogs = snapshot.dogs.len(), entries = snapshot.entries.len(), "exported bundle");
    Ok(written)
}
