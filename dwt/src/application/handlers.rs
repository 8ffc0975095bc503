use std::fs;
use std::path::{Path, PathBuf};

use dwt_core::domain::{Entry, parse_weight};
use dwt_core::error::{DwtError, Result};
use dwt_core::export::{
    ALL_CSV_FILENAME, BACKUP_FILENAME, BUNDLE_FILENAME, csv_all, csv_for_dog, dog_csv_filename,
    export_zip, snapshot_json,
};
use dwt_core::migrate::{MigrationOutcome, MigrationReport, RecordKind};
use dwt_core::pack::writer::{ArchiveOptions, DuplicateNames, NamedPayload, write_archive};
use dwt_core::read::zip::{list_archive, read_archive_file};
use dwt_core::stats::WeightStats;
use dwt_core::store::KvStore;
use dwt_core::store_factory::{Backend, open_store};
use dwt_core::tracker::{DogPatch, EntryPatch, Tracker, UNREADABLE_SUFFIX};
use dwt_core::util::atomic::write_atomic;
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::info;

use super::Config;

type AppTracker = Tracker<Box<dyn KvStore>>;

fn open_tracker(cfg: &Config) -> Result<(AppTracker, MigrationReport)> {
    let store = open_store(Backend::Fs, &cfg.data_dir)?;
    Tracker::load(store)
}

fn tracker(cfg: &Config) -> Result<AppTracker> {
    let (t, report) = open_tracker(cfg)?;
    if report.outcome == MigrationOutcome::Migrated {
        eprintln!(
            "migrate: converted {} dogs, {} entries from the old format",
            report.dogs, report.entries
        );
    }
    for d in t.skipped_on_load() {
        eprintln!(
            "load: skipped stored {} #{}: {} (raw value kept under *{UNREADABLE_SUFFIX})",
            kind_label(d.kind),
            d.index,
            d.reason
        );
    }
    Ok(t)
}

fn resolve_dog(t: &AppTracker, key: &str) -> Result<String> {
    t.find_dog(key)
        .map(|d| d.id.clone())
        .ok_or_else(|| DwtError::UnknownDog(key.to_string()))
}

fn today() -> Result<String> {
    let fmt = format_description!("[year]-[month]-[day]");
    Ok(OffsetDateTime::now_utc().date().format(fmt)?)
}

/// A directory target gets the default file name appended.
fn output_path(out: PathBuf, default_name: &str) -> PathBuf {
    if out.is_dir() { out.join(default_name) } else { out }
}

fn print_entry(e: &Entry) {
    println!("{}  {}  {:>7.2} kg  {}", e.id, e.date, e.weight, e.notes);
}

pub fn handle_dog_add(cfg: &Config, name: String, owner: String, breed: String) -> Result<()> {
    let mut t = tracker(cfg)?;
    let dog = t.add_dog(&name, &owner, &breed)?;
    println!("{}", dog.id);
    Ok(())
}

pub fn handle_dog_list(cfg: &Config) -> Result<()> {
    let t = tracker(cfg)?;
    for d in t.dogs() {
        let count = t.entries_for(&d.id).len();
        println!(
            "{}  {:<16} owner={:<12} breed={:<12} entries={}",
            d.id, d.name, d.owner, d.breed, count
        );
    }
    Ok(())
}

pub fn handle_dog_edit(
    cfg: &Config,
    dog: String,
    name: Option<String>,
    owner: Option<String>,
    breed: Option<String>,
) -> Result<()> {
    let mut t = tracker(cfg)?;
    let id = resolve_dog(&t, &dog)?;
    let updated = t.update_dog(&id, DogPatch { name, owner, breed })?;
    eprintln!("dog: updated {} ({})", updated.name, updated.id);
    Ok(())
}

pub fn handle_dog_rm(cfg: &Config, dog: String) -> Result<()> {
    let mut t = tracker(cfg)?;
    let id = resolve_dog(&t, &dog)?;
    let removed = t.delete_dog(&id)?;
    eprintln!("dog: removed {id} and {removed} entries");
    Ok(())
}

pub fn handle_entry_add(
    cfg: &Config,
    dog: String,
    weight: String,
    date: Option<String>,
    notes: String,
) -> Result<()> {
    let mut t = tracker(cfg)?;
    let dog_id = resolve_dog(&t, &dog)?;
    let weight = parse_weight(&weight)?;
    let date = match date {
        Some(d) => d,
        None => today()?,
    };
    let entry = t.add_entry(&dog_id, &date, weight, &notes)?;
    println!("{}", entry.id);
    Ok(())
}

pub fn handle_entry_list(cfg: &Config, dog: String) -> Result<()> {
    let t = tracker(cfg)?;
    let dog_id = resolve_dog(&t, &dog)?;
    for e in t.entries_for(&dog_id) {
        print_entry(e);
    }
    Ok(())
}

pub fn handle_entry_edit(
    cfg: &Config,
    id: String,
    dog: Option<String>,
    date: Option<String>,
    weight: Option<String>,
    notes: Option<String>,
) -> Result<()> {
    let mut t = tracker(cfg)?;
    let dog_id = dog.map(|d| resolve_dog(&t, &d)).transpose()?;
    let weight = weight.map(|w| parse_weight(&w)).transpose()?;
    let patch = EntryPatch {
        dog_id,
        date,
        weight,
        notes,
    };
    let e = t.update_entry(&id, patch)?;
    print_entry(&e);
    Ok(())
}

pub fn handle_entry_rm(cfg: &Config, id: String) -> Result<()> {
    let mut t = tracker(cfg)?;
    t.delete_entry(&id)?;
    eprintln!("entry: removed {id}");
    Ok(())
}

pub fn handle_stats(cfg: &Config, dog: String) -> Result<()> {
    let t = tracker(cfg)?;
    let dog_id = resolve_dog(&t, &dog)?;
    let entries: Vec<Entry> = t.entries_for(&dog_id).into_iter().cloned().collect();
    let Some(s) = WeightStats::from_entries(&entries) else {
        println!("no entries");
        return Ok(());
    };
    println!("entries: {}", s.count);
    println!("first:   {} {:.2} kg", s.first.date, s.first.weight);
    println!("latest:  {} {:.2} kg", s.latest.date, s.latest.weight);
    println!("min/max: {:.2} / {:.2} kg", s.min, s.max);
    println!("change:  {:+.2} kg", s.change);
    match s.trend_per_day {
        Some(slope) => println!("trend:   {:+.3} kg/day ({:+.2} kg/week)", slope, slope * 7.0),
        None => println!("trend:   n/a"),
    }
    Ok(())
}

pub fn handle_export_csv(cfg: &Config, out: PathBuf, dog: Option<String>) -> Result<()> {
    let t = tracker(cfg)?;
    let (csv, default_name) = match dog {
        Some(key) => {
            let id = resolve_dog(&t, &key)?;
            let name = t.dog(&id).map(|d| d.name.clone()).unwrap_or(key);
            (csv_for_dog(t.dogs(), t.entries(), &id)?, dog_csv_filename(&name))
        }
        None => (csv_all(t.dogs(), t.entries()), ALL_CSV_FILENAME.to_string()),
    };
    let path = output_path(out, &default_name);
    write_atomic(&path, csv.as_bytes())?;
    info!(path = %path.display(), "exported csv");
    eprintln!("export: wrote {}", path.display());
    Ok(())
}

pub fn handle_export_json(cfg: &Config, out: PathBuf) -> Result<()> {
    let t = tracker(cfg)?;
    let snapshot = t.snapshot(OffsetDateTime::now_utc())?;
    let path = output_path(out, BACKUP_FILENAME);
    write_atomic(&path, snapshot_json(&snapshot)?.as_bytes())?;
    info!(path = %path.display(), "exported backup");
    eprintln!("export: wrote {}", path.display());
    Ok(())
}

pub fn handle_export_zip(cfg: &Config, out: PathBuf) -> Result<()> {
    let t = tracker(cfg)?;
    let snapshot = t.snapshot(OffsetDateTime::now_utc())?;
    let path = output_path(out, BUNDLE_FILENAME);
    let bytes = export_zip(&path, &snapshot)?;
    eprintln!("export: wrote {} ({bytes} bytes)", path.display());
    Ok(())
}

pub fn handle_restore(cfg: &Config, file: PathBuf) -> Result<()> {
    let text = fs::read_to_string(&file)?;
    let backup: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| DwtError::InvalidBackupFormat(format!("{}: {e}", file.display())))?;
    let mut t = tracker(cfg)?;
    let report = t.restore(&backup)?;
    for d in &report.dropped {
        eprintln!("restore: skipped {} #{}: {}", kind_label(d.kind), d.index, d.reason);
    }
    eprintln!("restore: {} dogs, {} entries", report.dogs, report.entries);
    Ok(())
}

pub fn handle_clear(cfg: &Config, yes: bool) -> Result<()> {
    if !yes {
        return Err(DwtError::InvalidInput(
            "clear deletes every dog and entry; pass --yes to confirm".into(),
        ));
    }
    let mut t = tracker(cfg)?;
    t.clear_all()?;
    eprintln!("clear: done");
    Ok(())
}

fn kind_label(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Dog => "dog",
        RecordKind::Entry => "entry",
    }
}

pub fn handle_migrate(cfg: &Config) -> Result<()> {
    let (_, report) = open_tracker(cfg)?;
    let outcome = match report.outcome {
        MigrationOutcome::AlreadyCurrent => "already current",
        MigrationOutcome::Fresh => "nothing to migrate",
        MigrationOutcome::Migrated => "migrated",
    };
    println!(
        "migrate: {outcome} (dogs={}, entries={}, dropped={})",
        report.dogs,
        report.entries,
        report.dropped.len()
    );
    for d in &report.dropped {
        let id = d.id.as_deref().unwrap_or("-");
        println!("  {} #{} id={id}: {}", kind_label(d.kind), d.index, d.reason);
    }
    Ok(())
}

fn entry_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| DwtError::InvalidInput(format!("no usable file name in {}", path.display())))
}

pub fn handle_zip_pack(out: PathBuf, files: Vec<PathBuf>, allow_duplicates: bool) -> Result<()> {
    let mut payloads = Vec::with_capacity(files.len());
    for f in &files {
        payloads.push(NamedPayload::new(entry_name(f)?, fs::read(f)?));
    }
    let opts = ArchiveOptions {
        duplicates: if allow_duplicates {
            DuplicateNames::Allow
        } else {
            DuplicateNames::Reject
        },
    };
    let bytes = write_archive(&out, &payloads, &opts)?;
    eprintln!("pack: {} entries, {bytes} bytes -> {}", payloads.len(), out.display());
    Ok(())
}

pub fn handle_zip_list(archive: PathBuf) -> Result<()> {
    let bytes = fs::read(&archive)?;
    for e in list_archive(&bytes)? {
        println!("{:>10}  {:08x}  {}", e.size, e.crc32, e.name);
    }
    Ok(())
}

pub fn handle_zip_verify(archive: PathBuf) -> Result<()> {
    let entries = read_archive_file(&archive)?;
    eprintln!("verify: OK ({} entries)", entries.len());
    Ok(())
}
