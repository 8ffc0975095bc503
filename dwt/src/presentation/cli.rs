use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Dog weight tracker", long_about = None)]
pub struct Cli {
    /// Directory holding the record files
    #[arg(long, global = true, env = "DWT_DATA_DIR", default_value = "dwt-data")]
    pub data_dir: PathBuf,

    /// More output (-v info, -vv debug, -vvv trace); RUST_LOG wins when set
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum DogCommands {
    /// Register a dog
    Add {
        name: String,
        #[arg(long, default_value = "")]
        owner: String,
        #[arg(long, default_value = "")]
        breed: String,
    },
    /// List dogs
    List,
    /// Change a dog's name, owner or breed
    Edit {
        /// dog id or name
        dog: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        breed: Option<String>,
    },
    /// Remove a dog and all of its entries
    Rm { dog: String },
}

#[derive(Subcommand)]
pub enum EntryCommands {
    /// Record a weight (kg); `,` works as decimal separator
    Add {
        /// dog id or name
        dog: String,
        weight: String,
        /// YYYY-MM-DD, defaults to today (UTC)
        #[arg(long)]
        date: Option<String>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// List a dog's entries, newest first
    List { dog: String },
    Edit {
        id: String,
        /// move the entry to another dog (id or name)
        #[arg(long)]
        dog: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        weight: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    Rm { id: String },
}

#[derive(Subcommand)]
pub enum ExportCommands {
    /// CSV of one dog (--dog) or of every dog
    Csv {
        out: PathBuf,
        #[arg(long)]
        dog: Option<String>,
    },
    /// Full JSON backup
    Json { out: PathBuf },
    /// ZIP bundle with JSON collections, CSV and backup
    Zip { out: PathBuf },
}

#[derive(Subcommand)]
pub enum ZipCommands {
    /// Store files into an uncompressed ZIP
    Pack {
        out: PathBuf,
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// keep entries sharing a name instead of failing
        #[arg(long)]
        allow_duplicates: bool,
    },
    /// List archive entries
    List { archive: PathBuf },
    /// Check every entry against its CRC-32
    Verify { archive: PathBuf },
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(subcommand)]
    /// Manage dogs
    Dog(DogCommands),

    #[command(subcommand)]
    /// Manage weight entries
    Entry(EntryCommands),

    /// Weight summary and trend for one dog
    Stats { dog: String },

    #[command(subcommand)]
    /// Write CSV, JSON or ZIP exports
    Export(ExportCommands),

    /// Replace all records with a JSON backup
    Restore { file: PathBuf },

    /// Delete every dog and entry
    Clear {
        #[arg(long)]
        yes: bool,
    },

    /// Run the legacy data migration and print its report
    Migrate,

    #[command(subcommand)]
    /// Raw ZIP tools
    Zip(ZipCommands),
}
