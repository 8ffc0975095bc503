pub mod handlers;

use std::path::PathBuf;

use crate::logging::init_logging;
use crate::presentation::cli::{Cli, Commands, DogCommands, EntryCommands, ExportCommands, ZipCommands};
use clap::Parser;
use dwt_core::error::Result;

/// Options resolved from the command line and environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub data_dir: PathBuf,
    pub verbosity: u8,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = Config {
        data_dir: cli.data_dir,
        verbosity: cli.verbose,
    };
    init_logging(cfg.verbosity);

    match cli.command {
        Commands::Dog(cmd) => match cmd {
            DogCommands::Add { name, owner, breed } => handlers::handle_dog_add(&cfg, name, owner, breed),
            DogCommands::List => handlers::handle_dog_list(&cfg),
            DogCommands::Edit {
                dog,
                name,
                owner,
                breed,
            } => handlers::handle_dog_edit(&cfg, dog, name, owner, breed),
            DogCommands::Rm { dog } => handlers::handle_dog_rm(&cfg, dog),
        },
        Commands::Entry(cmd) => match cmd {
            EntryCommands::Add {
                dog,
                weight,
                date,
                notes,
            } => handlers::handle_entry_add(&cfg, dog, weight, date, notes),
            EntryCommands::List { dog } => handlers::handle_entry_list(&cfg, dog),
            EntryCommands::Edit {
                id,
                dog,
                date,
                weight,
                notes,
            } => handlers::handle_entry_edit(&cfg, id, dog, date, weight, notes),
            EntryCommands::Rm { id } => handlers::handle_entry_rm(&cfg, id),
        },
        Commands::Stats { dog } => handlers::handle_stats(&cfg, dog),
        Commands::Export(cmd) => match cmd {
            ExportCommands::Csv { out, dog } => handlers::handle_export_csv(&cfg, out, dog),
            ExportCommands::Json { out } => handlers::handle_export_json(&cfg, out),
            ExportCommands::Zip { out } => handlers::handle_export_zip(&cfg, out),
        },
        Commands::Restore { file } => handlers::handle_restore(&cfg, file),
        Commands::Clear { yes } => handlers::handle_clear(&cfg, yes),
        Commands::Migrate => handlers::handle_migrate(&cfg),
        Commands::Zip(cmd) => match cmd {
            ZipCommands::Pack {
                out,
                files,
                allow_duplicates,
            } => handlers::handle_zip_pack(out, files, allow_duplicates),
            ZipCommands::List { archive } => handlers::handle_zip_list(archive),
            ZipCommands::Verify { archive } => handlers::handle_zip_verify(archive),
        },
    }
}
