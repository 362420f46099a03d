use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use checklist::{schema, SchemaItem, VisitType};
use hvn_core::{
    autosave_debounce_from_env_value, CoreConfig, FileVisitStore, VisitService, VisitSession,
    VisitStore,
};
use hvn_uuid::VisitId;

#[derive(Parser)]
#[command(name = "hvn")]
#[command(about = "HVN visit documentation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new visit
    CreateVisit {
        /// Visit type (SOC or InitialEval)
        visit_type: String,
    },
    /// Show a visit's checklist and lock state
    Show {
        /// Visit identifier
        visit_id: String,
    },
    /// Set one checklist field
    Set {
        /// Visit identifier
        visit_id: String,
        /// Checklist field key
        key: String,
        /// Field value
        value: String,
    },
    /// Generate the narrative note
    Generate {
        /// Visit identifier
        visit_id: String,
    },
    /// Sign and lock the visit
    Sign {
        /// Visit identifier
        visit_id: String,
    },
}

fn core_config() -> Result<CoreConfig, Box<dyn std::error::Error>> {
    let data_dir: PathBuf = std::env::var("HVN_DATA_DIR")
        .unwrap_or_else(|_| "/visit_data".into())
        .into();
    let debounce = autosave_debounce_from_env_value(std::env::var("HVN_AUTOSAVE_MS").ok())?;
    Ok(CoreConfig::new(data_dir, debounce)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = core_config()?;
    let store = Arc::new(FileVisitStore::new(config.visits_dir()));

    match cli.command {
        Some(Commands::CreateVisit { visit_type }) => {
            let visit_type: VisitType = match visit_type.parse() {
                Ok(parsed) => parsed,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return Ok(());
                }
            };
            match store.create(visit_type) {
                Ok(visit_id) => println!("Created {} visit: {}", visit_type, visit_id),
                Err(e) => eprintln!("Error creating visit: {}", e),
            }
        }
        Some(Commands::Show { visit_id }) => {
            let visit_id = VisitId::parse(&visit_id)?;
            match store.get(&visit_id) {
                Ok(stored) => {
                    println!(
                        "Visit {} ({}), locked: {}",
                        stored.visit_id, stored.visit_type, stored.locked
                    );
                    for item in schema::layout_for(stored.visit_type) {
                        match item {
                            SchemaItem::Header(text) => println!("-- {}", text),
                            SchemaItem::Field(descriptor) => {
                                let value = stored.fields.value(descriptor.key);
                                if !value.is_empty() {
                                    println!("{}: {}", descriptor.label, value);
                                }
                            }
                        }
                    }
                    if let Some(note) = &stored.rendered_note {
                        println!("--- rendered note ---");
                        println!("{}", note);
                    }
                }
                Err(e) => eprintln!("Error reading visit: {}", e),
            }
        }
        Some(Commands::Set {
            visit_id,
            key,
            value,
        }) => {
            let visit_id = VisitId::parse(&visit_id)?;
            let stored = store.get(&visit_id)?;
            let mut session = VisitSession::from_stored(stored);
            match session.apply_edit(&key, &value) {
                Ok(()) => {
                    store.set(&visit_id, &session.snapshot())?;
                    println!("Set {} = {}", key, session.value(&key));
                }
                Err(e) => eprintln!("Error setting field: {}", e),
            }
        }
        Some(Commands::Generate { visit_id }) => {
            let visit_id = VisitId::parse(&visit_id)?;
            let mut service = VisitService::new(store, config.autosave_debounce());
            service.open_visit(&visit_id)?;
            match service.generate() {
                Ok(note) => println!("{}", note),
                Err(e) => eprintln!("Error generating note: {}", e),
            }
        }
        Some(Commands::Sign { visit_id }) => {
            let visit_id = VisitId::parse(&visit_id)?;
            let mut service = VisitService::new(store, config.autosave_debounce());
            service.open_visit(&visit_id)?;
            match service.sign() {
                Ok(note) => {
                    println!("Signed and locked {}", visit_id);
                    println!("{}", note);
                }
                Err(e) => eprintln!("Error signing visit: {}", e),
            }
        }
        None => {
            println!("Use 'hvn --help' for commands");
        }
    }

    Ok(())
}
