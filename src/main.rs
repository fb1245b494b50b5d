mod ai;
mod config;
mod error;
mod learn;
mod models;
mod modes;
mod progress;
mod sample;
mod store;
mod tui;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ai::{parse_generated_items, UnconfiguredService};
use config::Config;
use models::{
    JsonOutput, NewStudyItem, NewStudySet, SourceType, StudyMode, StudySet, StudySetPatch,
};
use store::StudyStore;

const ITEM_SEPARATOR: &str = "::";

#[derive(Parser)]
#[command(name = "studydeck")]
#[command(about = "A terminal flashcard trainer with study sets, learn mode and progress tracking")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which storage backend is active
    Status,

    /// Manage study sets
    #[command(subcommand)]
    Set(SetCommands),

    /// Create a ready-made sample study set
    Sample,

    /// Show practice progress for a study set
    Progress {
        /// Study set ID
        id: String,

        /// Only this mode: flashcards/quiz/match/learn/write
        #[arg(long, short)]
        mode: Option<String>,
    },

    /// Start a study session in the terminal UI
    Study {
        /// Study set ID
        id: String,

        /// Study mode: flashcards/quiz/match/learn/write
        mode: String,
    },

    /// Launch interactive terminal UI
    Tui,
}

#[derive(Subcommand)]
enum SetCommands {
    /// List all study sets
    List,

    /// Show a study set with its items
    Show {
        /// Study set ID
        id: String,
    },

    /// Create a study set
    Create {
        /// Study set title
        title: String,

        /// Study set description
        #[arg(long, short)]
        description: Option<String>,

        /// Item as "term::definition" (repeatable)
        #[arg(long = "item", short = 'i')]
        items: Vec<String>,

        /// Where the material came from
        #[arg(long)]
        source_name: Option<String>,
    },

    /// Update title or description
    Update {
        /// Study set ID
        id: String,

        #[arg(long, short)]
        title: Option<String>,

        #[arg(long, short)]
        description: Option<String>,
    },

    /// Delete a study set and its progress
    Delete {
        /// Study set ID
        id: String,
    },

    /// Import generated flashcards from a JSON file
    Import {
        /// Path to a JSON array of {term, definition, options?, correctAnswer?}
        path: PathBuf,

        /// Study set title (defaults to the file name)
        #[arg(long, short)]
        title: Option<String>,

        /// Provenance: pdf/manual/ai-generated
        #[arg(long, short, default_value = "ai-generated")]
        source: String,
    },

    /// Append an item to a study set
    AddItem {
        /// Study set ID
        id: String,
        term: String,
        definition: String,
    },

    /// Remove an item from a study set
    RemoveItem {
        /// Study set ID
        id: String,

        /// Item ID
        item_id: String,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli, Config::from_env()) {
        if json {
            let invalid = e
                .downcast_ref::<error::Error>()
                .is_some_and(error::Error::is_validation);
            let summary = if invalid { "Invalid input" } else { "Command failed" };
            let output = JsonOutput::<()>::err(summary).with_details(e.to_string());
            println!("{}", serde_json::to_string(&output).unwrap_or_default());
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = store::open_store(&config)?;

    match cli.command {
        Commands::Status => {
            let backend = store.backend();
            let location = match backend {
                store::Backend::Sqlite => config.database_path().unwrap_or_default(),
                store::Backend::Local => config.data_dir.display().to_string(),
            };
            let sets = store.get_all_study_sets()?.len();
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "backend": backend,
                        "location": location,
                        "study_sets": sets
                    })))?
                );
            } else {
                println!("Backend: {}", backend.as_str());
                println!("Location: {}", location);
                println!("Study sets: {}", sets);
            }
        }

        Commands::Set(set_cmd) => run_set_command(set_cmd, store.as_mut(), cli.json)?,

        Commands::Sample => {
            let set = store.create_study_set(sample::sample_study_set())?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&set))?);
            } else {
                println!(
                    "Created sample set '{}' with {} items (ID: {})",
                    set.title,
                    set.items.len(),
                    set.id
                );
            }
        }

        Commands::Progress { id, mode } => {
            let mode = mode.as_deref().map(parse_mode).transpose()?;
            if store.get_study_set(&id)?.is_none() {
                print_not_found(cli.json)?;
                return Ok(());
            }

            let records = match mode {
                Some(m) => store.get_user_progress(&id, m)?.into_iter().collect(),
                None => store.list_user_progress(&id)?,
            };

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&records))?);
            } else if records.is_empty() {
                println!("No progress recorded yet.");
            } else {
                println!(
                    "{:<12} {:>8} {:>8} {:>10} {:>9} {:>9}",
                    "MODE", "STUDIED", "CORRECT", "INCORRECT", "SESSIONS", "ACCURACY"
                );
                println!("{}", "-".repeat(61));
                for p in records {
                    println!(
                        "{:<12} {:>8} {:>8} {:>10} {:>9} {:>8.0}%",
                        p.mode.label(),
                        p.items_studied,
                        p.correct_answers,
                        p.incorrect_answers,
                        p.completed_sessions,
                        p.accuracy()
                    );
                }
            }
        }

        Commands::Study { id, mode } => {
            let mode = parse_mode(&mode)?;
            if store.get_study_set(&id)?.is_none() {
                print_not_found(cli.json)?;
                return Ok(());
            }
            tui::run(store, Box::new(UnconfiguredService), Some((id, mode)))?;
        }

        Commands::Tui => {
            tui::run(store, Box::new(UnconfiguredService), None)?;
        }
    }

    Ok(())
}

fn run_set_command(
    cmd: SetCommands,
    store: &mut dyn StudyStore,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        SetCommands::List => {
            let sets = store.get_all_study_sets()?;
            if json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&sets))?);
            } else if sets.is_empty() {
                println!("No study sets found. Try `studydeck sample`.");
            } else {
                println!("{:<38} {:<32} {:>5}  SOURCE", "ID", "TITLE", "ITEMS");
                println!("{}", "-".repeat(88));
                for set in sets {
                    println!(
                        "{:<38} {:<32} {:>5}  {}",
                        set.id,
                        truncate(&set.title, 30),
                        set.items.len(),
                        set.source_type.as_str()
                    );
                }
            }
        }

        SetCommands::Show { id } => match store.get_study_set(&id)? {
            Some(set) => {
                if json {
                    let progress = store.list_user_progress(&id)?;
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                            "studySet": set,
                            "progress": progress
                        })))?
                    );
                } else {
                    print_set(&set);
                }
            }
            None => print_not_found(json)?,
        },

        SetCommands::Create {
            title,
            description,
            items,
            source_name,
        } => {
            let items = items
                .iter()
                .map(|raw| parse_item(raw))
                .collect::<Result<Vec<_>, _>>()?;
            let set = store.create_study_set(NewStudySet {
                title,
                description: description.unwrap_or_default(),
                items,
                source_type: SourceType::Manual,
                source_name,
            })?;
            print_saved(&set, "Created", json)?;
        }

        SetCommands::Update {
            id,
            title,
            description,
        } => {
            let patch = StudySetPatch {
                title,
                description,
                ..Default::default()
            };
            match store.update_study_set(&id, patch)? {
                Some(set) => print_saved(&set, "Updated", json)?,
                None => print_not_found(json)?,
            }
        }

        SetCommands::Delete { id } => {
            if store.delete_study_set(&id)? {
                if json {
                    println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
                } else {
                    println!("Study set {} deleted.", id);
                }
            } else {
                print_not_found(json)?;
            }
        }

        SetCommands::Import {
            path,
            title,
            source,
        } => {
            let source_type = SourceType::from_str(&source).ok_or_else(|| {
                format!(
                    "Invalid source '{}'. Use: pdf, manual, or ai-generated",
                    source
                )
            })?;
            let raw = std::fs::read_to_string(&path)?;
            let items = parse_generated_items(&raw)?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned());
            let title = title
                .or_else(|| {
                    path.file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                })
                .unwrap_or_else(|| "Imported set".to_string());

            let set = store.create_study_set(NewStudySet {
                title,
                description: String::new(),
                items,
                source_type,
                source_name: file_name,
            })?;
            print_saved(&set, "Imported", json)?;
        }

        SetCommands::AddItem {
            id,
            term,
            definition,
        } => {
            let Some(set) = store.get_study_set(&id)? else {
                return print_not_found(json);
            };
            let mut items: Vec<NewStudyItem> = set.items.into_iter().map(Into::into).collect();
            items.push(NewStudyItem::new(term, definition));
            let patch = StudySetPatch {
                items: Some(items),
                ..Default::default()
            };
            match store.update_study_set(&id, patch)? {
                Some(set) => print_saved(&set, "Updated", json)?,
                None => print_not_found(json)?,
            }
        }

        SetCommands::RemoveItem { id, item_id } => {
            let Some(set) = store.get_study_set(&id)? else {
                return print_not_found(json);
            };
            if !set.items.iter().any(|i| i.id == item_id) {
                return Err(format!("Item {} is not part of study set {}", item_id, id).into());
            }
            let items: Vec<NewStudyItem> = set
                .items
                .into_iter()
                .filter(|i| i.id != item_id)
                .map(Into::into)
                .collect();
            let patch = StudySetPatch {
                items: Some(items),
                ..Default::default()
            };
            match store.update_study_set(&id, patch)? {
                Some(set) => print_saved(&set, "Updated", json)?,
                None => print_not_found(json)?,
            }
        }
    }

    Ok(())
}

fn print_set(set: &StudySet) {
    println!("Study set: {}", set.title);
    println!("ID: {}", set.id);
    if !set.description.is_empty() {
        println!("Description: {}", set.description);
    }
    match &set.source_name {
        Some(name) => println!("Source: {} ({})", set.source_type.as_str(), name),
        None => println!("Source: {}", set.source_type.as_str()),
    }
    println!("Updated: {}", format_timestamp(set.updated_at));
    println!();
    println!("{:<38} {:<28} DEFINITION", "ITEM ID", "TERM");
    println!("{}", "-".repeat(90));
    for item in &set.items {
        println!(
            "{:<38} {:<28} {}",
            item.id,
            truncate(&item.term, 26),
            truncate(&item.definition, 40)
        );
    }
}

fn print_saved(set: &StudySet, verb: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(&JsonOutput::ok(set))?);
    } else {
        println!(
            "{} study set '{}' with {} items (ID: {})",
            verb,
            set.title,
            set.items.len(),
            set.id
        );
    }
    Ok(())
}

fn print_not_found(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!(
            "{}",
            serde_json::to_string(&JsonOutput::<()>::err("Study set not found"))?
        );
    } else {
        println!("Study set not found.");
    }
    Ok(())
}

fn parse_mode(raw: &str) -> Result<StudyMode, String> {
    StudyMode::from_str(raw).ok_or_else(|| {
        format!(
            "Invalid mode '{}'. Use: flashcards, quiz, match, learn, or write",
            raw
        )
    })
}

fn parse_item(raw: &str) -> Result<NewStudyItem, String> {
    match raw.split_once(ITEM_SEPARATOR) {
        Some((term, definition)) if !term.trim().is_empty() && !definition.trim().is_empty() => {
            Ok(NewStudyItem::new(term.trim(), definition.trim()))
        }
        _ => Err(format!(
            "Invalid item '{}'. Use \"term{}definition\"",
            raw, ITEM_SEPARATOR
        )),
    }
}

fn format_timestamp(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    mod truncate_tests {
        use super::*;

        #[test]
        fn truncate_short_string() {
            assert_eq!(truncate("hello", 10), "hello");
        }

        #[test]
        fn truncate_exact_length() {
            assert_eq!(truncate("hello", 5), "hello");
        }

        #[test]
        fn truncate_long_string() {
            assert_eq!(truncate("hello world", 8), "hello...");
        }

        #[test]
        fn truncate_multibyte() {
            assert_eq!(truncate("señoritas", 6), "señ...");
        }
    }

    mod item_parsing_tests {
        use super::*;

        #[test]
        fn parse_item_splits_on_separator() {
            let item = parse_item(" perro :: dog ").unwrap();
            assert_eq!(item.term, "perro");
            assert_eq!(item.definition, "dog");
        }

        #[test]
        fn parse_item_keeps_later_separators_in_definition() {
            let item = parse_item("C++::a language with :: scopes").unwrap();
            assert_eq!(item.term, "C++");
            assert_eq!(item.definition, "a language with :: scopes");
        }

        #[test]
        fn parse_item_rejects_missing_parts() {
            assert!(parse_item("perro").is_err());
            assert!(parse_item("::dog").is_err());
            assert!(parse_item("perro::  ").is_err());
        }

        #[test]
        fn parse_mode_accepts_known_modes() {
            assert_eq!(parse_mode("quiz"), Ok(StudyMode::Quiz));
            assert!(parse_mode("speedrun").is_err());
        }

        #[test]
        fn format_timestamp_renders_utc() {
            assert_eq!(format_timestamp(0), "1970-01-01 00:00");
        }
    }

    mod cli_parsing_tests {
        use super::*;

        #[test]
        fn parse_status_command() {
            let cli = Cli::try_parse_from(["studydeck", "status"]).unwrap();
            assert!(!cli.json);
            assert!(matches!(cli.command, Commands::Status));
        }

        #[test]
        fn parse_set_list_with_json() {
            let cli = Cli::try_parse_from(["studydeck", "--json", "set", "list"]).unwrap();
            assert!(cli.json);
            assert!(matches!(cli.command, Commands::Set(SetCommands::List)));
        }

        #[test]
        fn parse_set_create_with_items() {
            let cli = Cli::try_parse_from([
                "studydeck",
                "set",
                "create",
                "Spanish",
                "-d",
                "Animals",
                "-i",
                "perro::dog",
                "--item",
                "gato::cat",
            ])
            .unwrap();
            match cli.command {
                Commands::Set(SetCommands::Create {
                    title,
                    description,
                    items,
                    source_name,
                }) => {
                    assert_eq!(title, "Spanish");
                    assert_eq!(description, Some("Animals".to_string()));
                    assert_eq!(items, vec!["perro::dog", "gato::cat"]);
                    assert!(source_name.is_none());
                }
                _ => panic!("Expected Set Create command"),
            }
        }

        #[test]
        fn parse_set_import_defaults_source() {
            let cli = Cli::try_parse_from(["studydeck", "set", "import", "cards.json"]).unwrap();
            match cli.command {
                Commands::Set(SetCommands::Import {
                    path,
                    title,
                    source,
                }) => {
                    assert_eq!(path, PathBuf::from("cards.json"));
                    assert!(title.is_none());
                    assert_eq!(source, "ai-generated");
                }
                _ => panic!("Expected Set Import command"),
            }
        }

        #[test]
        fn parse_progress_with_mode() {
            let cli =
                Cli::try_parse_from(["studydeck", "progress", "abc", "--mode", "learn"]).unwrap();
            match cli.command {
                Commands::Progress { id, mode } => {
                    assert_eq!(id, "abc");
                    assert_eq!(mode, Some("learn".to_string()));
                }
                _ => panic!("Expected Progress command"),
            }
        }

        #[test]
        fn parse_study_command() {
            let cli = Cli::try_parse_from(["studydeck", "study", "abc", "quiz"]).unwrap();
            match cli.command {
                Commands::Study { id, mode } => {
                    assert_eq!(id, "abc");
                    assert_eq!(mode, "quiz");
                }
                _ => panic!("Expected Study command"),
            }
        }

        #[test]
        fn parse_missing_required_arg_fails() {
            assert!(Cli::try_parse_from(["studydeck", "set", "create"]).is_err());
            assert!(Cli::try_parse_from(["studydeck", "study", "abc"]).is_err());
            assert!(Cli::try_parse_from(["studydeck", "set", "add-item", "abc", "term"]).is_err());
        }

        #[test]
        fn parse_invalid_command_fails() {
            assert!(Cli::try_parse_from(["studydeck", "invalid"]).is_err());
        }
    }

    mod command_tests {
        use super::*;
        use crate::store::{LocalStore, MemoryKeyValueStore};

        fn store() -> LocalStore {
            LocalStore::new(Box::new(MemoryKeyValueStore::default()))
        }

        fn create(store: &mut LocalStore) -> StudySet {
            run_set_command(
                SetCommands::Create {
                    title: "Spanish".into(),
                    description: None,
                    items: vec!["perro::dog".into()],
                    source_name: None,
                },
                store,
                true,
            )
            .unwrap();
            store.get_all_study_sets().unwrap().remove(0)
        }

        #[test]
        fn create_with_bad_item_fails() {
            let mut store = store();
            let result = run_set_command(
                SetCommands::Create {
                    title: "Spanish".into(),
                    description: None,
                    items: vec!["perro".into()],
                    source_name: None,
                },
                &mut store,
                true,
            );
            assert!(result.is_err());
        }

        #[test]
        fn add_and_remove_items() {
            let mut store = store();
            let set = create(&mut store);

            run_set_command(
                SetCommands::AddItem {
                    id: set.id.clone(),
                    term: "gato".into(),
                    definition: "cat".into(),
                },
                &mut store,
                true,
            )
            .unwrap();
            let updated = store.get_study_set(&set.id).unwrap().unwrap();
            let terms: Vec<_> = updated.items.iter().map(|i| i.term.as_str()).collect();
            assert_eq!(terms, vec!["perro", "gato"]);

            run_set_command(
                SetCommands::RemoveItem {
                    id: set.id.clone(),
                    item_id: set.items[0].id.clone(),
                },
                &mut store,
                true,
            )
            .unwrap();
            let remaining = store.get_study_set(&set.id).unwrap().unwrap();
            assert_eq!(remaining.items.len(), 1);
            assert_eq!(remaining.items[0].term, "gato");
            assert_eq!(remaining.items[0].id, updated.items[1].id);
        }

        #[test]
        fn removing_last_item_is_rejected() {
            let mut store = store();
            let set = create(&mut store);
            let result = run_set_command(
                SetCommands::RemoveItem {
                    id: set.id.clone(),
                    item_id: set.items[0].id.clone(),
                },
                &mut store,
                true,
            );
            assert!(result.is_err());
            assert_eq!(store.get_study_set(&set.id).unwrap().unwrap().items.len(), 1);
        }

        #[test]
        fn import_reads_generated_json() {
            let dir = tempfile::TempDir::new().unwrap();
            let path = dir.path().join("chapter-3.json");
            std::fs::write(
                &path,
                r#"[{"term": "Osmosis", "definition": "Diffusion of water across a membrane"}]"#,
            )
            .unwrap();

            let mut store = store();
            run_set_command(
                SetCommands::Import {
                    path,
                    title: None,
                    source: "pdf".into(),
                },
                &mut store,
                true,
            )
            .unwrap();

            let set = store.get_all_study_sets().unwrap().remove(0);
            assert_eq!(set.title, "chapter-3");
            assert_eq!(set.source_type, SourceType::Pdf);
            assert_eq!(set.source_name.as_deref(), Some("chapter-3.json"));
        }

        #[test]
        fn missing_set_is_not_an_error() {
            let mut store = store();
            assert!(run_set_command(SetCommands::Show { id: "nope".into() }, &mut store, true).is_ok());
            assert!(run_set_command(SetCommands::Delete { id: "nope".into() }, &mut store, true).is_ok());
        }
    }
}
