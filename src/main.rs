//! CLI entry point for the answer engine.
//!
//! Provides commands for building an answer snapshot from a corpus file and
//! asking questions against it.

use anyhow::Context;
use autoguru::answers::{AnswerPolicy, AnswerStore, StoreOptions, load_corpus};
use autoguru::config::CONFIG_DIR;
use autoguru::storage::read_metadata;
use autoguru::{AnswerError, AnswerResult, ExitCode, Settings, SnapshotPaths, create_embedder};
use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use console::style;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Question answering over a recorded corpus
#[derive(Parser)]
#[command(
    name = "autoguru",
    version = env!("CARGO_PKG_VERSION"),
    about = "Answer questions from a corpus of recorded answers",
    long_about = "Embed a question/answer corpus, then answer new questions with the closest recorded one.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = "Examples:\n  autoguru init\n  autoguru ingest faq.json\n  autoguru ask \"How do I reset my API key?\"\n  autoguru ask \"rate limits\" --json"
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize project
    #[command(about = "Set up .autoguru directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Embed a corpus file and save the snapshot
    #[command(
        about = "Add question/answer pairs from a JSON or JSON Lines file",
        after_help = "Records look like {\"question\": \"...\", \"answer\": \"...\"}.\nScraped threads {\"body\": \"...\", \"answers\": [...]} are also accepted."
    )]
    Ingest {
        /// Corpus file
        corpus: PathBuf,

        /// Discard the existing snapshot instead of appending to it
        #[arg(long)]
        fresh: bool,
    },

    /// Answer a question
    #[command(about = "Answer a question from the saved snapshot")]
    Ask {
        /// The question to answer
        question: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Skip the confidence threshold and show the nearest answer as is
        #[arg(long)]
        raw: bool,
    },

    /// Show snapshot information
    #[command(about = "Show what the saved snapshot contains")]
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings from .autoguru/settings.toml")]
    Config,
}

#[derive(Debug, Serialize)]
struct SnapshotInfo {
    data_dir: PathBuf,
    backend: String,
    model: String,
    dimensions: usize,
    entries: usize,
    created: String,
    updated: String,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    if let Commands::Init { force } = &cli.command {
        return match Settings::init_config_file(*force) {
            Ok(path) => {
                println!("Edit {} to customize your settings.", path.display());
                ExitCode::Success.into()
            }
            Err(e) => {
                eprintln!("Error: {e}");
                ExitCode::ConfigError.into()
            }
        };
    }

    if cli.config.is_none() {
        if let Err(warning) = Settings::check_init() {
            eprintln!("Warning: {warning}");
            eprintln!("Using default configuration for now.");
        }
    }

    let settings = match load_settings(cli.config.as_ref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {e:#}");
            return ExitCode::ConfigError.into();
        }
    };
    autoguru::logging::init_logging(cli.debug || settings.debug);

    let result = match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),
        Commands::Config => show_config(&settings),
        Commands::Ingest { corpus, fresh } => ingest(&settings, &corpus, fresh),
        Commands::Ask {
            question,
            json,
            raw,
        } => ask(&settings, &question, json, raw),
        Commands::Info { json } => info(&settings, json),
    };

    match result {
        Ok(code) => code.into(),
        Err(error) => report(&error).into(),
    }
}

fn load_settings(path: Option<&PathBuf>) -> anyhow::Result<Settings> {
    match path {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("loading settings from {}", path.display())),
        None => Settings::load().with_context(|| format!("loading {CONFIG_DIR}/settings.toml")),
    }
}

fn snapshot_paths(settings: &Settings) -> SnapshotPaths {
    SnapshotPaths::from_config(settings.resolved_data_dir(), &settings.storage)
}

fn store_options(settings: &Settings) -> StoreOptions {
    StoreOptions {
        leaf_size: settings.answers.leaf_size,
        ..StoreOptions::default()
    }
}

fn open_store(settings: &Settings) -> AnswerResult<AnswerStore> {
    let paths = snapshot_paths(settings);
    if !paths.exists() {
        return Err(AnswerError::NotReady);
    }
    let embedder = create_embedder(&settings.embedding, Some(paths.model_path()))?;
    AnswerStore::load_with(&paths, embedder, store_options(settings))
}

fn ingest(settings: &Settings, corpus: &std::path::Path, fresh: bool) -> AnswerResult<ExitCode> {
    let start = Instant::now();
    let paths = snapshot_paths(settings);
    let entries = load_corpus(corpus)?;

    let embedder = create_embedder(&settings.embedding, Some(paths.model_path()))?;
    let store = if paths.exists() && !fresh {
        AnswerStore::load_with(&paths, embedder, store_options(settings))?
    } else {
        let size = embedder.dimension().get();
        AnswerStore::construct_with(store_options(settings), embedder, Some(size), None, None)?
    };

    let added = store.add_answers(entries)?;
    store.save(&paths)?;

    println!(
        "{} {added} answers ({} total) in {:.2}s",
        style("Ingested").green().bold(),
        store.len(),
        start.elapsed().as_secs_f64()
    );
    println!("Snapshot: {}", paths.dir.display());
    Ok(ExitCode::Success)
}

fn ask(settings: &Settings, question: &str, json: bool, raw: bool) -> AnswerResult<ExitCode> {
    let store = open_store(settings)?;
    let policy = AnswerPolicy::from_config(&settings.answers);

    let nearest = store.get_answer(question)?;
    let confident = policy.accepts(&nearest);
    let answer = if raw { nearest } else { policy.apply(nearest) };

    if json {
        match serde_json::to_string_pretty(&answer) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("Error serializing answer: {e}"),
        }
    } else {
        println!("{}", answer.content);
        let confidence = format!("confidence {:.3}", answer.confidence);
        if confident {
            eprintln!("{}", style(confidence).dim());
        } else {
            eprintln!("{}", style(confidence).yellow());
        }
    }

    Ok(if confident || raw {
        ExitCode::Success
    } else {
        ExitCode::LowConfidence
    })
}

fn info(settings: &Settings, json: bool) -> AnswerResult<ExitCode> {
    let paths = snapshot_paths(settings);
    if !paths.exists() {
        return Err(AnswerError::NotReady);
    }
    let metadata = read_metadata(&paths)?;

    let info = SnapshotInfo {
        data_dir: paths.dir.clone(),
        backend: metadata.embedder.backend.to_string(),
        model: metadata.embedder.model.clone(),
        dimensions: metadata.embedder.dimension.get(),
        entries: metadata.entry_count,
        created: metadata.created_at.to_rfc3339(),
        updated: metadata.updated_at.to_rfc3339(),
    };

    if json {
        match serde_json::to_string_pretty(&info) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("Error serializing info: {e}"),
        }
    } else {
        println!("{}", style("Answer snapshot").cyan().bold());
        println!("  Location:   {}", info.data_dir.display());
        println!("  Entries:    {}", info.entries);
        println!("  Embedder:   {} ({})", info.model, info.backend);
        println!("  Dimensions: {}", info.dimensions);
        println!("  Created:    {}", info.created);
        println!("  Updated:    {}", info.updated);
    }
    Ok(ExitCode::Success)
}

fn show_config(settings: &Settings) -> AnswerResult<ExitCode> {
    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    match toml::to_string_pretty(settings) {
        Ok(toml_str) => println!("{toml_str}"),
        Err(e) => eprintln!("Error displaying config: {e}"),
    }
    Ok(ExitCode::Success)
}

fn report(error: &AnswerError) -> ExitCode {
    eprintln!("{} {error}", style("Error:").red().bold());
    for suggestion in error.recovery_suggestions() {
        eprintln!("  {} {suggestion}", style("hint:").cyan());
    }
    ExitCode::from_error(error)
}
