use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::fs;

use scriptvision::api::OpenAiGenerator;
use scriptvision::config::Config;
use scriptvision::generation::{ScriptedGenerator, TextGenerator};
use scriptvision::init;
use scriptvision::normalize::sanitize_utf8_lossy;
use scriptvision::store::ProjectStore;
use scriptvision::workspace::{ImportOutcome, ShotListOutcome, SuggestionOutcome};
use scriptvision::{
    ScriptVisionError, Workspace, extract_shots_with_report, extract_subjects_with_report,
};

/// Shot lists and subject catalogs from screenplay text
#[derive(Parser, Debug)]
#[command(name = "scriptvision")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config.json
    #[arg(long, global = true, default_value = "config.json")]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import shots from a JSON array or free text into a project
    Import {
        project: String,
        file: PathBuf,
    },

    /// Run the extractor over a saved reply and show what it recovered
    Extract {
        file: PathBuf,

        /// Extract subjects instead of shots
        #[arg(long)]
        subjects: bool,
    },

    /// Ask for extra shots and add the chosen ones to a project
    Suggest {
        project: String,

        /// Screenplay text
        #[arg(long)]
        script: PathBuf,

        /// Use a saved reply instead of calling the provider
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Indices of suggestions to accept
        #[arg(long, value_delimiter = ',')]
        accept: Vec<usize>,

        /// Accept every suggestion
        #[arg(long)]
        all: bool,
    },

    /// Replace a project's shot list with a freshly generated one
    Generate {
        project: String,

        #[arg(long)]
        script: PathBuf,

        #[arg(long)]
        replay: Option<PathBuf>,
    },

    /// Extract people, places and props and add them to a project
    Subjects {
        project: String,

        #[arg(long)]
        script: PathBuf,

        #[arg(long)]
        replay: Option<PathBuf>,
    },

    /// Print a project's shots and subjects
    List { project: String },

    /// List stored projects
    Projects,
}

async fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(sanitize_utf8_lossy(&bytes))
}

fn generation_context(err: ScriptVisionError) -> anyhow::Error {
    if err.is_generation_failure() {
        anyhow::Error::new(err).context("Generation failed; project unchanged")
    } else {
        err.into()
    }
}

async fn make_generator(cfg: &Config, replay: Option<&Path>) -> Result<Box<dyn TextGenerator>> {
    if let Some(path) = replay {
        let reply = read_text(path).await?;
        return Ok(Box::new(ScriptedGenerator::replying(reply)));
    }
    cfg.require_openai_key()?;
    Ok(Box::new(OpenAiGenerator::new(cfg)?))
}

async fn open_workspace(store: &ProjectStore, cfg: &Config, name: &str) -> Result<Workspace> {
    let workspace = match store.load_project(name).await? {
        Some(snapshot) => Workspace::from_snapshot(snapshot),
        None => Workspace::new(name),
    };
    Ok(workspace.with_max_suggestions(cfg.max_suggestions))
}

async fn save_workspace(store: &ProjectStore, workspace: &Workspace) -> Result<()> {
    let path = store.save_project(&workspace.snapshot()).await?;
    println!("Saved {}", path.display());
    Ok(())
}

fn print_workspace(workspace: &Workspace) {
    println!("Project: {}", workspace.meta().name);
    println!("\nShots:");
    for shot in workspace.shots().iter() {
        println!(
            "  [{}] {}: {} ({})",
            shot.id,
            shot.label(),
            shot.draft.description,
            shot.draft.shot_size
        );
    }
    println!("\nSubjects:");
    for subject in workspace.subjects().iter() {
        let mark = if subject.draft.active { ' ' } else { 'x' };
        println!(
            "  [{}]{} {} ({}): {}",
            subject.id, mark, subject.draft.name, subject.draft.category, subject.draft.description
        );
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cfg = Config::load_or_default(&cli.config).await?;
    let store = init::ensure_storage(&cfg).await?;

    match cli.command {
        Commands::Import { project, file } => {
            let text = read_text(&file).await?;
            let mut workspace = open_workspace(&store, &cfg, &project).await?;
            match workspace.import_shots(&text) {
                ImportOutcome::Imported(n) => {
                    println!("Imported {} shots", n);
                    save_workspace(&store, &workspace).await?;
                }
                ImportOutcome::NothingParsed => println!("Nothing to import"),
            }
        }

        Commands::Extract { file, subjects } => {
            let text = read_text(&file).await?;
            let (strategy, count, skipped) = if subjects {
                let extraction = extract_subjects_with_report(&text);
                for subject in &extraction.records {
                    println!("{} ({}): {}", subject.name, subject.category, subject.description);
                }
                (extraction.strategy, extraction.records.len(), extraction.skipped)
            } else {
                let extraction = extract_shots_with_report(&text);
                for shot in &extraction.records {
                    println!(
                        "Scene {}, Shot {}: {} [{}]",
                        shot.draft.scene, shot.draft.shot, shot.draft.description, shot.reason
                    );
                }
                (extraction.strategy, extraction.records.len(), extraction.skipped)
            };

            match strategy {
                Some(strategy) => println!("\n{} records via {}", count, strategy),
                None => println!("No records recovered"),
            }
            for reason in skipped {
                println!("  skipped: {}", reason);
            }
        }

        Commands::Suggest {
            project,
            script,
            replay,
            accept,
            all,
        } => {
            let script = read_text(&script).await?;
            let generator = make_generator(&cfg, replay.as_deref()).await?;
            let mut workspace = open_workspace(&store, &cfg, &project).await?;

            let outcome = workspace
                .suggest_shots(generator.as_ref(), &script)
                .await
                .map_err(generation_context)?;
            if outcome == SuggestionOutcome::NoSuggestions {
                println!("No suggestions");
                return Ok(());
            }

            for (i, suggestion) in workspace.suggested_shots().items().iter().enumerate() {
                println!(
                    "{:>3}. Scene {}, Shot {}: {}\n     {}",
                    i, suggestion.draft.scene, suggestion.draft.shot, suggestion.draft.description, suggestion.reason
                );
            }

            let batch = workspace.suggested_shots_mut();
            if !all && accept.is_empty() {
                batch.discard();
                println!("Nothing accepted; pass --accept or --all");
                return Ok(());
            }
            if all {
                batch.toggle_all(true);
            }
            for index in accept {
                if !batch.set_selected(index, true) {
                    anyhow::bail!("No suggestion at index {}", index);
                }
            }

            let added = workspace.commit_suggested_shots();
            if added > 0 {
                println!("Added {} shots", added);
                save_workspace(&store, &workspace).await?;
            }
        }

        Commands::Generate {
            project,
            script,
            replay,
        } => {
            let script = read_text(&script).await?;
            let generator = make_generator(&cfg, replay.as_deref()).await?;
            let mut workspace = open_workspace(&store, &cfg, &project).await?;

            let outcome = workspace
                .generate_shot_list(generator.as_ref(), &script)
                .await
                .map_err(generation_context)?;
            match outcome {
                ShotListOutcome::Replaced { count, strategy } => {
                    match strategy {
                        Some(strategy) => println!("Generated {} shots via {}", count, strategy),
                        None => println!("Generated {} shots", count),
                    }
                    save_workspace(&store, &workspace).await?;
                }
                ShotListOutcome::NothingParsed => println!("No shots recovered; list unchanged"),
            }
        }

        Commands::Subjects {
            project,
            script,
            replay,
        } => {
            let script = read_text(&script).await?;
            let generator = make_generator(&cfg, replay.as_deref()).await?;
            let mut workspace = open_workspace(&store, &cfg, &project).await?;

            let outcome = workspace
                .extract_subjects(generator.as_ref(), &script)
                .await
                .map_err(generation_context)?;
            if outcome == SuggestionOutcome::NoSuggestions {
                println!("No subjects found");
                return Ok(());
            }

            let report = workspace.merge_proposed_subjects();
            println!("Added {} subjects", report.added);
            for reason in &report.skipped {
                println!("  skipped: {}", reason);
            }
            if report.added > 0 {
                save_workspace(&store, &workspace).await?;
            }
        }

        Commands::List { project } => {
            let snapshot = store
                .load_project(&project)
                .await?
                .with_context(|| format!("No project named {}", project))?;
            print_workspace(&Workspace::from_snapshot(snapshot));
        }

        Commands::Projects => {
            for name in store.list_blobs().await? {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }

    run(cli).await
}
