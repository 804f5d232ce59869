//! Command handlers for CLI operations
//!
//! - chat: interactive study session
//! - ask: one turn, then exit
//! - memory: list / add / delete / clear stored facts
//! - key: store or locate the API key
//! - config: show the active configuration

use anyhow::{Context, Result};
use sdk::errors::{EngineError, SwarmErrorExt};
use serde_json::json;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::agents::GeneratedImage;
use crate::cli::{ConfigAction, KeyAction, MemoryAction, SessionArgs};
use crate::conductor::{Conductor, TurnKind, TurnOutcome};
use crate::config::Config;
use crate::llm::gemini::GeminiProvider;
use crate::memory::{self, MemoryStore};
use crate::secrets::{KeySource, SecretManager, GEMINI_KEY};

/// Keychain service name
pub const KEYCHAIN_SERVICE: &str = "swarm";

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Wire up model, store and conductor for a session
async fn build_conductor(config: &Config, session: &SessionArgs) -> Result<Conductor> {
    let mut config = config.clone();
    if let Some(policy) = session.policy {
        config.router.policy = policy;
    }

    let secrets = SecretManager::new(KEYCHAIN_SERVICE);
    let (api_key, source) = secrets.resolve_api_key(&config.llm.api_key_env)?;
    tracing::debug!("API key source: {:?}", source);

    let model = GeminiProvider::new(config.llm.clone(), api_key)
        .context("Failed to create Gemini client")?;

    let store = memory::open_store(&config.memory)
        .await
        .context("Failed to open memory store")?;

    let mut conductor = Conductor::new(&config, Arc::new(model), store);
    conductor.set_document(session.pdf.clone());
    conductor.set_video(session.video.clone());
    conductor.set_judge(session.judge || config.judge.enabled);

    Ok(conductor)
}

/// Answer a single question
pub async fn handle_ask(
    query: String,
    session: SessionArgs,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    for path in [&session.pdf, &session.video].into_iter().flatten() {
        if !path.exists() {
            anyhow::bail!("File not found: {}", path.display());
        }
    }

    let mut conductor = build_conductor(config, &session).await?;
    let outcome = conductor.handle_turn(&query).await;
    let images = save_images(&config.images_dir(), &outcome.response.images).await?;

    print_outcome(&query, &outcome, &images, format)
}

/// Run the interactive study loop
pub async fn handle_chat(session: SessionArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let mut session = session;

    if format == OutputFormat::Text {
        println!("Study Swarm");
        println!("I can search the web, read PDFs, watch videos and run code.");
        println!();
    }

    if session.pdf.is_none() {
        session.pdf = ask_for_path("PDF path (Enter to skip): ")?;
    }
    if session.video.is_none() {
        session.video = ask_for_path("Video path (Enter to skip): ")?;
    }

    session.pdf = existing(session.pdf, "PDF", format);
    session.video = existing(session.video, "Video", format);

    let mut conductor = build_conductor(config, &session).await?;

    if format == OutputFormat::Text {
        println!(
            "Routing: {}. Judge: {}.",
            conductor.router_name(),
            if conductor.judge_enabled() { "on" } else { "off" }
        );
        println!("Type 'quit' to exit. Commands: /facts, /forget <fact>, /clear");
    }

    loop {
        let Some(input) = prompt("\nYou: ")? else {
            break;
        };

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            if format == OutputFormat::Text {
                println!("Goodbye.");
            }
            break;
        }

        if let Some(command) = input.strip_prefix('/') {
            run_session_command(&mut conductor, command.trim(), format).await?;
            continue;
        }

        let outcome = conductor.handle_turn(&input).await;
        let images = save_images_or_report(&config.images_dir(), &outcome, format).await?;
        print_outcome(&input, &outcome, &images, format)?;
    }

    Ok(())
}

async fn run_session_command(
    conductor: &mut Conductor,
    command: &str,
    format: OutputFormat,
) -> Result<()> {
    let (name, argument) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };

    match name {
        "facts" => print_facts(&conductor.facts().await, format)?,
        "forget" if !argument.is_empty() => match conductor.forget(argument).await {
            Ok(removed) => print_status(
                format,
                if removed { "Forgotten." } else { "No such fact." },
                json!({ "action": "forget", "fact": argument, "removed": removed }),
            )?,
            Err(e) => {
                tracing::error!("Failed to forget fact: {}", e);
                report_error(format, &anyhow::Error::new(e).context("Could not forget that fact"))?;
            }
        },
        "clear" => {
            conductor.clear_history();
            print_status(
                format,
                "Chat history cleared.",
                json!({ "action": "clear_history" }),
            )?;
        }
        _ => report_error(
            format,
            &anyhow::anyhow!("Unknown command. Try /facts, /forget <fact> or /clear."),
        )?,
    }

    Ok(())
}

/// Save a turn's images; a failed write is reported and the session goes on
async fn save_images_or_report(
    dir: &Path,
    outcome: &TurnOutcome,
    format: OutputFormat,
) -> Result<Vec<PathBuf>> {
    match save_images(dir, &outcome.response.images).await {
        Ok(paths) => Ok(paths),
        Err(e) => {
            tracing::error!("Failed to save images: {:#}", e);
            report_error(format, &e)?;
            Ok(Vec::new())
        }
    }
}

/// Print an error that does not end the session
fn report_error(format: OutputFormat, error: &anyhow::Error) -> Result<()> {
    match format {
        OutputFormat::Text => {
            eprintln!("Error: {:#}", error);
            if let Some(hint) = user_hint(error) {
                eprintln!("Hint: {}", hint);
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "error": format!("{:#}", error),
                "hint": user_hint(error),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

/// Hint for the first engine error in `error`'s chain
pub fn user_hint(error: &anyhow::Error) -> Option<&str> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<EngineError>())
        .map(|e| e.user_hint())
}

fn print_outcome(
    query: &str,
    outcome: &TurnOutcome,
    images: &[PathBuf],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if outcome.rewritten.changed {
                println!("(understood as: {})", outcome.rewritten.query);
            }
            match &outcome.kind {
                TurnKind::Remembered { .. } => println!("[memory updated]"),
                TurnKind::Answered { decision } => {
                    let note = if decision.is_fallback() {
                        " (fallback)"
                    } else {
                        ""
                    };
                    println!("-> {}{}", decision.route, note);
                }
            }
            println!();
            println!("{}", outcome.response.text);

            for path in images {
                println!("Image saved: {}", path.display());
            }

            if let Some(verdict) = &outcome.verdict {
                println!();
                match verdict.score {
                    Some(score) => println!("Judge: {}/5 - {}", score, verdict.reason),
                    None => println!("Judge: n/a - {}", verdict.reason),
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "query": query,
                "rewritten": outcome.rewritten,
                "turn": outcome.kind,
                "response": outcome.response.text,
                "failure": outcome.response.failure,
                "images": images,
                "verdict": outcome.verdict,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Write generated images to `dir`, one file per image
pub async fn save_images(dir: &Path, images: &[GeneratedImage]) -> Result<Vec<PathBuf>> {
    if images.is_empty() {
        return Ok(Vec::new());
    }

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut paths = Vec::with_capacity(images.len());
    for image in images {
        let path = dir.join(format!("{}.{}", uuid::Uuid::new_v4(), image.extension()));
        tokio::fs::write(&path, &image.data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!("Saved image to {}", path.display());
        paths.push(path);
    }

    Ok(paths)
}

/// Manage stored facts
pub async fn handle_memory(action: MemoryAction, config: &Config, format: OutputFormat) -> Result<()> {
    let store = memory::open_store(&config.memory)
        .await
        .context("Failed to open memory store")?;

    run_memory_action(store.as_ref(), action, format).await
}

async fn run_memory_action(
    store: &dyn MemoryStore,
    action: MemoryAction,
    format: OutputFormat,
) -> Result<()> {
    match action {
        MemoryAction::List => print_facts(&store.load().await.facts, format),
        MemoryAction::Add { fact } => {
            let fact = fact.trim().to_string();
            if fact.is_empty() {
                anyhow::bail!("Fact cannot be empty");
            }
            let added = store.update(&fact).await?;
            print_status(
                format,
                if added { "Stored." } else { "Already stored." },
                json!({ "action": "add", "fact": fact, "changed": added }),
            )
        }
        MemoryAction::Delete { fact } => {
            let removed = store.delete(&fact).await?;
            print_status(
                format,
                if removed { "Deleted." } else { "No such fact." },
                json!({ "action": "delete", "fact": fact, "changed": removed }),
            )
        }
        MemoryAction::Clear => {
            store.clear().await?;
            print_status(format, "All facts deleted.", json!({ "action": "clear" }))
        }
    }
}

fn print_facts(facts: &[String], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if facts.is_empty() {
                println!("Nothing yet. Tell me about yourself!");
            } else {
                for fact in facts {
                    println!("- {}", fact);
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "facts": facts }))?);
        }
    }
    Ok(())
}

fn print_status(format: OutputFormat, text: &str, value: serde_json::Value) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", text),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&value)?),
    }
    Ok(())
}

/// Store or locate the API key
pub async fn handle_key(action: KeyAction, config: &Config, format: OutputFormat) -> Result<()> {
    let secrets = SecretManager::new(KEYCHAIN_SERVICE);

    match action {
        KeyAction::Set => {
            let key = prompt("Gemini API key: ")?.unwrap_or_default();
            secrets.set_secret(GEMINI_KEY, &key)?;
            print_status(
                format,
                "API key stored in the OS keychain.",
                json!({ "stored": true }),
            )
        }
        KeyAction::Status => {
            let source = match secrets.resolve_api_key(&config.llm.api_key_env) {
                Ok((_, KeySource::Environment)) => Some("environment"),
                Ok((_, KeySource::Keychain)) => Some("keychain"),
                Err(_) => None,
            };

            match format {
                OutputFormat::Text => match source {
                    Some("environment") => {
                        println!("API key found in ${}", config.llm.api_key_env)
                    }
                    Some(_) => println!("API key found in the OS keychain"),
                    None => println!(
                        "No API key. Set ${} or run 'swarm key set'.",
                        config.llm.api_key_env
                    ),
                },
                OutputFormat::Json => {
                    let output = json!({
                        "found": source.is_some(),
                        "source": source,
                        "env_var": config.llm.api_key_env,
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
            }
            Ok(())
        }
    }
}

/// Show the active configuration
pub fn handle_config(
    action: ConfigAction,
    config: &Config,
    config_path: &Path,
    format: OutputFormat,
) -> Result<()> {
    match action {
        ConfigAction::Show => match format {
            OutputFormat::Text => {
                let text =
                    toml::to_string_pretty(config).context("Failed to serialize config")?;
                println!("{}", text);
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        },
        ConfigAction::Path => match format {
            OutputFormat::Text => println!("{}", config_path.display()),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({ "path": config_path }))?
                )
            }
        },
    }
    Ok(())
}

/// Print `label` to stderr, read one trimmed line; `None` at end of input
fn prompt(label: &str) -> Result<Option<String>> {
    eprint!("{}", label);
    io::stderr().flush()?;

    let mut line = String::new();
    let read = io::stdin().read_line(&mut line)?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn ask_for_path(label: &str) -> Result<Option<PathBuf>> {
    Ok(prompt(label)?
        .filter(|s| !s.is_empty())
        .map(PathBuf::from))
}

fn existing(path: Option<PathBuf>, kind: &str, format: OutputFormat) -> Option<PathBuf> {
    let path = path?;
    let found = path.exists();

    if found {
        tracing::info!("Loaded {}: {}", kind, path.display());
    } else {
        tracing::warn!("{} not found: {}", kind, path.display());
    }

    if format == OutputFormat::Text {
        if found {
            println!("Loaded {}: {}", kind, path.display());
        } else {
            eprintln!("{} not found, ignoring: {}", kind, path.display());
        }
    }

    found.then_some(path)
}
