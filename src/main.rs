use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use foro_core::domain::{CreateMessageInput, CreateTopicInput, ImageFile};
use foro_core::forum::PageLoad;
use foro_core::identity::StaticIdentityProvider;
use foro_core::state::AppState;
use foro_core::{telemetry, AppError, Config};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "foro", version, about = "Forum client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check backend health
    Health,
    /// Show authentication and registration status
    Status,
    /// Show where navigating to a path would lead
    Open { path: String },
    /// List topics
    Topics {
        #[arg(long, default_value_t = 0)]
        page: u32,
    },
    /// Show a topic and its messages
    Topic {
        id: i64,
        #[arg(long, default_value_t = 0)]
        page: u32,
    },
    /// Register the signed-in identity as a forum user
    Register {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        picture: Option<String>,
    },
    /// Create a topic
    NewTopic {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Post a message, optionally with an image
    Post {
        #[arg(long)]
        topic: i64,
        #[arg(long)]
        text: String,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Show the current user's profile
    Profile,
    /// Sign out and clear the stored token
    Logout,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_page<T: Serialize>(load: &PageLoad<T>) -> Result<()> {
    if let PageLoad::Blocked { guard } = load {
        info!(?guard, "Page blocked by guard");
    }
    print_json(load)
}

async fn run(
    cli: Cli,
    state: AppState<StaticIdentityProvider>,
) -> std::result::Result<(), AppError> {
    match cli.command {
        Command::Health => print_json(&state.api.health().await?)?,
        Command::Status => print_json(&state.status().await)?,
        Command::Open { path } => {
            let (route, outcome) = state.navigate(&path).await;
            print_json(&serde_json::json!({ "route": route, "guard": outcome }))?;
        }
        Command::Topics { page } => {
            let (session, decision) = state.refresh().await;
            print_page(&state.forum.home(&session, &decision, page).await?)?;
        }
        Command::Topic { id, page } => {
            let (session, decision) = state.refresh().await;
            print_page(&state.forum.topic_detail(&session, &decision, id, page).await?)?;
        }
        Command::Register {
            name,
            email,
            picture,
        } => {
            let (session, _) = state.refresh().await;
            let mut input = state.registration.prefill(&session)?;
            if let Some(name) = name {
                input.name = name;
            }
            if let Some(email) = email {
                input.email = email;
            }
            if picture.is_some() {
                input.picture = picture;
            }
            print_json(&state.registration.register_with(&session, input).await?)?;
        }
        Command::NewTopic { title, description } => {
            let (_, decision) = state.refresh().await;
            let topic = state
                .forum
                .create_topic(&decision, CreateTopicInput::new(title, description))
                .await?;
            print_json(&topic)?;
        }
        Command::Post { topic, text, image } => {
            let (_, decision) = state.refresh().await;
            let file = match image {
                Some(path) => {
                    let bytes = tokio::fs::read(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "image".to_string());
                    Some(ImageFile::from_path_bytes(file_name, bytes))
                }
                None => None,
            };
            let message = state
                .forum
                .post_message(
                    &decision,
                    CreateMessageInput::new(topic, text),
                    file.as_ref(),
                )
                .await?;
            print_json(&message)?;
        }
        Command::Profile => {
            let (session, decision) = state.refresh().await;
            print_page(&state.forum.profile(&session, &decision).await?)?;
        }
        Command::Logout => {
            state.logout().await?;
            print_json(&state.status().await)?;
        }
    }
    Ok(())
}

/// Text printed on stderr when a command fails
fn error_text(e: &AppError) -> String {
    if e.requires_login() {
        format!("{} Run again after signing in.", e.user_message())
    } else {
        e.user_message()
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;
    telemetry::init(&config.telemetry);

    info!(api = %config.api.base_url, "Starting forum client");

    let provider = Arc::new(StaticIdentityProvider::from_config(&config.identity));
    let state = AppState::new(config, provider)?;

    if let Err(e) = run(cli, state).await {
        tracing::debug!(error = %e, "Command failed");
        eprintln!("{}", error_text(&e));
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
