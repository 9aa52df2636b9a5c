pub mod audio;
pub mod collaborators;
pub mod error;
pub mod narration;
pub mod script;
pub mod sequence;
pub mod session;
pub mod settings;
pub mod timeline;
pub mod utils;

#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};

use sequence::pools::AffirmationTheme;
use session::{Exercise, SessionController, SessionMode, SessionStatus, SessionView};
use settings::SettingsStore;

pub use error::{SessionError, SessionResult};

pub const SETTINGS_PATH_ENV: &str = "GUIDED_SESSIONS_SETTINGS";

#[derive(Debug, Clone, Parser)]
#[command(name = "guided-sessions")]
#[command(about = "Run a guided breathing, body-scan or affirmation session in the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub exercise: CliExercise,
    /// Render narration with the TTS service and follow the audio.
    #[arg(long, default_value_t = false)]
    pub narrated: bool,
    #[arg(long)]
    pub settings: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliExercise {
    BodyScan,
    BoxBreathing,
    Release,
    Affirmations { theme: String },
}

impl CliExercise {
    fn into_exercise(self) -> anyhow::Result<Exercise> {
        Ok(match self {
            CliExercise::BodyScan => Exercise::BodyScan,
            CliExercise::BoxBreathing => Exercise::BoxBreathing,
            CliExercise::Release => Exercise::ReleasingMemories,
            CliExercise::Affirmations { theme } => Exercise::Affirmations {
                theme: AffirmationTheme::parse(&theme)
                    .ok_or_else(|| anyhow!("unknown affirmation theme: {}", theme))?,
            },
        })
    }
}

fn settings_path(cli: &Cli) -> PathBuf {
    if let Some(path) = &cli.settings {
        return path.clone();
    }
    if let Some(path) = std::env::var_os(SETTINGS_PATH_ENV) {
        return PathBuf::from(path);
    }
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home)
            .join(".config")
            .join("guided-sessions")
            .join("settings.json"),
        None => PathBuf::from("guided-sessions.json"),
    }
}

pub fn run() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let store = Arc::new(SettingsStore::new(settings_path(&cli))?);
    log::info!("settings loaded from {}", store.path().display());

    let mode = if cli.narrated {
        SessionMode::Narrated
    } else {
        SessionMode::SelfPaced
    };
    let exercise = cli.exercise.into_exercise()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build async runtime")?;
    runtime.block_on(run_session(store, exercise, mode))
}

async fn run_session(
    store: Arc<SettingsStore>,
    exercise: Exercise,
    mode: SessionMode,
) -> anyhow::Result<()> {
    let controller = SessionController::builder(store.snapshot())
        .settings_store(store)
        .build();
    let mut views = controller.subscribe();

    let starter = controller.clone();
    let mut start = tokio::spawn(async move { starter.start(exercise, mode).await });
    let mut started = false;
    let mut last_text = String::new();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("interrupted, resetting session");
                controller.reset().await?;
                break;
            }
            result = &mut start, if !started => {
                started = true;
                result.context("start task failed")??;
            }
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                print_view(&view, &mut last_text);
                if view.status == SessionStatus::Completed {
                    controller.reset().await?;
                    break;
                }
            }
        }
    }
    Ok(())
}

fn print_view(view: &SessionView, last_text: &mut String) {
    if view.current_text != *last_text {
        println!(
            "[{:>3.0}%] {:>5}  {}",
            view.progress_percent, view.elapsed_formatted, view.current_text
        );
        *last_text = view.current_text.clone();
    }
    if view.status == SessionStatus::Completed {
        println!("Session complete.");
    }
}
