use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod binding;
mod commands;
mod host;
mod marker;
mod notify;
mod settings;
mod timer;
mod watch;

use commands::Outcome;
use host::{Clock, Document, SystemClock, TextDocument};
use timer::Action;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser)]
#[command(author, version, about = "🍅 pomark - Inline pomodoro timers for your notes")]
struct Cli {
    /// Settings file (defaults to ./pomark/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a new timer on a line
    Add {
        file: PathBuf,
        /// Line number, starting at 1
        line: usize,
        /// Override the configured pomodoro length
        #[arg(short, long)]
        minutes: Option<u32>,
    },
    /// Pause the running timer on a line
    Pause { file: PathBuf, line: usize },
    /// Resume a paused timer
    Resume { file: PathBuf, line: usize },
    /// Restart a timer, bumping its cycle count
    Restart { file: PathBuf, line: usize },
    /// Perform whichever action the line's state calls for
    Toggle { file: PathBuf, line: usize },
    /// List every timer in a file
    Status { file: PathBuf },
    /// Watch a file's timers live in the terminal
    Watch { file: PathBuf },
    /// Write a default settings file
    Init,
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .unwrap_or_else(|| settings::config_path("config.json"));
    let settings = settings::load(&config_path);
    let duration = settings.duration_seconds();

    match cli.command {
        Command::Add { file, line, minutes } => {
            let duration = minutes.map(|m| m.saturating_mul(60)).unwrap_or(duration);
            edit_line(&file, line, |doc, index, now| {
                commands::add_timer(doc, index, now, duration)
            })
        }
        Command::Pause { file, line } => edit_line(&file, line, |doc, index, now| {
            commands::apply_action(doc, index, Action::Pause, now, duration)
        }),
        Command::Resume { file, line } => edit_line(&file, line, |doc, index, now| {
            commands::apply_action(doc, index, Action::Resume, now, duration)
        }),
        Command::Restart { file, line } => edit_line(&file, line, |doc, index, now| {
            commands::apply_action(doc, index, Action::Restart, now, duration)
        }),
        Command::Toggle { file, line } => edit_line(&file, line, |doc, index, now| {
            commands::apply_contextual(doc, index, now, duration)
        }),
        Command::Status { file } => status(&file, duration),
        Command::Watch { file } => watch::run(&file, &settings),
        Command::Init => {
            settings::save(&config_path, &settings)?;
            println!("wrote {}", config_path.display());
            Ok(())
        }
    }
}

fn edit_line(
    file: &PathBuf,
    line: usize,
    edit: impl FnOnce(&mut TextDocument, usize, i64) -> Outcome,
) -> Result<()> {
    let index = line.checked_sub(1).ok_or("line numbers start at 1")?;
    let mut doc = TextDocument::load(file)?;
    if index >= doc.line_count() {
        return Err(format!("{} has only {} lines", file.display(), doc.line_count()).into());
    }

    match edit(&mut doc, index, SystemClock.now()) {
        Outcome::Applied(token) => {
            doc.save(file)?;
            println!("line {line}: {token}");
        }
        Outcome::AlreadyPresent => println!("line {line} already has a timer"),
        Outcome::NoMarker => println!("no timer on line {line}"),
        Outcome::WrongPhase(offered) => {
            println!("nothing to do on line {line}; it offers \"{}\"", offered.title())
        }
    }
    Ok(())
}

fn status(file: &PathBuf, duration: u32) -> Result<()> {
    let doc = TextDocument::load(file)?;
    let now = SystemClock.now();
    let mut found = false;

    for index in 0..doc.line_count() {
        let Some(text) = doc.line(index) else { continue };
        let Some(parsed) = marker::decode(&text) else { continue };
        found = true;

        let m = &parsed.marker;
        let phase = timer::phase(Some(m), now);
        let remaining = timer::remaining_seconds(m, now, duration);
        println!(
            "line {:>4}  {:<9}  {:02}:{:02} left  cycle {}  {}",
            index + 1,
            phase.as_str(),
            remaining / 60,
            remaining % 60,
            m.repeat_count(),
            marker::strip_marker(&text),
        );
    }

    if !found {
        println!("no timers in {}", file.display());
    }
    Ok(())
}
