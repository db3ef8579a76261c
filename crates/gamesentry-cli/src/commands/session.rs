use std::error::Error;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use clap::Subcommand;
use gamesentry_core::session::{format_hms, format_time_remaining};
use gamesentry_core::{
    spawn_ticker, Config, Database, NotificationDispatcher, SessionController, SessionLog,
    SystemClock, UsageStatus, User,
};
use tracing::warn;

use super::{load_snapshot, open_database, resolve_user, save_snapshot};
use crate::console::{ConsoleSink, StdinPrompts};

const LAST_USER_KEY: &str = "last_user";

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start playing; stops on Ctrl-C
    Play {
        /// Username or id (defaults to the last player)
        user: Option<String>,
    },
    /// Show today's usage and any rest period
    Status {
        user: String,
        #[arg(long)]
        json: bool,
    },
    /// Show the session log, most recent first
    Log {
        user: String,
        /// Only sessions that started on this day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Back-enter a session; a stop before the start ends the next day
    Add {
        user: String,
        /// Start time (HH:MM)
        start: String,
        /// Stop time (HH:MM)
        stop: String,
        /// Day the session started (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
    },
    /// Rewrite one log entry
    Edit {
        user: String,
        /// Entry number as shown by `session log`
        index: usize,
        /// YYYY-MM-DD HH:MM:SS
        #[arg(long)]
        start: String,
        /// YYYY-MM-DD HH:MM:SS
        #[arg(long)]
        stop: String,
        /// HH:MM:SS
        #[arg(long)]
        duration: String,
    },
    /// Delete one log entry
    Delete {
        user: String,
        /// Entry number as shown by `session log`
        index: usize,
    },
    /// Delete every log entry for a user
    Clear {
        user: String,
        /// Required to actually delete
        #[arg(long)]
        yes: bool,
    },
}

fn controller(db: &Arc<Database>, config: &Config) -> SessionController {
    SessionController::new(
        db.clone(),
        db.clone(),
        Arc::new(SystemClock),
        Box::new(StdinPrompts),
    )
    .with_default_rest_minutes(config.limits.default_rest_minutes)
    .with_snapshot(load_snapshot(db))
}

fn print_status(user: &User, status: &UsageStatus) {
    println!("{}", user.username);
    if status.live_elapsed_secs > 0 {
        println!("  playing for     {}", format_hms(status.live_elapsed_secs));
    }
    println!("  played today    {}", format_hms(status.daily_used_secs));
    if let Some(remaining) = status.daily_remaining_secs {
        println!("  left today      {}", format_time_remaining(remaining));
    }
    if let Some(remaining) = status.block_remaining_secs() {
        println!("  left this block {}", format_time_remaining(remaining));
    }
    if status.resting {
        println!("  on a break      {}", format_time_remaining(status.rest_remaining_secs));
    }
}

fn status_line(status: &UsageStatus) -> String {
    let mut line = format!("\r{}", format_hms(status.live_elapsed_secs));
    if let Some(remaining) = status.daily_remaining_secs {
        line.push_str(&format!("  today: {}", format_time_remaining(remaining)));
    }
    if let Some(remaining) = status.block_remaining_secs() {
        line.push_str(&format!("  block: {}", format_time_remaining(remaining)));
    }
    line.push_str("   ");
    line
}

fn print_log(log: &SessionLog, date: Option<NaiveDate>) {
    let rows: Vec<_> = log
        .recent_first()
        .into_iter()
        .filter(|(_, r)| date.is_none() || r.start_time().map(|s| s.date()) == date)
        .collect();
    if rows.is_empty() {
        println!("No sessions.");
        return;
    }
    println!("{:>4}  {:<19}  {:<19}  {}", "#", "start", "stop", "duration");
    for (index, record) in rows {
        println!(
            "{index:>4}  {:<19}  {:<19}  {}",
            record.start, record.stop, record.duration
        );
    }
}

fn play(db: Arc<Database>, user: User, config: &Config) -> Result<(), Box<dyn Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    let _guard = runtime.enter();

    let (dispatcher, drain) = NotificationDispatcher::spawn(Arc::new(ConsoleSink {
        sounds_enabled: config.notifications.sounds_enabled,
    }));
    let mut engine = controller(&db, config);
    if config.notifications.enabled {
        engine = engine.with_event_sink(Arc::new(dispatcher.clone()));
    }
    drop(dispatcher);

    let started = engine.start(&user.id);
    save_snapshot(&db, &engine.snapshot())?;
    let started = started?;
    db.kv_set(LAST_USER_KEY, user.id.as_str())?;
    println!(
        "{} started playing at {}. Press Ctrl-C to stop.",
        user.username,
        started.started_at.format("%H:%M:%S")
    );

    let shared = engine.into_shared();
    let ticker = spawn_ticker(
        shared.clone(),
        user.id.clone(),
        config.tick_interval(),
        |status| {
            print!("{}", status_line(status));
            let _ = std::io::stdout().flush();
        },
    );

    runtime.block_on(tokio::signal::ctrl_c())?;
    ticker.cancel();
    println!();

    let (outcome, snapshot) = {
        let mut engine = shared.lock().unwrap_or_else(|e| e.into_inner());
        let outcome = engine.stop(&user.id)?;
        (outcome, engine.snapshot())
    };
    save_snapshot(&db, &snapshot)?;
    drop(ticker);
    drop(shared);

    println!("{} played for {}.", user.username, outcome.record.duration);
    if let Some(err) = &outcome.persist_error {
        warn!(error = %err, "session was not saved");
        eprintln!("warning: the session could not be saved: {err}");
    }

    // Give queued notifications a moment to print.
    runtime.block_on(async {
        let _ = tokio::time::timeout(Duration::from_secs(2), drain).await;
    });
    Ok(())
}

pub fn run(action: SessionAction, db: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let db = open_database(db)?;
    let config = Config::load_or_default();

    match action {
        SessionAction::Play { user } => {
            let name = match user {
                Some(name) => name,
                None => db
                    .kv_get(LAST_USER_KEY)?
                    .ok_or("no user given and nobody has played yet")?,
            };
            let user = resolve_user(&db, &name)?;
            play(db, user, &config)?;
        }
        SessionAction::Status { user, json } => {
            let user = resolve_user(&db, &user)?;
            let status = controller(&db, &config).status(&user.id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&user, &status);
            }
        }
        SessionAction::Log { user, date, json } => {
            let user = resolve_user(&db, &user)?;
            let log = controller(&db, &config).sessions(&user.id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(log.entries())?);
            } else {
                print_log(&log, date);
            }
        }
        SessionAction::Add {
            user,
            start,
            stop,
            date,
        } => {
            let user = resolve_user(&db, &user)?;
            let record = controller(&db, &config).add_manual_entry(&user.id, date, &start, &stop)?;
            println!("Added {} to {} ({})", record.start, record.stop, record.duration);
        }
        SessionAction::Edit {
            user,
            index,
            start,
            stop,
            duration,
        } => {
            let user = resolve_user(&db, &user)?;
            let record =
                controller(&db, &config).edit_entry(&user.id, index, &start, &stop, &duration)?;
            println!("Updated #{index}: {} to {} ({})", record.start, record.stop, record.duration);
        }
        SessionAction::Delete { user, index } => {
            let user = resolve_user(&db, &user)?;
            let removed = controller(&db, &config).delete_entry(&user.id, index)?;
            println!("Deleted #{index}: {} ({})", removed.start, removed.duration);
        }
        SessionAction::Clear { user, yes } => {
            let user = resolve_user(&db, &user)?;
            if !yes {
                return Err(format!(
                    "this deletes every session for {}; pass --yes to confirm",
                    user.username
                )
                .into());
            }
            let count = controller(&db, &config).clear_entries(&user.id)?;
            println!("Deleted {count} sessions for {}.", user.username);
        }
    }
    Ok(())
}
