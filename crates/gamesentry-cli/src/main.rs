use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod console;

#[derive(Parser)]
#[command(name = "gamesentry", version, about = "Game Sentry CLI")]
struct Cli {
    /// Database file (overrides the config file and the default location)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parent and kid accounts
    User {
        #[command(subcommand)]
        action: commands::user::UserAction,
    },
    /// Play sessions and the session log
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,gamesentry_core=info,gamesentry_cli=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let db = cli.db.as_deref();
    let result = match cli.command {
        Commands::User { action } => commands::user::run(action, db),
        Commands::Session { action } => commands::session::run(action, db),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_db_flag_parses_after_subcommand() {
        let cli = Cli::try_parse_from(["gamesentry", "session", "status", "sam", "--db", "/tmp/x.db"])
            .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        assert!(matches!(cli.command, Commands::Session { .. }));
    }

    #[test]
    fn session_add_requires_a_date() {
        assert!(Cli::try_parse_from(["gamesentry", "session", "add", "sam", "09:00", "10:00"]).is_err());
        assert!(Cli::try_parse_from([
            "gamesentry", "session", "add", "sam", "09:00", "10:00", "--date", "2024-05-01"
        ])
        .is_ok());
    }
}
