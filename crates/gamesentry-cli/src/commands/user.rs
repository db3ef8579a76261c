use std::error::Error;
use std::path::Path;

use clap::{Args, Subcommand};
use gamesentry_core::user::parse_hhmm;
use gamesentry_core::{Role, User, UserDirectory, UserId};

use super::{open_database, resolve_user};

#[derive(Subcommand)]
pub enum UserAction {
    /// Add an account
    Add {
        username: String,
        /// parent or kid
        #[arg(long, default_value = "kid")]
        role: Role,
        #[command(flatten)]
        rules: RuleArgs,
    },
    /// List accounts
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show one account as JSON
    Show {
        /// Username or id
        user: String,
    },
    /// Change an account's settings
    Update {
        /// Username or id
        user: String,
        /// New username
        #[arg(long)]
        rename: Option<String>,
        #[command(flatten)]
        rules: RuleArgs,
    },
    /// Delete an account and its session log
    Remove {
        /// Username or id
        user: String,
    },
}

/// Budget and gate settings. Numbers of 0 and empty times clear the setting.
#[derive(Args, Default)]
pub struct RuleArgs {
    /// Block budget in minutes before a rest is imposed
    #[arg(long)]
    max_session: Option<u32>,
    /// Daily budget in minutes
    #[arg(long)]
    max_daily: Option<u32>,
    /// Rest length in minutes after a block is used up
    #[arg(long)]
    rest: Option<u32>,
    /// Whether block budgets impose a rest
    #[arg(long)]
    enforce_rest: Option<bool>,
    /// Start of allowed play hours (HH:MM)
    #[arg(long)]
    allowed_start: Option<String>,
    /// End of allowed play hours (HH:MM), may be earlier than the start
    #[arg(long)]
    allowed_end: Option<String>,
    /// Ask about lunch and teeth during the lunch window
    #[arg(long)]
    lunch_routine: Option<bool>,
    #[arg(long)]
    lunch_start: Option<String>,
    #[arg(long)]
    lunch_end: Option<String>,
}

impl RuleArgs {
    fn apply(self, user: &mut User) -> Result<(), Box<dyn Error>> {
        let minutes = |value: u32| (value > 0).then_some(value);
        if let Some(v) = self.max_session {
            user.rules.max_session_minutes = minutes(v);
        }
        if let Some(v) = self.max_daily {
            user.rules.max_daily_minutes = minutes(v);
        }
        if let Some(v) = self.rest {
            user.rules.rest_minutes = minutes(v);
        }
        if let Some(v) = self.enforce_rest {
            user.rules.enforce_rest = v;
        }
        if let Some(v) = self.lunch_routine {
            user.enforce_lunch_routine = v;
        }
        set_time(&mut user.allowed_start_time, self.allowed_start, "allowed-start")?;
        set_time(&mut user.allowed_end_time, self.allowed_end, "allowed-end")?;
        set_time(&mut user.lunch_start_time, self.lunch_start, "lunch-start")?;
        set_time(&mut user.lunch_end_time, self.lunch_end, "lunch-end")?;
        Ok(())
    }
}

fn set_time(slot: &mut Option<String>, value: Option<String>, flag: &str) -> Result<(), Box<dyn Error>> {
    let Some(value) = value else {
        return Ok(());
    };
    let value = value.trim();
    if value.is_empty() {
        *slot = None;
    } else if parse_hhmm(value).is_some() {
        *slot = Some(value.to_string());
    } else {
        return Err(format!("--{flag} must be HH:MM, got '{value}'").into());
    }
    Ok(())
}

fn describe(user: &User) -> String {
    let limit = |v: Option<u32>| v.map_or_else(|| "-".to_string(), |m| format!("{m}m"));
    let hours = match (&user.allowed_start_time, &user.allowed_end_time) {
        (None, None) => "any time".to_string(),
        (start, end) => format!(
            "{}-{}",
            start.as_deref().unwrap_or("?"),
            end.as_deref().unwrap_or("?")
        ),
    };
    format!(
        "{:<16} {:<7} block {:<6} daily {:<6} rest {:<6} hours {}",
        user.username,
        user.role.as_str(),
        limit(user.rules.max_session_minutes),
        limit(user.rules.max_daily_minutes),
        limit(user.rules.rest_minutes),
        hours,
    )
}

pub fn run(action: UserAction, db: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let db = open_database(db)?;

    match action {
        UserAction::Add {
            username,
            role,
            rules,
        } => {
            let mut user = match role {
                Role::Kid => User::kid(UserId::generate(), username.trim()),
                Role::Parent => User::parent(UserId::generate(), username.trim()),
            };
            rules.apply(&mut user)?;
            db.insert_user(&user)?;
            println!("User added: {} ({})", user.username, user.id);
        }
        UserAction::List { json } => {
            let users = db.list_users()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&users)?);
            } else if users.is_empty() {
                println!("No users yet. Add one with `gamesentry user add <name>`.");
            } else {
                for user in &users {
                    println!("{}", describe(user));
                }
            }
        }
        UserAction::Show { user } => {
            let user = resolve_user(&db, &user)?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        UserAction::Update {
            user,
            rename,
            rules,
        } => {
            let mut user = resolve_user(&db, &user)?;
            if let Some(name) = rename {
                user.username = name.trim().to_string();
            }
            rules.apply(&mut user)?;
            db.update_user(&user)?;
            println!("{}", describe(&user));
        }
        UserAction::Remove { user } => {
            let user = resolve_user(&db, &user)?;
            db.delete_user(&user.id)?;
            println!("User removed: {}", user.username);
        }
    }
    Ok(())
}
