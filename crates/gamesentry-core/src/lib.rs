//! # Game Sentry Core Library
//!
//! This library provides the time-budget and gating engine behind Game Sentry,
//! a parental-control tool that tracks children's gaming sessions. The desktop
//! shell and the CLI are thin layers over the same core.
//!
//! ## Architecture
//!
//! - **Session log**: persisted, immutable play intervals per user, plus the
//!   usage arithmetic over them
//! - **Rest tracker**: cooldown windows imposed after a block budget breach
//! - **Gate**: decides whether a session may start right now (routine,
//!   allowed hours, outstanding rest)
//! - **Limit monitor**: watches daily and block budgets and raises
//!   notification events at most once per day per limit kind
//! - **Session controller**: the `Idle -> Running -> Idle` state machine a
//!   caller drives
//!
//! ## Key Components
//!
//! - [`SessionController`]: top-level state machine
//! - [`Database`]: SQLite-backed users and session log
//! - [`Config`]: application configuration management
//! - [`NotificationDispatcher`]: fire-and-forget event delivery

pub mod clock;
pub mod controller;
pub mod error;
pub mod events;
pub mod gate;
pub mod limits;
pub mod notify;
pub mod rest;
pub mod session;
pub mod storage;
pub mod ticker;
pub mod user;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{
    ControllerState, EngineSnapshot, SessionController, SessionHandle, SharedController, StopOutcome,
    UsageStatus,
};
pub use error::{ConfigError, CoreError, DatabaseError, GateDenial, SessionError, ValidationError};
pub use events::{Event, LimitKind};
pub use gate::{GateEvaluator, LunchConfirmations, PromptProvider, RoutineQuestion};
pub use limits::{LimitMonitor, NotificationFlags, UsageSnapshot};
pub use notify::{
    EventBuffer, EventSink, Notification, NotificationDispatcher, NotificationSink, SoundHint,
};
pub use rest::{RestState, RestTracker};
pub use session::{IntervalRecord, LiveSession, SessionInterval, SessionLog, UsageWindow};
pub use storage::{Config, Database, MemoryStore, SessionStore, UserDirectory};
pub use ticker::{spawn_ticker, TickHandle};
pub use user::{BudgetRules, Role, User, UserId};
