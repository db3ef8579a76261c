mod interval;
mod log;
mod usage;

pub use interval::{
    format_hms, format_time_remaining, parse_hms, parse_timestamp, IntervalRecord,
    SessionInterval, TIMESTAMP_FORMAT,
};
pub use log::SessionLog;
pub use usage::{total_seconds, LiveSession, UsageWindow};
