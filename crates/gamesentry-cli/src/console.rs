//! Terminal implementations of the engine's UI capabilities.

use std::io::{self, BufRead, Write};

use gamesentry_core::{Notification, NotificationSink, PromptProvider, RoutineQuestion, User};
use tracing::debug;

/// Prints notifications to the terminal.
pub struct ConsoleSink {
    pub sounds_enabled: bool,
}

impl NotificationSink for ConsoleSink {
    fn notify(&self, notification: &Notification) {
        // Start on a fresh line; the ticker may be mid-line.
        println!("\n*** {} ***\n{}", notification.title, notification.body);
        if let (true, Some(sound)) = (self.sounds_enabled, notification.sound) {
            debug!(sound = sound.file_name(), "sound cue");
            print!("\x07");
            let _ = io::stdout().flush();
        }
    }
}

/// Asks routine questions on stdin. Anything but y/yes counts as no.
pub struct StdinPrompts;

impl PromptProvider for StdinPrompts {
    fn ask(&mut self, user: &User, question: RoutineQuestion) -> bool {
        print!("[{}] {}: {} [y/N] ", question.title(), user.username, question.prompt());
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(_) => parse_answer(&line),
            Err(_) => false,
        }
    }
}

fn parse_answer(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
