//! Spinner shown while the model thinks.

use indicatif::{ProgressBar, ProgressStyle};
use is_terminal::IsTerminal;
use rand::Rng;
use rand::seq::IndexedRandom;
use std::time::Duration;

const MESSAGES: &[&str] = &[
    "Consulting the regex gods for you, you derp...",
    "Converting your words to nerd hieroglyphics...",
    "Asking AI because you forgot regex again...",
    "Translating from human to regex-speak...",
    "Generating the pattern you should've memorized...",
    "Doing the regex homework you avoided...",
    "Saving you from Googling \"regex for...\"...",
    "Making up for your regex education gaps...",
];

/// A stderr spinner that is a no-op when stderr is not a terminal.
pub struct Spinner {
    bar: Option<ProgressBar>,
}

impl Spinner {
    /// Start a spinner with a randomly picked message, unless `hidden`.
    pub fn start(hidden: bool) -> Self {
        if hidden || !std::io::stderr().is_terminal() {
            return Self { bar: None };
        }

        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(pick_message(&mut rand::rng()));
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar: Some(bar) }
    }

    /// Stop and erase the spinner line.
    pub fn stop(self) {
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

fn pick_message<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    MESSAGES.choose(rng).copied().unwrap_or(MESSAGES[0])
}
