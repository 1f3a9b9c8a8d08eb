//! Maps session progress to and from shareable state tokens

use crate::cache::Answer;
use crate::codec::{self, TokenState};
use log::warn;

/// Tokens for the navigation a driver offers next to a comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTokens {
    /// Undo the last answer; `None` leads back to "no active session"
    pub back: Option<String>,
    /// Same initial order, no answers
    pub restart: String,
}

/// Keeps the token of the current state for one item list
#[derive(Debug, Clone)]
pub struct StateChannel {
    item_count: usize,
    current: Option<String>,
}

impl StateChannel {
    pub fn new(item_count: usize) -> Self {
        Self {
            item_count,
            current: None,
        }
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Token of the last published state
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Decode a token for this item list; an unusable token means "start fresh"
    pub fn restore(&mut self, token: &str) -> Option<TokenState> {
        match codec::decode_token(token, self.item_count) {
            Ok(state) => {
                self.current = Some(token.to_string());
                Some(state)
            }
            Err(e) => {
                warn!("ignoring state token: {e}");
                self.current = None;
                None
            }
        }
    }

    /// Encode and remember the state of a running session
    pub fn publish(&mut self, draws: &[usize], answers: &[Answer]) -> &str {
        let token = codec::encode_token(draws, answers);
        self.current.insert(token).as_str()
    }

    /// Forget the current state
    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn navigation(&self, draws: &[usize], completed: &[Answer]) -> NavigationTokens {
        let back = completed
            .split_last()
            .map(|(_, earlier)| codec::encode_token(draws, earlier));
        NavigationTokens {
            back,
            restart: codec::encode_token(draws, &[]),
        }
    }
}

/// Status line shown while comparisons are outstanding
pub fn progress_message(completed: usize, approximate_total: usize) -> String {
    let remaining = approximate_total.saturating_sub(completed);
    let remaining_text = if remaining < 10 {
        "a few".to_string()
    } else {
        format!("~{}", (remaining + 9) / 10 * 10)
    };
    format!(
        "{completed} comparison{} performed, {remaining_text} remaining",
        if completed == 1 { "" } else { "s" }
    )
}

/// Status line shown with the results
pub fn completion_message(completed: usize) -> String {
    format!("Completed sorting after {completed} comparisons")
}
