//! Pairwise ranking driven by human answers
//!
//! A list of items is put in order by asking one "which is better?" question
//! at a time. The questions come from a stable merge sort that can stop at any
//! comparison, and the whole progress of a ranking (the initial shuffle plus
//! every answer so far) fits in a short URL-safe token, so a ranking can be
//! paused, shared and resumed exactly where it left off.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

pub mod error;
pub mod config;

pub mod cache;
pub mod codec;
pub mod engine;
pub mod permutation;
pub mod session;

pub mod channel;
pub mod items;
pub mod driver;

// Re-export commonly used types
pub use cache::{Answer, ComparisonCache};
pub use codec::{decode_token, encode_token, TokenState};
pub use config::{RankConfig, RankConfigBuilder, ResultsLayout};
pub use error::{RankError, RankResult};
pub use session::{OrderedOption, PendingComparison, SessionEvent, SessionStatus, SortSession};

use std::io::{self, BufWriter};
use std::path::Path;

/// Process exit codes
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const USAGE_FAILURE: i32 = 2;

/// Rank the items of `config.items_file` on the terminal
pub fn rank(config: &RankConfig) -> RankResult<i32> {
    let items = items::load_items(Path::new(&config.items_file))?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    driver::run_ranking(config, &items, stdin.lock(), BufWriter::new(stdout.lock()))
}
