//! Configuration management for ranking runs

use crate::error::{RankError, RankResult};
use std::str::FromStr;

/// How the final ranking is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultsLayout {
    /// One item per line with its rank and subtitle
    #[default]
    Full,
    /// One line per rank, tied items joined on the same line
    Compact,
}

/// Main configuration structure for ranking runs
#[derive(Debug, Clone)]
pub struct RankConfig {
    /// File holding the items to rank
    pub items_file: String,
    /// State token to resume from
    pub token: Option<String>,
    /// Seed for the initial shuffle
    pub seed: Option<u64>,
    /// Answers to apply instead of prompting
    pub script: Option<String>,
    /// Drop the answers stored in `token`, keeping its order
    pub restart: bool,
    pub results_layout: ResultsLayout,
    /// Print the progress line before each comparison
    pub show_progress: bool,
    /// Debug mode (for troubleshooting)
    pub debug: bool,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            items_file: String::new(),
            token: None,
            seed: None,
            script: None,
            restart: false,
            results_layout: ResultsLayout::Full,
            show_progress: true,
            debug: false,
        }
    }
}

impl RankConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items_file(mut self, items_file: &str) -> Self {
        self.items_file = items_file.to_string();
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_script(mut self, script: Option<String>) -> Self {
        self.script = script;
        self
    }

    pub fn with_restart(mut self, restart: bool) -> Self {
        self.restart = restart;
        self
    }

    pub fn with_results_layout(mut self, layout: ResultsLayout) -> Self {
        self.results_layout = layout;
        self
    }

    pub fn with_show_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Enable debug mode
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Validate configuration for consistency
    pub fn validate(&self) -> RankResult<()> {
        if self.items_file.is_empty() {
            return Err(RankError::parse_error("no items file given"));
        }

        if self.restart && self.token.is_none() {
            return Err(RankError::conflicting_options(
                "--restart requires --state",
            ));
        }

        if let Some(script) = &self.script {
            if script.chars().all(char::is_whitespace) {
                return Err(RankError::conflicting_options(
                    "--answers needs at least one answer",
                ));
            }
        }

        Ok(())
    }

    /// Answers come from `--answers` rather than the terminal
    pub fn is_scripted(&self) -> bool {
        self.script.is_some()
    }
}

impl FromStr for ResultsLayout {
    type Err = RankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" | "list" => Ok(ResultsLayout::Full),
            "compact" | "grouped" => Ok(ResultsLayout::Compact),
            _ => Err(RankError::parse_error(&format!(
                "unknown results layout: {s}"
            ))),
        }
    }
}

impl std::fmt::Display for ResultsLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResultsLayout::Full => "full",
            ResultsLayout::Compact => "compact",
        };
        write!(f, "{name}")
    }
}

/// Builder pattern for creating configurations
pub struct RankConfigBuilder {
    config: RankConfig,
}

impl RankConfigBuilder {
    /// Start building a configuration for the given items file
    pub fn new(items_file: &str) -> Self {
        Self {
            config: RankConfig::new().with_items_file(items_file),
        }
    }

    pub fn token(mut self, token: &str) -> Self {
        self.config.token = Some(token.to_string());
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn script(mut self, script: &str) -> Self {
        self.config.script = Some(script.to_string());
        self
    }

    pub fn restart(mut self) -> Self {
        self.config.restart = true;
        self
    }

    pub fn compact(mut self) -> Self {
        self.config.results_layout = ResultsLayout::Compact;
        self
    }

    pub fn quiet(mut self) -> Self {
        self.config.show_progress = false;
        self
    }

    pub fn debug(mut self) -> Self {
        self.config.debug = true;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> RankResult<RankConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
