//! Pairwise ranking on the command line
//!
//! Asks "which is better?" one pair at a time and prints the resulting order.
//! Progress is printed as a state token after every answer; pass it back with
//! `--state` to continue later.

use std::process;
use clap::{Arg, ArgAction, Command};
use env_logger::Env;

use pairwise_rank::{
    config::{RankConfig, RankConfigBuilder},
    error::{RankError, RankResult},
    rank,
};

fn main() {
    let result = run();
    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("rank: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn run() -> RankResult<i32> {
    let matches = build_cli().get_matches();
    let config = parse_config_from_matches(&matches)?;

    let default_filter = if config.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    rank(&config)
}

fn build_cli() -> Command {
    Command::new("rank")
        .version(env!("CARGO_PKG_VERSION"))
        .override_usage("rank [OPTION]... FILE")
        .about("Rank items by answering pairwise comparisons")
        .long_about("Rank the items listed in FILE (one per line, optional TAB-separated subtitle) by answering which of two items is better. Only the comparisons a stable merge sort needs are asked, and no pair is asked twice.\n\nAfter every answer a state token is printed; pass it to --state to resume.")

        .arg(Arg::new("file")
            .help("Items to rank, one per line")
            .required(true)
            .value_name("FILE"))

        // Session state
        .arg(Arg::new("state")
            .short('s')
            .long("state")
            .help("Resume from a state token")
            .value_name("TOKEN"))
        .arg(Arg::new("restart")
            .long("restart")
            .help("Keep the order of --state but forget its answers")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("seed")
            .long("seed")
            .help("Seed for the initial shuffle")
            .value_name("N")
            .value_parser(clap::value_parser!(u64)))

        // Answer source
        .arg(Arg::new("answers")
            .short('a')
            .long("answers")
            .help("Answer from SCRIPT instead of prompting")
            .long_help("Answer from SCRIPT instead of prompting. Each character answers one comparison as presented: '<' or '1' when the first item is better, '>' or '2' when the second is, '=' when they are equal. Whitespace is ignored. When the script runs out the current state token is printed.")
            .value_name("SCRIPT"))

        // Output
        .arg(Arg::new("compact")
            .long("compact")
            .help("Print tied items on one line")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("no-progress")
            .long("no-progress")
            .help("Do not print the progress line")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("debug")
            .long("debug")
            .help("Log session activity to stderr")
            .action(ArgAction::SetTrue))
}

/// Parse configuration from command line matches
fn parse_config_from_matches(matches: &clap::ArgMatches) -> RankResult<RankConfig> {
    let file = matches
        .get_one::<String>("file")
        .ok_or_else(|| RankError::parse_error("missing FILE operand"))?;
    let mut builder = RankConfigBuilder::new(file);

    if let Some(token) = matches.get_one::<String>("state") {
        builder = builder.token(token);
    }
    if let Some(&seed) = matches.get_one::<u64>("seed") {
        builder = builder.seed(seed);
    }
    if let Some(script) = matches.get_one::<String>("answers") {
        builder = builder.script(script);
    }

    // Apply boolean flags
    if matches.get_flag("restart") {
        builder = builder.restart();
    }
    if matches.get_flag("compact") {
        builder = builder.compact();
    }
    if matches.get_flag("no-progress") {
        builder = builder.quiet();
    }
    if matches.get_flag("debug") {
        builder = builder.debug();
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairwise_rank::config::ResultsLayout;

    #[test]
    fn test_parse_basic_config() {
        let app = build_cli();
        let matches = app
            .try_get_matches_from(["rank", "movies.txt"])
            .expect("Failed to parse test arguments");

        let config = parse_config_from_matches(&matches).expect("Failed to parse test config");

        assert_eq!(config.items_file, "movies.txt");
        assert_eq!(config.token, None);
        assert_eq!(config.results_layout, ResultsLayout::Full);
        assert!(config.show_progress);
    }

    #[test]
    fn test_parse_complex_config() {
        let app = build_cli();
        let matches = app.try_get_matches_from([
            "rank",
            "-s", "AbC-_",
            "--seed", "42",
            "-a", "12 =",
            "--compact",
            "--no-progress",
            "--debug",
            "movies.txt",
        ]).expect("Failed to parse test arguments");

        let config = parse_config_from_matches(&matches).expect("Failed to parse test config");

        assert_eq!(config.token.as_deref(), Some("AbC-_"));
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.script.as_deref(), Some("12 ="));
        assert_eq!(config.results_layout, ResultsLayout::Compact);
        assert!(!config.show_progress);
        assert!(config.debug);
    }

    #[test]
    fn test_conflicting_options() {
        let app = build_cli();
        let matches = app
            .try_get_matches_from(["rank", "--restart", "movies.txt"])
            .expect("Failed to parse test arguments");

        let result = parse_config_from_matches(&matches);
        assert!(matches!(result, Err(RankError::ConflictingOptions { .. })));
    }

    #[test]
    fn test_file_is_required() {
        assert!(build_cli().try_get_matches_from(["rank"]).is_err());
        assert!(build_cli().try_get_matches_from(["rank", "--seed", "x", "f.txt"]).is_err());
    }
}
