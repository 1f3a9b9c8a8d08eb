//! Terminal front end: asks the pending comparison, reads the answer, prints the ranking
//!
//! Answers come either from a script (`--answers`) or from the input reader,
//! one command per line. The session is resumed from and published to state
//! tokens so a ranking can be interrupted at any comparison.

use crate::cache::Answer;
use crate::channel::{self, StateChannel};
use crate::config::{RankConfig, ResultsLayout};
use crate::error::{RankError, RankResult};
use crate::items::Item;
use crate::session::{OrderedOption, SessionEvent, SortSession};
use crate::EXIT_SUCCESS;
use crossbeam_channel::{unbounded, Receiver};
use itertools::Itertools;
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::str::FromStr;

/// One line of interactive input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    /// Answer relative to the items as presented
    Answer(Answer),
    Back,
    Restart,
    Quit,
}

impl FromStr for UserCommand {
    type Err = RankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "back" | "b" | "undo" => Ok(UserCommand::Back),
            "restart" | "r" => Ok(UserCommand::Restart),
            "quit" | "q" | "exit" => Ok(UserCommand::Quit),
            other => other.parse::<Answer>().map(UserCommand::Answer),
        }
    }
}

/// Parse `--answers`: `<`/`1` first better, `>`/`2` second better, `=` equal
pub fn parse_script(script: &str) -> RankResult<Vec<Answer>> {
    script
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '<' | '1' => Ok(Answer::LessThan),
            '>' | '2' => Ok(Answer::GreaterThan),
            '=' => Ok(Answer::Equal),
            other => Err(RankError::invalid_answer(&other.to_string())),
        })
        .collect()
}

/// Render the final order, one item or one tie group per line
pub fn render_results(
    items: &[Item],
    ordered: &[OrderedOption<usize>],
    layout: ResultsLayout,
) -> Vec<String> {
    match layout {
        ResultsLayout::Full => ordered
            .iter()
            .map(|option| {
                let item = &items[option.item];
                match &item.subtitle {
                    Some(subtitle) => {
                        format!("#{} {} — {}", option.rank + 1, item.title, subtitle)
                    }
                    None => format!("#{} {}", option.rank + 1, item.title),
                }
            })
            .collect(),
        ResultsLayout::Compact => {
            let groups = ordered.iter().group_by(|option| option.rank);
            let mut lines = Vec::new();
            for (rank, group) in &groups {
                let titles = group.map(|option| items[option.item].title.as_str()).join(" = ");
                lines.push(format!("#{} {}", rank + 1, titles));
            }
            lines
        }
    }
}

/// Rank `items` as configured, reading commands from `input`
pub fn run_ranking<R: BufRead, W: Write>(
    config: &RankConfig,
    items: &[Item],
    mut input: R,
    mut output: W,
) -> RankResult<i32> {
    if items.is_empty() {
        return Err(RankError::EmptyItemList);
    }

    let mut ranking = Ranking::new(config, items)?;
    let code = ranking.run(&mut input, &mut output)?;
    output.flush()?;
    Ok(code)
}

struct Ranking<'a> {
    config: &'a RankConfig,
    items: &'a [Item],
    indices: Vec<usize>,
    session: SortSession<usize>,
    events: Receiver<SessionEvent<usize>>,
    channel: StateChannel,
    script: Option<VecDeque<Answer>>,
}

impl<'a> Ranking<'a> {
    fn new(config: &'a RankConfig, items: &'a [Item]) -> RankResult<Self> {
        let (sender, events) = unbounded();
        let session = match config.seed {
            Some(seed) => SortSession::with_seed(sender, seed),
            None => SortSession::new(sender),
        };
        let script = config
            .script
            .as_deref()
            .map(parse_script)
            .transpose()?
            .map(VecDeque::from);

        Ok(Self {
            config,
            items,
            indices: (0..items.len()).collect(),
            session,
            events,
            channel: StateChannel::new(items.len()),
            script,
        })
    }

    fn run<R: BufRead, W: Write>(&mut self, input: &mut R, output: &mut W) -> RankResult<i32> {
        let restored = self
            .config
            .token
            .as_deref()
            .and_then(|token| self.channel.restore(token));
        let (draws, answers) = match restored {
            Some(state) if self.config.restart => (state.draws, Vec::new()),
            Some(state) => (state.draws, state.answers),
            None => {
                if self.config.token.is_some() {
                    writeln!(output, "State token not recognised, starting a new ranking")?;
                }
                (self.session.create_random_draws(self.items.len()), Vec::new())
            }
        };
        self.load_state(draws, answers)?;

        loop {
            let event = self
                .events
                .try_recv()
                .map_err(|_| RankError::internal("session stopped without an event"))?;

            match event {
                SessionEvent::ComparisonRequested {
                    first,
                    second,
                    request,
                } => {
                    let completed = self.session.completed_answers();
                    let token = self
                        .channel
                        .publish(self.session.draws(), &completed)
                        .to_string();
                    writeln!(output, "State: {token}")?;
                    if self.config.show_progress {
                        writeln!(
                            output,
                            "{}",
                            channel::progress_message(
                                completed.len(),
                                self.session.approximate_total_comparison_count()
                            )
                        )?;
                    }

                    let (left, right) = if request.flip {
                        (second, first)
                    } else {
                        (first, second)
                    };
                    writeln!(output, "  1) {}", self.items[left])?;
                    writeln!(output, "  2) {}", self.items[right])?;

                    let command = match self.script.as_mut() {
                        Some(script) => match script.pop_front() {
                            Some(answer) => UserCommand::Answer(answer),
                            None => {
                                writeln!(output, "Out of answers; resume with --state {token}")?;
                                return Ok(EXIT_SUCCESS);
                            }
                        },
                        None => prompt(input, output)?,
                    };

                    match command {
                        UserCommand::Answer(answer) => {
                            let answer = Answer::from_presented(answer, request.flip);
                            debug!("answer #{}: {answer}", request.ticket.index());
                            self.session.resolve(request.ticket, answer)?;
                        }
                        UserCommand::Back => {
                            let navigation =
                                self.channel.navigation(self.session.draws(), &completed);
                            let target = match navigation.back {
                                Some(back) => back,
                                None => {
                                    writeln!(output, "Nothing to undo")?;
                                    navigation.restart
                                }
                            };
                            self.jump_to(&target)?;
                        }
                        UserCommand::Restart => {
                            let navigation =
                                self.channel.navigation(self.session.draws(), &completed);
                            self.jump_to(&navigation.restart)?;
                        }
                        UserCommand::Quit => {
                            self.session.cancel();
                            self.channel.clear();
                            writeln!(output, "Resume with --state {token}")?;
                            return Ok(EXIT_SUCCESS);
                        }
                    }
                }
                SessionEvent::SortCompleted { ordered } => {
                    let completed = self.session.completed_answers();
                    let token = self.channel.publish(self.session.draws(), &completed);
                    writeln!(output, "State: {token}")?;
                    writeln!(
                        output,
                        "{}",
                        channel::completion_message(completed.len())
                    )?;
                    for line in render_results(self.items, &ordered, self.config.results_layout) {
                        writeln!(output, "{line}")?;
                    }
                    info!("ranked {} items", ordered.len());
                    return Ok(EXIT_SUCCESS);
                }
            }
        }
    }

    /// Replace the running sort with the state a navigation token describes
    fn jump_to(&mut self, token: &str) -> RankResult<()> {
        match self.channel.restore(token) {
            Some(state) => self.load_state(state.draws, state.answers),
            None => self.start_over(&RankError::invalid_token(
                "navigation token does not match the items",
            )),
        }
    }

    /// Hand a state to the session; a state it cannot use starts a new ranking
    fn load_state(&mut self, draws: Vec<usize>, answers: Vec<Answer>) -> RankResult<()> {
        match self.session.set_state(self.indices.clone(), draws, answers) {
            Err(e) if e.is_recoverable() => self.start_over(&e),
            result => result,
        }
    }

    fn start_over(&mut self, cause: &RankError) -> RankResult<()> {
        warn!("{cause}; starting a new ranking");
        self.channel.clear();
        let draws = self.session.create_random_draws(self.items.len());
        self.session.set_state(self.indices.clone(), draws, Vec::new())
    }
}

fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> RankResult<UserCommand> {
    loop {
        write!(output, "Which is better? [1, 2, =, back, restart, quit] ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(UserCommand::Quit);
        }
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<UserCommand>() {
            Ok(command) => return Ok(command),
            Err(e) => writeln!(output, "{e}")?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::config::RankConfigBuilder;
    use std::io::Cursor;

    fn items(titles: &[&str]) -> Vec<Item> {
        titles.iter().map(|title| Item::new(title)).collect()
    }

    fn run(config: &RankConfig, items: &[Item], input: &str) -> (i32, String) {
        let mut output = Vec::new();
        let code = run_ranking(config, items, Cursor::new(input.to_string()), &mut output)
            .expect("ranking failed");
        (code, String::from_utf8(output).expect("output is not UTF-8"))
    }

    fn last_token(output: &str) -> String {
        output
            .lines()
            .filter_map(|line| line.strip_prefix("State: "))
            .last()
            .expect("no state token printed")
            .to_string()
    }

    #[test]
    fn test_parse_script() {
        assert_eq!(
            parse_script("1 2\n=<>").unwrap(),
            vec![
                Answer::LessThan,
                Answer::GreaterThan,
                Answer::Equal,
                Answer::LessThan,
                Answer::GreaterThan,
            ]
        );
        assert!(matches!(
            parse_script("12x"),
            Err(RankError::InvalidAnswer { .. })
        ));
    }

    #[test]
    fn test_user_command_from_str() {
        assert_eq!("back".parse::<UserCommand>().unwrap(), UserCommand::Back);
        assert_eq!(" Quit\n".parse::<UserCommand>().unwrap(), UserCommand::Quit);
        assert_eq!(
            "2".parse::<UserCommand>().unwrap(),
            UserCommand::Answer(Answer::GreaterThan)
        );
        assert!("maybe".parse::<UserCommand>().is_err());
    }

    #[test]
    fn test_scripted_ties_render_compact() {
        let token = codec::encode_token(&[0, 0], &[]);
        let config = RankConfigBuilder::new("items.txt")
            .token(&token)
            .script("==")
            .compact()
            .build()
            .unwrap();
        let (code, output) = run(&config, &items(&["A", "B", "C"]), "");
        assert_eq!(code, EXIT_SUCCESS);
        assert!(output.contains("Completed sorting after 2 comparisons"));
        assert!(output.lines().any(|line| line == "#1 A = B = C"));
    }

    #[test]
    fn test_script_runs_out() {
        let config = RankConfigBuilder::new("items.txt")
            .seed(3)
            .script("1")
            .build()
            .unwrap();
        let (code, output) = run(&config, &items(&["A", "B", "C", "D"]), "");
        assert_eq!(code, EXIT_SUCCESS);
        assert!(output.contains("Out of answers"));

        let state = codec::decode_token(&last_token(&output), 4).unwrap();
        assert_eq!(state.answers.len(), 1);
    }

    #[test]
    fn test_resume_from_printed_token() {
        let config = RankConfigBuilder::new("items.txt")
            .seed(11)
            .script("=")
            .build()
            .unwrap();
        let list = items(&["A", "B", "C"]);
        let (_, output) = run(&config, &list, "");
        let token = last_token(&output);

        let resumed = RankConfigBuilder::new("items.txt")
            .token(&token)
            .script("=")
            .build()
            .unwrap();
        let (_, output) = run(&resumed, &list, "");
        assert!(output.contains("Completed sorting after 2 comparisons"));
        assert!(output.lines().any(|line| line == "#1 A"));
    }

    #[test]
    fn test_interactive_back_and_bad_input() {
        let token = codec::encode_token(&[0, 0], &[]);
        let config = RankConfigBuilder::new("items.txt")
            .token(&token)
            .quiet()
            .build()
            .unwrap();
        let (code, output) = run(&config, &items(&["A", "B", "C"]), "=\nback\nwhat\n=\n=\n");
        assert_eq!(code, EXIT_SUCCESS);
        assert!(output.contains("Invalid answer: what"));
        assert!(output.contains("Completed sorting after 2 comparisons"));
        assert!(!output.contains("remaining"));
    }

    #[test]
    fn test_back_without_answers_stays_put() {
        let token = codec::encode_token(&[0, 0], &[]);
        let config = RankConfigBuilder::new("items.txt").token(&token).build().unwrap();
        let (_, output) = run(&config, &items(&["A", "B", "C"]), "back\nquit\n");
        assert!(output.contains("Nothing to undo"));
        assert!(output.contains(&format!("Resume with --state {token}")));
    }

    #[test]
    fn test_restart_drops_stored_answers() {
        let token = codec::encode_token(&[2, 1, 0], &[Answer::LessThan]);
        let config = RankConfigBuilder::new("items.txt")
            .token(&token)
            .restart()
            .build()
            .unwrap();
        let (_, output) = run(&config, &items(&["A", "B", "C", "D"]), "quit\n");
        let state = codec::decode_token(&last_token(&output), 4).unwrap();
        assert_eq!(state.draws, vec![2, 1, 0]);
        assert!(state.answers.is_empty());
    }

    #[test]
    fn test_end_of_input_quits() {
        let config = RankConfigBuilder::new("items.txt").seed(1).build().unwrap();
        let (code, output) = run(&config, &items(&["A", "B"]), "");
        assert_eq!(code, EXIT_SUCCESS);
        assert!(output.contains("Resume with --state"));
    }

    #[test]
    fn test_unrecognised_token_starts_fresh() {
        let config = RankConfigBuilder::new("items.txt")
            .token("not a token")
            .seed(2)
            .script("=")
            .build()
            .unwrap();
        let (_, output) = run(&config, &items(&["A", "B"]), "");
        assert!(output.contains("State token not recognised"));
        assert!(output.contains("Completed sorting after 1 comparisons"));
    }

    #[test]
    fn test_single_item_needs_no_comparison() {
        let config = RankConfigBuilder::new("items.txt").build().unwrap();
        let list = vec![Item {
            title: "Banana".to_string(),
            subtitle: Some("yellow".to_string()),
        }];
        let (_, output) = run(&config, &list, "");
        assert!(output.contains("Completed sorting after 0 comparisons"));
        assert!(output.lines().any(|line| line == "#1 Banana — yellow"));
    }

    #[test]
    fn test_unusable_state_starts_over() {
        let config = RankConfigBuilder::new("items.txt").seed(5).build().unwrap();
        let list = items(&["A", "B", "C", "D"]);
        let mut ranking = Ranking::new(&config, &list).unwrap();

        // a token for a different number of items
        ranking.jump_to(&codec::encode_token(&[0], &[])).unwrap();
        assert_eq!(ranking.session.draws().len(), 3);
        assert!(ranking.session.pending().is_some());
        assert!(matches!(
            ranking.events.try_recv().unwrap(),
            SessionEvent::ComparisonRequested { .. }
        ));

        // draws outside their pools
        ranking.load_state(vec![7, 7, 7], Vec::new()).unwrap();
        assert!(ranking.session.draws().iter().zip([4, 3, 2]).all(|(&d, pool)| d < pool));
        assert_eq!(ranking.session.completed_comparison_count(), 0);
        assert!(ranking.events.try_recv().is_ok());
    }

    #[test]
    fn test_empty_item_list() {
        let config = RankConfig::new().with_items_file("items.txt");
        let result = run_ranking(&config, &[], Cursor::new(String::new()), Vec::new());
        assert!(matches!(result, Err(RankError::EmptyItemList)));
    }
}
