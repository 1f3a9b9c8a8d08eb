//! Sort sessions driven by externally supplied answers
//!
//! A session owns the persisted progress of one ranking: the items, the draw
//! sequence that fixes their initial order, and the answers given so far. The
//! sort itself is a pure function of that state. Each time the state changes
//! the engine is replayed from the initial order: cached pairs and stored
//! answers are served without stopping, and the first comparison with no
//! stored answer suspends the run. That comparison becomes the single pending
//! request, reported through the event sink, until the caller answers it or
//! cancels the session.

use crate::cache::{Answer, ComparisonCache};
use crate::engine;
use crate::error::{RankError, RankResult};
use crate::permutation;
use crossbeam_channel::Sender;
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// An item placed in the final order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedOption<I> {
    pub item: I,
    /// Position of the item in the caller's list
    pub index: usize,
    /// 0-based rank; tied items share the rank of the first of their group
    pub rank: usize,
}

/// Identifies one pending comparison of one session run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComparisonTicket {
    generation: u64,
    index: usize,
}

impl ComparisonTicket {
    /// Number of answers consumed before this comparison was asked
    pub fn index(&self) -> usize {
        self.index
    }
}

/// The comparison the engine is waiting on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingComparison {
    /// Index of the item the engine compares...
    pub first: usize,
    /// ...against this one
    pub second: usize,
    /// Show `second` before `first`. Presentation only: answers are always
    /// stored relative to `first`, see [`Answer::from_presented`].
    pub flip: bool,
    pub ticket: ComparisonTicket,
}

/// One answer the engine consumed, in request order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedComparison {
    pub first: usize,
    pub second: usize,
    pub flip: bool,
    pub answer: Answer,
}

/// Notifications emitted through the session's event sink
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent<I> {
    ComparisonRequested {
        first: I,
        second: I,
        request: PendingComparison,
    },
    SortCompleted {
        ordered: Vec<OrderedOption<I>>,
    },
}

/// Where the session currently stands
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus<I> {
    Idle,
    AwaitingComparison(PendingComparison),
    Completed(Vec<OrderedOption<I>>),
}

/// Why a replay stopped before the sort finished
#[derive(Debug, Clone, Copy)]
struct Suspension {
    first: usize,
    second: usize,
    flip: bool,
}

struct ActiveSort<I> {
    items: Vec<I>,
    draws: Vec<usize>,
    order: Vec<usize>,
    answers: Vec<Answer>,
    completed: Vec<CompletedComparison>,
    cache: ComparisonCache,
}

impl<I> ActiveSort<I> {
    /// Run the engine from the initial order, consuming stored answers
    fn replay(&mut self) -> Result<Vec<usize>, Suspension> {
        self.cache.clear();
        self.completed.clear();

        let answers = &self.answers;
        let cache = &mut self.cache;
        let completed = &mut self.completed;
        let mut order = self.order.clone();

        engine::try_sort_by(&mut order, |&a, &b| {
            if let Some(answer) = cache.get(a, b) {
                trace!("cache hit for ({a}, {b}): {answer}");
                return Ok(answer.to_ordering());
            }

            let flip = should_flip(completed.as_slice(), a, b);
            match answers.get(completed.len()) {
                Some(&answer) => {
                    trace!("replaying answer #{} for ({a}, {b}): {answer}", completed.len());
                    completed.push(CompletedComparison {
                        first: a,
                        second: b,
                        flip,
                        answer,
                    });
                    cache.set(a, b, answer);
                    Ok(answer.to_ordering())
                }
                None => {
                    trace!("suspending on ({a}, {b})");
                    Err(Suspension {
                        first: a,
                        second: b,
                        flip,
                    })
                }
            }
        })?;

        Ok(order)
    }

    /// Walk the final order; an item tied with its predecessor shares its rank
    fn assign_ranks(&self, sorted: &[usize]) -> Vec<OrderedOption<I>>
    where
        I: Clone,
    {
        let mut ordered: Vec<OrderedOption<I>> = Vec::with_capacity(sorted.len());
        for (position, &index) in sorted.iter().enumerate() {
            let rank = match ordered.last() {
                Some(previous) if self.cache.get(previous.index, index) == Some(Answer::Equal) => {
                    previous.rank
                }
                _ => position,
            };
            ordered.push(OrderedOption {
                item: self.items[index].clone(),
                index,
                rank,
            });
        }
        ordered
    }
}

/// Keep chained comparisons visually stable: if the item about to be shown
/// appeared on the other side in the previous request, swap sides.
fn should_flip(completed: &[CompletedComparison], first: usize, second: usize) -> bool {
    let Some(previous) = completed.last() else {
        return false;
    };
    let (shown_first, shown_second) = if previous.flip {
        (previous.second, previous.first)
    } else {
        (previous.first, previous.second)
    };
    first == shown_second || second == shown_first
}

fn is_prefix<T: PartialEq>(prefix: &[T], full: &[T]) -> bool {
    prefix.len() <= full.len() && prefix == &full[..prefix.len()]
}

/// Bridges persisted (draws, answers) state to a running sort
pub struct SortSession<I> {
    events: Sender<SessionEvent<I>>,
    rng: StdRng,
    active: Option<ActiveSort<I>>,
    status: SessionStatus<I>,
    generation: u64,
}

impl<I> SortSession<I>
where
    I: Clone + PartialEq,
{
    /// New session publishing to `events`, with an entropy-seeded generator for draws
    pub fn new(events: Sender<SessionEvent<I>>) -> Self {
        Self::with_rng(events, StdRng::from_entropy())
    }

    /// New session whose random draws are reproducible
    pub fn with_seed(events: Sender<SessionEvent<I>>, seed: u64) -> Self {
        Self::with_rng(events, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(events: Sender<SessionEvent<I>>, rng: StdRng) -> Self {
        Self {
            events,
            rng,
            active: None,
            status: SessionStatus::Idle,
            generation: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn status(&self) -> &SessionStatus<I> {
        &self.status
    }

    pub fn pending(&self) -> Option<&PendingComparison> {
        match &self.status {
            SessionStatus::AwaitingComparison(pending) => Some(pending),
            _ => None,
        }
    }

    /// Complete draw sequence of the running sort (empty when idle)
    pub fn draws(&self) -> &[usize] {
        match &self.active {
            Some(active) => &active.draws,
            None => &[],
        }
    }

    /// Answers supplied so far, including any the sort never needed
    pub fn answers(&self) -> &[Answer] {
        match &self.active {
            Some(active) => &active.answers,
            None => &[],
        }
    }

    /// Comparisons the engine actually consumed, in request order
    pub fn completed_comparisons(&self) -> &[CompletedComparison] {
        match &self.active {
            Some(active) => &active.completed,
            None => &[],
        }
    }

    pub fn completed_answers(&self) -> Vec<Answer> {
        self.completed_comparisons()
            .iter()
            .map(|comparison| comparison.answer)
            .collect()
    }

    pub fn completed_comparison_count(&self) -> usize {
        self.completed_comparisons().len()
    }

    pub fn approximate_total_comparison_count(&self) -> usize {
        self.active.as_ref().map_or(0, |active| {
            engine::approximate_comparison_count(active.order.len())
        })
    }

    /// A fresh random draw sequence for `count` items
    pub fn create_random_draws(&mut self, count: usize) -> Vec<usize> {
        permutation::random_draws(count, &mut self.rng)
    }

    /// Load persisted state and run the sort as far as the answers allow
    ///
    /// When the items match the running sort and the current draws and answers
    /// are prefixes of the new ones, only the answers are extended and the
    /// pending comparison is retried. Anything else cancels the running sort
    /// and starts over; missing draws are filled in at random.
    pub fn set_state(
        &mut self,
        items: Vec<I>,
        draws: Vec<usize>,
        answers: Vec<Answer>,
    ) -> RankResult<()> {
        if let Some(active) = self.active.as_mut() {
            if active.items == items
                && is_prefix(&active.draws, &draws)
                && is_prefix(&active.answers, &answers)
            {
                debug!(
                    "resuming sort with {} answers ({} new)",
                    answers.len(),
                    answers.len() - active.answers.len()
                );
                active.answers = answers;
                if matches!(self.status, SessionStatus::Completed(_)) {
                    return Ok(());
                }
                return self.advance();
            }
        }

        self.cancel();

        let mut draws = draws;
        permutation::complete_draws(items.len(), &mut draws, &mut self.rng)?;
        let order = permutation::permutation_from_draws(items.len(), &draws)?;
        debug!(
            "starting sort of {} items with {} stored answers",
            items.len(),
            answers.len()
        );

        self.active = Some(ActiveSort {
            items,
            draws,
            order,
            answers,
            completed: Vec::new(),
            cache: ComparisonCache::new(),
        });
        self.advance()
    }

    /// Answer the pending comparison, oriented as the engine asked it
    pub fn submit_answer(&mut self, answer: Answer) -> RankResult<()> {
        if self.pending().is_none() {
            return Err(RankError::NoPendingComparison);
        }
        let active = self
            .active
            .as_mut()
            .ok_or(RankError::NoPendingComparison)?;
        active.answers.push(answer);
        self.advance()
    }

    /// Answer a specific request; fails with `Cancelled` if it is no longer pending
    pub fn resolve(&mut self, ticket: ComparisonTicket, answer: Answer) -> RankResult<()> {
        let is_pending = matches!(self.pending(), Some(pending) if pending.ticket == ticket);
        if !is_pending {
            return Err(RankError::Cancelled);
        }
        self.submit_answer(answer)
    }

    /// Drop all state. A pending comparison is failed and its sort never completes.
    ///
    /// Returns whether a comparison was pending.
    pub fn cancel(&mut self) -> bool {
        let had_pending = self.pending().is_some();
        if self.active.take().is_some() {
            debug!(
                "cancelled sort generation {}{}",
                self.generation,
                if had_pending { " with a pending comparison" } else { "" }
            );
        }
        self.status = SessionStatus::Idle;
        self.generation += 1;
        had_pending
    }

    fn advance(&mut self) -> RankResult<()> {
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };

        let event = match active.replay() {
            Ok(sorted) => {
                let ordered = active.assign_ranks(&sorted);
                debug!(
                    "sort completed after {} comparisons",
                    active.completed.len()
                );
                self.status = SessionStatus::Completed(ordered.clone());
                SessionEvent::SortCompleted { ordered }
            }
            Err(suspension) => {
                let request = PendingComparison {
                    first: suspension.first,
                    second: suspension.second,
                    flip: suspension.flip,
                    ticket: ComparisonTicket {
                        generation: self.generation,
                        index: active.completed.len(),
                    },
                };
                let event = SessionEvent::ComparisonRequested {
                    first: active.items[request.first].clone(),
                    second: active.items[request.second].clone(),
                    request,
                };
                self.status = SessionStatus::AwaitingComparison(request);
                event
            }
        };

        self.events
            .send(event)
            .map_err(|_| RankError::EventChannelClosed)
    }
}
