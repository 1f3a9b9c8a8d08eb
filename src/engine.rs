//! Adaptive natural merge sort (TimSort) over a fallible comparator
//!
//! The comparator may refuse to answer by returning `Err`. The sort stops at
//! that point and hands the error back untouched; the slice is then in an
//! unspecified (but complete) arrangement and must not be read as a result.
//! Comparator calls are made strictly one at a time, in an order that depends
//! only on the input arrangement and the answers returned so far, which is
//! what lets a caller replay a partial answer list and land on the exact same
//! next question.
//!
//! Comparisons are the expensive resource here, so the algorithm keeps the
//! classic galloping merge with its adaptive threshold.

use log::warn;
use std::cmp::Ordering;
use std::convert::Infallible;
use std::marker::PhantomData;

/// Arrays shorter than this are sorted with a single binary insertion pass
pub const MIN_MERGE: usize = 32;

/// Initial number of consecutive wins before a merge switches to galloping
pub const MIN_GALLOP: usize = 7;

/// Sort `v` with an infallible comparator
pub fn sort_by<T, F>(v: &mut [T], mut compare: F)
where
    T: Clone,
    F: FnMut(&T, &T) -> Ordering,
{
    let result: Result<(), Infallible> = try_sort_by(v, |a, b| Ok(compare(a, b)));
    match result {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

/// Sort `v`, stopping at the first comparator error
pub fn try_sort_by<T, E, F>(v: &mut [T], compare: F) -> Result<(), E>
where
    T: Clone,
    F: FnMut(&T, &T) -> Result<Ordering, E>,
{
    TimSort::new(v, compare).sort()
}

/// Minimum run length for an array of `n` elements, in `[MIN_MERGE / 2, MIN_MERGE]` for large `n`
pub fn min_run_length(mut n: usize) -> usize {
    let mut r = 0;
    while n >= MIN_MERGE {
        r |= n & 1;
        n >>= 1;
    }
    n + r
}

/// Estimated number of questions a merge-insertion optimal sort needs for `n` items
///
/// Only meant for progress display.
pub fn approximate_comparison_count(n: usize) -> usize {
    if n < 2 {
        return 0;
    }
    let n_f = n as f64;
    let log6 = (6.0 * n_f).log2();
    let estimate = n_f * (n_f * 0.75).log2().ceil() - (2f64.powf(log6.floor()) / 3.0).floor()
        + (log6 / 2.0).floor();
    estimate.max(0.0) as usize
}

/// Find the run starting at `v[0]` and make it ascending, returning its length
///
/// A strictly descending run is reversed in place.
fn make_ascending_run<T, E, F>(v: &mut [T], compare: &mut F) -> Result<usize, E>
where
    F: FnMut(&T, &T) -> Result<Ordering, E>,
{
    let len = v.len();
    if len < 2 {
        return Ok(len);
    }

    let mut run_hi = 2;
    if compare(&v[1], &v[0])? == Ordering::Less {
        while run_hi < len && compare(&v[run_hi], &v[run_hi - 1])? == Ordering::Less {
            run_hi += 1;
        }
        v[..run_hi].reverse();
    } else {
        while run_hi < len && compare(&v[run_hi], &v[run_hi - 1])? != Ordering::Less {
            run_hi += 1;
        }
    }

    Ok(run_hi)
}

/// Extend the sorted prefix `v[..start]` to cover all of `v`
fn binary_insertion_sort<T, E, F>(v: &mut [T], start: usize, compare: &mut F) -> Result<(), E>
where
    F: FnMut(&T, &T) -> Result<Ordering, E>,
{
    for i in start.max(1)..v.len() {
        let mut left = 0;
        let mut right = i;
        while left < right {
            let mid = (left + right) >> 1;
            if compare(&v[i], &v[mid])? == Ordering::Less {
                right = mid;
            } else {
                left = mid + 1;
            }
        }
        v[left..=i].rotate_right(1);
    }
    Ok(())
}

/// Position at which `key` would be inserted before any equal elements of `run`
///
/// The search starts at `hint` and gallops outwards before settling with a binary search.
fn gallop_left<T, E, F>(key: &T, run: &[T], hint: usize, compare: &mut F) -> Result<usize, E>
where
    F: FnMut(&T, &T) -> Result<Ordering, E>,
{
    let length = run.len();
    let mut last_offset = 0;
    let mut offset = 1;
    let (mut lo, mut hi);

    if compare(key, &run[hint])? == Ordering::Greater {
        let max_offset = length - hint;
        while offset < max_offset && compare(key, &run[hint + offset])? == Ordering::Greater {
            last_offset = offset;
            offset = (offset << 1) + 1;
        }
        offset = offset.min(max_offset);
        lo = hint + last_offset + 1;
        hi = hint + offset;
    } else {
        let max_offset = hint + 1;
        while offset < max_offset && compare(key, &run[hint - offset])? != Ordering::Greater {
            last_offset = offset;
            offset = (offset << 1) + 1;
        }
        offset = offset.min(max_offset);
        lo = hint + 1 - offset;
        hi = hint - last_offset;
    }

    while lo < hi {
        let m = lo + ((hi - lo) >> 1);
        if compare(key, &run[m])? == Ordering::Greater {
            lo = m + 1;
        } else {
            hi = m;
        }
    }
    Ok(hi)
}

/// Position at which `key` would be inserted after any equal elements of `run`
fn gallop_right<T, E, F>(key: &T, run: &[T], hint: usize, compare: &mut F) -> Result<usize, E>
where
    F: FnMut(&T, &T) -> Result<Ordering, E>,
{
    let length = run.len();
    let mut last_offset = 0;
    let mut offset = 1;
    let (mut lo, mut hi);

    if compare(key, &run[hint])? == Ordering::Less {
        let max_offset = hint + 1;
        while offset < max_offset && compare(key, &run[hint - offset])? == Ordering::Less {
            last_offset = offset;
            offset = (offset << 1) + 1;
        }
        offset = offset.min(max_offset);
        lo = hint + 1 - offset;
        hi = hint - last_offset;
    } else {
        let max_offset = length - hint;
        while offset < max_offset && compare(key, &run[hint + offset])? != Ordering::Less {
            last_offset = offset;
            offset = (offset << 1) + 1;
        }
        offset = offset.min(max_offset);
        lo = hint + last_offset + 1;
        hi = hint + offset;
    }

    while lo < hi {
        let m = lo + ((hi - lo) >> 1);
        if compare(key, &run[m])? == Ordering::Less {
            hi = m;
        } else {
            lo = m + 1;
        }
    }
    Ok(hi)
}

/// Move `len` elements from `src` to `dest` inside `v`, handling overlap like `memmove`
fn shift_within<T: Clone>(v: &mut [T], src: usize, dest: usize, len: usize) {
    if dest < src {
        for i in 0..len {
            v[dest + i] = v[src + i].clone();
        }
    } else if dest > src {
        for i in (0..len).rev() {
            v[dest + i] = v[src + i].clone();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run {
    start: usize,
    len: usize,
}

struct TimSort<'a, T, E, F> {
    v: &'a mut [T],
    compare: F,
    /// Scratch space holding the shorter run of a merge; reused for every merge
    tmp: Vec<T>,
    min_gallop: usize,
    runs: Vec<Run>,
    _error: PhantomData<fn() -> E>,
}

impl<'a, T, E, F> TimSort<'a, T, E, F>
where
    T: Clone,
    F: FnMut(&T, &T) -> Result<Ordering, E>,
{
    fn new(v: &'a mut [T], compare: F) -> Self {
        let capacity = v.len() / 2;
        Self {
            v,
            compare,
            tmp: Vec::with_capacity(capacity),
            min_gallop: MIN_GALLOP,
            runs: Vec::new(),
            _error: PhantomData,
        }
    }

    fn sort(mut self) -> Result<(), E> {
        let len = self.v.len();
        if len < 2 {
            return Ok(());
        }

        if len < MIN_MERGE {
            let run_len = make_ascending_run(self.v, &mut self.compare)?;
            return binary_insertion_sort(self.v, run_len, &mut self.compare);
        }

        let min_run = min_run_length(len);
        let mut lo = 0;
        let mut remaining = len;

        while remaining != 0 {
            let mut run_len = make_ascending_run(&mut self.v[lo..], &mut self.compare)?;
            if run_len < min_run {
                let force = remaining.min(min_run);
                binary_insertion_sort(&mut self.v[lo..lo + force], run_len, &mut self.compare)?;
                run_len = force;
            }

            self.runs.push(Run {
                start: lo,
                len: run_len,
            });
            self.merge_collapse()?;

            remaining -= run_len;
            lo += run_len;
        }

        self.merge_force_collapse()?;
        debug_assert!(self.runs.len() == 1 && self.runs[0].len == len);
        Ok(())
    }

    /// Merge adjacent runs until the stack lengths shrink quickly enough from bottom to top
    fn merge_collapse(&mut self) -> Result<(), E> {
        while self.runs.len() > 1 {
            let runs = &self.runs;
            let mut n = runs.len() - 2;

            if (n >= 1 && runs[n - 1].len <= runs[n].len + runs[n + 1].len)
                || (n >= 2 && runs[n - 2].len <= runs[n].len + runs[n - 1].len)
            {
                if runs[n - 1].len < runs[n + 1].len {
                    n -= 1;
                }
            } else if runs[n].len > runs[n + 1].len {
                break;
            }

            self.merge_at(n)?;
        }
        Ok(())
    }

    /// Merge everything left on the stack into one run
    fn merge_force_collapse(&mut self) -> Result<(), E> {
        while self.runs.len() > 1 {
            let mut n = self.runs.len() - 2;
            if n > 0 && self.runs[n - 1].len < self.runs[n + 1].len {
                n -= 1;
            }
            self.merge_at(n)?;
        }
        Ok(())
    }

    /// Merge stack entries `i` and `i + 1`
    fn merge_at(&mut self, i: usize) -> Result<(), E> {
        let Run {
            start: mut start1,
            len: mut len1,
        } = self.runs[i];
        let Run {
            start: start2,
            len: mut len2,
        } = self.runs[i + 1];
        assert!(
            len1 > 0 && len2 > 0 && start1 + len1 == start2,
            "merge_at called on malformed runs {:?} and {:?}",
            self.runs[i],
            self.runs[i + 1]
        );

        self.runs[i].len = len1 + len2;
        self.runs.remove(i + 1);

        // Elements of run 1 that already precede run 2 stay where they are.
        let k = gallop_right(
            &self.v[start2],
            &self.v[start1..start1 + len1],
            0,
            &mut self.compare,
        )?;
        start1 += k;
        len1 -= k;
        if len1 == 0 {
            return Ok(());
        }

        // Likewise the tail of run 2 that already follows run 1.
        len2 = gallop_left(
            &self.v[start1 + len1 - 1],
            &self.v[start2..start2 + len2],
            len2 - 1,
            &mut self.compare,
        )?;
        if len2 == 0 {
            return Ok(());
        }

        if len1 <= len2 {
            self.merge_low(start1, len1, start2, len2)
        } else {
            self.merge_high(start1, len1, start2, len2)
        }
    }

    /// Merge with run 1 copied to scratch, filling from the low end
    ///
    /// Requires `v[start2]` to sort before `v[start1]` and the last element of run 1
    /// to sort after the whole of run 2.
    fn merge_low(
        &mut self,
        start1: usize,
        mut len1: usize,
        start2: usize,
        mut len2: usize,
    ) -> Result<(), E> {
        self.tmp.clear();
        self.tmp.extend_from_slice(&self.v[start1..start1 + len1]);

        let mut cursor1 = 0;
        let mut cursor2 = start2;
        let mut dest = start1;

        self.v[dest] = self.v[cursor2].clone();
        dest += 1;
        cursor2 += 1;
        len2 -= 1;

        if len2 == 0 {
            self.v[dest..dest + len1].clone_from_slice(&self.tmp[cursor1..cursor1 + len1]);
            return Ok(());
        }
        if len1 == 1 {
            shift_within(self.v, cursor2, dest, len2);
            self.v[dest + len2] = self.tmp[cursor1].clone();
            return Ok(());
        }

        let mut min_gallop = self.min_gallop;

        'outer: loop {
            let mut count1 = 0;
            let mut count2 = 0;

            // One element at a time until one side keeps winning.
            loop {
                if (self.compare)(&self.v[cursor2], &self.tmp[cursor1])? == Ordering::Less {
                    self.v[dest] = self.v[cursor2].clone();
                    dest += 1;
                    cursor2 += 1;
                    count2 += 1;
                    count1 = 0;
                    len2 -= 1;
                    if len2 == 0 {
                        break 'outer;
                    }
                } else {
                    self.v[dest] = self.tmp[cursor1].clone();
                    dest += 1;
                    cursor1 += 1;
                    count1 += 1;
                    count2 = 0;
                    len1 -= 1;
                    if len1 == 1 {
                        break 'outer;
                    }
                }
                if (count1 | count2) >= min_gallop {
                    break;
                }
            }

            // Gallop while it keeps paying off.
            loop {
                count1 = gallop_right(
                    &self.v[cursor2],
                    &self.tmp[cursor1..cursor1 + len1],
                    0,
                    &mut self.compare,
                )?;
                if count1 != 0 {
                    self.v[dest..dest + count1]
                        .clone_from_slice(&self.tmp[cursor1..cursor1 + count1]);
                    dest += count1;
                    cursor1 += count1;
                    len1 -= count1;
                    if len1 <= 1 {
                        break 'outer;
                    }
                }

                self.v[dest] = self.v[cursor2].clone();
                dest += 1;
                cursor2 += 1;
                len2 -= 1;
                if len2 == 0 {
                    break 'outer;
                }

                count2 = gallop_left(
                    &self.tmp[cursor1],
                    &self.v[cursor2..cursor2 + len2],
                    0,
                    &mut self.compare,
                )?;
                if count2 != 0 {
                    shift_within(self.v, cursor2, dest, count2);
                    dest += count2;
                    cursor2 += count2;
                    len2 -= count2;
                    if len2 == 0 {
                        break 'outer;
                    }
                }

                self.v[dest] = self.tmp[cursor1].clone();
                dest += 1;
                cursor1 += 1;
                len1 -= 1;
                if len1 == 1 {
                    break 'outer;
                }

                min_gallop = min_gallop.saturating_sub(1);
                if count1 < MIN_GALLOP && count2 < MIN_GALLOP {
                    break;
                }
            }

            min_gallop += 2;
        }

        self.min_gallop = min_gallop.max(1);

        if len1 == 1 {
            shift_within(self.v, cursor2, dest, len2);
            self.v[dest + len2] = self.tmp[cursor1].clone();
        } else if len1 == 0 {
            // Only reachable with a comparator that contradicts itself; the rest of
            // run 2 already sits in place.
            warn!("inconsistent comparison results detected while merging low");
        } else {
            self.v[dest..dest + len1].clone_from_slice(&self.tmp[cursor1..cursor1 + len1]);
        }
        Ok(())
    }

    /// Merge with run 2 copied to scratch, filling from the high end
    ///
    /// Cursors are exclusive ends: the next element taken from run 1 is
    /// `v[end1 - 1]`, from scratch `tmp[end2 - 1]`, and it lands at `v[dest - 1]`.
    fn merge_high(
        &mut self,
        start1: usize,
        mut len1: usize,
        start2: usize,
        mut len2: usize,
    ) -> Result<(), E> {
        self.tmp.clear();
        self.tmp.extend_from_slice(&self.v[start2..start2 + len2]);

        let mut end1 = start1 + len1;
        let mut end2 = len2;
        let mut dest = start2 + len2;

        dest -= 1;
        end1 -= 1;
        self.v[dest] = self.v[end1].clone();
        len1 -= 1;

        if len1 == 0 {
            self.v[dest - len2..dest].clone_from_slice(&self.tmp[..len2]);
            return Ok(());
        }
        if len2 == 1 {
            dest -= len1;
            end1 -= len1;
            shift_within(self.v, end1, dest, len1);
            self.v[dest - 1] = self.tmp[end2 - 1].clone();
            return Ok(());
        }

        let mut min_gallop = self.min_gallop;

        'outer: loop {
            let mut count1 = 0;
            let mut count2 = 0;

            loop {
                if (self.compare)(&self.tmp[end2 - 1], &self.v[end1 - 1])? == Ordering::Less {
                    dest -= 1;
                    end1 -= 1;
                    self.v[dest] = self.v[end1].clone();
                    count1 += 1;
                    count2 = 0;
                    len1 -= 1;
                    if len1 == 0 {
                        break 'outer;
                    }
                } else {
                    dest -= 1;
                    end2 -= 1;
                    self.v[dest] = self.tmp[end2].clone();
                    count2 += 1;
                    count1 = 0;
                    len2 -= 1;
                    if len2 == 1 {
                        break 'outer;
                    }
                }
                if (count1 | count2) >= min_gallop {
                    break;
                }
            }

            loop {
                count1 = len1
                    - gallop_right(
                        &self.tmp[end2 - 1],
                        &self.v[start1..start1 + len1],
                        len1 - 1,
                        &mut self.compare,
                    )?;
                if count1 != 0 {
                    dest -= count1;
                    end1 -= count1;
                    len1 -= count1;
                    shift_within(self.v, end1, dest, count1);
                    if len1 == 0 {
                        break 'outer;
                    }
                }

                dest -= 1;
                end2 -= 1;
                self.v[dest] = self.tmp[end2].clone();
                len2 -= 1;
                if len2 == 1 {
                    break 'outer;
                }

                count2 = len2
                    - gallop_left(
                        &self.v[end1 - 1],
                        &self.tmp[..len2],
                        len2 - 1,
                        &mut self.compare,
                    )?;
                if count2 != 0 {
                    dest -= count2;
                    end2 -= count2;
                    len2 -= count2;
                    self.v[dest..dest + count2].clone_from_slice(&self.tmp[end2..end2 + count2]);
                    if len2 <= 1 {
                        break 'outer;
                    }
                }

                dest -= 1;
                end1 -= 1;
                self.v[dest] = self.v[end1].clone();
                len1 -= 1;
                if len1 == 0 {
                    break 'outer;
                }

                min_gallop = min_gallop.saturating_sub(1);
                if count1 < MIN_GALLOP && count2 < MIN_GALLOP {
                    break;
                }
            }

            min_gallop += 2;
        }

        self.min_gallop = min_gallop.max(1);

        if len2 == 1 {
            dest -= len1;
            end1 -= len1;
            shift_within(self.v, end1, dest, len1);
            self.v[dest - 1] = self.tmp[end2 - 1].clone();
        } else if len2 == 0 {
            // Comparator contradicted itself; what is left of run 1 is already in place.
            warn!("inconsistent comparison results detected while merging high");
        } else {
            self.v[dest - len2..dest].clone_from_slice(&self.tmp[..len2]);
        }
        Ok(())
    }
}
