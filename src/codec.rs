//! Compact state tokens
//!
//! A token packs the draw sequence that produced the initial permutation and
//! the answers given so far into a short URL-safe string. Bits are written
//! LSB-first into 6-bit symbols; the final symbol carries a 3-bit trailer that
//! records how many zero bits of padding precede it.
//!
//! Layout of the bit stream before padding:
//!
//! ```text
//! [2 reserved bits]
//! [draw 0: bits(N)] [draw 1: bits(N-1)] ... [draw N-2: bits(2)]
//! [answer width: 1 bit] [answer 0] [answer 1] ...
//! ```
//!
//! where `bits(k) = ceil(log2(max(2, k)))`. The answer section is only present
//! when at least one draw and one answer exist.

use crate::cache::Answer;
use crate::error::{RankError, RankResult};

/// The 64 symbols a token is made of, indexed by their 6-bit value
pub const ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

const SYMBOL_BITS: usize = 6;
const PAD_LENGTH_BITS: usize = 3;
const RESERVED_BITS: usize = 2;
const WORD_BITS: usize = u64::BITS as usize;

/// Number of bits needed to store one of `value_count` distinct values
pub fn required_bit_count(value_count: usize) -> usize {
    let n = value_count.max(2);
    (usize::BITS - (n - 1).leading_zeros()) as usize
}

/// Growable bit array with a read cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitStream {
    words: Vec<u64>,
    len: usize,
    position: usize,
}

impl BitStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits stored
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bits left between the read cursor and the end of the stream
    pub fn remaining(&self) -> usize {
        self.len - self.position
    }

    pub fn push_bit(&mut self, bit: bool) {
        let word = self.len / WORD_BITS;
        if word == self.words.len() {
            self.words.push(0);
        }
        if bit {
            self.words[word] |= 1 << (self.len % WORD_BITS);
        }
        self.len += 1;
    }

    /// Append the low `count` bits of `value`, least significant first
    pub fn write_bits(&mut self, value: u64, count: usize) {
        debug_assert!(count <= WORD_BITS);
        for i in 0..count {
            self.push_bit((value >> i) & 1 == 1);
        }
    }

    pub fn bit(&self, index: usize) -> bool {
        debug_assert!(index < self.len);
        (self.words[index / WORD_BITS] >> (index % WORD_BITS)) & 1 == 1
    }

    /// Read `count` bits starting at an absolute index, without moving the cursor
    fn bits_at(&self, start: usize, count: usize) -> u64 {
        (0..count).fold(0u64, |value, i| {
            value | (u64::from(self.bit(start + i)) << i)
        })
    }

    pub fn read_bit(&mut self) -> Option<bool> {
        if self.position >= self.len {
            return None;
        }
        let bit = self.bit(self.position);
        self.position += 1;
        Some(bit)
    }

    /// Read `count` bits; `None` if the stream ends first (cursor is left untouched)
    pub fn read_bits(&mut self, count: usize) -> Option<u64> {
        if count > self.remaining() {
            return None;
        }
        let value = self.bits_at(self.position, count);
        self.position += count;
        Some(value)
    }

    /// Drop every bit from `len` onwards
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        self.len = len;
        self.words.truncate((len + WORD_BITS - 1) / WORD_BITS);
        if len % WORD_BITS != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << (len % WORD_BITS)) - 1;
            }
        }
        self.position = self.position.min(len);
    }

    /// Render the stream as symbols, appending padding and its 3-bit length
    pub fn to_token(&self) -> String {
        let pad_length = 5 - ((self.len % SYMBOL_BITS) + 2) % SYMBOL_BITS;
        let mut padded = self.clone();
        padded.write_bits(0, pad_length);
        padded.write_bits(pad_length as u64, PAD_LENGTH_BITS);
        debug_assert_eq!(padded.len % SYMBOL_BITS, 0);

        (0..padded.len / SYMBOL_BITS)
            .map(|symbol| {
                let value = padded.bits_at(symbol * SYMBOL_BITS, SYMBOL_BITS);
                char::from(ALPHABET[value as usize])
            })
            .collect()
    }

    /// Parse a token back into the unpadded bit stream, cursor at the start
    pub fn from_token(token: &str) -> RankResult<Self> {
        if token.is_empty() {
            return Err(RankError::invalid_token("token is empty"));
        }

        let mut stream = BitStream::new();
        for symbol in token.bytes() {
            let value = ALPHABET
                .iter()
                .position(|&candidate| candidate == symbol)
                .ok_or_else(|| {
                    RankError::invalid_token(&format!(
                        "unexpected symbol '{}'",
                        char::from(symbol)
                    ))
                })?;
            stream.write_bits(value as u64, SYMBOL_BITS);
        }

        let pad_length = stream.bits_at(stream.len - PAD_LENGTH_BITS, PAD_LENGTH_BITS) as usize;
        if pad_length >= SYMBOL_BITS {
            return Err(RankError::invalid_token(&format!(
                "padding length {pad_length} out of range"
            )));
        }
        stream.truncate(stream.len - (pad_length + PAD_LENGTH_BITS));
        Ok(stream)
    }
}

/// Draws and answers recovered from a token
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenState {
    pub draws: Vec<usize>,
    pub answers: Vec<Answer>,
}

fn answer_code(answer: Answer) -> u64 {
    match answer {
        Answer::LessThan => 0,
        Answer::GreaterThan => 1,
        Answer::Equal => 2,
    }
}

fn answer_from_code(code: u64) -> Option<Answer> {
    match code {
        0 => Some(Answer::LessThan),
        1 => Some(Answer::GreaterThan),
        2 => Some(Answer::Equal),
        _ => None,
    }
}

/// Encode a draw sequence (length N-1 for N items) and the answers given so far
pub fn encode_token(draws: &[usize], answers: &[Answer]) -> String {
    let item_count = draws.len() + 1;
    let mut stream = BitStream::new();
    stream.write_bits(0, RESERVED_BITS);

    for (position, &draw) in draws.iter().enumerate() {
        stream.write_bits(draw as u64, required_bit_count(item_count - position));
    }

    if !draws.is_empty() && !answers.is_empty() {
        let wide = answers.contains(&Answer::Equal);
        stream.push_bit(wide);
        let width = if wide { 2 } else { 1 };
        for &answer in answers {
            stream.write_bits(answer_code(answer), width);
        }
    }

    stream.to_token()
}

/// Decode a token for a list of `item_count` items
///
/// Fails if the token is truncated before the full draw sequence, contains
/// foreign symbols, or names a draw outside its pool. A partial answer list is
/// accepted and simply ends where the bits do, or at the first unknown answer code.
pub fn decode_token(token: &str, item_count: usize) -> RankResult<TokenState> {
    let mut stream = BitStream::from_token(token)?;
    stream
        .read_bits(RESERVED_BITS)
        .ok_or_else(|| RankError::invalid_token("missing header"))?;

    let draw_count = item_count.saturating_sub(1);
    let mut draws = Vec::with_capacity(draw_count);
    for position in 0..draw_count {
        let pool = item_count - position;
        let value = stream.read_bits(required_bit_count(pool)).ok_or_else(|| {
            RankError::invalid_token(&format!(
                "truncated after {position} of {draw_count} draws"
            ))
        })? as usize;
        if value >= pool {
            return Err(RankError::invalid_token(&format!(
                "draw {value} at position {position} exceeds pool of {pool}"
            )));
        }
        draws.push(value);
    }

    let mut answers = Vec::new();
    if draw_count > 0 {
        if let Some(wide) = stream.read_bit() {
            let width = if wide { 2 } else { 1 };
            while let Some(answer) = stream.read_bits(width).and_then(answer_from_code) {
                answers.push(answer);
            }
        }
    }

    Ok(TokenState { draws, answers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_draws(rng: &mut StdRng, item_count: usize) -> Vec<usize> {
        (0..item_count.saturating_sub(1))
            .map(|position| rng.gen_range(0..item_count - position))
            .collect()
    }

    #[test]
    fn test_required_bit_count() {
        assert_eq!(required_bit_count(0), 1);
        assert_eq!(required_bit_count(1), 1);
        assert_eq!(required_bit_count(2), 1);
        assert_eq!(required_bit_count(3), 2);
        assert_eq!(required_bit_count(4), 2);
        assert_eq!(required_bit_count(5), 3);
        assert_eq!(required_bit_count(10), 4);
        assert_eq!(required_bit_count(64), 6);
        assert_eq!(required_bit_count(65), 7);
    }

    #[test]
    fn test_bit_stream_reads_back_lsb_first() {
        let mut stream = BitStream::new();
        stream.write_bits(0b101, 3);
        stream.write_bits(0x3ff, 10);
        stream.write_bits(u64::MAX, 64);
        assert_eq!(stream.len(), 77);
        assert!(stream.bit(0));
        assert!(!stream.bit(1));
        assert_eq!(stream.read_bits(3), Some(0b101));
        assert_eq!(stream.read_bits(10), Some(0x3ff));
        assert_eq!(stream.read_bits(64), Some(u64::MAX));
        assert_eq!(stream.read_bit(), None);
        assert_eq!(stream.read_bits(1), None);
    }

    #[test]
    fn test_truncate_clears_tail() {
        let mut stream = BitStream::new();
        stream.write_bits(0xff, 8);
        stream.truncate(3);
        stream.write_bits(0, 5);
        assert_eq!(stream.read_bits(8), Some(0b111));
    }

    #[test]
    fn test_padding_makes_whole_symbols() {
        for len in 0..20 {
            let mut stream = BitStream::new();
            stream.write_bits(0, len);
            let token = stream.to_token();
            let decoded = BitStream::from_token(&token).unwrap();
            assert_eq!(decoded.len(), len, "length {len}");
        }
    }

    #[test]
    fn test_known_three_item_token() {
        // 2 reserved + 2 + 1 draw bits, 1 width bit, 3 x 2 answer bits = 12 bits,
        // padded to 18 bits: three symbols
        let draws = vec![1, 0];
        let answers = vec![Answer::GreaterThan, Answer::LessThan, Answer::Equal];
        let token = encode_token(&draws, &answers);
        assert_eq!(token.len(), 3);
        let state = decode_token(&token, 3).unwrap();
        assert_eq!(state.draws, draws);
        assert_eq!(state.answers, answers);
    }

    #[test]
    fn test_round_trip_random_states() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for item_count in 1..60 {
            for _ in 0..5 {
                let draws = random_draws(&mut rng, item_count);
                let max_answers = if item_count > 1 { item_count * 8 } else { 0 };
                let answer_count = rng.gen_range(0..=max_answers);
                let with_equal = rng.gen_bool(0.5);
                let answers: Vec<Answer> = (0..answer_count)
                    .map(|_| match rng.gen_range(0..if with_equal { 3 } else { 2 }) {
                        0 => Answer::LessThan,
                        1 => Answer::GreaterThan,
                        _ => Answer::Equal,
                    })
                    .collect();

                let token = encode_token(&draws, &answers);
                let state = decode_token(&token, item_count).unwrap();
                assert_eq!(state.draws, draws, "draws for {item_count} items");
                assert_eq!(state.answers, answers, "answers for {item_count} items");
            }
        }
    }

    #[test]
    fn test_single_item_round_trip() {
        let token = encode_token(&[], &[]);
        let state = decode_token(&token, 1).unwrap();
        assert!(state.draws.is_empty());
        assert!(state.answers.is_empty());
    }

    #[test]
    fn test_binary_answers_use_one_bit() {
        let draws = vec![0; 9];
        let narrow = encode_token(&draws, &vec![Answer::GreaterThan; 30]);
        let mut wide_answers = vec![Answer::GreaterThan; 30];
        wide_answers[29] = Answer::Equal;
        let wide = encode_token(&draws, &wide_answers);
        assert!(narrow.len() < wide.len());
    }

    #[test]
    fn test_short_token_is_invalid() {
        // the first draw for ten items alone needs four bits
        assert!(decode_token("A", 10).is_err());
        let full = encode_token(&vec![0; 9], &[]);
        assert!(decode_token(&full[..full.len() - 1], 10).is_err());
    }

    #[test]
    fn test_empty_and_foreign_symbols_are_invalid() {
        assert!(matches!(
            decode_token("", 3),
            Err(RankError::InvalidToken { .. })
        ));
        assert!(matches!(
            decode_token("AB*", 3),
            Err(RankError::InvalidToken { .. })
        ));
    }

    #[test]
    fn test_out_of_range_draw_is_invalid() {
        // position 0 of three items has two bits but only three legal values
        let mut stream = BitStream::new();
        stream.write_bits(0, RESERVED_BITS);
        stream.write_bits(3, 2);
        stream.write_bits(0, 1);
        assert!(decode_token(&stream.to_token(), 3).is_err());
    }

    #[test]
    fn test_unknown_answer_code_ends_answer_list() {
        let mut stream = BitStream::new();
        stream.write_bits(0, RESERVED_BITS);
        stream.write_bits(1, 2);
        stream.write_bits(0, 1);
        stream.push_bit(true);
        for code in [0, 2, 3, 1] {
            stream.write_bits(code, 2);
        }
        let state = decode_token(&stream.to_token(), 3).unwrap();
        assert_eq!(state.draws, vec![1, 0]);
        assert_eq!(state.answers, vec![Answer::LessThan, Answer::Equal]);
    }

    #[test]
    fn test_token_uses_url_safe_alphabet() {
        let mut rng = StdRng::seed_from_u64(7);
        let draws = random_draws(&mut rng, 40);
        let token = encode_token(&draws, &[Answer::Equal; 50]);
        assert!(token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
    }
}
