// src/hand.rs
// Card types and canonical preflop hand notation.

use serde::{Deserialize, Serialize};

/// Rank characters in strength order. This string doubles as the fixed
/// enumeration order for template lookups: first-declared rank wins on
/// ambiguous crops.
pub const RANKS: &str = "AKQJT98765432";

/// Suit characters in fixed enumeration order.
pub const SUITS: [char; 4] = ['s', 'h', 'd', 'c'];

fn rank_index(rank: char) -> Option<usize> {
    RANKS.find(rank)
}

/// A single playing card, e.g. rank 'A' suit 'h'.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub rank: char,
    pub suit: char,
}

impl Card {
    pub fn new(rank: char, suit: char) -> Option<Self> {
        if rank_index(rank).is_some() && SUITS.contains(&suit) {
            Some(Self { rank, suit })
        } else {
            None
        }
    }

    /// Two-character card code, e.g. "Ah".
    pub fn code(&self) -> String {
        format!("{}{}", self.rank, self.suit)
    }
}

/// Hero's two hole cards as recognized from the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardPair {
    pub first: Card,
    pub second: Card,
}

impl CardPair {
    pub fn new(first: Card, second: Card) -> Self {
        Self { first, second }
    }

    /// Short hand notation ("77", "AKs", "AKo") suitable as input to
    /// [`canonicalize`]. Higher rank is written first.
    pub fn notation(&self) -> String {
        let (a, b) = (self.first, self.second);
        if a.rank == b.rank {
            return format!("{}{}", a.rank, b.rank);
        }
        let (hi, lo) = if rank_index(a.rank) < rank_index(b.rank) {
            (a, b)
        } else {
            (b, a)
        };
        let suffix = if hi.suit == lo.suit { 's' } else { 'o' };
        format!("{}{}{}", hi.rank, lo.rank, suffix)
    }
}

/// Normalize a typed or recognized hand into its canonical chart key.
///
/// Pure and total over strings: well-formed 2-3 character inputs map to
/// exactly one canonical form, everything else maps to `None`. A
/// two-character non-pair defaults to offsuit ("AK" -> "AKo"); a pair
/// never takes a suffix ("77s" is rejected).
pub fn canonicalize(hand_text: &str) -> Option<String> {
    let hand_text = hand_text.trim();
    let chars: Vec<char> = hand_text.chars().collect();
    if chars.len() < 2 || chars.len() > 3 {
        return None;
    }

    let mut card1 = chars[0].to_ascii_uppercase();
    let mut card2 = chars[1].to_ascii_uppercase();
    let (i1, i2) = (rank_index(card1)?, rank_index(card2)?);

    // Consistent order: AKs, never KAs.
    if i1 > i2 {
        std::mem::swap(&mut card1, &mut card2);
    }

    if chars.len() == 2 {
        return Some(if card1 == card2 {
            format!("{card1}{card2}")
        } else {
            format!("{card1}{card2}o")
        });
    }

    let suffix = chars[2].to_ascii_lowercase();
    match suffix {
        's' | 'o' if card1 != card2 => Some(format!("{card1}{card2}{suffix}")),
        _ => None,
    }
}
