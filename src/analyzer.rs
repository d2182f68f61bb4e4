// src/analyzer.rs
// Turns one captured table frame into a structured observation: hero
// position, hero hole cards and the raises made before hero acts.

use tracing::{debug, trace};

use crate::capture::Frame;
use crate::config::TableLayout;
use crate::geometry::PixelRect;
use crate::hand::CardPair;
use crate::ocr;
use crate::templates::{TemplateKey, TemplateLibrary, DEALER_MARKER};

/// Kind of a prior action. Limps and posts are not tracked; only raises
/// change which chart scenario applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Raise,
}

/// One action taken by an opponent before hero's turn.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorAction {
    /// Position label of the actor ("BTN"), or the seat name when the
    /// dealer button was not found this frame.
    pub position: String,
    pub kind: ActionKind,
    /// Bet text exactly as recognized from the frame, e.g. "2.5BB".
    pub raw_size_text: String,
}

/// Everything the decision layer needs from a single frame. Every field
/// is best-effort; an unreadable table yields an empty observation, not
/// an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableObservation {
    pub position: Option<String>,
    pub hand: Option<CardPair>,
    pub actions_before: Vec<PriorAction>,
}

/// Frame analyzer bound to a loaded template library.
pub struct TableAnalyzer<'a> {
    templates: &'a TemplateLibrary,
    threshold: f32,
}

impl<'a> TableAnalyzer<'a> {
    pub fn new(templates: &'a TemplateLibrary, threshold: f32) -> Self {
        Self {
            templates,
            threshold,
        }
    }

    pub fn analyze(&self, frame: &Frame, layout: &TableLayout) -> TableObservation {
        let gray = frame.to_gray();

        let anchors: Vec<PixelRect> = layout
            .seats
            .iter()
            .filter_map(|s| s.anchor.resolve(frame.width, frame.height).ok())
            .collect();
        let dealer_seat = if anchors.len() == layout.seats.len() {
            self.templates
                .find(&gray, &TemplateKey::Marker(DEALER_MARKER.into()), self.threshold)
                .and_then(|hit| nearest_seat((hit.0 as f64, hit.1 as f64), &anchors))
        } else {
            None
        };

        let ring = layout.position_ring();
        let n = layout.seats.len();
        let position = match (ring, dealer_seat) {
            (Some(ring), Some(d)) => seat_position(ring, n, d, 0).map(str::to_string),
            _ => None,
        };
        debug!(?dealer_seat, ?position, "seat inference");

        let hand = self.read_hero_cards(frame, layout);

        let mut actions_before = Vec::new();
        for seat_idx in acting_order(n, dealer_seat) {
            // Seat 0 is hero's own chair.
            if seat_idx == 0 {
                continue;
            }
            let seat = &layout.seats[seat_idx];
            let Ok(rect) = seat.bet_region.resolve(frame.width, frame.height) else {
                continue;
            };
            let text = ocr::read_region(frame, &rect, true);
            if let Some(bet) = bet_text(&text) {
                let label = match (ring, dealer_seat) {
                    (Some(ring), Some(d)) => seat_position(ring, n, d, seat_idx)
                        .map(str::to_string)
                        .unwrap_or_else(|| seat.name.clone()),
                    _ => seat.name.clone(),
                };
                trace!(seat = %label, bet = %bet, "raise observed");
                actions_before.push(PriorAction {
                    position: label,
                    kind: ActionKind::Raise,
                    raw_size_text: bet.to_string(),
                });
            }
        }

        TableObservation {
            position,
            hand,
            actions_before,
        }
    }

    /// Hero's hole-card region, split in half for the two cards. Both
    /// halves must recognize a card for a hand to be reported.
    fn read_hero_cards(&self, frame: &Frame, layout: &TableLayout) -> Option<CardPair> {
        let rect = layout.hero_cards.resolve(frame.width, frame.height).ok()?;
        if rect.w < 2 {
            return None;
        }
        let half = rect.w / 2;
        let left = PixelRect::new(rect.x, rect.y, half, rect.h);
        let right = PixelRect::new(rect.x + half, rect.y, rect.w - half, rect.h);

        let first = self
            .templates
            .find_card(&frame.view_gray(&left)?, self.threshold)?;
        let second = self
            .templates
            .find_card(&frame.view_gray(&right)?, self.threshold)?;
        Some(CardPair::new(first, second))
    }
}

/// Seat index whose anchor center is closest to the match point.
fn nearest_seat(point: (f64, f64), anchors: &[PixelRect]) -> Option<usize> {
    anchors
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let (cx, cy) = a.center();
            let (dx, dy) = (cx - point.0, cy - point.1);
            (i, dx * dx + dy * dy)
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// Position label of `seat_idx` given that `dealer_idx` holds the
/// button. Seats are laid out clockwise, as is the ring.
fn seat_position(
    ring: &'static [&'static str],
    seats: usize,
    dealer_idx: usize,
    seat_idx: usize,
) -> Option<&'static str> {
    if seats == 0 || seats != ring.len() || dealer_idx >= seats || seat_idx >= seats {
        return None;
    }
    Some(ring[(seat_idx + seats - dealer_idx) % seats])
}

/// Seat indices in preflop acting order (UTG first, BB last) so the
/// last recorded raise is the current aggressor. Without a dealer seat
/// the layout order is used as-is.
fn acting_order(seats: usize, dealer_idx: Option<usize>) -> Vec<usize> {
    match dealer_idx {
        Some(d) if seats >= 4 => (3..seats)
            .chain(0..3)
            .map(|k| (d + k) % seats)
            .collect(),
        _ => (0..seats).collect(),
    }
}

/// A visible bet label means that seat raised; the text is carried
/// verbatim for logging and any size-aware charts.
fn bet_text(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeatLayout;
    use crate::geometry::RegionOfInterest;
    use image::{Rgba, RgbaImage};

    const RING: &[&str] = &["BTN", "SB", "BB", "UTG", "HJ", "CO"];

    fn textured_frame(width: u32, height: u32, seed: u32) -> Frame {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            let mut h = x
                .wrapping_mul(0x9E37_79B1)
                ^ y.wrapping_mul(0x85EB_CA77)
                ^ seed.wrapping_mul(0xC2B2_AE3D);
            h ^= h >> 15;
            h = h.wrapping_mul(0x27D4_EB2F);
            h ^= h >> 13;
            let v = (h & 0xFF) as u8;
            Rgba([v, v, v, 255])
        });
        Frame::from_rgba(&img, PixelRect::new(0, 0, width, height))
    }

    fn abs(x: u32, y: u32, w: u32, h: u32) -> RegionOfInterest {
        RegionOfInterest::Absolute { x, y, w, h }
    }

    fn seat(name: &str, ax: u32, ay: u32) -> SeatLayout {
        SeatLayout {
            name: name.to_string(),
            anchor: abs(ax, ay, 10, 10),
            bet_region: abs(ax, ay + 12, 10, 4),
        }
    }

    fn six_seat_layout() -> TableLayout {
        TableLayout {
            table_size: "6max".to_string(),
            hero_cards: abs(80, 100, 60, 30),
            seats: vec![
                seat("Hero", 100, 130),
                seat("Seat2", 10, 90),
                seat("Seat3", 10, 10),
                seat("Seat4", 100, 5),
                seat("Seat5", 180, 10),
                seat("Seat6", 180, 90),
            ],
        }
    }

    #[test]
    fn seat_position_rotates_ring_around_dealer() {
        assert_eq!(seat_position(RING, 6, 0, 0), Some("BTN"));
        assert_eq!(seat_position(RING, 6, 1, 0), Some("CO"));
        assert_eq!(seat_position(RING, 6, 1, 1), Some("BTN"));
        assert_eq!(seat_position(RING, 6, 1, 2), Some("SB"));
        assert_eq!(seat_position(RING, 6, 3, 0), Some("UTG"));
        assert_eq!(seat_position(RING, 6, 6, 0), None);
        assert_eq!(seat_position(RING, 5, 0, 0), None);
    }

    #[test]
    fn nearest_seat_picks_closest_anchor_center() {
        let anchors = vec![
            PixelRect::new(0, 0, 10, 10),
            PixelRect::new(100, 0, 10, 10),
            PixelRect::new(50, 80, 10, 10),
        ];
        assert_eq!(nearest_seat((2.0, 3.0), &anchors), Some(0));
        assert_eq!(nearest_seat((98.0, 8.0), &anchors), Some(1));
        assert_eq!(nearest_seat((60.0, 70.0), &anchors), Some(2));
        assert_eq!(nearest_seat((0.0, 0.0), &[]), None);
    }

    #[test]
    fn acting_order_starts_at_utg_and_ends_on_bb() {
        // Dealer at seat 1 of six: UTG is seat 4, BB is seat 3.
        assert_eq!(acting_order(6, Some(1)), vec![4, 5, 0, 1, 2, 3]);
        assert_eq!(acting_order(6, None), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(acting_order(3, Some(0)), vec![0, 1, 2]);
    }

    #[test]
    fn bet_text_requires_visible_content() {
        assert_eq!(bet_text("2.5BB"), Some("2.5BB"));
        assert_eq!(bet_text("  $12 "), Some("$12"));
        assert_eq!(bet_text(""), None);
        assert_eq!(bet_text("   "), None);
    }

    #[test]
    fn empty_library_yields_empty_observation() {
        let lib = TemplateLibrary::empty();
        let analyzer = TableAnalyzer::new(&lib, 0.8);
        let frame = textured_frame(200, 150, 1);

        let obs = analyzer.analyze(&frame, &six_seat_layout());
        assert_eq!(obs.position, None);
        assert_eq!(obs.hand, None);
    }

    #[test]
    fn dealer_marker_and_hero_cards_are_read_from_the_frame() {
        let frame = textured_frame(200, 150, 42);
        let gray = frame.to_gray();
        let crop = |x: u32, y: u32, w: u32, h: u32| {
            image::GrayImage::from_fn(w, h, |cx, cy| *gray.get_pixel(x + cx, y + cy))
        };

        let dir = tempfile::tempdir().unwrap();
        // Dealer button texture lives next to Seat3's anchor (10, 10).
        crop(14, 14, 8, 8)
            .save(dir.path().join("dealer_button.png"))
            .unwrap();
        // Hero region is x 80..140: left half 80..110, right 110..140.
        crop(84, 104, 8, 10).save(dir.path().join("rank_A.png")).unwrap();
        crop(96, 116, 8, 8).save(dir.path().join("suit_s.png")).unwrap();
        crop(114, 104, 8, 10).save(dir.path().join("rank_K.png")).unwrap();
        crop(126, 116, 8, 8).save(dir.path().join("suit_h.png")).unwrap();

        let lib = TemplateLibrary::load(dir.path());
        assert_eq!(lib.len(), 5);
        let analyzer = TableAnalyzer::new(&lib, 0.999);

        let obs = analyzer.analyze(&frame, &six_seat_layout());
        // Seat3 (index 2) holds the button, so hero is four seats after
        // it: (0 + 6 - 2) % 6 = 4 -> "HJ".
        assert_eq!(obs.position.as_deref(), Some("HJ"));
        let hand = obs.hand.expect("both hole cards recognized");
        assert_eq!(hand.notation(), "AKo");
    }
}
