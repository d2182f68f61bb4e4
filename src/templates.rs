// src/templates.rs
// Reference-image library for card ranks, card suits and table markers,
// with masked and unmasked template matching.

use std::collections::HashMap;
use std::path::Path;

use image::GrayImage;
use imageproc::template_matching::{match_template, MatchTemplateMethod};
use tracing::{debug, warn};

use crate::hand::{Card, RANKS, SUITS};

/// File stem of the dealer button marker template.
pub const DEALER_MARKER: &str = "dealer_button";

const SUPPORTED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];
const MASK_SUFFIX: &str = "_mask";

/// Semantic identity of a template asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplateKey {
    Rank(char),
    Suit(char),
    Marker(String),
}

impl TemplateKey {
    /// Parse a file stem: `rank_A` / `suit_h` are card templates, any
    /// other stem is a table marker.
    fn from_stem(stem: &str) -> Self {
        if let Some(r) = stem.strip_prefix("rank_") {
            let mut chars = r.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                return TemplateKey::Rank(c.to_ascii_uppercase());
            }
        }
        if let Some(s) = stem.strip_prefix("suit_") {
            let mut chars = s.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                return TemplateKey::Suit(c.to_ascii_lowercase());
            }
        }
        TemplateKey::Marker(stem.to_string())
    }
}

/// A reference raster plus optional same-size binary mask. Loaded once,
/// never mutated.
struct TemplateAsset {
    image: GrayImage,
    mask: Option<GrayImage>,
}

/// Loaded set of reference templates. Owns its assets exclusively;
/// constructed once at startup and passed by reference to consumers.
pub struct TemplateLibrary {
    assets: HashMap<TemplateKey, TemplateAsset>,
}

impl TemplateLibrary {
    pub fn empty() -> Self {
        Self {
            assets: HashMap::new(),
        }
    }

    /// Eagerly load every template in `dir`. An unreadable file only
    /// costs that entry: a warning is logged and the rest of the
    /// library still loads.
    pub fn load(dir: &Path) -> Self {
        let mut assets = HashMap::new();

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "template directory unreadable, library is empty");
                return Self::empty();
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Some(ext) = path.extension().map(|e| e.to_string_lossy().to_lowercase()) else {
                continue;
            };
            if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
                continue;
            }
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };
            // Masks are picked up when their base template loads.
            if stem.ends_with(MASK_SUFFIX) {
                continue;
            }

            let image = match image::open(&path) {
                Ok(img) => img.to_luma8(),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load template, entry unavailable");
                    continue;
                }
            };

            let mask = Self::load_mask(&path, &stem, &ext, &image);
            let key = TemplateKey::from_stem(&stem);
            debug!(?key, masked = mask.is_some(), "loaded template");
            assets.insert(key, TemplateAsset { image, mask });
        }

        Self { assets }
    }

    fn load_mask(path: &Path, stem: &str, ext: &str, template: &GrayImage) -> Option<GrayImage> {
        let mask_path = path.with_file_name(format!("{stem}{MASK_SUFFIX}.{ext}"));
        if !mask_path.exists() {
            return None;
        }
        match image::open(&mask_path) {
            Ok(img) => {
                let mask = img.to_luma8();
                if mask.dimensions() != template.dimensions() {
                    warn!(path = %mask_path.display(), "mask size differs from template, ignoring mask");
                    None
                } else {
                    Some(mask)
                }
            }
            Err(e) => {
                warn!(path = %mask_path.display(), error = %e, "failed to load mask, matching unmasked");
                None
            }
        }
    }

    pub fn contains(&self, key: &TemplateKey) -> bool {
        self.assets.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Locate a template inside `frame`. Returns the top-left pixel of
    /// the match, or `None` when the key is unavailable or nothing
    /// crosses the threshold.
    ///
    /// Masked templates use a normalized sum-of-squared-differences
    /// metric (lower is better, in [0, 1]); a match is reported when the
    /// global minimum is <= 1 - threshold. Unmasked templates use
    /// normalized cross-correlation (higher is better) and report the
    /// FIRST raster-order location at or above the threshold. The
    /// asymmetry is kept for compatibility with existing thresholds;
    /// unifying on best-match is a candidate change.
    pub fn find(&self, frame: &GrayImage, key: &TemplateKey, threshold: f32) -> Option<(u32, u32)> {
        let asset = self.assets.get(key)?;
        let (tw, th) = asset.image.dimensions();
        let (fw, fh) = frame.dimensions();
        if tw == 0 || th == 0 || tw > fw || th > fh {
            return None;
        }

        match &asset.mask {
            Some(mask) => masked_sqdiff_best(frame, &asset.image, mask)
                .filter(|&(_, _, score)| score <= 1.0 - threshold)
                .map(|(x, y, _)| (x, y)),
            None => {
                let scores = match_template(
                    frame,
                    &asset.image,
                    MatchTemplateMethod::CrossCorrelationNormalized,
                );
                for y in 0..scores.height() {
                    for x in 0..scores.width() {
                        if scores.get_pixel(x, y)[0] >= threshold {
                            return Some((x, y));
                        }
                    }
                }
                None
            }
        }
    }

    /// Recognize a single card in `region`: ranks are tried in the fixed
    /// order of [`RANKS`], then suits in the order of [`SUITS`]; the
    /// first template that matches wins. Both must match to produce a
    /// card code.
    pub fn find_card(&self, region: &GrayImage, threshold: f32) -> Option<Card> {
        let rank = RANKS
            .chars()
            .find(|&r| self.find(region, &TemplateKey::Rank(r), threshold).is_some())?;
        let suit = SUITS
            .iter()
            .copied()
            .find(|&s| self.find(region, &TemplateKey::Suit(s), threshold).is_some())?;
        Card::new(rank, suit)
    }
}

/// Exhaustive masked SSD scan. Returns the global best (x, y, score)
/// with the score normalized to [0, 1]; `None` when the mask marks no
/// pixel valid.
fn masked_sqdiff_best(
    frame: &GrayImage,
    template: &GrayImage,
    mask: &GrayImage,
) -> Option<(u32, u32, f32)> {
    let (tw, th) = template.dimensions();
    let (fw, fh) = frame.dimensions();

    let valid: u64 = mask.pixels().filter(|p| p[0] > 0).count() as u64;
    if valid == 0 {
        return None;
    }
    let denom = valid as f64 * 255.0 * 255.0;

    let mut best: Option<(u32, u32, f32)> = None;
    for oy in 0..=(fh - th) {
        for ox in 0..=(fw - tw) {
            let mut sum: u64 = 0;
            for ty in 0..th {
                for tx in 0..tw {
                    if mask.get_pixel(tx, ty)[0] == 0 {
                        continue;
                    }
                    let f = frame.get_pixel(ox + tx, oy + ty)[0] as i64;
                    let t = template.get_pixel(tx, ty)[0] as i64;
                    let d = f - t;
                    sum += (d * d) as u64;
                }
            }
            let score = (sum as f64 / denom) as f32;
            if best.map_or(true, |(_, _, s)| score < s) {
                best = Some((ox, oy, score));
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    // Deterministic pseudo-random texture so only the exact offset
    // scores perfectly.
    fn textured(width: u32, height: u32, seed: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            let mut h = x
                .wrapping_mul(0x9E37_79B1)
                ^ y.wrapping_mul(0x85EB_CA77)
                ^ seed.wrapping_mul(0xC2B2_AE3D);
            h ^= h >> 15;
            h = h.wrapping_mul(0x27D4_EB2F);
            h ^= h >> 13;
            Luma([(h & 0xFF) as u8])
        })
    }

    fn crop(img: &GrayImage, x: u32, y: u32, w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |cx, cy| *img.get_pixel(x + cx, y + cy))
    }

    fn library_with(key: TemplateKey, image: GrayImage, mask: Option<GrayImage>) -> TemplateLibrary {
        let mut lib = TemplateLibrary::empty();
        lib.assets.insert(key, TemplateAsset { image, mask });
        lib
    }

    #[test]
    fn masked_match_finds_exact_offset_at_full_threshold() {
        let frame = textured(64, 48, 7);
        let template = crop(&frame, 20, 10, 12, 12);
        let mask = GrayImage::from_pixel(12, 12, Luma([255]));
        let lib = library_with(TemplateKey::Marker("dealer_button".into()), template, Some(mask));

        let hit = lib.find(&frame, &TemplateKey::Marker("dealer_button".into()), 1.0);
        assert_eq!(hit, Some((20, 10)));
    }

    #[test]
    fn masked_match_misses_on_unrelated_frame() {
        let frame = textured(64, 48, 7);
        let template = crop(&frame, 20, 10, 12, 12);
        let mask = GrayImage::from_pixel(12, 12, Luma([255]));
        let lib = library_with(TemplateKey::Marker("dealer_button".into()), template, Some(mask));

        // Entirely different texture: nothing should reach a perfect score.
        let other = textured(64, 48, 1234);
        let hit = lib.find(&other, &TemplateKey::Marker("dealer_button".into()), 1.0);
        assert_eq!(hit, None);
    }

    #[test]
    fn masked_match_ignores_pixels_outside_mask() {
        let frame = textured(40, 40, 3);
        let mut template = crop(&frame, 8, 8, 10, 10);
        // Corrupt a corner, then mask that corner out.
        let mut mask = GrayImage::from_pixel(10, 10, Luma([255]));
        for y in 0..4 {
            for x in 0..4 {
                template.put_pixel(x, y, Luma([255]));
                mask.put_pixel(x, y, Luma([0]));
            }
        }
        let lib = library_with(TemplateKey::Marker("m".into()), template, Some(mask));
        assert_eq!(lib.find(&frame, &TemplateKey::Marker("m".into()), 1.0), Some((8, 8)));
    }

    #[test]
    fn unmasked_match_reports_first_raster_hit() {
        let frame = textured(64, 48, 9);
        let template = crop(&frame, 30, 22, 8, 8);
        let lib = library_with(TemplateKey::Marker("chip".into()), template, None);

        let hit = lib.find(&frame, &TemplateKey::Marker("chip".into()), 0.999);
        assert_eq!(hit, Some((30, 22)));
    }

    #[test]
    fn unknown_key_and_oversized_template_miss() {
        let frame = textured(16, 16, 2);
        let lib = library_with(TemplateKey::Rank('A'), textured(32, 32, 5), None);
        assert_eq!(lib.find(&frame, &TemplateKey::Rank('K'), 0.5), None);
        // Template larger than the frame can never match.
        assert_eq!(lib.find(&frame, &TemplateKey::Rank('A'), 0.5), None);
    }

    #[test]
    fn find_card_combines_rank_and_suit() {
        let region = textured(60, 40, 11);
        let rank = crop(&region, 4, 4, 10, 12);
        let suit = crop(&region, 30, 20, 10, 10);

        let mut lib = TemplateLibrary::empty();
        lib.assets.insert(
            TemplateKey::Rank('A'),
            TemplateAsset { image: rank, mask: None },
        );
        lib.assets.insert(
            TemplateKey::Suit('h'),
            TemplateAsset { image: suit, mask: None },
        );

        let card = lib.find_card(&region, 0.999).unwrap();
        assert_eq!(card.code(), "Ah");
    }

    #[test]
    fn find_card_requires_both_rank_and_suit() {
        let region = textured(60, 40, 11);
        let rank = crop(&region, 4, 4, 10, 12);
        let lib = library_with(TemplateKey::Rank('A'), rank, None);
        assert!(lib.find_card(&region, 0.999).is_none());
    }

    #[test]
    fn load_skips_unreadable_entries_but_keeps_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        textured(10, 10, 1)
            .save(dir.path().join("rank_A.png"))
            .unwrap();
        std::fs::write(dir.path().join("suit_h.png"), b"not a png").unwrap();

        let lib = TemplateLibrary::load(dir.path());
        assert!(lib.contains(&TemplateKey::Rank('A')));
        assert!(!lib.contains(&TemplateKey::Suit('h')));
        assert_eq!(lib.len(), 1);
    }

    #[test]
    fn load_pairs_masks_with_templates() {
        let dir = tempfile::tempdir().unwrap();
        textured(10, 10, 1)
            .save(dir.path().join("dealer_button.png"))
            .unwrap();
        GrayImage::from_pixel(10, 10, Luma([255]))
            .save(dir.path().join("dealer_button_mask.png"))
            .unwrap();
        // Wrong-size mask is dropped, template still loads.
        textured(8, 8, 2).save(dir.path().join("rank_K.png")).unwrap();
        GrayImage::from_pixel(4, 4, Luma([255]))
            .save(dir.path().join("rank_K_mask.png"))
            .unwrap();

        let lib = TemplateLibrary::load(dir.path());
        assert!(lib.assets[&TemplateKey::Marker("dealer_button".into())]
            .mask
            .is_some());
        assert!(lib.assets[&TemplateKey::Rank('K')].mask.is_none());
    }
}
