// src/ocr.rs
// Tesseract-backed text extraction for bet-size regions.
//
// Pipeline: crop -> grayscale -> Otsu binary-inverse threshold ->
// single-line OCR via the tesseract CLI. Failures of any kind yield an
// empty string; nothing here ever aborts an analysis cycle.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use image::GrayImage;
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::capture::Frame;
use crate::geometry::PixelRect;

/// Characters accepted in numeric mode: digits, decimal point, currency
/// and big-blind suffixes as they appear on the table.
const NUMERIC_WHITELIST: &str = "0123456789.$BB";

/// Hard deadline on the tesseract subprocess. The engine normally
/// returns in well under a second for a single text line.
const OCR_TIMEOUT: Duration = Duration::from_secs(2);

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Read the text content of `rect` (frame-relative pixels) from a
/// captured frame. With `numeric` set, recognition is restricted to the
/// bet-size character whitelist.
pub fn read_region(frame: &Frame, rect: &PixelRect, numeric: bool) -> String {
    let Some(gray) = frame.view_gray(rect) else {
        debug!(?rect, "ocr region outside frame, skipping");
        return String::new();
    };
    let binary = binarize(&gray);
    recognize(&binary, numeric)
}

/// Otsu binary-inverse threshold, matching the preprocessing the bet
/// labels were tuned against (light text over dark felt).
pub(crate) fn binarize(gray: &GrayImage) -> GrayImage {
    let level = otsu_level(gray);
    threshold(gray, level, ThresholdType::BinaryInverted)
}

fn recognize(binary: &GrayImage, numeric: bool) -> String {
    let temp_path = temp_image_path();
    if let Err(e) = binary.save(&temp_path) {
        debug!(error = %e, "failed to write ocr temp image");
        return String::new();
    }
    let text = run_tesseract(&temp_path, numeric).unwrap_or_default();
    let _ = std::fs::remove_file(&temp_path);
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

fn temp_image_path() -> PathBuf {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("pokerscout_ocr_{}_{}.png", std::process::id(), n))
}

fn run_tesseract(path: &std::path::Path, numeric: bool) -> Option<String> {
    let mut cmd = Command::new("tesseract");
    cmd.arg(path)
        .arg("stdout")
        .arg("--psm")
        .arg("7")
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    if numeric {
        cmd.arg("-c")
            .arg(format!("tessedit_char_whitelist={NUMERIC_WHITELIST}"));
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            debug!(error = %e, "failed to run tesseract");
            return None;
        }
    };

    // Bounded wait: a hung engine must not stall the agent loop.
    let deadline = Instant::now() + OCR_TIMEOUT;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if Instant::now() >= deadline {
                    debug!("tesseract exceeded deadline, killing");
                    let _ = child.kill();
                    let _ = child.wait();
                    return None;
                }
                std::thread::sleep(Duration::from_millis(25));
            }
            Err(e) => {
                debug!(error = %e, "failed to wait on tesseract");
                return None;
            }
        }
    };

    if !status.success() {
        debug!(?status, "tesseract exited with failure");
        return None;
    }

    let mut out = String::new();
    use std::io::Read;
    child.stdout.take()?.read_to_string(&mut out).ok()?;
    Some(out)
}
