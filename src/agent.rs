// src/agent.rs
// The polling loop: watch the foreground window, and when a table of
// interest comes to the front run one capture/analyze/decide cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::analyzer::TableAnalyzer;
use crate::capture::FrameSource;
use crate::config::{AgentConfig, TableLayout};
use crate::decision::DecisionEngine;
use crate::window::{title_matches, ForegroundProbe, ForegroundWindow, WindowHandle};

/// Where the loop currently is; logged on transitions for debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    WindowChanged,
    Capturing,
    Analyzing,
    Deciding,
    Throttling,
}

/// Edge trigger for foreground changes. Tracks the last handle seen at
/// every poll, matching or not, so alt-tabbing away and back to the
/// same table fires again.
pub struct FocusGate {
    patterns: Vec<String>,
    last: Option<WindowHandle>,
}

impl FocusGate {
    pub fn new(patterns: Vec<String>) -> Self {
        Self {
            patterns,
            last: None,
        }
    }

    /// Record one poll result. Returns true when the foreground handle
    /// changed and the new title is in scope.
    pub fn observe(&mut self, window: Option<&ForegroundWindow>) -> bool {
        let Some(window) = window else {
            self.last = None;
            return false;
        };
        let changed = self.last != Some(window.handle);
        self.last = Some(window.handle);
        changed && title_matches(&window.title, &self.patterns)
    }
}

/// Random human-ish pause after each recommendation.
fn throttle_delay(range: (u64, u64)) -> Duration {
    let (lo, hi) = (range.0.min(range.1), range.0.max(range.1));
    Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
}

/// The observe/advise loop over injected window and frame sources.
pub struct AgentLoop<'a, P, F> {
    probe: P,
    frames: F,
    analyzer: TableAnalyzer<'a>,
    engine: DecisionEngine<'a>,
    config: AgentConfig,
    layout: TableLayout,
    gate: FocusGate,
    state: LoopState,
}

impl<'a, P: ForegroundProbe, F: FrameSource> AgentLoop<'a, P, F> {
    pub fn new(
        probe: P,
        frames: F,
        analyzer: TableAnalyzer<'a>,
        engine: DecisionEngine<'a>,
        config: AgentConfig,
        layout: TableLayout,
    ) -> Self {
        let gate = FocusGate::new(config.window_titles.clone());
        Self {
            probe,
            frames,
            analyzer,
            engine,
            config,
            layout,
            gate,
            state: LoopState::Idle,
        }
    }

    fn enter(&mut self, state: LoopState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "state change");
            self.state = state;
        }
    }

    /// One full cycle against the given window. `None` means the cycle
    /// was abandoned before a recommendation (capture failure, degenerate
    /// window); the loop just waits for the next trigger.
    pub fn run_cycle(&mut self, window: &ForegroundWindow) -> Option<String> {
        self.enter(LoopState::WindowChanged);
        if window.bounds.w == 0 || window.bounds.h == 0 {
            warn!(title = %window.title, "foreground window has no area, skipping");
            self.enter(LoopState::Idle);
            return None;
        }

        self.enter(LoopState::Capturing);
        let frame = match self.frames.capture(&window.bounds) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, title = %window.title, "capture failed, skipping cycle");
                self.enter(LoopState::Idle);
                return None;
            }
        };
        if let Some(dir) = &self.config.frame_dump_dir {
            let name = format!(
                "frame_{}.png",
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_millis())
                    .unwrap_or_default()
            );
            if let Err(e) = frame.save_png(&dir.join(name)) {
                debug!(error = %e, "frame dump failed");
            }
        }

        self.enter(LoopState::Analyzing);
        let observation = self.analyzer.analyze(&frame, &self.layout);
        debug!(?observation, "table observed");

        self.enter(LoopState::Deciding);
        let advice = self.engine.decide(&observation);
        info!(
            title = %window.title,
            position = observation.position.as_deref().unwrap_or("?"),
            hand = %observation
                .hand
                .map(|h| h.notation())
                .unwrap_or_else(|| "?".to_string()),
            raises = observation.actions_before.len(),
            %advice,
            "recommendation"
        );
        Some(advice)
    }

    /// Poll until `cancel` is raised. Runs a cycle whenever a table
    /// window newly takes focus, then throttles before polling again.
    pub async fn run(&mut self, cancel: Arc<AtomicBool>) {
        info!(
            poll_ms = self.config.poll_interval_ms,
            titles = ?self.config.window_titles,
            "agent loop started"
        );
        while !cancel.load(Ordering::SeqCst) {
            let window = self.probe.foreground();
            if self.gate.observe(window.as_ref()) {
                if let Some(window) = window {
                    if self.run_cycle(&window).is_some() {
                        self.enter(LoopState::Throttling);
                        tokio::time::sleep(throttle_delay(self.config.throttle_ms)).await;
                    }
                }
            }
            self.enter(LoopState::Idle);
            tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
        }
        info!("agent loop stopped");
    }
}
