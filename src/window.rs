// src/window.rs
// Foreground-window detection and title-based scoping.

use crate::geometry::PixelRect;

/// Opaque OS window identity. Equality is the only operation the agent
/// loop needs: a changed handle means a new table came to the front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u64);

/// Snapshot of the frontmost window at one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundWindow {
    pub handle: WindowHandle,
    pub title: String,
    /// Screen-space window rectangle, the base for fractional regions.
    pub bounds: PixelRect,
}

/// Source of "what window is frontmost right now". Behind a trait so
/// the agent loop can be driven by a scripted probe in tests.
pub trait ForegroundProbe {
    /// `None` when there is no usable foreground window this poll.
    fn foreground(&mut self) -> Option<ForegroundWindow>;
}

/// Case-sensitive substring match against the configured title list.
pub fn title_matches(title: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|p| !p.is_empty() && title.contains(p))
}

/// Probe backed by the platform's native notion of window focus.
#[derive(Debug, Default)]
pub struct SystemProbe;

impl SystemProbe {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(windows)]
impl ForegroundProbe for SystemProbe {
    fn foreground(&mut self) -> Option<ForegroundWindow> {
        use windows::Win32::Foundation::RECT;
        use windows::Win32::UI::WindowsAndMessaging::{
            GetForegroundWindow, GetWindowRect, GetWindowTextW,
        };

        unsafe {
            let hwnd = GetForegroundWindow();
            if hwnd.0 == 0 {
                return None;
            }

            let mut buf = [0u16; 512];
            let len = GetWindowTextW(hwnd, &mut buf) as usize;
            let title = String::from_utf16_lossy(&buf[..len]);

            let mut rect = RECT::default();
            GetWindowRect(hwnd, &mut rect).ok()?;
            let width = rect.right.saturating_sub(rect.left).max(0) as u32;
            let height = rect.bottom.saturating_sub(rect.top).max(0) as u32;

            Some(ForegroundWindow {
                handle: WindowHandle(hwnd.0 as u64),
                title,
                bounds: PixelRect::new(
                    rect.left.max(0) as u32,
                    rect.top.max(0) as u32,
                    width,
                    height,
                ),
            })
        }
    }
}

#[cfg(not(windows))]
impl ForegroundProbe for SystemProbe {
    /// Best-effort stand-in where no focus API is exposed: the window
    /// enumeration is roughly z-ordered, so the first non-minimized
    /// window of plausible size is taken as frontmost.
    fn foreground(&mut self) -> Option<ForegroundWindow> {
        let windows = match xcap::Window::all() {
            Ok(windows) => windows,
            Err(e) => {
                tracing::debug!(error = %e, "window enumeration failed");
                return None;
            }
        };

        windows
            .into_iter()
            .find(|w| !w.is_minimized() && w.width() >= 100 && w.height() >= 100)
            .map(|w| ForegroundWindow {
                handle: WindowHandle(w.id() as u64),
                title: w.title().to_string(),
                bounds: PixelRect::new(
                    w.x().max(0) as u32,
                    w.y().max(0) as u32,
                    w.width(),
                    w.height(),
                ),
            })
    }
}
