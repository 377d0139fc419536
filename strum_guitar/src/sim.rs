//! Mouse-driven hand simulator using `minifb`.
//!
//! ```text
//! ┌──────────────────────────┐
//! │                          │
//! │        ┌──────┐ ▲ thumb  │   mouse Y  → hand center
//! │        │ hand │          │   Space    → thumb extended
//! │ ═══════╪══════╪═════════ │   Q / Esc  → quit
//! │ ═══════╪══════╪═════════ │
//! │        └──────┘          │   pointer outside → no hand
//! │                          │
//! └──────────────────────────┘
//! ```
//!
//! The window is an input surface only: it produces synthetic
//! [`LandmarkFrame`]s and draws where the simulated hand is.

use std::time::{Duration, Instant};

use minifb::{Key, KeyRepeat, MouseMode, Window, WindowOptions};
use strum_detect::LandmarkFrame;

use crate::sampler::{LandmarkSampler, Sample};
use crate::AppError;

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:     usize = 480;
pub const WIN_H:     usize = 640;
/// Simulated hand height as a fraction of the window.
const HAND_HEIGHT:   f32   = 0.25;
const HAND_W:        usize = 70;
const THUMB_GAP_OUT: f32   = 0.12;
const THUMB_GAP_IN:  f32   = 0.01;
const STRING_COUNT:  usize = 6;
const BG_COLOR:      u32   = 0xFF1A1A2E;
const STRING_COLOR:  u32   = 0xFF8A7F6A;
const FIST_COLOR:    u32   = 0xFFE0A070;
const OPEN_COLOR:    u32   = 0xFF70C0E0;
const THUMB_COLOR:   u32   = 0xFFFFD700;

// ════════════════════════════════════════════════════════════════════════════
// SimSource
// ════════════════════════════════════════════════════════════════════════════

pub struct SimSource {
    window:  Window,
    buf:     Vec<u32>,
    started: Instant,
}

impl SimSource {
    pub fn new() -> Result<Self, AppError> {
        let mut window = Window::new(
            "Strum Guitar — move the mouse to strum, hold Space for thumb up",
            WIN_W,
            WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| AppError::Source(e.to_string()))?;

        window.limit_update_rate(Some(Duration::from_millis(16))); // ~60fps

        Ok(SimSource {
            window,
            buf: vec![BG_COLOR; WIN_W * WIN_H],
            started: Instant::now(),
        })
    }

    fn quit_requested(&self) -> bool {
        self.window.is_key_pressed(Key::Q, KeyRepeat::No)
            || self.window.is_key_pressed(Key::Escape, KeyRepeat::No)
    }

    // ── Rendering ─────────────────────────────────────────────────────────

    fn render(&mut self, hand: Option<(usize, usize)>, extended: bool) {
        self.buf.fill(BG_COLOR);

        let band_top = WIN_H / 2 - 40;
        for i in 0..STRING_COUNT {
            let y = band_top + i * 16;
            self.fill_rect(0, y, WIN_W, 2, STRING_COLOR);
        }

        if let Some((cx, cy)) = hand {
            let h  = (HAND_HEIGHT * WIN_H as f32) as usize;
            let x0 = cx.saturating_sub(HAND_W / 2);
            let y0 = cy.saturating_sub(h / 2);
            let color = if extended { OPEN_COLOR } else { FIST_COLOR };
            self.fill_rect(x0, y0, HAND_W, h, color);
            self.draw_border(x0, y0, HAND_W, h, 0xFF000000);
            if extended {
                let ty = y0.saturating_sub(30);
                self.fill_rect(x0.saturating_sub(10), ty, 12, 30, THUMB_COLOR);
            }
        }

        self.window.update_with_buffer(&self.buf, WIN_W, WIN_H).ok();
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(WIN_H) {
            for col in x..(x + w).min(WIN_W) {
                self.buf[row * WIN_W + col] = color;
            }
        }
    }

    fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        if w == 0 || h == 0 {
            return;
        }
        for col in x..(x + w).min(WIN_W) {
            if y < WIN_H         { self.buf[y * WIN_W + col] = color; }
            if y + h - 1 < WIN_H { self.buf[(y + h - 1) * WIN_W + col] = color; }
        }
        for row in y..(y + h).min(WIN_H) {
            if x < WIN_W         { self.buf[row * WIN_W + x] = color; }
            if x + w - 1 < WIN_W { self.buf[row * WIN_W + x + w - 1] = color; }
        }
    }
}

impl LandmarkSampler for SimSource {
    fn next_sample(&mut self) -> Sample {
        if !self.window.is_open() || self.quit_requested() {
            return Sample::Closed;
        }

        let timestamp = self.started.elapsed().as_secs_f64();
        let extended  = self.window.is_key_down(Key::Space);
        let pointer   = self.window.get_mouse_pos(MouseMode::Discard);

        let hand = pointer.map(|(mx, my)| (mx.max(0.0) as usize, my.max(0.0) as usize));
        self.render(hand, extended);

        match pointer {
            Some((mx, my)) => Sample::Hand(simulated_frame(
                timestamp,
                mx / WIN_W as f32,
                my / WIN_H as f32,
                extended,
            )),
            None => Sample::NoHand { timestamp },
        }
    }
}

/// The synthetic hand the simulator reports for a pointer position in
/// normalised window coordinates.
pub fn simulated_frame(timestamp: f64, x: f32, y: f32, extended: bool) -> LandmarkFrame {
    let gap = if extended { THUMB_GAP_OUT } else { THUMB_GAP_IN };
    LandmarkFrame::synthetic(timestamp, x, y, gap, HAND_HEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use strum_detect::{DetectorConfig, ShapeClassifier};

    #[test]
    fn space_toggles_the_shape_signal() {
        let classifier = ShapeClassifier::new(DetectorConfig::default().shape_threshold);
        assert!(classifier.classify(&simulated_frame(0.0, 0.5, 0.5, true)).extended);
        assert!(!classifier.classify(&simulated_frame(0.0, 0.5, 0.5, false)).extended);
    }

    #[test]
    fn pointer_maps_to_hand_center() {
        let f = simulated_frame(0.0, 0.4, 0.7, false);
        assert_abs_diff_eq!(f.center().y, 0.7, epsilon = 1e-6);
        assert_abs_diff_eq!(f.hand_height(), HAND_HEIGHT, epsilon = 1e-6);
    }
}
