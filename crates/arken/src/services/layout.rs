//! Chat Layout
//!
//! Fixed placement of the chat panel and its children on a canvas that
//! scales with the screen. All rects are in reference pixels with the
//! origin at the bottom-left of their parent.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Axis-aligned rectangle, bottom-left origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Canvas scaling and chat widget placement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatLayout {
    pub reference_resolution: Vec2,
    /// 0 matches width, 1 matches height
    pub match_width_or_height: f32,
    pub panel: Rect,
    pub scroll_margin: f32,
    pub scroll_bottom_gap: f32,
    pub input: Rect,
    pub send_button: Rect,
}

impl Default for ChatLayout {
    fn default() -> Self {
        Self {
            reference_resolution: Vec2::new(1920.0, 1080.0),
            match_width_or_height: 0.5,
            panel: Rect::new(16.0, 16.0, 520.0, 260.0),
            scroll_margin: 8.0,
            scroll_bottom_gap: 52.0,
            input: Rect::new(8.0, 8.0, 400.0, 32.0),
            send_button: Rect::new(416.0, 8.0, 88.0, 32.0),
        }
    }
}

impl ChatLayout {
    /// Transcript area, stretched inside the panel above the input row
    pub fn scroll_view(&self) -> Rect {
        let m = self.scroll_margin;
        Rect::new(
            m,
            self.scroll_bottom_gap,
            (self.panel.width - 2.0 * m).max(0.0),
            (self.panel.height - self.scroll_bottom_gap - m).max(0.0),
        )
    }

    /// Canvas scale for a screen size, blending width and height in log space
    pub fn scale_factor(&self, screen: Vec2) -> f32 {
        let reference = self.reference_resolution;
        if !(screen.x > 0.0 && screen.y > 0.0 && reference.x > 0.0 && reference.y > 0.0) {
            debug!(width = screen.x, height = screen.y, "Degenerate screen size; scale 1");
            return 1.0;
        }

        let log_width = (screen.x / reference.x).log2();
        let log_height = (screen.y / reference.y).log2();
        let t = self.match_width_or_height.clamp(0.0, 1.0);
        (log_width + (log_height - log_width) * t).exp2()
    }
}
