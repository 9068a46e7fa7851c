//! Static level geometry

use serde::Serialize;

/// Playable area in world units (one unit per screen pixel)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle, `(x, y)` is the top-left corner and y grows down
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Platform {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Platform {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains_point(&self, px: f32, py: f32) -> bool {
        px >= self.left() && px <= self.right() && py >= self.top() && py <= self.bottom()
    }
}

/// Height of the floor strip along the bottom edge
pub const GROUND_HEIGHT: f32 = 40.0;
/// Thickness of floating ledges
pub const LEDGE_HEIGHT: f32 = 16.0;

/// Ledges as (x, y, width) fractions of the viewport
const LEDGES: [(f32, f32, f32); 5] = [
    (0.08, 0.70, 0.24),
    (0.68, 0.70, 0.24),
    (0.38, 0.50, 0.24),
    (0.10, 0.30, 0.20),
    (0.70, 0.30, 0.20),
];

/// Build the fixed layout for a viewport. The floor comes first.
pub fn generate_layout(viewport: Viewport) -> Vec<Platform> {
    let Viewport { width, height } = viewport;

    let mut platforms = vec![Platform::new(0.0, height - GROUND_HEIGHT, width, GROUND_HEIGHT)];
    platforms.extend(
        LEDGES
            .iter()
            .map(|&(fx, fy, fw)| Platform::new(fx * width, fy * height, fw * width, LEDGE_HEIGHT)),
    );
    platforms
}
