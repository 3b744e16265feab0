//! Overlay placement.

use crate::config::Layout;

/// Where the overlay sits on screen, in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayGeometry {
    /// X position of the top-left corner.
    pub x: i32,
    /// Y position of the top-left corner.
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl OverlayGeometry {
    /// Centre the overlay on a screen of size `screen`, then shift it by the
    /// layout offsets.
    ///
    /// The half-difference is truncated toward zero only after the offset is
    /// added, so `(105 - 100) / 2 - 10` lands on -7, not -8. Without
    /// screen information the offsets alone give the position.
    pub fn centered(screen: Option<(u32, u32)>, layout: &Layout) -> Self {
        let axis = |screen_len: Option<u32>, len: u32, offset: i64| -> i32 {
            let shift = offset.saturating_mul(2);
            let doubled = match screen_len {
                Some(screen_len) => (i64::from(screen_len) - i64::from(len)).saturating_add(shift),
                None => shift,
            };
            (doubled / 2).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
        };

        Self {
            x: axis(screen.map(|(w, _)| w), layout.width, layout.offset_x),
            y: axis(screen.map(|(_, h)| h), layout.height, layout.offset_y),
            width: layout.width,
            height: layout.height,
        }
    }
}
