//! Per-tab zoom

/// Lowest zoom percentage
pub const MIN_ZOOM: u16 = 50;
/// Highest zoom percentage
pub const MAX_ZOOM: u16 = 200;
/// Increment used by zoom in/out
pub const ZOOM_STEP: u16 = 10;
/// Zoom percentage of a fresh tab
pub const DEFAULT_ZOOM: u16 = 100;

/// Zoom percentage clamped to [50, 200]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZoomLevel(u16);

impl ZoomLevel {
    pub fn new(percent: i32) -> Self {
        Self(percent.clamp(MIN_ZOOM as i32, MAX_ZOOM as i32) as u16)
    }

    pub fn percent(&self) -> u16 {
        self.0
    }

    pub fn zoomed_in(&self) -> Self {
        Self::new(self.0 as i32 + ZOOM_STEP as i32)
    }

    pub fn zoomed_out(&self) -> Self {
        Self::new(self.0 as i32 - ZOOM_STEP as i32)
    }

    /// Scale plus counter-scaled box size for the frame
    pub fn transform(&self) -> ZoomTransform {
        let scale = self.0 as f32 / 100.0;
        ZoomTransform {
            scale,
            box_percent: 100.0 / scale,
        }
    }
}

impl Default for ZoomLevel {
    fn default() -> Self {
        Self(DEFAULT_ZOOM)
    }
}

/// Visual transform for a content frame
///
/// The frame is scaled by `scale` while its box is sized to `box_percent`
/// of the container, so the scaled content still fills the container
/// instead of being clipped or leaving a gap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomTransform {
    pub scale: f32,
    pub box_percent: f32,
}

/// Anything whose visual box can be zoomed
pub trait ZoomSurface {
    fn apply_zoom(&mut self, transform: ZoomTransform);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped() {
        assert_eq!(ZoomLevel::new(10).percent(), MIN_ZOOM);
        assert_eq!(ZoomLevel::new(500).percent(), MAX_ZOOM);
        assert_eq!(ZoomLevel::new(130).percent(), 130);
    }

    #[test]
    fn test_stepping_stops_at_bounds() {
        let mut level = ZoomLevel::new(190);
        level = level.zoomed_in().zoomed_in();
        assert_eq!(level.percent(), 200);
        let mut low = ZoomLevel::new(60);
        low = low.zoomed_out().zoomed_out();
        assert_eq!(low.percent(), 50);
    }

    #[test]
    fn test_transform_counter_scales() {
        let t = ZoomLevel::new(200).transform();
        assert_eq!(t.scale, 2.0);
        assert_eq!(t.box_percent, 50.0);
        let t = ZoomLevel::new(50).transform();
        assert_eq!(t.box_percent, 200.0);
    }
}
