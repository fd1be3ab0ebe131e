//! Slide layout for the brand showcase carousel
//!
//! Slides sit on a ring around the active one. Each slide's position is
//! its shortest signed distance to the active slide, and the visual
//! properties fall off with that distance. Slides more than
//! [`MAX_VISIBLE_OFFSET`] away are hidden.

use serde::Serialize;

/// Furthest distance from the active slide that is still drawn
pub const MAX_VISIBLE_OFFSET: i64 = 2;

const TRANSLATE_STEP_PCT: f64 = 60.0;
const SCALE_STEP: f64 = 0.15;
const OPACITY_STEP: f64 = 0.35;
const BLUR_STEP_PX: f64 = 2.0;
const BASE_Z_INDEX: i64 = 10;

/// Render properties of one slide
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideLayout {
    pub index: usize,
    /// Signed distance to the active slide; negative is to the left
    pub offset: i64,
    /// Horizontal translation, percent of the slide width
    pub translate_pct: f64,
    pub scale: f64,
    pub opacity: f64,
    pub blur_px: f64,
    pub z_index: i64,
    pub visible: bool,
}

impl SlideLayout {
    /// Inline CSS for the slide
    pub fn style(&self) -> String {
        format!(
            "transform: translateX({:.1}%) scale({:.2}); opacity: {:.2}; filter: blur({:.1}px); z-index: {};{}",
            self.translate_pct,
            self.scale,
            self.opacity,
            self.blur_px,
            self.z_index,
            if self.visible { "" } else { " visibility: hidden;" }
        )
    }
}

/// Shortest signed distance from `active` to `index` on a ring of `len`.
///
/// The result lies in `(-len/2, len/2]`, so with an even count the slide
/// directly opposite is placed on the right.
pub fn circular_offset(index: usize, active: usize, len: usize) -> i64 {
    if len == 0 {
        return 0;
    }
    let len = len as i64;
    let raw = (index as i64 - active as i64).rem_euclid(len);
    if raw > len / 2 {
        raw - len
    } else {
        raw
    }
}

pub fn slide_layout(index: usize, active: usize, len: usize) -> SlideLayout {
    let offset = circular_offset(index, active, len);
    let distance = offset.abs();
    let visible = distance <= MAX_VISIBLE_OFFSET;
    let d = distance as f64;

    SlideLayout {
        index,
        offset,
        translate_pct: offset as f64 * TRANSLATE_STEP_PCT,
        scale: (1.0 - SCALE_STEP * d).max(0.0),
        opacity: if visible { (1.0 - OPACITY_STEP * d).max(0.0) } else { 0.0 },
        blur_px: BLUR_STEP_PX * d,
        z_index: BASE_Z_INDEX - distance,
        visible,
    }
}

/// Carousel position over a fixed number of slides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Carousel {
    len: usize,
    active: usize,
}

impl Carousel {
    pub fn new(len: usize) -> Self {
        Self { len, active: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn active(&self) -> usize {
        self.active
    }

    /// Advance one slide, wrapping from the last to the first
    pub fn next(&mut self) -> usize {
        if self.len > 0 {
            self.active = (self.active + 1) % self.len;
        }
        self.active
    }

    /// Go back one slide, wrapping from the first to the last
    pub fn prev(&mut self) -> usize {
        if self.len > 0 {
            self.active = (self.active + self.len - 1) % self.len;
        }
        self.active
    }

    /// Jump to `index`, wrapped into range
    pub fn go_to(&mut self, index: usize) -> usize {
        if self.len > 0 {
            self.active = index % self.len;
        }
        self.active
    }

    pub fn layout(&self) -> Vec<SlideLayout> {
        (0..self.len).map(|i| slide_layout(i, self.active, self.len)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_circular_offset_wraps() {
        assert_eq!(circular_offset(0, 0, 5), 0);
        assert_eq!(circular_offset(1, 0, 5), 1);
        assert_eq!(circular_offset(4, 0, 5), -1);
        assert_eq!(circular_offset(0, 4, 5), 1);
        assert_eq!(circular_offset(2, 0, 4), 2);
        assert_eq!(circular_offset(0, 0, 0), 0);
    }

    #[test]
    fn test_active_slide_layout() {
        let active = slide_layout(3, 3, 6);
        assert_eq!(active.offset, 0);
        assert_eq!(active.translate_pct, 0.0);
        assert_eq!(active.scale, 1.0);
        assert_eq!(active.opacity, 1.0);
        assert_eq!(active.blur_px, 0.0);
        assert!(active.visible);
    }

    #[test]
    fn test_neighbours_and_hidden_slides() {
        let left = slide_layout(2, 3, 7);
        assert_eq!(left.offset, -1);
        assert_eq!(left.translate_pct, -60.0);
        assert!((left.opacity - 0.65).abs() < 1e-9);

        let far = slide_layout(6, 3, 7);
        assert_eq!(far.offset, 3);
        assert!(!far.visible);
        assert_eq!(far.opacity, 0.0);
        assert!(far.style().contains("visibility: hidden"));
    }

    #[test]
    fn test_navigation_wraps() {
        let mut carousel = Carousel::new(3);
        assert_eq!(carousel.prev(), 2);
        assert_eq!(carousel.next(), 0);
        assert_eq!(carousel.next(), 1);
        assert_eq!(carousel.go_to(7), 1);

        let mut empty = Carousel::new(0);
        assert_eq!(empty.next(), 0);
        assert!(empty.layout().is_empty());
    }

    proptest! {
        #[test]
        fn prop_offset_in_half_open_range(len in 1usize..50, a in 0usize..50, i in 0usize..50) {
            let (active, index) = (a % len, i % len);
            let offset = circular_offset(index, active, len);
            let half = len as i64 / 2;
            prop_assert!(offset <= half);
            prop_assert!(offset > half - len as i64);
            prop_assert_eq!((active as i64 + offset).rem_euclid(len as i64), index as i64);
        }

        #[test]
        fn prop_exactly_one_active_and_it_is_on_top(len in 1usize..30, a in 0usize..30) {
            let mut carousel = Carousel::new(len);
            carousel.go_to(a);
            let layout = carousel.layout();
            let centred: Vec<_> = layout.iter().filter(|s| s.offset == 0).collect();
            prop_assert_eq!(centred.len(), 1);
            let top = layout.iter().map(|s| s.z_index).max().unwrap();
            prop_assert_eq!(centred[0].z_index, top);
        }

        #[test]
        fn prop_next_then_prev_is_identity(len in 1usize..30, a in 0usize..30) {
            let mut carousel = Carousel::new(len);
            let start = carousel.go_to(a);
            carousel.next();
            prop_assert_eq!(carousel.prev(), start);
        }

        #[test]
        fn prop_opacity_and_scale_fall_with_distance(len in 2usize..30, a in 0usize..30) {
            let active = a % len;
            for i in 0..len {
                let s = slide_layout(i, active, len);
                prop_assert!((0.0..=1.0).contains(&s.opacity));
                prop_assert!(s.scale <= 1.0);
                prop_assert_eq!(s.visible, s.offset.abs() <= MAX_VISIBLE_OFFSET);
            }
        }
    }
}
