//! Layout geometry in device-independent units.
//!
//! Sizes are fail-fast: constructing one from a NaN or negative component
//! panics at the construction site instead of letting the bad value ripple
//! through a layout pass. [`AvailableSize`] is the one place infinity is
//! legal; it models "take as much as you want" on an axis during measure.

use serde::{Deserialize, Serialize};

/// A finite, non-negative width/height pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    width: f32,
    height: f32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    /// Panics if either component is NaN, infinite, or negative.
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        assert!(
            width.is_finite() && width >= 0.0,
            "size width must be finite and non-negative, got {width}"
        );
        assert!(
            height.is_finite() && height >= 0.0,
            "size height must be finite and non-negative, got {height}"
        );
        Self { width, height }
    }

    #[must_use]
    pub fn width(self) -> f32 {
        self.width
    }

    #[must_use]
    pub fn height(self) -> f32 {
        self.height
    }

    /// Component-wise maximum.
    #[must_use]
    pub fn max(self, other: Size) -> Size {
        Size {
            width: self.width.max(other.width),
            height: self.height.max(other.height),
        }
    }

    /// Component-wise minimum.
    #[must_use]
    pub fn min(self, other: Size) -> Size {
        Size {
            width: self.width.min(other.width),
            height: self.height.min(other.height),
        }
    }
}

/// Space offered to a child during measure. Components may be infinite
/// ("unconstrained axis") but never NaN or negative.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AvailableSize {
    width: f32,
    height: f32,
}

impl AvailableSize {
    pub const INFINITE: AvailableSize = AvailableSize {
        width: f32::INFINITY,
        height: f32::INFINITY,
    };

    /// Panics if either component is NaN or negative.
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        assert!(
            !width.is_nan() && width >= 0.0,
            "available width must be non-negative and not NaN, got {width}"
        );
        assert!(
            !height.is_nan() && height >= 0.0,
            "available height must be non-negative and not NaN, got {height}"
        );
        Self { width, height }
    }

    #[must_use]
    pub fn width(self) -> f32 {
        self.width
    }

    #[must_use]
    pub fn height(self) -> f32 {
        self.height
    }

    #[must_use]
    pub fn is_infinite_width(self) -> bool {
        self.width.is_infinite()
    }

    #[must_use]
    pub fn is_infinite_height(self) -> bool {
        self.height.is_infinite()
    }

    /// The available space as a finite size; infinite axes collapse to the
    /// corresponding component of `fallback`.
    #[must_use]
    pub fn to_size_or(self, fallback: Size) -> Size {
        Size {
            width: if self.width.is_finite() {
                self.width
            } else {
                fallback.width()
            },
            height: if self.height.is_finite() {
                self.height
            } else {
                fallback.height()
            },
        }
    }

    /// Clamp a desired size so it never exceeds the available space.
    #[must_use]
    pub fn constrain(self, desired: Size) -> Size {
        Size {
            width: desired.width().min(self.width),
            height: desired.height().min(self.height),
        }
    }
}

impl From<Size> for AvailableSize {
    fn from(size: Size) -> Self {
        AvailableSize {
            width: size.width(),
            height: size.height(),
        }
    }
}

/// A finite placement rectangle handed to a child during arrange.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl Rect {
    /// Panics if the origin is not finite or the extent is not a valid size.
    #[must_use]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        assert!(
            x.is_finite() && y.is_finite(),
            "rect origin must be finite, got ({x}, {y})"
        );
        let size = Size::new(width, height);
        Self {
            x,
            y,
            width: size.width(),
            height: size.height(),
        }
    }

    #[must_use]
    pub fn from_size(size: Size) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: size.width(),
            height: size.height(),
        }
    }

    #[must_use]
    pub fn x(self) -> f32 {
        self.x
    }

    #[must_use]
    pub fn y(self) -> f32 {
        self.y
    }

    #[must_use]
    pub fn width(self) -> f32 {
        self.width
    }

    #[must_use]
    pub fn height(self) -> f32 {
        self.height
    }

    #[must_use]
    pub fn size(self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    #[should_panic(expected = "finite and non-negative")]
    fn size_rejects_nan() {
        let _ = Size::new(f32::NAN, 1.0);
    }

    #[test]
    #[should_panic(expected = "finite and non-negative")]
    fn size_rejects_negative() {
        let _ = Size::new(1.0, -0.5);
    }

    #[test]
    #[should_panic(expected = "finite and non-negative")]
    fn size_rejects_infinity() {
        let _ = Size::new(f32::INFINITY, 1.0);
    }

    #[test]
    fn available_size_allows_infinity_but_not_nan() {
        let available = AvailableSize::new(f32::INFINITY, 100.0);
        assert!(available.is_infinite_width());
        assert!(!available.is_infinite_height());
    }

    #[test]
    #[should_panic(expected = "not NaN")]
    fn available_size_rejects_nan() {
        let _ = AvailableSize::new(1.0, f32::NAN);
    }

    #[test]
    fn to_size_or_collapses_infinite_axes_only() {
        let available = AvailableSize::new(f32::INFINITY, 50.0);
        let size = available.to_size_or(Size::new(10.0, 999.0));
        assert_eq!(size, Size::new(10.0, 50.0));
    }

    #[test]
    fn constrain_caps_each_axis() {
        let available = AvailableSize::new(100.0, f32::INFINITY);
        let constrained = available.constrain(Size::new(150.0, 80.0));
        assert_eq!(constrained, Size::new(100.0, 80.0));
    }

    #[test]
    fn rect_exposes_its_size() {
        let rect = Rect::new(5.0, -3.0, 20.0, 10.0);
        assert_eq!(rect.size(), Size::new(20.0, 10.0));
        assert_eq!(Rect::from_size(Size::new(2.0, 4.0)).x(), 0.0);
    }

    proptest! {
        #[test]
        fn max_and_min_bracket_both_inputs(
            aw in 0.0f32..1000.0, ah in 0.0f32..1000.0,
            bw in 0.0f32..1000.0, bh in 0.0f32..1000.0,
        ) {
            let a = Size::new(aw, ah);
            let b = Size::new(bw, bh);
            let hi = a.max(b);
            let lo = a.min(b);
            prop_assert!(hi.width() >= lo.width());
            prop_assert!(hi.height() >= lo.height());
            prop_assert!(hi.width() >= aw && hi.width() >= bw);
            prop_assert!(lo.height() <= ah && lo.height() <= bh);
        }
    }
}
