//! The fill layout: every child gets the full available space.
//!
//! Layout runs as the classic two-phase pass. `measure` asks each child how
//! much space it wants given what is available; `arrange` then hands each
//! child its final rectangle. The container enforces the phase order: a
//! child is never arranged with a stale measurement.
//!
//! # Invariants
//!
//! 1. `arrange` panics unless a `measure` happened since the last
//!    invalidation.
//! 2. On an unconstrained (infinite) axis the fill layout reports the
//!    largest child desire instead of infinity; the returned size is always
//!    finite.

use crate::geometry::{AvailableSize, Rect, Size};

/// A participant in the measure/arrange pass.
pub trait Measurable {
    /// Report the desired size given the available space. The result must
    /// be finite even when `available` has infinite axes.
    fn measure(&mut self, available: AvailableSize) -> Size;

    /// Accept the final placement.
    fn arrange(&mut self, rect: Rect);
}

/// A fixed-size leaf, mostly useful for tests and spacers.
#[derive(Clone, Copy, Debug)]
pub struct FixedSize {
    desired: Size,
    arranged: Option<Rect>,
}

impl FixedSize {
    #[must_use]
    pub fn new(desired: Size) -> Self {
        Self {
            desired,
            arranged: None,
        }
    }

    /// The rectangle from the last arrange, if one happened.
    #[must_use]
    pub fn arranged(&self) -> Option<Rect> {
        self.arranged
    }
}

impl Measurable for FixedSize {
    fn measure(&mut self, available: AvailableSize) -> Size {
        available.constrain(self.desired)
    }

    fn arrange(&mut self, rect: Rect) {
        self.arranged = Some(rect);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum LayoutState {
    #[default]
    Dirty,
    Measured,
    Arranged,
}

/// A container that stacks its children on top of each other, each filling
/// the whole content area.
pub struct FillLayout<T: Measurable> {
    children: Vec<T>,
    desired: Size,
    state: LayoutState,
}

impl<T: Measurable> Default for FillLayout<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Measurable> FillLayout<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            children: Vec::new(),
            desired: Size::ZERO,
            state: LayoutState::Dirty,
        }
    }

    /// Append a child; children keep insertion order.
    pub fn add_child(&mut self, child: T) {
        self.children.push(child);
        self.state = LayoutState::Dirty;
    }

    /// Remove all children.
    pub fn clear_children(&mut self) {
        self.children.clear();
        self.state = LayoutState::Dirty;
    }

    /// Take the children out, in insertion order, leaving the layout empty.
    #[must_use]
    pub fn extract_children(&mut self) -> Vec<T> {
        self.state = LayoutState::Dirty;
        core::mem::take(&mut self.children)
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    #[must_use]
    pub fn children(&self) -> &[T] {
        &self.children
    }

    /// Invalidate cached layout results; the next pass must re-measure.
    pub fn invalidate(&mut self) {
        self.state = LayoutState::Dirty;
    }

    #[must_use]
    pub fn is_layout_dirty(&self) -> bool {
        self.state == LayoutState::Dirty
    }

    /// The desired size from the last measure.
    #[must_use]
    pub fn desired_size(&self) -> Size {
        self.desired
    }
}

impl<T: Measurable> Measurable for FillLayout<T> {
    fn measure(&mut self, available: AvailableSize) -> Size {
        let mut children_max = Size::ZERO;
        for child in &mut self.children {
            children_max = children_max.max(child.measure(available));
        }
        // Fill the finite axes; on infinite axes fall back to the largest
        // child desire so the result stays finite.
        self.desired = available.to_size_or(children_max);
        self.state = LayoutState::Measured;
        self.desired
    }

    fn arrange(&mut self, rect: Rect) {
        assert!(
            self.state != LayoutState::Dirty,
            "arrange requires a preceding measure"
        );
        for child in &mut self.children {
            child.arrange(rect);
        }
        self.state = LayoutState::Arranged;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_axes_fill_the_available_space() {
        let mut layout = FillLayout::new();
        layout.add_child(FixedSize::new(Size::new(10.0, 10.0)));

        let desired = layout.measure(AvailableSize::new(100.0, 50.0));
        assert_eq!(desired, Size::new(100.0, 50.0));
        assert!(!layout.is_layout_dirty());
    }

    #[test]
    fn infinite_axis_reports_the_largest_child_desire() {
        let mut layout = FillLayout::new();
        layout.add_child(FixedSize::new(Size::new(10.0, 30.0)));
        layout.add_child(FixedSize::new(Size::new(25.0, 20.0)));

        let desired = layout.measure(AvailableSize::new(f32::INFINITY, 50.0));
        assert_eq!(desired, Size::new(25.0, 50.0));

        let desired = layout.measure(AvailableSize::INFINITE);
        assert_eq!(desired, Size::new(25.0, 30.0));
    }

    #[test]
    fn empty_layout_measures_zero_on_infinite_axes() {
        let mut layout: FillLayout<FixedSize> = FillLayout::new();
        assert_eq!(layout.measure(AvailableSize::INFINITE), Size::ZERO);
    }

    #[test]
    fn arrange_hands_every_child_the_full_rect() {
        let mut layout = FillLayout::new();
        layout.add_child(FixedSize::new(Size::new(10.0, 10.0)));
        layout.add_child(FixedSize::new(Size::new(20.0, 20.0)));

        layout.measure(AvailableSize::new(80.0, 40.0));
        let rect = Rect::new(5.0, 5.0, 80.0, 40.0);
        layout.arrange(rect);

        for child in layout.children() {
            assert_eq!(child.arranged(), Some(rect));
        }
    }

    #[test]
    #[should_panic(expected = "requires a preceding measure")]
    fn arrange_without_measure_panics() {
        let mut layout: FillLayout<FixedSize> = FillLayout::new();
        layout.arrange(Rect::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    #[should_panic(expected = "requires a preceding measure")]
    fn mutating_children_invalidates_the_measure() {
        let mut layout = FillLayout::new();
        layout.measure(AvailableSize::new(10.0, 10.0));
        layout.add_child(FixedSize::new(Size::ZERO));
        layout.arrange(Rect::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn extract_children_preserves_insertion_order() {
        let mut layout = FillLayout::new();
        for i in 0..5 {
            layout.add_child(FixedSize::new(Size::new(i as f32, 0.0)));
        }
        let children = layout.extract_children();
        assert_eq!(layout.child_count(), 0);
        let widths: Vec<f32> = children.iter().map(|c| c.desired.width()).collect();
        assert_eq!(widths, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn nested_fill_layouts_compose() {
        let mut inner = FillLayout::new();
        inner.add_child(FixedSize::new(Size::new(15.0, 5.0)));
        let mut outer = FillLayout::new();
        outer.add_child(inner);

        let desired = outer.measure(AvailableSize::new(f32::INFINITY, 100.0));
        assert_eq!(desired, Size::new(15.0, 100.0));
    }
}
