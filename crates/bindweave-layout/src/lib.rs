#![forbid(unsafe_code)]

//! Layout primitives for Bindweave: fail-fast geometry types, per-window
//! state flags, and the two-phase measure/arrange pass with a fill layout
//! container.
//!
//! This crate is independent of the binding graph; anything implementing
//! [`Measurable`] can participate, whether or not its sizes come from bound
//! properties.

pub mod fill;
pub mod flags;
pub mod geometry;

pub use fill::{FillLayout, FixedSize, Measurable};
pub use flags::WindowFlags;
pub use geometry::{AvailableSize, Rect, Size};
