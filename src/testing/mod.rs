//! Headless testing support.
//!
//! Use the [`Pilot`] to load markup into a [`Runtime`](crate::runtime::Runtime),
//! fire native events at elements by selector, and inspect the document.

pub mod pilot;

pub use pilot::Pilot;
