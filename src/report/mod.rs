//! Dashboard rendering.
//!
//! This module provides the text, Markdown and JSON views of the dashboard.

pub mod generator;

pub use generator::{RenderOptions, ViewTarget};
