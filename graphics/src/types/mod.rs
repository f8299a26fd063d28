//! Common types for graphics resources.
//!
//! This module contains the binding classifications and usage hints
//! used throughout the graphics system.

mod buffer;

pub use buffer::{BufferTarget, BufferUsageHint};
