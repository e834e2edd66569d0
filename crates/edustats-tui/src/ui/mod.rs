//! Terminal UI module using ratatui.
//!
//! - `render`: frame layout, statistics table and overlays
//! - `input`: keyboard event handling
//! - `styles`: colors and text styling

pub mod input;
pub mod render;
pub mod styles;
