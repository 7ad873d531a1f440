//! Color values shared between configuration and backends.

pub mod color;

pub use color::Color;
