//! Correlation module - Jastrow factors on spin configurations.

mod jastrow;

pub use jastrow::{JastrowKind, SpinJastrow};
