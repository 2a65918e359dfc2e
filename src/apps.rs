//! Installed applications.

pub mod polls;
