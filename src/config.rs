//! Project configuration: URL table and application assembly.

pub mod application;
pub mod urls;

pub use application::{Application, RouteInfo};
