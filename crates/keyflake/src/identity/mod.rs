mod host;
mod strategy;

pub use host::*;
pub use strategy::*;
