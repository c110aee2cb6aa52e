#![cfg_attr(docsrs, feature(doc_cfg))]

mod config;
mod error;
mod generator;
mod identity;
mod layout;
mod rand;
mod time;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::identity::*;
pub use crate::layout::*;
pub use crate::rand::*;
pub use crate::time::*;
