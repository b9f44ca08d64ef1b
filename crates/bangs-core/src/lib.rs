pub mod bootstrap;
pub mod config;
pub mod editor;
pub mod gate;
pub mod search;
pub mod storage;

mod engine;
mod error;

#[cfg(test)]
mod tests;

pub use engine::BangsCore;
pub use error::{Error, Result};

pub use bangs_types::*;
