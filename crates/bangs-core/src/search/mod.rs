//! Bang lookup pipeline: entry parsing, prefix matching, suggestion building.

mod entry;
mod matcher;
mod suggest;

pub use entry::{Entry, parse};
pub use matcher::{first_match, matches, matching};
pub use suggest::{ParamEncoding, SuggestionBuilder, build};
