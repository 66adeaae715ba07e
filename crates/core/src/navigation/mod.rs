//! Caret-to-declaration resolution and the goto/back trail.

mod resolver;
mod trail;

pub use resolver::{resolve, resolve_word, word_under_caret, CaretWord, MAX_CHAIN_DEPTH};
pub use trail::{NavigationTrail, Navigator, TrailEntry};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavError {
    #[error("Navigation trail is empty")]
    EmptyTrail,
    #[error("Symbol location unavailable (line {})", .offset + 1)]
    LocationUnavailable { offset: usize },
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),
}
