//! Line-oriented text containers.
//!
//! The parser works over a [`TextPage`] of [`TextLine`]s rather than a flat
//! string: every classifier decision is made per line, and every code element
//! in the tree owns exactly one line of text.

mod line;
mod page;

pub use line::{split_first_deref, ExtractedWord, TextLine, WORD_DELIMITERS};
pub use page::TextPage;
