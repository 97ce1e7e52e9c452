#![doc = include_str!("../README.md")]

mod span;
pub use span::{LineIndex, Location, Span};

mod token;
pub use token::{Token, TokenKind};

mod tokenizer;
pub use tokenizer::Tokenizer;

mod escape;
pub use escape::{is_name_char, is_name_start, unescape};
