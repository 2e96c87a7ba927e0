mod lexer;
mod generator;
mod compile;

pub use lexer::{tokenize, lexeme_text, Lexeme, LexemeKind, RESERVED_WORDS};
pub use generator::generate;
pub use compile::{Compilation, Encoder};
