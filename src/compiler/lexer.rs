/*!
  Splits source text into lexemes.

  The lexical forms are:
  ```text
    <reserved>   ::= 'TO' | 'DO' | 'END'
    <assign_op>  ::= ':='
    <math_op>    ::= '+' | '-' | '*' | '/'
    <semicolon>  ::= ';'
    <constant>   ::= [0-9]+
    <variable>   ::= [a-z] [a-z0-9]*
  ```
  Whitespace separates lexemes and is otherwise ignored. Operators and semicolons need no
  surrounding whitespace, so `x:=x+1;` is five lexemes and a semicolon.
*/

use std::fmt::{Display, Formatter};

use nom::{
  branch::alt,
  bytes::complete::{tag, take_while1},
  character::complete::{char as one_char, one_of},
  combinator::{map, recognize},
  IResult
};
use string_cache::DefaultAtom;
use strum_macros::{Display as StrumDisplay, IntoStaticStr};

use crate::bytecode::is_variable_name;
use crate::error::LexError;

pub const RESERVED_WORDS: [&str; 3] = ["TO", "DO", "END"];

#[derive(StrumDisplay, IntoStaticStr, Clone, Copy, Eq, PartialEq, Debug, Hash)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LexemeKind {
  Constant,
  Variable,
  ReservedWord,
  AssignOp,
  MathOp,
  Semicolon,
}

/// A lexeme with its textual form and the 1-based line it appears on.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Lexeme {
  pub kind : LexemeKind,
  pub text : DefaultAtom,
  pub line : usize,
}

impl Lexeme {
  pub fn new(kind: LexemeKind, text: &str, line: usize) -> Lexeme {
    Lexeme { kind, text: DefaultAtom::from(text), line }
  }

  pub fn is(&self, kind: LexemeKind, text: &str) -> bool {
    self.kind == kind && &*self.text == text
  }
}

impl Display for Lexeme {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "<Lexeme: {}, {}>", self.kind, self.text)
  }
}

/// The lexeme listing used for debug output, one lexeme per line.
pub fn lexeme_text(lexemes: &[Lexeme]) -> String {
  lexemes.iter()
         .map(|lexeme| format!("{}\n", lexeme))
         .collect()
}

// region Parsers

/// A candidate lexeme: either an operator with a known kind, or a word still to be classified.
enum Raw<'a> {
  Symbol(LexemeKind, &'a str),
  Word(&'a str),
  Junk(&'a str),
}

fn symbol_p(input: &str) -> IResult<&str, Raw<'_>> {
  alt((
    map(tag(":="), |s| Raw::Symbol(LexemeKind::AssignOp, s)),
    map(
      recognize(one_of("+-*/")),
      |s| Raw::Symbol(LexemeKind::MathOp, s)
    ),
    map(
      recognize(one_char(';')),
      |s| Raw::Symbol(LexemeKind::Semicolon, s)
    ),
  ))(input)
}

fn word_p(input: &str) -> IResult<&str, Raw<'_>> {
  map(take_while1(|c: char| c.is_ascii_alphanumeric()), Raw::Word)(input)
}

fn junk_p(input: &str) -> IResult<&str, Raw<'_>> {
  map(
    take_while1(|c: char| !c.is_whitespace() && !c.is_ascii_alphanumeric() && c != ';'),
    Raw::Junk
  )(input)
}

fn raw_p(input: &str) -> IResult<&str, Raw<'_>> {
  alt((symbol_p, word_p, junk_p))(input)
}

// endregion

/// Classifies an alphanumeric word as a constant, variable or reserved word.
fn classify_word(word: &str, line: usize) -> Result<Lexeme, LexError> {
  let invalid = || LexError::InvalidLexeme { line, text: word.to_string() };

  match word.chars().next() {

    Some(c) if c.is_ascii_digit() => {
      match word.chars().all(|c| c.is_ascii_digit()) {
        true  => {
          // Reject constants that don't even fit the runtime integer type.
          word.parse::<u64>()
              .map_err(|_| LexError::ConstantTooLarge { line, text: word.to_string() })?;
          Ok(Lexeme::new(LexemeKind::Constant, word, line))
        }
        false => Err(invalid())
      }
    }

    Some(c) if c.is_ascii_lowercase() => {
      match is_variable_name(word) {
        true  => Ok(Lexeme::new(LexemeKind::Variable, word, line)),
        false => Err(invalid())
      }
    }

    _ if RESERVED_WORDS.contains(&word) => Ok(Lexeme::new(LexemeKind::ReservedWord, word, line)),

    _ => Err(invalid())

  }
}

/// Tokenizes a whole program.
pub fn tokenize(source: &str) -> Result<Vec<Lexeme>, LexError> {
  let mut lexemes = Vec::new();

  for (idx, line_text) in source.lines().enumerate() {
    let line = idx + 1;
    let mut rest = line_text.trim_start();

    while !rest.is_empty() {
      let (remaining, raw) = match raw_p(rest) {
        Ok(result) => result,
        // Every non-whitespace character is matched by one of the alternatives.
        Err(_e) => return Err(LexError::InvalidLexeme { line, text: rest.to_string() }),
      };

      let lexeme = match raw {
        Raw::Symbol(kind, text) => Lexeme::new(kind, text, line),
        Raw::Word(word)         => classify_word(word, line)?,
        Raw::Junk(text)         => {
          return Err(LexError::InvalidLexeme { line, text: text.to_string() });
        }
      };
      lexemes.push(lexeme);
      rest = remaining.trim_start();
    }
  }

  tracing::debug!(count = lexemes.len(), "tokenized source");
  Ok(lexemes)
}


#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn kinds(source: &str) -> Vec<LexemeKind> {
    tokenize(source).unwrap().iter().map(|l| l.kind).collect()
  }

  #[test]
  fn assignment() {
    use LexemeKind::*;
    assert_eq!(
      kinds("y := x + 2;"),
      vec![Variable, AssignOp, Variable, MathOp, Constant, Semicolon]
    );
  }

  #[test]
  fn no_whitespace_needed_around_symbols() {
    let lexemes = tokenize("x:=x*10;").unwrap();
    let texts: Vec<&str> = lexemes.iter().map(|l| &*l.text).collect();
    assert_eq!(texts, vec!["x", ":=", "x", "*", "10", ";"]);
  }

  #[test]
  fn loop_and_lines() {
    let lexemes = tokenize("TO y DO\n  z := z + x\nEND").unwrap();
    assert!(lexemes[0].is(LexemeKind::ReservedWord, "TO"));
    assert!(lexemes[2].is(LexemeKind::ReservedWord, "DO"));
    assert_eq!(lexemes[3].line, 2);
    assert!(lexemes.last().unwrap().is(LexemeKind::ReservedWord, "END"));
    assert_eq!(lexemes.last().unwrap().line, 3);
  }

  #[test]
  fn invalid_lexemes() {
    assert_eq!(
      tokenize("x := 3a;"),
      Err(LexError::InvalidLexeme { line: 1, text: "3a".to_string() })
    );
    assert_eq!(
      tokenize("Xy := 1"),
      Err(LexError::InvalidLexeme { line: 1, text: "Xy".to_string() })
    );
    assert_eq!(
      tokenize("a := 1\nb := a % 2"),
      Err(LexError::InvalidLexeme { line: 2, text: "%".to_string() })
    );
    assert!(tokenize("x := 99999999999999999999999").is_err());
  }

  #[test]
  fn display() {
    let lexemes = tokenize("x := 17").unwrap();
    assert_eq!(lexemes[0].to_string(), "<Lexeme: VARIABLE, x>");
    assert_eq!(lexemes[1].to_string(), "<Lexeme: ASSIGN_OP, :=>");
    assert_eq!(lexeme_text(&lexemes).lines().count(), 3);
  }
}
