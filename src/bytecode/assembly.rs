/*!
  The human readable textual form of bytecode is called assembly. One record per line:

  ```text
  MOV ECX y     % an instruction: mnemonic, then its operands
  label0        % a label marker: the loop re-entry point
  JMP
  ```

  Operands are decimal constants, register mnemonics (`AC`, `ECX`) or variable names matching
  `[a-z][a-z0-9]*`. Everything after `%` or `#` is a comment. This module leverages the `strum`
  derives of `Operation` and `Register` to serialize and deserialize mnemonics.
*/

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use nom::{
  branch::alt,
  bytes::complete::{take_while, take_while1},
  character::complete::{char as one_char, space0, space1},
  combinator::{eof, opt},
  multi::separated_list0,
  sequence::{preceded, terminated, tuple},
  IResult
};
use string_cache::DefaultAtom;

use crate::address::Register;
use crate::bytecode::Operation;
use crate::error::EncodeError;

/// Label markers are recognized by this prefix.
pub const LABEL_PREFIX: &str = "label";

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Operand {
  Constant(u64),
  Register(Register),
  Variable(DefaultAtom),
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum AssemblyLine {
  /// Marks the loop re-entry point. Emits no instruction.
  Label(DefaultAtom),
  Instruction {
    operation : Operation,
    operands  : Vec<Operand>
  },
}

impl Operand {
  pub fn variable(name: &str) -> Operand {
    Operand::Variable(DefaultAtom::from(name))
  }

  /// Parses a single operand token. `line` is only used for error reporting.
  pub fn parse(text: &str, line: usize) -> Result<Operand, EncodeError> {
    let malformed = || EncodeError::MalformedOperand { line, text: text.to_string() };

    if text.chars().all(|c| c.is_ascii_digit()) && !text.is_empty() {
      return text.parse::<u64>().map(Operand::Constant).map_err(|_| malformed());
    }
    if let Ok(register) = Register::from_str(text) {
      return Ok(Operand::Register(register));
    }
    match is_variable_name(text) {
      true  => Ok(Operand::variable(text)),
      false => Err(malformed())
    }
  }
}

/// Whether `text` matches `[a-z][a-z0-9]*`.
pub fn is_variable_name(text: &str) -> bool {
  let mut chars = text.chars();
  match chars.next() {
    Some(first) if first.is_ascii_lowercase() => {
      chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    }
    _ => false
  }
}

impl AssemblyLine {
  pub fn instruction(operation: Operation, operands: Vec<Operand>) -> AssemblyLine {
    AssemblyLine::Instruction { operation, operands }
  }

  pub fn is_label(&self) -> bool {
    match self {
      AssemblyLine::Label(_) => true,
      _ => false
    }
  }
}

impl Display for Operand {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Operand::Constant(value)     => write!(f, "{}", value),
      Operand::Register(register)  => write!(f, "{}", register),
      Operand::Variable(name)      => write!(f, "{}", name),
    }
  }
}

impl Display for AssemblyLine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      AssemblyLine::Label(name) => {
        write!(f, "{}", name)
      }

      AssemblyLine::Instruction { operation, operands } => {
        write!(f, "{}", operation)?;
        for operand in operands {
          write!(f, " {}", operand)?;
        }
        Ok(())
      }

    }
  }
}

/// Renders assembly lines as text that `parse_assembly` accepts.
pub fn assembly_text(lines: &[AssemblyLine]) -> String {
  lines.iter()
       .map(AssemblyLine::to_string)
       .collect::<Vec<String>>()
       .join("\n")
}

// region Parsers

fn token_p(input: &str) -> IResult<&str, &str> {
  take_while1(|c: char| !c.is_whitespace() && c != '%' && c != '#')(input)
}

fn comment_p(input: &str) -> IResult<&str, &str> {
  preceded(alt((one_char('%'), one_char('#'))), take_while(|_c: char| true))(input)
}

/// Splits one line into its tokens, dropping surrounding space and any comment.
fn line_tokens_p(input: &str) -> IResult<&str, Vec<&str>> {
  terminated(
    preceded(space0, separated_list0(space1, token_p)),
    tuple((space0, opt(comment_p), eof))
  )(input)
}

// endregion

/// Parses a single line of assembly. Returns `None` for blank and comment-only lines.
pub fn parse_assembly_line(text: &str, line: usize) -> Result<Option<AssemblyLine>, EncodeError> {
  let tokens = match line_tokens_p(text) {
    Ok((_rest, tokens)) => tokens,
    Err(_e) => {
      return Err(EncodeError::MalformedOperand { line, text: text.trim().to_string() });
    }
  };

  let (head, operand_tokens) = match tokens.split_first() {
    Some(pair) => pair,
    None       => return Ok(None),
  };

  if head.starts_with(LABEL_PREFIX) {
    return match operand_tokens.first() {
      Some(extra) => Err(EncodeError::MalformedOperand { line, text: extra.to_string() }),
      None        => Ok(Some(AssemblyLine::Label(DefaultAtom::from(*head)))),
    };
  }

  let operation = Operation::from_str(head)
    .map_err(|_| EncodeError::UnknownOperator { line, name: head.to_string() })?;

  let operands = operand_tokens
    .iter()
    .map(|token| Operand::parse(token, line))
    .collect::<Result<Vec<Operand>, EncodeError>>()?;

  Ok(Some(AssemblyLine::Instruction { operation, operands }))
}

/// Parses a full assembly listing.
pub fn parse_assembly(text: &str) -> Result<Vec<AssemblyLine>, EncodeError> {
  let mut lines = Vec::new();
  for (idx, line_text) in text.lines().enumerate() {
    if let Some(line) = parse_assembly_line(line_text, idx + 1)? {
      lines.push(line);
    }
  }
  Ok(lines)
}
