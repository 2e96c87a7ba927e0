//! Errors for every stage of the pipeline. Each stage has its own error type so that callers
//! driving a single stage (say, assembling hand-written assembly) only see what that stage can
//! report. `Error` unifies them for the end-to-end functions in the crate root.

use thiserror::Error;

use crate::bytecode::Word;

/// The tokenizer found text that is neither a reserved word, an operator, a constant nor a
/// variable name.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum LexError {
  #[error("line {line}: `{text}` is not a valid lexeme; variables start with a lowercase letter and constants with a digit")]
  InvalidLexeme {
    line: usize,
    text: String,
  },

  #[error("line {line}: constant `{text}` is too large")]
  ConstantTooLarge {
    line: usize,
    text: String,
  },
}

/// Grammar violations found while generating assembly from lexemes.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum SyntaxError {
  #[error("line {line}: expected {expected} but found `{found}`")]
  UnexpectedToken {
    line: usize,
    expected: &'static str,
    found: String,
  },

  #[error("unexpected end of input, expected {expected}")]
  UnexpectedEnd {
    expected: &'static str,
  },

  #[error("line {line}: loops cannot be nested")]
  NestedLoop {
    line: usize,
  },
}

/// Failures while turning assembly lines into bytecode.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum EncodeError {
  #[error("line {line}: {name} is not an operation")]
  UnknownOperator {
    line: usize,
    name: String,
  },

  #[error("line {line}: `{text}` is neither a constant, a register nor a variable name")]
  MalformedOperand {
    line: usize,
    text: String,
  },

  #[error("line {line}: {operation} requires {expected} operands but was given {given}")]
  WrongArity {
    line: usize,
    operation: &'static str,
    expected: usize,
    given: usize,
  },

  #[error("line {line}: constant {value} does not fit below the variable address space")]
  ConstantOutOfRange {
    line: usize,
    value: u64,
  },

  #[error("line {line}: constant {value} cannot be the destination of {operation}")]
  ConstantDestination {
    line: usize,
    operation: &'static str,
    value: u64,
  },

  #[error("line {line}: no storage address left for variable `{name}`")]
  VariableSpaceExhausted {
    line: usize,
    name: String,
  },

  #[error("line {line}: loop target {target} does not fit in an operand field")]
  JumpTargetOutOfRange {
    line: usize,
    target: usize,
  },
}

/// Failures while reading a bytecode listing back into instructions.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum DecodeError {
  #[error("line {line}: `{text}` is not a 36 bit instruction")]
  MalformedWord {
    line: usize,
    text: String,
  },

  #[error("opcode {opcode:04b} is not assigned to any operation")]
  UnknownOpcode {
    opcode: u8,
  },
}

/// Failures raised by the CPU while executing a program.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum ExecError {
  #[error("pc {pc}: storage address {address} is beyond the {length} initialized data slots")]
  MemoryOutOfBounds {
    pc: usize,
    address: Word,
    length: usize,
  },

  #[error("pc {pc}: constant {value} cannot be written to")]
  ConstantDestination {
    pc: usize,
    value: Word,
  },

  #[error("pc {pc}: opcode {opcode:04b} is not assigned to any operation")]
  UnknownOpcode {
    pc: usize,
    opcode: u8,
  },

  #[error("pc {pc}: division by zero")]
  DivisionByZero {
    pc: usize,
  },

  #[error("pc {pc}: integer overflow in {operation}")]
  ArithmeticOverflow {
    pc: usize,
    operation: &'static str,
  },

  #[error("program did not halt within {limit} cycles")]
  CycleLimitExceeded {
    limit: u64,
  },
}

/// Any failure of the compile-and-run pipeline.
#[derive(Error, Debug)]
pub enum Error {
  #[error(transparent)]
  Lex(#[from] LexError),

  #[error(transparent)]
  Syntax(#[from] SyntaxError),

  #[error(transparent)]
  Encode(#[from] EncodeError),

  #[error(transparent)]
  Decode(#[from] DecodeError),

  #[error(transparent)]
  Exec(#[from] ExecError),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}
