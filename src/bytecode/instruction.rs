use std::fmt::{Display, Formatter};

use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};
use num_enum::{TryFromPrimitive, IntoPrimitive};

use crate::address::Address;
use crate::value::Arithmetic;
use super::Word;

/**
  Opcodes of the CPU.

  The discriminant of each variant is its 4 bit opcode and the strum name is its assembly
  mnemonic. Only the first six of the sixteen possible opcodes are assigned; the CPU rejects the
  rest.
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq,        Debug,         Hash
)]
#[repr(u8)]
pub enum Operation {
  #[strum(serialize = "MOV")]
  Move,         // 0000  dest <- src
  #[strum(serialize = "ADD")]
  Add,          // 0001  dest <- dest + src
  #[strum(serialize = "SUB")]
  Subtract,     // 0010  dest <- dest - src
  #[strum(serialize = "MUL")]
  Multiply,     // 0011  dest <- dest * src
  #[strum(serialize = "DIV")]
  Divide,       // 0100  dest <- dest / src
  #[strum(serialize = "JMP")]
  LoopExit,     // 0101  pc <- target while ECX > 0
}

pub const MAX_OPCODE: u8 = 5u8;

impl Operation {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  pub fn mnemonic(&self) -> &'static str {
    self.into()
  }

  /// Number of operands the operation takes in assembly.
  pub fn arity(&self) -> usize {
    match self {
      Operation::LoopExit => 0,
      _ => 2
    }
  }

  /// The arithmetic an operation performs before storing, or `None` for a plain move.
  pub fn arithmetic(&self) -> Option<Arithmetic> {
    match self {
      Operation::Move     => None,
      Operation::Add      => Some(Arithmetic::Add),
      Operation::Subtract => Some(Arithmetic::Sub),
      Operation::Multiply => Some(Arithmetic::Mul),
      Operation::Divide   => Some(Arithmetic::Div),
      Operation::LoopExit => None,
    }
  }
}

/// Holds the unencoded components of an instruction.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Instruction {
  /// [OpCode:4][Destination:16][Source:16]
  Binary {
    opcode      : Operation,
    destination : Address,
    source      : Address
  },
  /// [OpCode:4][Target:16][Reserved:16]
  LoopExit {
    target: Word
  },
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      Instruction::Binary { opcode, destination, source } => {
        write!(f, "{} {}, {}", opcode, destination, source)
      }

      Instruction::LoopExit { target } => {
        write!(f, "{} {}", Operation::LoopExit, target)
      }

    }
  }
}
