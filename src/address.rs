//! The operand fields of an instruction share a single 16 bit address space between constants,
//! variables and registers. `Address` is the decoded form of an operand field, so the range
//! arithmetic below lives in exactly one place.
//!
//! ```text
//!        0 ..= 32767   literal constant
//!    32768 ..= 65533   variable, slot `value - 32768` of data memory
//!            65534     AC, the accumulator
//!            65535     ECX, the loop counter
//! ```

use std::fmt::{Display, Formatter};
use std::convert::TryFrom;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};

use crate::bytecode::Word;

/// The first storage address, given to the first variable a program mentions.
pub const VARIABLE_BASE: Word = 0x8000;
/// The largest literal that can be encoded without aliasing a variable.
pub const MAX_CONSTANT: Word = VARIABLE_BASE - 1;
/// The last storage address before the register codes.
pub const MAX_VARIABLE: Word = 0xFFFD;

/// The two user-visible registers. The discriminants are their operand codes.
#[derive(
  StrumDisplay, EnumString, IntoStaticStr, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,       Eq,            PartialEq,        Debug,         Hash
)]
#[repr(u16)]
pub enum Register {
  #[strum(serialize = "AC")]
  Accumulator = 0xFFFE,
  #[strum(serialize = "ECX")]
  LoopCounter = 0xFFFF,
}

impl Register {
  pub fn code(&self) -> Word {
    Into::<Word>::into(*self)
  }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Address {
  /// The operand is its own value.
  Literal(Word),
  /// An index into data memory, already offset from `VARIABLE_BASE`.
  Variable(usize),
  Register(Register),
}

impl Address {
  /// Classifies a raw operand field.
  pub fn decode(word: Word) -> Address {
    match word {
      value if value < VARIABLE_BASE => Address::Literal(value),
      value if value <= MAX_VARIABLE  => Address::Variable((value - VARIABLE_BASE) as usize),
      // Only the two register codes remain above `MAX_VARIABLE`.
      value => {
        match Register::try_from(value) {
          Ok(register) => Address::Register(register),
          Err(_)       => Address::Register(Register::LoopCounter),
        }
      }
    }
  }

  /// The raw operand field for this address. Inverse of `decode` for in-range addresses.
  pub fn encode(&self) -> Word {
    match self {
      Address::Literal(value)     => *value,
      Address::Variable(idx)      => VARIABLE_BASE + *idx as Word,
      Address::Register(register) => register.code(),
    }
  }

  /// Converts a data memory index to a variable address.
  pub fn from_slot_idx(slot_idx: usize) -> Address {
    Address::Variable(slot_idx)
  }
}

impl Display for Address {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Address::Literal(value) => {
        write!(f, "{}", value)
      },
      Address::Variable(idx) => {
        write!(f, "D[{}]", VARIABLE_BASE as usize + idx)
      },
      Address::Register(register) => {
        write!(f, "{}", register)
      }
    }
  }
}
