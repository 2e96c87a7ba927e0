/*!
  This module is responsible for the encoding and decoding of binary instructions.

  An instruction is 36 bits, written most significant bit first:
  ```text
    [Opcode:4][Operand1:16][Operand2:16]
  ```
  The textual bytecode listing is one instruction per line, each line being exactly 36 characters
  from `{0, 1}`. In memory an instruction is the low 36 bits of a `u64`.
*/
use std::convert::TryFrom;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use super::{Operation, Instruction};
use crate::address::Address;
use crate::error::DecodeError;

// If you change these you must also change `EncodedInstruction::from_fields` and its accessors.
pub type Word = u16;
pub type InstructionWord = u64;

pub const OPCODE_BITS      : usize = 4;
pub const OPERAND_BITS     : usize = 16;
pub const INSTRUCTION_BITS : usize = OPCODE_BITS + 2 * OPERAND_BITS;

/**
  Renders `value` in binary, left padded with zeros to `width` bits. A value that needs more than
  `width` bits is returned at its natural length rather than truncated; callers that need an
  exact width check the range themselves.
*/
pub fn to_bit_string(value: u64, width: usize) -> String {
  format!("{:0width$b}", value, width = width)
}

/// A single encoded instruction. The textual form is its 36 bit string.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct EncodedInstruction(InstructionWord);

impl EncodedInstruction {

  pub fn from_fields(opcode: u8, operand1: Word, operand2: Word) -> EncodedInstruction {
    EncodedInstruction(
        (((opcode & 0xF) as InstructionWord) << (2 * OPERAND_BITS))
      + ((operand1       as InstructionWord) << OPERAND_BITS)
      +  (operand2       as InstructionWord)
    )
  }

  pub fn opcode(&self) -> u8 {
    ((self.0 >> (2 * OPERAND_BITS)) & 0xF) as u8
  }

  pub fn operand1(&self) -> Word {
    ((self.0 >> OPERAND_BITS) & 0xFFFF) as Word
  }

  pub fn operand2(&self) -> Word {
    (self.0 & 0xFFFF) as Word
  }
}

impl Display for EncodedInstruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "{}{}{}",
      to_bit_string(self.opcode() as u64, OPCODE_BITS),
      to_bit_string(self.operand1() as u64, OPERAND_BITS),
      to_bit_string(self.operand2() as u64, OPERAND_BITS)
    )
  }
}

impl FromStr for EncodedInstruction {
  type Err = DecodeError;

  fn from_str(text: &str) -> Result<Self, Self::Err> {
    parse_bytecode_line(text, 1)
  }
}

/// Parses one line of a bytecode listing. `line` is only used for error reporting.
pub fn parse_bytecode_line(text: &str, line: usize) -> Result<EncodedInstruction, DecodeError> {
  let text = text.trim();
  let well_formed = text.len() == INSTRUCTION_BITS && text.chars().all(|c| c == '0' || c == '1');

  match well_formed {
    true  => {
      InstructionWord::from_str_radix(text, 2)
        .map(EncodedInstruction)
        .map_err(|_| DecodeError::MalformedWord { line, text: text.to_string() })
    }
    false => Err(DecodeError::MalformedWord { line, text: text.to_string() })
  }
}

/// Parses a whole bytecode listing, skipping blank lines.
pub fn parse_bytecode(text: &str) -> Result<Vec<EncodedInstruction>, DecodeError> {
  text.lines()
      .enumerate()
      .filter(|(_, line)| !line.trim().is_empty())
      .map(|(idx, line)| parse_bytecode_line(line, idx + 1))
      .collect()
}

/// Renders a program as a bytecode listing, one instruction per line.
pub fn bytecode_text(code: &[EncodedInstruction]) -> String {
  code.iter()
      .map(EncodedInstruction::to_string)
      .collect::<Vec<String>>()
      .join("\n")
}

pub fn try_decode_instruction(word: EncodedInstruction) -> Result<Instruction, DecodeError> {
  let opcode = Operation::try_from(word.opcode())
    .map_err(|_| DecodeError::UnknownOpcode { opcode: word.opcode() })?;

  let instruction =
    match opcode {
      Operation::LoopExit => {
        // [OpCode:4][Target:16][Reserved:16]
        Instruction::LoopExit { target: word.operand1() }
      }
      _ => {
        // [OpCode:4][Destination:16][Source:16]
        Instruction::Binary {
          opcode,
          destination : Address::decode(word.operand1()),
          source      : Address::decode(word.operand2()),
        }
      }
    };

  Ok(instruction)
}

/**
  Encodes the instruction into bytecode. Operand ranges are the caller's responsibility; the
  encoder in `compiler` checks them before an `Instruction` is built.
*/
pub fn encode_instruction(instruction: &Instruction) -> EncodedInstruction {
  match instruction {

    Instruction::Binary { opcode, destination, source } => {
      EncodedInstruction::from_fields(opcode.code(), destination.encode(), source.encode())
    }

    Instruction::LoopExit { target } => {
      EncodedInstruction::from_fields(Operation::LoopExit.code(), *target, 0)
    }

  }
}
