/*!

  Instructions are 36 bits: a 4 bit opcode followed by two 16 bit operand fields.

    Opcode:    4 bits
    Operand:  16 bits, interpreted through `crate::address::Address`

  Data instructions (MOV, ADD, SUB, MUL, DIV) use the first operand as the destination and the
  second as the source. The loop-exit instruction (JMP) stores an instruction index in its first
  operand field and zeros in the second; its target is not run through the addressing scheme.

  An `Instruction` is the decoded form. An `EncodedInstruction` is the packed form that lives in
  program memory and is written out as a line of `0`s and `1`s in bytecode listings.

*/

mod binary;
mod instruction;
mod assembly;

pub use binary::{
  encode_instruction, try_decode_instruction, to_bit_string, parse_bytecode, parse_bytecode_line,
  bytecode_text, EncodedInstruction, InstructionWord, Word,
  OPCODE_BITS, OPERAND_BITS, INSTRUCTION_BITS
};
pub use instruction::{Instruction, Operation, MAX_OPCODE};
pub use assembly::{
  parse_assembly, parse_assembly_line, assembly_text, is_variable_name,
  AssemblyLine, Operand, LABEL_PREFIX
};
