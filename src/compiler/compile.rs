/*!
  Functions to produce a compilation artifact from source code input.

  The compilation pipeline is this:
  ```text
  text -> [`tokenize`] -> `Lexeme`s -> [`generate`] -> `AssemblyLine`s ->⋯

  ⋯-> [`Encoder`] -> `Instruction`s -> [`encode_instruction`] -> `EncodedInstruction`s
  ```
  Variables get their storage addresses in the encoder, the first time an instruction mentions
  them.
*/

use std::io::Write;

use crate::address::{Address, MAX_CONSTANT};
use crate::bytecode::*;
use crate::error::{EncodeError, Error};
use crate::symboltable::SymbolTable;
use super::generator::generate;
use super::lexer::{lexeme_text, tokenize, Lexeme};

/**
  Encodes assembly lines one at a time. Owns the symbol table while encoding, along with the
  instruction count and the active loop target.
*/
#[derive(Debug, Default)]
pub struct Encoder {
  symbols           : SymbolTable,
  instruction_count : usize,
  // Instruction index recorded by the most recent label. Nested loops are not supported, so a
  // later label simply replaces an earlier one.
  loop_target       : usize,
}

impl Encoder {

  pub fn new() -> Encoder {
    Encoder::default()
  }

  pub fn into_symbols(self) -> SymbolTable {
    self.symbols
  }

  /**
    Encodes one line. Labels produce no instruction and return `Ok(None)`. `line` is the 1-based
    position of the line in its listing and is only used for error reporting.
  */
  pub fn encode_line(&mut self, assembly: &AssemblyLine, line: usize)
    -> Result<Option<Instruction>, EncodeError>
  {
    let (operation, operands) = match assembly {

      AssemblyLine::Label(_) => {
        self.loop_target = self.instruction_count;
        return Ok(None);
      }

      AssemblyLine::Instruction { operation, operands } => (*operation, operands),

    };

    if operands.len() != operation.arity() {
      return Err(EncodeError::WrongArity {
        line,
        operation : operation.mnemonic(),
        expected  : operation.arity(),
        given     : operands.len(),
      });
    }

    let instruction =
      match operation {
        Operation::LoopExit => {
          let target = Word::try_from(self.loop_target)
            .map_err(|_| EncodeError::JumpTargetOutOfRange { line, target: self.loop_target })?;
          Instruction::LoopExit { target }
        }
        opcode => {
          Instruction::Binary {
            opcode,
            destination : self.encode_operand(&operands[0], opcode, true, line)?,
            source      : self.encode_operand(&operands[1], opcode, false, line)?,
          }
        }
      };

    self.instruction_count += 1;
    Ok(Some(instruction))
  }

  fn encode_operand(&mut self, operand: &Operand, operation: Operation, is_destination: bool, line: usize)
    -> Result<Address, EncodeError>
  {
    match operand {

      Operand::Constant(value) if is_destination => {
        Err(EncodeError::ConstantDestination { line, operation: operation.mnemonic(), value: *value })
      }

      Operand::Constant(value) if *value > MAX_CONSTANT as u64 => {
        Err(EncodeError::ConstantOutOfRange { line, value: *value })
      }

      Operand::Constant(value) => Ok(Address::Literal(*value as Word)),

      Operand::Register(register) => Ok(Address::Register(*register)),

      Operand::Variable(name) => {
        if !is_variable_name(name) {
          return Err(EncodeError::MalformedOperand { line, text: name.to_string() });
        }
        match self.symbols.address_of(name) {
          Some(address) => Ok(Address::decode(address)),
          None => Err(EncodeError::VariableSpaceExhausted { line, name: name.to_string() }),
        }
      }

    }
  }
}

/// A `Compilation` holds every intermediate form of a program along with its symbol table.
#[derive(Debug)]
pub struct Compilation {
  /// Empty when compiled from assembly.
  pub lexemes      : Vec<Lexeme>,
  pub assembly     : Vec<AssemblyLine>,
  pub instructions : Vec<Instruction>,
  pub code         : Vec<EncodedInstruction>,
  pub symbols      : SymbolTable,
}

impl Compilation {

  /// Compiles source code all the way to bytecode.
  pub fn compile(source: &str) -> Result<Compilation, Error> {
    let compilation_time = std::time::Instant::now();

    let lexemes  = tokenize(source)?;
    let assembly = generate(&lexemes)?;
    let mut compilation = Compilation::from_assembly(assembly)?;
    compilation.lexemes = lexemes;

    tracing::debug!(
      instructions = compilation.code.len(),
      variables    = compilation.symbols.len(),
      elapsed      = ?compilation_time.elapsed(),
      "compiled source"
    );
    Ok(compilation)
  }

  /// Encodes an assembly listing that has already been parsed.
  pub fn from_assembly(assembly: Vec<AssemblyLine>) -> Result<Compilation, EncodeError> {
    let mut encoder      = Encoder::new();
    let mut instructions = Vec::new();

    for (idx, line) in assembly.iter().enumerate() {
      if let Some(instruction) = encoder.encode_line(line, idx + 1)? {
        instructions.push(instruction);
      }
    }

    let code = instructions.iter().map(encode_instruction).collect();

    Ok(Compilation {
      lexemes : Vec::new(),
      assembly,
      instructions,
      code,
      symbols : encoder.into_symbols(),
    })
  }

  /// Parses and encodes assembly text.
  pub fn from_assembly_text(text: &str) -> Result<Compilation, EncodeError> {
    Compilation::from_assembly(parse_assembly(text)?)
  }

  pub fn bytecode_text(&self) -> String {
    bytecode_text(&self.code)
  }

  pub fn assembly_text(&self) -> String {
    assembly_text(&self.assembly)
  }

  // region Debug output

  pub fn write_lexemes<W: Write>(&self, sink: &mut W) -> std::io::Result<()> {
    write!(sink, "{}", lexeme_text(&self.lexemes))
  }

  pub fn write_assembly<W: Write>(&self, sink: &mut W) -> std::io::Result<()> {
    writeln!(sink, "{}", self.assembly_text())
  }

  pub fn write_bytecode<W: Write>(&self, sink: &mut W) -> std::io::Result<()> {
    write!(sink, "{}", self.bytecode_text())
  }

  // endregion
}
