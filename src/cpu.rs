//! The virtual CPU: a register file, data memory, and a fetch-decode-execute cycle over 36 bit
//! instructions.
//!
//! Registers:
//!  * AC  - accumulator, scratch space for arithmetic the compiler can't do in place
//!  * ECX - loop counter, read by the loop-exit instruction
//!  * PC  - program counter, index of the next instruction
//!  * IR  - instruction register, the raw word being executed
//!
//! Program memory and data memory are separate stores. Data memory grows one slot at a time: a
//! variable may be written at the first unused slot, and reading or writing past that is an error.

use std::fmt::{Display, Formatter};
use std::io::Write;

use prettytable::{format as TableFormat, Table};

use crate::address::{Address, Register};
use crate::bytecode::*;
use crate::compiler::Compilation;
use crate::error::{DecodeError, ExecError};
use crate::symboltable::SymbolTable;
use crate::value::{Arithmetic, ArithmeticFault, Value};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Status {
  Running,
  /// The program counter ran off the end of program memory.
  Halted,
}

/// What a loop-exit instruction does with the program counter.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum LoopTransition {
  /// Go back to the loop's first instruction.
  Repeat(usize),
  /// Continue with the instruction after the loop.
  FallThrough,
}

/**
  The loop-exit rule: repeat while the counter is positive. A counter of zero, or one that has
  gone negative, leaves the loop. The counter is read fresh at every check.
*/
pub fn loop_transition(counter: Value, target: Word) -> LoopTransition {
  match counter.is_positive() {
    true  => LoopTransition::Repeat(target as usize),
    false => LoopTransition::FallThrough,
  }
}

pub struct Cpu {

  // Memory Stores
  program : Vec<EncodedInstruction>, // Program memory, read only while running
  data    : Vec<Value>,              // Data memory, indexed from `VARIABLE_BASE`

  // Registers //
  ac  : Value,              // Accumulator
  ecx : Value,              // Loop counter
  pc  : usize,              // Program counter
  ir  : EncodedInstruction, // Instruction register

  // Number of instructions executed so far.
  cycles  : u64,
  // Variable names for the dump, when the program came from a compilation.
  symbols : Option<SymbolTable>,

}

impl Cpu {

  // region Loading

  pub fn new(program: Vec<EncodedInstruction>) -> Cpu {
    tracing::debug!(instructions = program.len(), "loaded program");
    Cpu {
      program,
      data    : vec![],
      ac      : Value::default(),
      ecx     : Value::default(),
      pc      : 0,
      ir      : EncodedInstruction::from_fields(0, 0, 0),
      cycles  : 0,
      symbols : None,
    }
  }

  /// Loads a compiled program, keeping its symbol table to label the dump.
  pub fn load(compilation: &Compilation) -> Cpu {
    let mut cpu = Cpu::new(compilation.code.clone());
    cpu.symbols = Some(compilation.symbols.clone());
    cpu
  }

  /// Loads a bytecode listing, one 36 bit instruction per line.
  pub fn load_bytecode_text(text: &str) -> Result<Cpu, DecodeError> {
    Ok(Cpu::new(parse_bytecode(text)?))
  }

  // endregion

  // region Accessors

  pub fn status(&self) -> Status {
    match self.pc >= self.program.len() {
      true  => Status::Halted,
      false => Status::Running,
    }
  }

  pub fn accumulator(&self) -> Value {
    self.ac
  }

  pub fn loop_counter(&self) -> Value {
    self.ecx
  }

  pub fn pc(&self) -> usize {
    self.pc
  }

  pub fn ir(&self) -> EncodedInstruction {
    self.ir
  }

  pub fn cycles(&self) -> u64 {
    self.cycles
  }

  pub fn data(&self) -> &[Value] {
    &self.data
  }

  /// The value stored at a variable's storage address, if that slot has been written.
  pub fn value_at(&self, address: Word) -> Option<Value> {
    match Address::decode(address) {
      Address::Variable(idx) => self.data.get(idx).copied(),
      _ => None
    }
  }

  /// The value of a named variable. Only available for programs loaded from a compilation.
  pub fn variable(&self, name: &str) -> Option<Value> {
    let address = self.symbols.as_ref()?.get_address(name)?;
    self.value_at(address)
  }

  // endregion

  // region Fetch-execute cycle

  /// Runs until the program counter leaves program memory. There is no limit on the number of
  /// cycles; a loop whose counter never reaches zero runs forever.
  pub fn run(&mut self) -> Result<(), ExecError> {
    while self.step()? == Status::Running {}
    tracing::debug!(cycles = self.cycles, "halted");
    Ok(())
  }

  /// Like `run`, but gives up after executing `limit` instructions.
  pub fn run_with_limit(&mut self, limit: u64) -> Result<(), ExecError> {
    let mut executed = 0u64;
    while self.status() == Status::Running {
      if executed >= limit {
        return Err(ExecError::CycleLimitExceeded { limit });
      }
      self.step()?;
      executed += 1;
    }
    tracing::debug!(cycles = self.cycles, "halted");
    Ok(())
  }

  /// Executes one instruction and reports whether there is more to do. Stepping a halted CPU is
  /// a no-op.
  pub fn step(&mut self) -> Result<Status, ExecError> {
    if self.status() == Status::Halted {
      return Ok(Status::Halted);
    }

    #[cfg(feature = "trace_computation")] println!("{}", self);

    self.fetch();
    let instruction = self.decode()?;
    tracing::trace!(pc = self.pc, %instruction, "execute");
    self.execute(&instruction)?;
    self.cycles += 1;

    Ok(self.status())
  }

  fn fetch(&mut self) {
    self.ir = self.program[self.pc];
  }

  fn decode(&self) -> Result<Instruction, ExecError> {
    try_decode_instruction(self.ir).map_err(|error| {
      match error {
        DecodeError::UnknownOpcode { opcode } => ExecError::UnknownOpcode { pc: self.pc, opcode },
        // Words in program memory are well formed by construction.
        DecodeError::MalformedWord { .. }     => ExecError::UnknownOpcode { pc: self.pc, opcode: self.ir.opcode() },
      }
    })
  }

  fn execute(&mut self, instruction: &Instruction) -> Result<(), ExecError> {
    match instruction {

      Instruction::Binary { opcode, destination, source } => {
        self.transfer(*destination, *source, opcode.arithmetic())?;
        self.pc += 1;
      }

      Instruction::LoopExit { target } => {
        match loop_transition(self.ecx, *target) {
          LoopTransition::Repeat(target) => {
            tracing::trace!(target, ecx = %self.ecx, "repeat loop");
            self.pc = target;
          }
          LoopTransition::FallThrough => {
            self.pc += 1;
          }
        }
      }

    }
    Ok(())
  }

  // endregion

  // region Data movement

  /**
    The single read-resolve-write routine behind every data instruction. A plain move stores the
    source value; an arithmetic instruction stores `destination op source`.
  */
  fn transfer(&mut self, destination: Address, source: Address, arithmetic: Option<Arithmetic>)
    -> Result<(), ExecError>
  {
    let source_value = self.get_data(source)?;
    let value = match arithmetic {
      None     => source_value,
      Some(op) => {
        let current = self.get_data(destination)?;
        Value::apply(op, current, source_value).map_err(|fault| {
          match fault {
            ArithmeticFault::DivisionByZero => ExecError::DivisionByZero { pc: self.pc },
            ArithmeticFault::Overflow       => ExecError::ArithmeticOverflow { pc: self.pc, operation: op.into() },
          }
        })?
      }
    };
    self.store(destination, value)
  }

  /// Resolves an operand to the value it denotes.
  fn get_data(&self, address: Address) -> Result<Value, ExecError> {
    match address {
      Address::Literal(value)                  => Ok(Value::Int(value as i64)),
      Address::Variable(idx)                   => {
        self.data.get(idx).copied().ok_or(ExecError::MemoryOutOfBounds {
          pc      : self.pc,
          address : address.encode(),
          length  : self.data.len(),
        })
      }
      Address::Register(Register::Accumulator) => Ok(self.ac),
      Address::Register(Register::LoopCounter) => Ok(self.ecx),
    }
  }

  /**
    Writes a value to a register or variable. A variable whose slot is one past the end of data
    memory is appended; anything further out is out of bounds.
  */
  fn store(&mut self, address: Address, value: Value) -> Result<(), ExecError> {
    match address {

      Address::Literal(constant) => {
        Err(ExecError::ConstantDestination { pc: self.pc, value: constant })
      }

      Address::Variable(idx) if idx < self.data.len() => {
        self.data[idx] = value;
        Ok(())
      }

      Address::Variable(idx) if idx == self.data.len() => {
        self.data.push(value);
        Ok(())
      }

      Address::Variable(_) => {
        Err(ExecError::MemoryOutOfBounds {
          pc      : self.pc,
          address : address.encode(),
          length  : self.data.len(),
        })
      }

      Address::Register(Register::Accumulator) => {
        self.ac = value;
        Ok(())
      }

      Address::Register(Register::LoopCounter) => {
        self.ecx = value;
        Ok(())
      }

    }
  }

  // endregion

  // region Display methods

  /// Writes the register and data memory dump.
  pub fn write_dump<W: Write>(&self, sink: &mut W) -> std::io::Result<()> {
    writeln!(sink, "{}", self)
  }

  fn register_table(&self) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Register", ubl->"Contents"]);
    table.add_row(row![r->"AC =",  self.ac]);
    table.add_row(row![r->"ECX =", self.ecx]);
    table.add_row(row![r->"PC =",  self.pc]);
    table.add_row(row![r->"IR =",  self.ir]);
    table
  }

  fn data_table(&self) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Address", ubl->"Contents"]);

    for (i, value) in self.data.iter().enumerate() {
      let address = Address::from_slot_idx(i);
      let name = self.symbols
                     .as_ref()
                     .and_then(|symbols| symbols.get_symbol(address.encode()));
      match name {
        Some(name) => table.add_row(row![r->format!("{} {} =", address, name), value]),
        None       => table.add_row(row![r->format!("{} =", address), value]),
      };
    }
    table
  }

  // endregion
}


lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl Display for Cpu {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let r_table = self.register_table();
    let d_table = self.data_table();

    let mut combined_table = table!([r_table, d_table]);

    combined_table.set_titles(row![ub->"Registers", ub->"Data Memory"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    let status = match self.status() {
      Status::Halted  => "Halted.",
      Status::Running => "Running.",
    };

    write!(f, "{}\tCycles: {}\n{}", status, self.cycles, combined_table)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use crate::address::VARIABLE_BASE;

  fn run_assembly(text: &str) -> Result<Cpu, ExecError> {
    let compilation = Compilation::from_assembly_text(text).unwrap();
    let mut cpu = Cpu::load(&compilation);
    cpu.run_with_limit(10_000)?;
    Ok(cpu)
  }

  fn int(i: i64) -> Value {
    Value::Int(i)
  }

  #[test]
  fn empty_program_is_halted() {
    let mut cpu = Cpu::new(vec![]);
    assert_eq!(cpu.status(), Status::Halted);
    assert_eq!(cpu.step(), Ok(Status::Halted));
    assert_eq!(cpu.cycles(), 0);
  }

  #[test]
  fn registers_start_at_zero() {
    let cpu = Cpu::new(vec![]);
    assert_eq!(cpu.accumulator(), int(0));
    assert_eq!(cpu.loop_counter(), int(0));
    assert_eq!(cpu.pc(), 0);
  }

  #[test]
  fn arithmetic_is_a_move_of_the_result() {
    let cpu = run_assembly(
      "MOV a 20\nMOV b 20\nMOV c 20\nMOV d 20\nADD a 4\nSUB b 4\nMUL c 4\nDIV d 4"
    ).unwrap();
    assert_eq!(cpu.variable("a"), Some(int(24)));
    assert_eq!(cpu.variable("b"), Some(int(16)));
    assert_eq!(cpu.variable("c"), Some(int(80)));
    assert_eq!(cpu.variable("d"), Some(int(5)));
  }

  #[test]
  fn registers_as_operands() {
    let cpu = run_assembly("MOV AC 6\nMOV ECX 7\nMUL AC ECX\nMOV r AC").unwrap();
    assert_eq!(cpu.accumulator(), int(42));
    assert_eq!(cpu.variable("r"), Some(int(42)));
  }

  #[test]
  fn division_is_real_valued() {
    let cpu = run_assembly("MOV a 7\nDIV a 2").unwrap();
    assert_eq!(cpu.variable("a"), Some(Value::Real(3.5)));
  }

  #[test]
  fn division_by_zero() {
    assert_eq!(
      run_assembly("MOV a 7\nDIV a 0").err(),
      Some(ExecError::DivisionByZero { pc: 1 })
    );
  }

  #[test]
  fn loop_runs_body_counter_times() {
    // Body increments `n` once per pass.
    let cpu = run_assembly("MOV n 0\nMOV ECX 4\nlabel0\nADD n 1\nSUB ECX 1\nJMP").unwrap();
    assert_eq!(cpu.variable("n"), Some(int(4)));
    assert_eq!(cpu.loop_counter(), int(0));
  }

  #[test]
  fn loop_exit_is_taken_counter_minus_one_times() {
    let compilation = Compilation::from_assembly_text("MOV ECX 3\nlabel0\nSUB ECX 1\nJMP").unwrap();
    let mut cpu = Cpu::load(&compilation);
    let mut evaluated = 0;
    let mut repeated  = 0;
    while cpu.status() == Status::Running {
      let at_loop_exit = cpu.pc() == 2;
      cpu.step().unwrap();
      if at_loop_exit {
        evaluated += 1;
        if cpu.pc() == 1 {
          repeated += 1;
        }
      }
    }
    assert_eq!(evaluated, 3);
    assert_eq!(repeated, 2);
  }

  #[test]
  fn loop_transition_rule() {
    assert_eq!(loop_transition(int(1), 4), LoopTransition::Repeat(4));
    assert_eq!(loop_transition(int(0), 4), LoopTransition::FallThrough);
    assert_eq!(loop_transition(int(-1), 4), LoopTransition::FallThrough);
  }

  #[test]
  fn zero_counter_falls_through() {
    let cpu = run_assembly("MOV ECX 0\nMOV a 1\nJMP\nMOV b 2").unwrap();
    assert_eq!(cpu.variable("b"), Some(int(2)));
    assert_eq!(cpu.cycles(), 4);
  }

  #[test]
  fn counter_is_read_live() {
    // ECX drops by two per pass: 5 -> 3 -> 1 -> -1.
    let cpu = run_assembly("MOV n 0\nMOV ECX 5\nlabel0\nADD n 1\nSUB ECX 2\nJMP").unwrap();
    assert_eq!(cpu.variable("n"), Some(int(3)));
    assert_eq!(cpu.loop_counter(), int(-1));
  }

  #[test]
  fn write_at_length_appends() {
    let mut cpu = Cpu::new(vec![
      EncodedInstruction::from_fields(0, VARIABLE_BASE, 1),
      EncodedInstruction::from_fields(0, VARIABLE_BASE + 1, 2),
    ]);
    cpu.run().unwrap();
    assert_eq!(cpu.data(), &[int(1), int(2)]);
  }

  #[test]
  fn write_past_length_is_out_of_bounds() {
    let mut cpu = Cpu::new(vec![
      EncodedInstruction::from_fields(0, VARIABLE_BASE, 1),
      EncodedInstruction::from_fields(0, VARIABLE_BASE + 2, 2),
    ]);
    assert_eq!(
      cpu.run(),
      Err(ExecError::MemoryOutOfBounds { pc: 1, address: VARIABLE_BASE + 2, length: 1 })
    );
    assert_eq!(cpu.data(), &[int(1)]);
  }

  #[test]
  fn read_before_write_is_out_of_bounds() {
    assert_eq!(
      run_assembly("MOV a b").err(),
      Some(ExecError::MemoryOutOfBounds { pc: 0, address: VARIABLE_BASE + 1, length: 0 })
    );
    // The destination of an arithmetic instruction is read too.
    assert_eq!(
      run_assembly("ADD a 1").err(),
      Some(ExecError::MemoryOutOfBounds { pc: 0, address: VARIABLE_BASE, length: 0 })
    );
  }

  #[test]
  fn self_initializing_move_needs_a_value() {
    assert!(run_assembly("MOV a a").is_err());
    let cpu = run_assembly("MOV a 3\nMOV a a").unwrap();
    assert_eq!(cpu.variable("a"), Some(int(3)));
  }

  #[test]
  fn constant_destination_in_hand_written_bytecode() {
    let mut cpu = Cpu::new(vec![EncodedInstruction::from_fields(0, 12, 1)]);
    assert_eq!(cpu.run(), Err(ExecError::ConstantDestination { pc: 0, value: 12 }));
  }

  #[test]
  fn unassigned_opcodes_are_rejected() {
    let mut cpu = Cpu::new(vec![EncodedInstruction::from_fields(0b1001, 0, 0)]);
    assert_eq!(cpu.run(), Err(ExecError::UnknownOpcode { pc: 0, opcode: 0b1001 }));
  }

  #[test]
  fn overflow_is_detected() {
    let text = "MOV a 32767\nlabel0\nMUL a a\nJMP";
    let compilation = Compilation::from_assembly_text(&format!("MOV ECX 1\n{}", text)).unwrap();
    let mut cpu = Cpu::load(&compilation);
    assert_eq!(
      cpu.run_with_limit(100),
      Err(ExecError::ArithmeticOverflow { pc: 2, operation: "MUL" })
    );
  }

  #[test]
  fn cycle_limit() {
    let compilation = Compilation::from_assembly_text("MOV ECX 1\nlabel0\nMOV AC 1\nJMP").unwrap();
    let mut cpu = Cpu::load(&compilation);
    assert_eq!(cpu.run_with_limit(50), Err(ExecError::CycleLimitExceeded { limit: 50 }));
    assert_eq!(cpu.cycles(), 50);
  }

  #[test]
  fn bytecode_text_loads() {
    let mut cpu = Cpu::load_bytecode_text(
      "000010000000000000000000000000010001\n000110000000000000000000000000000011\n"
    ).unwrap();
    cpu.run().unwrap();
    assert_eq!(cpu.value_at(VARIABLE_BASE), Some(int(20)));
    assert_eq!(cpu.ir().opcode(), Operation::Add.code());
    // No symbol table without a compilation.
    assert_eq!(cpu.variable("x"), None);
  }

  #[test]
  fn dump_names_variables() {
    let cpu = run_assembly("MOV total 323\nMOV AC 1").unwrap();
    let mut buffer = Vec::new();
    cpu.write_dump(&mut buffer).unwrap();
    let dump = String::from_utf8(buffer).unwrap();
    assert!(dump.starts_with("Halted."));
    assert!(dump.contains("D[32768] total ="));
    assert!(dump.contains("323"));
    assert!(dump.contains("AC ="));
  }
}
