/*!
  A compiler and virtual CPU for a minimal loop language.

  Programs are assignments over unsigned integer constants and lowercase variables with at most one
  arithmetic operator each, plus non-nested counted loops:
  ```text
    x := 17; y := x + 2; z := 0; TO y DO z := z + x END
  ```
  The compiler lowers source text through lexemes and assembly to 36 bit bytecode. The `Cpu` loads
  the bytecode into program memory and executes it on a register file (AC, ECX, PC, IR) and a
  growable data memory.
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

pub mod address;
pub mod bytecode;
pub mod compiler;
pub mod cpu;
pub mod error;
pub mod symboltable;
pub mod value;

pub use address::{Address, Register};
pub use compiler::Compilation;
pub use cpu::{Cpu, Status};
pub use error::{DecodeError, EncodeError, Error, ExecError, LexError, SyntaxError};
pub use symboltable::SymbolTable;
pub use value::Value;

/// The program run when no source file is given.
pub const DEMO_PROGRAM: &str = "x := 17; y := x + 2; z := 0; TO y DO z := z + x END";

/// Compiles source text to bytecode.
pub fn compile(source: &str) -> Result<Compilation, Error> {
  Compilation::compile(source)
}

/// Compiles source text and runs it to completion, returning the compilation and the halted CPU.
pub fn execute(source: &str) -> Result<(Compilation, Cpu), Error> {
  let compilation = compile(source)?;
  let mut cpu = Cpu::load(&compilation);
  cpu.run()?;
  Ok((compilation, cpu))
}



#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn demo_program_runs() {
    test_utils::init_test_logging();
    let (compilation, cpu) = execute(DEMO_PROGRAM).unwrap();
    assert_eq!(compilation.code.len(), 8);
    assert_eq!(cpu.status(), Status::Halted);
    assert_eq!(cpu.variable("z"), Some(Value::Int(323)));
  }

  #[test]
  fn errors_carry_their_stage() {
    assert!(matches!(compile("x := 3a"), Err(Error::Lex(_))));
    assert!(matches!(compile("x := 1 +"), Err(Error::Syntax(_))));
    assert!(matches!(compile("x := 40000"), Err(Error::Encode(_))));
    assert!(matches!(execute("x := y"), Err(Error::Exec(_))));
  }
}
