/*!
  Translates lexemes into assembly lines.

  The language is given by the following EBNF:
  ```text
    <program>     ::= <statements>
    <statements>  ::= ( <statement> | ';' )*
    <statement>   ::= <variable> ':=' <expression>
                    | 'TO' <operand> 'DO' <statements> 'END'
    <expression>  ::= <operand> ( <math_op> <operand> )?
    <operand>     ::= <variable> | <constant>
  ```

  Assignments compile to at most three instructions. The destination is used as its own scratch
  space unless it also appears as the right operand, in which case the accumulator is used:
  ```text
    d := a        MOV d a
    d := d + b    ADD d b
    d := a + b    MOV d a;  ADD d b
    d := a - d    MOV AC a; SUB AC d; MOV d AC
  ```

  A loop `TO n DO body END` loads ECX, marks the re-entry point, and closes with a decrement and a
  loop-exit instruction:
  ```text
    MOV ECX n
    labelK
    <body>
    SUB ECX 1
    JMP
  ```
  The body always runs at least once for a counter that is zero at run time, since the only
  branch is backwards. A loop over the literal `0` is dropped at compile time.
*/

use string_cache::DefaultAtom;

use crate::address::Register;
use crate::bytecode::{AssemblyLine, Operand, Operation, LABEL_PREFIX};
use crate::error::SyntaxError;
use super::lexer::{Lexeme, LexemeKind};

struct Generator<'a> {
  lexemes  : &'a [Lexeme],
  position : usize,
  lines    : Vec<AssemblyLine>,
  // Number of labels emitted so far, used to name the next one.
  loops    : usize,
  in_loop  : bool,
}

/// Generates the assembly for a tokenized program.
pub fn generate(lexemes: &[Lexeme]) -> Result<Vec<AssemblyLine>, SyntaxError> {
  let mut generator = Generator::new(lexemes);
  generator.statements()?;
  tracing::debug!(lines = generator.lines.len(), loops = generator.loops, "generated assembly");
  Ok(generator.lines)
}

impl<'a> Generator<'a> {

  fn new(lexemes: &'a [Lexeme]) -> Generator<'a> {
    Generator {
      lexemes,
      position : 0,
      lines    : Vec::new(),
      loops    : 0,
      in_loop  : false,
    }
  }

  // region Cursor

  fn peek(&self) -> Option<&'a Lexeme> {
    self.lexemes.get(self.position)
  }

  fn advance(&mut self) -> Option<&'a Lexeme> {
    let lexeme = self.lexemes.get(self.position);
    if lexeme.is_some() {
      self.position += 1;
    }
    lexeme
  }

  /// Consumes the next lexeme, which must be of the given kind.
  fn expect_kind(&mut self, kind: LexemeKind, expected: &'static str) -> Result<&'a Lexeme, SyntaxError> {
    match self.advance() {
      Some(lexeme) if lexeme.kind == kind => Ok(lexeme),
      Some(lexeme) => Err(unexpected(lexeme, expected)),
      None         => Err(SyntaxError::UnexpectedEnd { expected }),
    }
  }

  /// Consumes the next lexeme, which must be the given reserved word.
  fn expect_word(&mut self, word: &str, expected: &'static str) -> Result<(), SyntaxError> {
    match self.advance() {
      Some(lexeme) if lexeme.is(LexemeKind::ReservedWord, word) => Ok(()),
      Some(lexeme) => Err(unexpected(lexeme, expected)),
      None         => Err(SyntaxError::UnexpectedEnd { expected }),
    }
  }

  // endregion

  fn emit(&mut self, operation: Operation, operands: Vec<Operand>) {
    self.lines.push(AssemblyLine::instruction(operation, operands));
  }

  /// Parses statements until the end of input or, inside a loop, until `END`, which is left for
  /// the caller to consume.
  fn statements(&mut self) -> Result<(), SyntaxError> {
    loop {
      let lexeme = match self.peek() {
        Some(lexeme) => lexeme,
        None if self.in_loop => return Err(SyntaxError::UnexpectedEnd { expected: "END" }),
        None => return Ok(()),
      };

      match lexeme.kind {

        LexemeKind::Semicolon => {
          self.advance();
        }

        LexemeKind::Variable => self.assignment()?,

        LexemeKind::ReservedWord if &*lexeme.text == "TO" => self.loop_statement()?,

        LexemeKind::ReservedWord if &*lexeme.text == "END" && self.in_loop => return Ok(()),

        _ => return Err(unexpected(lexeme, "a statement")),

      }
    }
  }

  fn operand(&mut self) -> Result<Operand, SyntaxError> {
    const EXPECTED: &str = "a variable or constant";
    match self.advance() {
      Some(lexeme) => {
        match lexeme.kind {
          LexemeKind::Variable => Ok(Operand::Variable(lexeme.text.clone())),
          LexemeKind::Constant => {
            lexeme.text
                  .parse::<u64>()
                  .map(Operand::Constant)
                  .map_err(|_| unexpected(lexeme, EXPECTED))
          }
          _ => Err(unexpected(lexeme, EXPECTED)),
        }
      }
      None => Err(SyntaxError::UnexpectedEnd { expected: EXPECTED }),
    }
  }

  fn assignment(&mut self) -> Result<(), SyntaxError> {
    let destination = self.expect_kind(LexemeKind::Variable, "a variable")?.text.clone();
    self.expect_kind(LexemeKind::AssignOp, "`:=`")?;
    let left = self.operand()?;

    let operation = match self.peek() {
      Some(lexeme) if lexeme.kind == LexemeKind::MathOp => {
        self.advance();
        Some(math_operation(lexeme)?)
      }
      _ => None
    };

    let operation = match operation {
      Some(operation) => operation,
      None => {
        self.emit(Operation::Move, vec![Operand::Variable(destination), left]);
        return Ok(());
      }
    };

    let right = self.operand()?;
    let target = Operand::Variable(destination.clone());

    match (left == target, right == target) {

      (true, _) => {
        // d := d op b
        self.emit(operation, vec![target, right]);
      }

      (false, true) => {
        // d := a op d would clobber d before it is read, so go through the accumulator.
        let accumulator = Operand::Register(Register::Accumulator);
        self.emit(Operation::Move, vec![accumulator.clone(), left]);
        self.emit(operation, vec![accumulator.clone(), right]);
        self.emit(Operation::Move, vec![target, accumulator]);
      }

      (false, false) => {
        self.emit(Operation::Move, vec![target.clone(), left]);
        self.emit(operation, vec![target, right]);
      }

    }
    Ok(())
  }

  fn loop_statement(&mut self) -> Result<(), SyntaxError> {
    let line = match self.advance() {
      Some(lexeme) => lexeme.line,
      None         => return Err(SyntaxError::UnexpectedEnd { expected: "TO" }),
    };
    if self.in_loop {
      return Err(SyntaxError::NestedLoop { line });
    }

    let count = self.operand()?;
    self.expect_word("DO", "DO")?;

    let start = self.lines.len();
    let counter = Operand::Register(Register::LoopCounter);
    self.emit(Operation::Move, vec![counter.clone(), count.clone()]);
    let label = DefaultAtom::from(format!("{}{}", LABEL_PREFIX, self.loops));
    self.lines.push(AssemblyLine::Label(label));
    self.loops += 1;

    self.in_loop = true;
    self.statements()?;
    self.in_loop = false;
    self.expect_word("END", "END")?;

    self.emit(Operation::Subtract, vec![counter, Operand::Constant(1)]);
    self.emit(Operation::LoopExit, vec![]);

    if count == Operand::Constant(0) {
      tracing::debug!(line, "dropping loop with a zero count");
      self.lines.truncate(start);
    }
    Ok(())
  }
}

fn math_operation(lexeme: &Lexeme) -> Result<Operation, SyntaxError> {
  match &*lexeme.text {
    "+" => Ok(Operation::Add),
    "-" => Ok(Operation::Subtract),
    "*" => Ok(Operation::Multiply),
    "/" => Ok(Operation::Divide),
    _   => Err(unexpected(lexeme, "`+`, `-`, `*` or `/`")),
  }
}

fn unexpected(lexeme: &Lexeme, expected: &'static str) -> SyntaxError {
  SyntaxError::UnexpectedToken {
    line: lexeme.line,
    expected,
    found: lexeme.text.to_string(),
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use crate::bytecode::assembly_text;
  use crate::compiler::lexer::tokenize;

  fn assemble(source: &str) -> String {
    assembly_text(&generate(&tokenize(source).unwrap()).unwrap())
  }

  fn fails(source: &str) -> SyntaxError {
    generate(&tokenize(source).unwrap()).unwrap_err()
  }

  #[test]
  fn demo_program() {
    let source = "x := 17;
                  y := x + 2;
                  z := 0;
                  TO y DO
                      z := z + x
                  END";
    assert_eq!(
      assemble(source),
      "MOV x 17\n\
       MOV y x\n\
       ADD y 2\n\
       MOV z 0\n\
       MOV ECX y\n\
       label0\n\
       ADD z x\n\
       SUB ECX 1\n\
       JMP"
    );
  }

  #[test]
  fn destination_on_the_right_uses_accumulator() {
    assert_eq!(assemble("a := b - a"), "MOV AC b\nSUB AC a\nMOV a AC");
  }

  #[test]
  fn destination_on_the_left_is_updated_in_place() {
    assert_eq!(assemble("a := a - b;"), "SUB a b");
    assert_eq!(assemble("a := a * a"), "MUL a a");
  }

  #[test]
  fn semicolons_are_optional_separators() {
    assert_eq!(assemble(";; a := 1 b := 2;"), "MOV a 1\nMOV b 2");
    assert_eq!(assemble(""), "");
  }

  #[test]
  fn sequential_loops_get_fresh_labels() {
    let text = assemble("TO 2 DO a := a + 1 END; TO 3 DO b := b + 1 END");
    assert!(text.contains("label0"));
    assert!(text.contains("label1"));
  }

  #[test]
  fn literal_zero_loop_is_dropped() {
    assert_eq!(assemble("a := 1; TO 0 DO a := a + 1 END; b := a"), "MOV a 1\nMOV b a");
  }

  #[test]
  fn nested_loops_are_rejected() {
    assert_eq!(
      fails("TO 2 DO\n  TO 3 DO a := 1 END\nEND"),
      SyntaxError::NestedLoop { line: 2 }
    );
  }

  #[test]
  fn grammar_errors() {
    assert_eq!(
      fails("a := b + c + d"),
      SyntaxError::UnexpectedToken { line: 1, expected: "a statement", found: "+".to_string() }
    );
    assert_eq!(fails("a :="), SyntaxError::UnexpectedEnd { expected: "a variable or constant" });
    assert_eq!(fails("TO 3 DO a := 1"), SyntaxError::UnexpectedEnd { expected: "END" });
    assert_eq!(
      fails("END"),
      SyntaxError::UnexpectedToken { line: 1, expected: "a statement", found: "END".to_string() }
    );
    assert_eq!(
      fails("7 := a"),
      SyntaxError::UnexpectedToken { line: 1, expected: "a statement", found: "7".to_string() }
    );
    assert_eq!(
      fails("TO a b := 1 END"),
      SyntaxError::UnexpectedToken { line: 1, expected: "DO", found: "b".to_string() }
    );
  }
}
