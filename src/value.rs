//! Runtime values held in registers and data memory.
//!
//! The language only has unsigned integer literals, but subtraction can go negative and division
//! is real-valued: `7 / 2` is `3.5`. A division that comes out even stays an integer, so programs
//! that never divide unevenly never see a `Real`.

use std::fmt::{Display, Formatter};

use strum_macros::{Display as StrumDisplay, IntoStaticStr};

#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Value {
  Int(i64),
  Real(f64),
}

/// The binary operations behind ADD, SUB, MUL and DIV.
#[derive(StrumDisplay, IntoStaticStr, Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Arithmetic {
  #[strum(serialize = "ADD")]
  Add,
  #[strum(serialize = "SUB")]
  Sub,
  #[strum(serialize = "MUL")]
  Mul,
  #[strum(serialize = "DIV")]
  Div,
}

/// Why an arithmetic operation has no result. The CPU attaches the program counter.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ArithmeticFault {
  DivisionByZero,
  Overflow,
}

impl Default for Value {
  fn default() -> Self {
    Value::Int(0)
  }
}

impl Value {

  pub fn as_f64(&self) -> f64 {
    match self {
      Value::Int(i)  => *i as f64,
      Value::Real(r) => *r,
    }
  }

  /// Whether a loop-exit instruction should send control back to its target.
  pub fn is_positive(&self) -> bool {
    match self {
      Value::Int(i)  => *i > 0,
      Value::Real(r) => *r > 0.0,
    }
  }

  pub fn is_zero(&self) -> bool {
    match self {
      Value::Int(i)  => *i == 0,
      Value::Real(r) => *r == 0.0,
    }
  }

  /// Computes `left op right`. Integer operands use checked arithmetic; as soon as either side is
  /// real the operation happens in floating point, and a result that is no longer finite counts as
  /// an overflow.
  pub fn apply(op: Arithmetic, left: Value, right: Value) -> Result<Value, ArithmeticFault> {
    if op == Arithmetic::Div && right.is_zero() {
      return Err(ArithmeticFault::DivisionByZero);
    }

    match (left, right) {

      (Value::Int(a), Value::Int(b)) => {
        let result = match op {
          Arithmetic::Add => a.checked_add(b),
          Arithmetic::Sub => a.checked_sub(b),
          Arithmetic::Mul => a.checked_mul(b),
          Arithmetic::Div => {
            match a.checked_rem(b) {
              Some(0) => a.checked_div(b),
              Some(_) => return Ok(Value::Real(a as f64 / b as f64)),
              None    => None,
            }
          }
        };
        result.map(Value::Int).ok_or(ArithmeticFault::Overflow)
      }

      (left, right) => {
        let (a, b) = (left.as_f64(), right.as_f64());
        let result = match op {
          Arithmetic::Add => a + b,
          Arithmetic::Sub => a - b,
          Arithmetic::Mul => a * b,
          Arithmetic::Div => a / b,
        };
        match result.is_finite() {
          true  => Ok(Value::Real(result)),
          false => Err(ArithmeticFault::Overflow),
        }
      }

    }
  }
}

impl Display for Value {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Value::Int(i)  => write!(f, "{}", i),
      Value::Real(r) => write!(f, "{}", r),
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  fn int(i: i64) -> Value {
    Value::Int(i)
  }

  #[test]
  fn integer_arithmetic() {
    assert_eq!(Value::apply(Arithmetic::Add, int(17), int(2)), Ok(int(19)));
    assert_eq!(Value::apply(Arithmetic::Sub, int(5), int(3)), Ok(int(2)));
    assert_eq!(Value::apply(Arithmetic::Sub, int(3), int(5)), Ok(int(-2)));
    assert_eq!(Value::apply(Arithmetic::Mul, int(17), int(19)), Ok(int(323)));
    assert_eq!(Value::apply(Arithmetic::Div, int(12), int(4)), Ok(int(3)));
  }

  #[test]
  fn uneven_division_is_real() {
    assert_eq!(Value::apply(Arithmetic::Div, int(7), int(2)), Ok(Value::Real(3.5)));
    assert_eq!(
      Value::apply(Arithmetic::Add, Value::Real(3.5), int(1)),
      Ok(Value::Real(4.5))
    );
  }

  #[test]
  fn faults() {
    assert_eq!(Value::apply(Arithmetic::Div, int(1), int(0)), Err(ArithmeticFault::DivisionByZero));
    assert_eq!(
      Value::apply(Arithmetic::Div, int(1), Value::Real(0.0)),
      Err(ArithmeticFault::DivisionByZero)
    );
    assert_eq!(Value::apply(Arithmetic::Mul, int(i64::MAX), int(2)), Err(ArithmeticFault::Overflow));
    assert_eq!(Value::apply(Arithmetic::Div, int(i64::MIN), int(-1)), Err(ArithmeticFault::Overflow));
    assert_eq!(
      Value::apply(Arithmetic::Mul, Value::Real(f64::MAX), int(2)),
      Err(ArithmeticFault::Overflow)
    );
    assert_eq!(
      Value::apply(Arithmetic::Sub, Value::Real(-f64::MAX), Value::Real(f64::MAX)),
      Err(ArithmeticFault::Overflow)
    );
  }

  #[test]
  fn loop_condition() {
    assert!(int(3).is_positive());
    assert!(!int(0).is_positive());
    assert!(!int(-1).is_positive());
    assert!(Value::Real(0.5).is_positive());
  }

  #[test]
  fn display() {
    assert_eq!(int(323).to_string(), "323");
    assert_eq!(Value::Real(2.5).to_string(), "2.5");
  }
}
