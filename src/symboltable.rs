use bimap::BiMap;
use string_cache::DefaultAtom;

use crate::address::{MAX_VARIABLE, VARIABLE_BASE};
use crate::bytecode::Word;

/**
  The symbol table maps variable names to their storage addresses. The first variable gets
  `VARIABLE_BASE` and each new one gets one past the largest address handed out so far, so the
  addresses are dense and their order is the order in which the names were first seen. A symbol
  table is really just a convenience wrapper around a BiMap.
*/
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SymbolTable {
  table: BiMap<DefaultAtom, Word>,
  // Largest address assigned so far, if any.
  last: Option<Word>,
}

impl SymbolTable {

  pub fn new() -> SymbolTable {
    SymbolTable {
      table : BiMap::new(),
      last  : None,
    }
  }

  pub fn len(&self) -> usize {
    self.table.len()
  }

  pub fn is_empty(&self) -> bool {
    self.table.is_empty()
  }

  pub fn get_symbol(&self, address: Word) -> Option<DefaultAtom> {
    self.table.get_by_right(&address).cloned()
  }

  pub fn get_address(&self, name: &str) -> Option<Word> {
    self.table.get_by_left(&DefaultAtom::from(name)).cloned()
  }

  /// Returns the address of `name`, assigning the next free one if it has none yet. Returns
  /// `None` when the variable address space is used up.
  pub fn address_of(&mut self, name: &DefaultAtom) -> Option<Word> {
    if let Some(address) = self.table.get_by_left(name) {
      return Some(*address);
    }

    let address = match self.last {
      None                             => VARIABLE_BASE,
      Some(last) if last < MAX_VARIABLE => last + 1,
      Some(_)                          => return None,
    };
    self.table.insert(name.clone(), address);
    self.last = Some(address);
    Some(address)
  }

  /// Names and addresses in allocation order.
  pub fn entries(&self) -> Vec<(DefaultAtom, Word)> {
    let mut entries: Vec<(DefaultAtom, Word)> =
      self.table.iter().map(|(name, address)| (name.clone(), *address)).collect();
    entries.sort_by_key(|(_, address)| *address);
    entries
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sequential_allocation() {
    let mut symbols = SymbolTable::new();
    assert!(symbols.is_empty());
    assert_eq!(symbols.address_of(&DefaultAtom::from("x")), Some(32768));
    assert_eq!(symbols.address_of(&DefaultAtom::from("y")), Some(32769));
    assert_eq!(symbols.address_of(&DefaultAtom::from("x")), Some(32768));
    assert_eq!(symbols.address_of(&DefaultAtom::from("z")), Some(32770));
    assert_eq!(symbols.len(), 3);
  }

  #[test]
  fn lookups_both_ways() {
    let mut symbols = SymbolTable::new();
    symbols.address_of(&DefaultAtom::from("count"));
    assert_eq!(symbols.get_address("count"), Some(32768));
    assert_eq!(symbols.get_address("missing"), None);
    assert_eq!(symbols.get_symbol(32768), Some(DefaultAtom::from("count")));
    assert_eq!(symbols.get_symbol(32769), None);
  }

  #[test]
  fn entries_follow_allocation_order() {
    let mut symbols = SymbolTable::new();
    for name in ["b", "a", "c"] {
      symbols.address_of(&DefaultAtom::from(name));
    }
    let names: Vec<String> = symbols.entries().iter().map(|(n, _)| n.to_string()).collect();
    assert_eq!(names, vec!["b", "a", "c"]);
  }

  #[test]
  fn exhaustion() {
    let mut symbols = SymbolTable::new();
    let capacity = (MAX_VARIABLE - VARIABLE_BASE) as usize + 1;
    for i in 0..capacity {
      assert!(symbols.address_of(&DefaultAtom::from(format!("v{}", i))).is_some());
    }
    assert_eq!(symbols.address_of(&DefaultAtom::from("overflow")), None);
    assert_eq!(symbols.get_address("v0"), Some(VARIABLE_BASE));
    assert_eq!(symbols.get_address(&format!("v{}", capacity - 1)), Some(MAX_VARIABLE));
  }
}
