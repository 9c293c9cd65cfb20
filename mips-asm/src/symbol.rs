//! Symbol tables. Each source file gets
//! its own local table; one program-wide global table collects names promoted by `.globl` plus
//! names declared with `.extern`.

use crate::token::SourceLocation;
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub defining_location: SourceLocation,
    pub address: u32,
}

#[derive(Debug, PartialEq, Eq)]
pub struct SymbolAlreadyExists(pub String);

/// A name-to-address map with insert-once semantics.
#[derive(Default, Debug)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable { symbols: HashMap::new() }
    }

    pub fn define(&mut self, name: &str, address: u32, location: SourceLocation) -> Result<(), SymbolAlreadyExists> {
        if self.symbols.contains_key(name) {
            return Err(SymbolAlreadyExists(name.to_owned()));
        }
        self.symbols.insert(
            name.to_owned(),
            Symbol { name: name.to_owned(), defining_location: location, address },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// Removes and returns a local symbol so it can be reinserted into the global table by
    /// `.globl` promotion.
    pub fn take(&mut self, name: &str) -> Option<Symbol> {
        self.symbols.remove(name)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::rc::Rc;

    fn loc() -> SourceLocation {
        SourceLocation { file: Rc::new("t.s".into()), line: 1, line_offset: 0, file_offset: 0 }
    }

    #[test]
    fn duplicate_definition_is_rejected() {
        let mut table = SymbolTable::new();
        table.define("loop", 0x400000, loc()).unwrap();
        assert_eq!(table.define("loop", 0x400004, loc()), Err(SymbolAlreadyExists("loop".into())));
    }

    #[test]
    fn take_removes_symbol_for_promotion_to_global() {
        let mut table = SymbolTable::new();
        table.define("main", 0x400000, loc()).unwrap();
        let sym = table.take("main").unwrap();
        assert_eq!(sym.address, 0x400000);
        assert!(!table.contains("main"));
    }
}
