use std::collections::HashMap;

use crate::register::VReg;

/// A stack of maps from local name to (virtual register, declared type
/// name), used by the function builder to resolve identifiers.
#[derive(Debug, Default)]
pub struct SymbolTable {
    scopes: Vec<HashMap<String, (VReg, String)>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable { scopes: vec![HashMap::new()] }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
        if self.scopes.is_empty() {
            self.scopes.push(HashMap::new());
        }
    }

    pub fn define(&mut self, name: impl Into<String>, vr: VReg, type_name: impl Into<String>) {
        self.scopes
            .last_mut()
            .expect("symbol table always has a scope")
            .insert(name.into(), (vr, type_name.into()));
    }

    pub fn lookup(&self, name: &str) -> Option<(VReg, String)> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_scope_shadows_outer() {
        let mut table = SymbolTable::new();
        table.define("x", VReg(0), "i32");
        table.push_scope();
        table.define("x", VReg(1), "i32");
        assert_eq!(table.lookup("x").unwrap().0, VReg(1));
        table.pop_scope();
        assert_eq!(table.lookup("x").unwrap().0, VReg(0));
    }

    #[test]
    fn unknown_identifier_is_none() {
        let table = SymbolTable::new();
        assert!(table.lookup("missing").is_none());
    }
}
