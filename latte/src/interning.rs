use std::{fmt, sync::Arc};

use ahash::AHashMap;
use parking_lot::RwLock;

/// An interned slot name.
///
/// Symbols compare, order and hash by id, which is arbitrary but stable for
/// the lifetime of their [`SymbolTable`]. `Symbol::default()` is never handed
/// out by a table; property maps use it as their empty key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Symbol(u32);

impl Symbol {
    #[inline]
    pub fn id(self) -> u32 {
        self.0
    }
}

struct SymbolTableImpl {
    names: Vec<Arc<str>>,
    mappings: AHashMap<Arc<str>, Symbol>,
    gensym_index: u64,
}

/// Shared handle to the interned slot names of one runtime.
#[derive(Clone)]
pub struct SymbolTable(Arc<RwLock<SymbolTableImpl>>);

impl SymbolTableImpl {
    fn new() -> Self {
        Self {
            names: Vec::new(),
            mappings: AHashMap::new(),
            gensym_index: 100,
        }
    }

    fn fresh(&mut self, name: Arc<str>) -> Symbol {
        self.names.push(name);
        Symbol(self.names.len() as u32)
    }

    fn get_or_add(&mut self, value: &str) -> Symbol {
        if let Some(&symbol) = self.mappings.get(value) {
            return symbol;
        }
        let name = Arc::<str>::from(value);
        let symbol = self.fresh(name.clone());
        self.mappings.insert(name, symbol);
        symbol
    }

    fn get(&self, symbol: Symbol) -> Option<Arc<str>> {
        let index = symbol.0.checked_sub(1)?;
        self.names.get(index as usize).cloned()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self(Arc::new(RwLock::new(SymbolTableImpl::new())))
    }

    /// Intern `value`. The same text always yields the same symbol.
    pub fn intern(&self, value: &str) -> Symbol {
        if let Some(&symbol) = self.0.read().mappings.get(value) {
            return symbol;
        }
        self.0.write().get_or_add(value)
    }

    /// Look up an already interned name without adding it.
    pub fn lookup(&self, value: &str) -> Option<Symbol> {
        self.0.read().mappings.get(value).copied()
    }

    pub fn resolve(&self, symbol: Symbol) -> Option<Arc<str>> {
        self.0.read().get(symbol)
    }

    /// Resolve for display; unknown symbols render as `#<id>`.
    pub fn name(&self, symbol: Symbol) -> String {
        match self.resolve(symbol) {
            Some(name) => name.to_string(),
            None => format!("#<{}>", symbol.0),
        }
    }

    /// The positional argument name `$n`.
    pub fn natural(&self, n: usize) -> Symbol {
        self.intern(&format!("${n}"))
    }

    /// A fresh `~prefixN` symbol that no other call to `intern` or `gensym`
    /// will ever return.
    pub fn gensym(&self, prefix: &str) -> Symbol {
        let mut table = self.0.write();
        table.gensym_index += 1;
        let name = format!("~{prefix}{}", table.gensym_index);
        table.fresh(Arc::from(name))
    }

    pub fn len(&self) -> usize {
        self.0.read().names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolTable")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let table = SymbolTable::new();
        let a = table.intern("foobar");
        let b = table.intern("foobar");
        let c = table.intern("nobody");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve(a).as_deref(), Some("foobar"));
        assert_eq!(table.lookup("nobody"), Some(c));
        assert_eq!(table.lookup("missing"), None);
    }

    #[test]
    fn default_symbol_is_never_interned() {
        let table = SymbolTable::new();
        let first = table.intern("first");
        assert_ne!(first, Symbol::default());
        assert_eq!(table.resolve(Symbol::default()), None);
        assert_eq!(table.name(Symbol::default()), "#<0>");
    }

    #[test]
    fn naturals_are_dollar_names() {
        let table = SymbolTable::new();
        let one = table.natural(1);
        assert_eq!(one, table.intern("$1"));
        assert_eq!(table.name(table.natural(12)), "$12");
    }

    #[test]
    fn gensyms_never_collide() {
        let table = SymbolTable::new();
        let a = table.gensym("G");
        let b = table.gensym("G");
        assert_ne!(a, b);

        let spelled = table.name(a);
        assert!(spelled.starts_with("~G"));
        assert_ne!(table.intern(&spelled), a, "gensyms stay uninterned");
    }

    #[test]
    fn handles_share_one_table() {
        let table = SymbolTable::new();
        let other = table.clone();
        let a = table.intern("shared");
        assert_eq!(other.intern("shared"), a);
    }
}
