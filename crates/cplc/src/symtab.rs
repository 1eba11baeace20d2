//! Hash-chained scoped symbol table (§4.E).
//!
//! Buckets are ordered by declaration recency — the most recent
//! declaration sits at the chain head — so `probe` resolving to the first
//! match on a name automatically returns the innermost in-scope binding.
//! Popping a scope just strips chain heads whose scope is at or above the
//! closing depth, which is correct precisely because every enter at depth
//! d happened after every enter at depth < d.

use crate::interner::{InternHandle, StringInterner};

/// Number of hash buckets. Prime, as in the original.
pub const HASHSIZE: usize = 997;
/// Only the first this-many bytes of a spelling participate in hashing.
pub const MAXHASHLENGTH: usize = 100;
/// Only the first this-many bytes of a spelling participate in comparison.
const COMPARE_LENGTH: usize = 80;

/// What a declared name denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Program,
    GlobalVariable,
    Procedure,
    Function,
    LocalVariable,
    ValueParameter,
    RefParameter,
}

impl SymbolKind {
    pub fn is_variable(self) -> bool {
        matches!(
            self,
            SymbolKind::GlobalVariable
                | SymbolKind::LocalVariable
                | SymbolKind::ValueParameter
                | SymbolKind::RefParameter
        )
    }

    pub fn is_callable(self) -> bool {
        matches!(self, SymbolKind::Procedure | SymbolKind::Function)
    }
}

/// A declared name. `address` is a data offset for variables, an
/// instruction address for procedures/functions, and `-1` while the
/// symbol is still being populated by `enter`.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub spelling: InternHandle,
    pub scope: u32,
    pub kind: SymbolKind,
    pub param_count: u32,
    /// Bit `i` set means parameter `i` is a `REF` parameter.
    pub param_is_ref: u32,
    pub address: i64,
    next: Option<usize>,
}

/// A reference to a [`Symbol`] stored in the table's arena, stable across
/// `enter`/`remove_at_or_above` calls within the same compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolId(usize);

pub struct SymbolTable {
    buckets: [Option<usize>; HASHSIZE],
    arena: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            buckets: [None; HASHSIZE],
            arena: Vec::new(),
        }
    }

    /// Sums 7-bit character codes over the first [`MAXHASHLENGTH`] bytes of
    /// `spelling`, reduced modulo [`HASHSIZE`].
    pub fn hash(spelling: &str) -> usize {
        let sum: u32 = spelling
            .bytes()
            .take(MAXHASHLENGTH)
            .map(|b| (b & 0x7f) as u32)
            .sum();
        (sum as usize) % HASHSIZE
    }

    fn spellings_match(a: &str, b: &str) -> bool {
        let a = &a.as_bytes()[..a.len().min(COMPARE_LENGTH)];
        let b = &b.as_bytes()[..b.len().min(COMPARE_LENGTH)];
        a == b
    }

    /// Walks the bucket chain for `hash` and returns the first (most
    /// recent) symbol whose spelling matches `spelling`.
    pub fn probe(&self, spelling: &str, hash: usize, interner: &StringInterner) -> Option<SymbolId> {
        let mut cursor = self.buckets[hash];
        while let Some(id) = cursor {
            let symbol = &self.arena[id];
            if Self::spellings_match(interner.resolve(symbol.spelling), spelling) {
                return Some(SymbolId(id));
            }
            cursor = symbol.next;
        }
        None
    }

    /// Prepends a fresh, mostly-unpopulated record at the bucket head.
    /// The caller fills in `scope`, `kind`, and `address`.
    pub fn enter(&mut self, spelling: InternHandle, hash: usize) -> SymbolId {
        let id = self.arena.len();
        self.arena.push(Symbol {
            spelling,
            scope: 0,
            kind: SymbolKind::GlobalVariable,
            param_count: 0,
            param_is_ref: 0,
            address: -1,
            next: self.buckets[hash],
        });
        self.buckets[hash] = Some(id);
        SymbolId(id)
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.arena[id.0]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.arena[id.0]
    }

    /// Reclaims every symbol at scope depth `>= depth`. Because chain
    /// heads are the most recent declarations and every enter at depth
    /// `>= depth` happened strictly after every enter at a shallower
    /// depth, stripping chain heads while their scope qualifies is exact.
    pub fn remove_at_or_above(&mut self, depth: u32) {
        for bucket in self.buckets.iter_mut() {
            while let Some(id) = *bucket {
                if self.arena[id].scope >= depth {
                    *bucket = self.arena[id].next;
                } else {
                    break;
                }
            }
        }
    }

    /// Diagnostic dump: symbols at scope `>= depth`, sorted lexicographically
    /// by spelling.
    pub fn dump(&self, depth: u32, interner: &StringInterner) -> Vec<String> {
        let mut names: Vec<&str> = Vec::new();
        for bucket in &self.buckets {
            let mut cursor = *bucket;
            while let Some(id) = cursor {
                let symbol = &self.arena[id];
                if symbol.scope >= depth {
                    names.push(interner.resolve(symbol.spelling));
                }
                cursor = symbol.next;
            }
        }
        names.sort_unstable();
        names.into_iter().map(str::to_owned).collect()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(interner: &mut StringInterner, s: &str) -> InternHandle {
        interner.begin();
        for b in s.bytes() {
            interner.push(b);
        }
        interner.commit()
    }

    #[test]
    fn probe_finds_innermost_binding() {
        let mut interner = StringInterner::new();
        let mut table = SymbolTable::new();

        let outer = commit(&mut interner, "x");
        let hash = SymbolTable::hash("x");
        let outer_id = table.enter(outer, hash);
        table.get_mut(outer_id).scope = 1;
        table.get_mut(outer_id).kind = SymbolKind::GlobalVariable;

        let inner = commit(&mut interner, "x");
        let inner_id = table.enter(inner, hash);
        table.get_mut(inner_id).scope = 2;
        table.get_mut(inner_id).kind = SymbolKind::LocalVariable;

        let found = table.probe("x", hash, &interner).unwrap();
        assert_eq!(table.get(found).scope, 2);
    }

    #[test]
    fn scope_invariant_after_remove() {
        let mut interner = StringInterner::new();
        let mut table = SymbolTable::new();
        let hash = SymbolTable::hash("x");

        let outer = commit(&mut interner, "x");
        let outer_id = table.enter(outer, hash);
        table.get_mut(outer_id).scope = 1;

        let inner = commit(&mut interner, "x");
        let inner_id = table.enter(inner, hash);
        table.get_mut(inner_id).scope = 2;

        table.remove_at_or_above(2);

        let found = table.probe("x", hash, &interner).unwrap();
        assert_eq!(table.get(found).scope, 1);
    }

    #[test]
    fn scope_invariant_no_outer_binding() {
        let mut interner = StringInterner::new();
        let mut table = SymbolTable::new();
        let hash = SymbolTable::hash("y");

        let only = commit(&mut interner, "y");
        let only_id = table.enter(only, hash);
        table.get_mut(only_id).scope = 2;

        table.remove_at_or_above(2);

        assert!(table.probe("y", hash, &interner).is_none());
    }

    #[test]
    fn distinct_names_hash_independently_most_of_the_time() {
        // Not an invariant of the table, just documents expected use: two
        // different names can still land in the same bucket, and probe
        // must keep walking past a non-matching head.
        let mut interner = StringInterner::new();
        let mut table = SymbolTable::new();

        let a = commit(&mut interner, "alpha");
        let a_hash = SymbolTable::hash("alpha");
        let a_id = table.enter(a, a_hash);
        table.get_mut(a_id).scope = 1;

        assert!(table.probe("beta", SymbolTable::hash("beta"), &interner).is_none());
        assert!(table.probe("alpha", a_hash, &interner).is_some());
    }
}
