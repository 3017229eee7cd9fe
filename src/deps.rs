//! Declaration dependency sorting.
//!
//! Local declarations may reference each other across categories regardless of
//! textual order (a later-declared helper used by an earlier constant), so the
//! generated init function orders them topologically. Kahn's algorithm with
//! the original source index as the deterministic tie-break; a cycle never
//! fails the sort: the unresolved remainder is emitted in source order.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};

lazy_static! {
    static ref IDENT_RE: Regex = Regex::new(r"\b([a-zA-Z_$][a-zA-Z0-9_$]*)\b").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    Constant,
    Signal,
    Memo,
    Function,
}

/// One component-scope declaration. Signals introduce two names (getter and
/// setter); everything else introduces one.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub names: Vec<String>,
    /// Initializer or body text the declaration's references are read from.
    pub code: String,
    /// Original textual order, used as the deterministic tie-break.
    pub source_index: usize,
}

impl Declaration {
    pub fn new(kind: DeclarationKind, names: Vec<String>, code: &str, source_index: usize) -> Self {
        Self {
            kind,
            names,
            code: code.to_string(),
            source_index,
        }
    }
}

/// Topologically sort declarations so runtime evaluation order is correct
/// regardless of source order. Returns indices into `declarations`.
pub fn sort_declarations(declarations: &[Declaration]) -> Vec<usize> {
    // Identifier -> declaration index.
    let mut by_name: HashMap<&str, usize> = HashMap::new();
    for (index, decl) in declarations.iter().enumerate() {
        for name in &decl.names {
            by_name.insert(name.as_str(), index);
        }
    }

    // dependencies[i] = declarations i references; dependents is the reverse.
    let mut in_degree = vec![0usize; declarations.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); declarations.len()];
    for (index, decl) in declarations.iter().enumerate() {
        let mut seen: HashSet<usize> = HashSet::new();
        for captures in IDENT_RE.captures_iter(&decl.code) {
            let ident = captures.get(1).map(|m| m.as_str()).unwrap_or("");
            // References outside the declared-name set and self-references
            // contribute no edges.
            if let Some(&target) = by_name.get(ident) {
                if target != index && seen.insert(target) {
                    dependents[target].push(index);
                    in_degree[index] += 1;
                }
            }
        }
    }

    // Zero-in-degree declarations, kept in ascending source order.
    let mut ready: Vec<usize> = (0..declarations.len())
        .filter(|&i| in_degree[i] == 0)
        .collect();
    ready.sort_by_key(|&i| declarations[i].source_index);

    let mut ordered = Vec::with_capacity(declarations.len());
    let mut resolved = vec![false; declarations.len()];
    while !ready.is_empty() {
        let next = ready.remove(0);
        resolved[next] = true;
        ordered.push(next);
        for &dependent in &dependents[next] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                // Re-insert newly-ready nodes in sorted position.
                let key = declarations[dependent].source_index;
                let position = ready
                    .iter()
                    .position(|&r| declarations[r].source_index > key)
                    .unwrap_or(ready.len());
                ready.insert(position, dependent);
            }
        }
    }

    // Cycle fallback: whatever never reached zero in-degree goes out in
    // original source order. Correctness over arbitrary-cycle resolution.
    let mut remainder: Vec<usize> = (0..declarations.len()).filter(|&i| !resolved[i]).collect();
    remainder.sort_by_key(|&i| declarations[i].source_index);
    ordered.extend(remainder);
    ordered
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(name: &str, code: &str, index: usize) -> Declaration {
        Declaration::new(
            DeclarationKind::Constant,
            vec![name.to_string()],
            code,
            index,
        )
    }

    #[test]
    fn test_dependency_before_dependent() {
        // A uses B; B uses nothing. B must come first regardless of order.
        let decls = vec![constant("a", "b + 1", 0), constant("b", "2", 1)];
        let order = sort_declarations(&decls);
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn test_source_order_preserved_without_edges() {
        let decls = vec![
            constant("x", "1", 0),
            constant("y", "2", 1),
            constant("z", "3", 2),
        ];
        assert_eq!(sort_declarations(&decls), vec![0, 1, 2]);
    }

    #[test]
    fn test_declaration_order_is_input_order_independent() {
        let forward = vec![constant("b", "2", 0), constant("a", "b + 1", 1)];
        let backward = vec![constant("a", "b + 1", 0), constant("b", "2", 1)];
        let forward_names: Vec<&str> = sort_declarations(&forward)
            .into_iter()
            .map(|i| forward[i].names[0].as_str())
            .collect();
        let backward_names: Vec<&str> = sort_declarations(&backward)
            .into_iter()
            .map(|i| backward[i].names[0].as_str())
            .collect();
        assert_eq!(forward_names, vec!["b", "a"]);
        assert_eq!(backward_names, vec!["b", "a"]);
    }

    #[test]
    fn test_cycle_falls_back_to_source_order() {
        // a <-> b never resolve; emitted in source order, no failure.
        let decls = vec![
            constant("a", "b + 1", 0),
            constant("b", "a + 1", 1),
            constant("c", "7", 2),
        ];
        let order = sort_declarations(&decls);
        assert_eq!(order, vec![2, 0, 1]);
    }

    #[test]
    fn test_signal_setter_counts_as_dependency() {
        let decls = vec![
            Declaration::new(
                DeclarationKind::Function,
                vec!["increment".to_string()],
                "setCount(count() + 1)",
                0,
            ),
            Declaration::new(
                DeclarationKind::Signal,
                vec!["count".to_string(), "setCount".to_string()],
                "0",
                1,
            ),
        ];
        let order = sort_declarations(&decls);
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn test_self_reference_ignored() {
        let decls = vec![constant("recurse", "recurse", 0)];
        assert_eq!(sort_declarations(&decls), vec![0]);
    }

    #[test]
    fn test_unknown_names_ignored() {
        let decls = vec![constant("total", "Math.max(limit, 10)", 0)];
        assert_eq!(sort_declarations(&decls), vec![0]);
    }
}
