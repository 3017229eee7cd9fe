//! Constant inlining and identifier qualification.
//!
//! Component-mode templates cannot reference a live component instance, so
//! bare prop references are rewritten to `props.<name>` accesses and local
//! constants are substituted with their values. Both rewrites work on parsed
//! identifier references, never raw text, so property keys and string
//! contents are never touched.
//!
//! Constant chains (a constant referencing another constant) resolve through
//! an explicit fixed-point loop with an iteration cap equal to the candidate
//! count; any constant still referencing an unsafe name after resolution is
//! demoted rather than inlined wrong.

use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_ast::ast::{Expression, Function};
use oxc_ast_visit::{Visit, VisitMut};
use oxc_parser::Parser;
use oxc_span::SourceType;
use oxc_syntax::scope::ScopeFlags;
use std::collections::{HashMap, HashSet};

use crate::reactivity::{is_client_only, ReactiveContext};

lazy_static! {
    /// Names that are always resolvable outside a component instance.
    static ref SAFE_GLOBALS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("Math");
        s.insert("JSON");
        s.insert("String");
        s.insert("Number");
        s.insert("Boolean");
        s.insert("Array");
        s.insert("Object");
        s.insert("Date");
        s.insert("Infinity");
        s.insert("NaN");
        s.insert("undefined");
        s
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// SPAN-BASED IDENTIFIER REWRITING
// ═══════════════════════════════════════════════════════════════════════════════

/// Collects names bound *inside* the expression (arrow params, nested
/// function locals); references to those must never be rewritten.
struct ShadowCollector {
    bindings: HashSet<String>,
}

impl<'a> Visit<'a> for ShadowCollector {
    fn visit_binding_identifier(&mut self, ident: &oxc_ast::ast::BindingIdentifier<'a>) {
        self.bindings.insert(ident.name.to_string());
    }

    fn visit_function(&mut self, func: &Function<'a>, flags: ScopeFlags) {
        if let Some(id) = &func.id {
            self.bindings.insert(id.name.to_string());
        }
        oxc_ast_visit::walk::walk_function(self, func, flags);
    }
}

/// Collects free identifier references (member property names and binding
/// positions do not count).
struct FreeRefCollector {
    bindings: HashSet<String>,
    references: HashSet<String>,
}

impl<'a> Visit<'a> for FreeRefCollector {
    fn visit_identifier_reference(&mut self, ident: &oxc_ast::ast::IdentifierReference<'a>) {
        let name = ident.name.to_string();
        if !self.bindings.contains(&name) {
            self.references.insert(name);
        }
    }
}

/// Records replacement spans for free identifier references; the caller
/// splices them in reverse so earlier spans stay valid.
struct RefReplacer<'m> {
    map: &'m HashMap<String, String>,
    bindings: HashSet<String>,
    replacements: Vec<(u32, u32, String)>,
}

impl<'a, 'm> VisitMut<'a> for RefReplacer<'m> {
    fn visit_identifier_reference(&mut self, ident: &mut oxc_ast::ast::IdentifierReference<'a>) {
        let name = ident.name.to_string();
        if self.bindings.contains(&name) {
            return;
        }
        if let Some(replacement) = self.map.get(&name) {
            self.replacements
                .push((ident.span.start, ident.span.end, replacement.clone()));
        }
    }
}

fn parse_expr<'a>(
    allocator: &'a Allocator,
    code: &'a str,
) -> Option<Expression<'a>> {
    let source_type = SourceType::default().with_typescript(true).with_jsx(true);
    Parser::new(allocator, code, source_type)
        .parse_expression()
        .ok()
}

fn shadowed_bindings(expr: &Expression) -> HashSet<String> {
    let mut shadows = ShadowCollector {
        bindings: HashSet::new(),
    };
    shadows.visit_expression(expr);
    shadows.bindings
}

/// Rewrite free identifier references in an expression according to `map`.
/// Unparsable input is returned unchanged; degradation is local.
pub fn replace_identifier_refs(code: &str, map: &HashMap<String, String>) -> String {
    if map.is_empty() {
        return code.to_string();
    }
    let allocator = Allocator::default();
    let Some(mut expr) = parse_expr(&allocator, code) else {
        return code.to_string();
    };

    let mut replacer = RefReplacer {
        map,
        bindings: shadowed_bindings(&expr),
        replacements: Vec::new(),
    };
    replacer.visit_expression(&mut expr);

    let mut replacements = replacer.replacements;
    replacements.sort_by(|a, b| b.0.cmp(&a.0));
    let mut result = code.to_string();
    for (start, end, replacement) in replacements {
        result.replace_range(start as usize..end as usize, &replacement);
    }
    result
}

/// Free identifier references of an expression. Unparsable input reports no
/// references, which downstream treats as unsafe to inline.
pub fn free_references(code: &str) -> Option<HashSet<String>> {
    let allocator = Allocator::default();
    let expr = parse_expr(&allocator, code)?;
    let mut collector = FreeRefCollector {
        bindings: shadowed_bindings(&expr),
        references: HashSet::new(),
    };
    collector.visit_expression(&expr);
    Some(collector.references)
}

/// Qualify bare prop references so a registered component template reads
/// `props.<name>` instead of a destructured local.
pub fn qualify_props(code: &str, prop_names: &[String], props_object: &str) -> String {
    let map: HashMap<String, String> = prop_names
        .iter()
        .map(|name| (name.clone(), format!("{}.{}", props_object, name)))
        .collect();
    replace_identifier_refs(code, &map)
}

// ═══════════════════════════════════════════════════════════════════════════════
// FIXED-POINT CONSTANT RESOLUTION
// ═══════════════════════════════════════════════════════════════════════════════

fn wrap_value(value: &str) -> String {
    let trimmed = value.trim();
    let simple = trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.')
        || (trimmed.starts_with('"') && trimmed.ends_with('"'))
        || (trimmed.starts_with('\'') && trimmed.ends_with('\''));
    if simple {
        trimmed.to_string()
    } else {
        format!("({})", trimmed)
    }
}

/// Resolve which local constants may be inlined into a component template,
/// and to what value. Returns `(name, resolved_value)` pairs in declaration
/// order; demoted constants are simply absent.
pub fn resolve_inlinable_constants(
    constants: &[(String, Option<String>)],
    ctx: &ReactiveContext,
) -> Vec<(String, String)> {
    // Candidates: initialized, not reactive, evaluable outside the browser.
    let mut values: Vec<(String, String)> = Vec::new();
    for (name, initializer) in constants {
        let Some(init) = initializer else { continue };
        if ctx.is_reactive(init) || is_client_only(init) {
            continue;
        }
        values.push((name.clone(), init.clone()));
    }

    // Fixed point: substitute candidate values into each other until nothing
    // changes, capped at the candidate count to survive residual cycles.
    let cap = values.len();
    for _ in 0..cap {
        let map: HashMap<String, String> = values
            .iter()
            .map(|(name, value)| (name.clone(), wrap_value(value)))
            .collect();
        let mut changed = false;
        for index in 0..values.len() {
            let name = values[index].0.clone();
            // Never substitute a constant into itself.
            let mut self_free = map.clone();
            self_free.remove(&name);
            let next = replace_identifier_refs(&values[index].1, &self_free);
            if next != values[index].1 {
                values[index].1 = next;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    // Demote anything still leaning on a name outside its resolved set.
    values
        .into_iter()
        .filter(|(_, value)| match free_references(value) {
            Some(references) => references
                .iter()
                .all(|ident| SAFE_GLOBALS.contains(ident.as_str())),
            None => false,
        })
        .collect()
}

/// Substitution map for template rendering: resolved constant values, each
/// parenthesized where precedence could leak.
pub fn inline_substitution_map(
    constants: &[(String, Option<String>)],
    ctx: &ReactiveContext,
) -> HashMap<String, String> {
    resolve_inlinable_constants(constants, ctx)
        .into_iter()
        .map(|(name, value)| (name, wrap_value(&value)))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ReactiveContext {
        ReactiveContext::new(
            vec!["count".to_string()],
            vec![],
            vec!["title".to_string()],
            Some("props".to_string()),
        )
    }

    #[test]
    fn test_qualify_bare_prop() {
        let out = qualify_props("title + 1", &["title".to_string()], "props");
        assert_eq!(out, "props.title + 1");
    }

    #[test]
    fn test_qualify_skips_property_keys() {
        let out = qualify_props("item.title", &["title".to_string()], "props");
        assert_eq!(out, "item.title");
    }

    #[test]
    fn test_qualify_skips_string_contents() {
        let out = qualify_props("\"title\" + title", &["title".to_string()], "props");
        assert_eq!(out, "\"title\" + props.title");
    }

    #[test]
    fn test_qualify_skips_shadowed_params() {
        let out = qualify_props(
            "items.map(title => title.length)",
            &["title".to_string()],
            "props",
        );
        assert_eq!(out, "items.map(title => title.length)");
    }

    #[test]
    fn test_resolve_simple_constant() {
        let constants = vec![("greeting".to_string(), Some("\"hello\"".to_string()))];
        let resolved = resolve_inlinable_constants(&constants, &ctx());
        assert_eq!(
            resolved,
            vec![("greeting".to_string(), "\"hello\"".to_string())]
        );
    }

    #[test]
    fn test_resolve_constant_chain() {
        let constants = vec![
            ("base".to_string(), Some("\"/api\"".to_string())),
            ("endpoint".to_string(), Some("base + \"/users\"".to_string())),
        ];
        let resolved = resolve_inlinable_constants(&constants, &ctx());
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[1].0, "endpoint");
        assert_eq!(resolved[1].1, "\"/api\" + \"/users\"");
    }

    #[test]
    fn test_reactive_constant_not_inlined() {
        let constants = vec![("label".to_string(), Some("count() + \"!\"".to_string()))];
        let resolved = resolve_inlinable_constants(&constants, &ctx());
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_cyclic_constants_demoted() {
        let constants = vec![
            ("a".to_string(), Some("b + 1".to_string())),
            ("b".to_string(), Some("a + 1".to_string())),
        ];
        let resolved = resolve_inlinable_constants(&constants, &ctx());
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_uninitialized_constant_skipped() {
        let constants = vec![("pending".to_string(), None)];
        assert!(resolve_inlinable_constants(&constants, &ctx()).is_empty());
    }

    #[test]
    fn test_global_references_are_safe() {
        let constants = vec![("limit".to_string(), Some("Math.max(3, 7)".to_string()))];
        let resolved = resolve_inlinable_constants(&constants, &ctx());
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn test_helper_reference_demotes() {
        // `format` is neither a candidate nor a global, so the value is not
        // resolvable outside the instance.
        let constants = vec![("label".to_string(), Some("format(7)".to_string()))];
        let resolved = resolve_inlinable_constants(&constants, &ctx());
        assert!(resolved.is_empty());
    }
}
