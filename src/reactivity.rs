//! Reactivity classification.
//!
//! Decides whether an expression's value can change at runtime: it references
//! a signal getter called as a function, a memo called as a function, or a
//! prop. This drives which DOM bindings need live update effects versus
//! one-time rendering, and whether a local constant may be inlined into a
//! static template.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref IDENT_RE: Regex = Regex::new(r"\b([a-zA-Z_$][a-zA-Z0-9_$]*)\b").unwrap();
    static ref BROWSER_GLOBAL_RE: Regex =
        Regex::new(r"\b(window|document|navigator|localStorage|sessionStorage)\b").unwrap();
}

/// The reactive names of one component, built once by the Analyzer.
#[derive(Debug, Clone, Default)]
pub struct ReactiveContext {
    signal_getters: HashSet<String>,
    memo_names: HashSet<String>,
    prop_names: HashSet<String>,
    props_object: Option<String>,
}

impl ReactiveContext {
    pub fn new(
        signal_getters: Vec<String>,
        memo_names: Vec<String>,
        prop_names: Vec<String>,
        props_object: Option<String>,
    ) -> Self {
        Self {
            signal_getters: signal_getters.into_iter().collect(),
            memo_names: memo_names.into_iter().collect(),
            prop_names: prop_names.into_iter().collect(),
            props_object,
        }
    }

    fn called_as_function(expr: &str, name: &str) -> bool {
        let pattern = format!(r"\b{}\s*\(", regex::escape(name));
        Regex::new(&pattern)
            .map(|re| re.is_match(expr))
            .unwrap_or(false)
    }

    fn props_access(&self, expr: &str) -> bool {
        if let Some(props) = &self.props_object {
            let pattern = format!(r"\b{}\s*\.\s*[a-zA-Z_$]", regex::escape(props));
            if Regex::new(&pattern)
                .map(|re| re.is_match(expr))
                .unwrap_or(false)
            {
                return true;
            }
        }
        false
    }

    /// True iff the expression contains a signal getter call, a memo call, or
    /// a prop reference (whole-word matches only).
    pub fn is_reactive(&self, expr: &str) -> bool {
        if self.props_access(expr) {
            return true;
        }
        for captures in IDENT_RE.captures_iter(expr) {
            let ident = captures.get(1).map(|m| m.as_str()).unwrap_or("");
            if self.prop_names.contains(ident) {
                return true;
            }
            if (self.signal_getters.contains(ident) || self.memo_names.contains(ident))
                && Self::called_as_function(expr, ident)
            {
                return true;
            }
        }
        false
    }

    /// The reactive names an expression depends on, sorted and deduplicated
    /// for deterministic output.
    pub fn dependencies(&self, expr: &str) -> Vec<String> {
        let mut deps = Vec::new();
        for captures in IDENT_RE.captures_iter(expr) {
            let ident = captures.get(1).map(|m| m.as_str()).unwrap_or("");
            if self.prop_names.contains(ident) {
                deps.push(ident.to_string());
            } else if (self.signal_getters.contains(ident) || self.memo_names.contains(ident))
                && Self::called_as_function(expr, ident)
            {
                deps.push(ident.to_string());
            }
        }
        if let Some(props) = &self.props_object {
            let pattern = format!(r"\b{}\s*\.\s*([a-zA-Z_$][a-zA-Z0-9_$]*)", regex::escape(props));
            if let Ok(re) = Regex::new(&pattern) {
                for captures in re.captures_iter(expr) {
                    if let Some(name) = captures.get(1) {
                        deps.push(name.as_str().to_string());
                    }
                }
            }
        }
        deps.sort();
        deps.dedup();
        deps
    }

    /// True iff the expression reads a signal or memo (prop references do not
    /// count). A loop over a plain prop array is static precisely because
    /// this is false for its array expression.
    pub fn reads_reactive_state(&self, expr: &str) -> bool {
        for captures in IDENT_RE.captures_iter(expr) {
            let ident = captures.get(1).map(|m| m.as_str()).unwrap_or("");
            if (self.signal_getters.contains(ident) || self.memo_names.contains(ident))
                && Self::called_as_function(expr, ident)
            {
                return true;
            }
        }
        false
    }

    pub fn is_signal(&self, name: &str) -> bool {
        self.signal_getters.contains(name)
    }

    pub fn is_memo(&self, name: &str) -> bool {
        self.memo_names.contains(name)
    }

    pub fn is_prop(&self, name: &str) -> bool {
        self.prop_names.contains(name)
    }

    pub fn prop_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.prop_names.iter().cloned().collect();
        names.sort();
        names
    }

    pub fn props_object(&self) -> Option<&str> {
        self.props_object.as_deref()
    }
}

/// Expressions touching browser-only globals must not be evaluated during
/// server rendering.
pub fn is_client_only(expr: &str) -> bool {
    BROWSER_GLOBAL_RE.is_match(expr)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ReactiveContext {
        ReactiveContext::new(
            vec!["count".to_string(), "text".to_string()],
            vec!["doubled".to_string()],
            vec!["title".to_string()],
            Some("props".to_string()),
        )
    }

    #[test]
    fn test_signal_call_is_reactive() {
        assert!(ctx().is_reactive("count() + 1"));
    }

    #[test]
    fn test_string_literal_is_not_reactive() {
        assert!(!ctx().is_reactive("'static'"));
    }

    #[test]
    fn test_bare_getter_name_without_call_is_not_reactive() {
        // Passing the getter itself around does not read it.
        assert!(!ctx().is_reactive("register(count)"));
    }

    #[test]
    fn test_memo_call_is_reactive() {
        assert!(ctx().is_reactive("doubled()"));
    }

    #[test]
    fn test_props_access_is_reactive() {
        assert!(ctx().is_reactive("props.label"));
    }

    #[test]
    fn test_destructured_prop_is_reactive() {
        assert!(ctx().is_reactive("title.toUpperCase()"));
    }

    #[test]
    fn test_whole_word_matching() {
        // `discount` must not match the `count` signal.
        assert!(!ctx().is_reactive("discount + 1"));
    }

    #[test]
    fn test_dependencies_sorted_and_deduped() {
        let deps = ctx().dependencies("count() + doubled() + count() + props.label");
        assert_eq!(deps, vec!["count", "doubled", "label"]);
    }

    #[test]
    fn test_client_only_detection() {
        assert!(is_client_only("window.innerWidth"));
        assert!(is_client_only("localStorage.getItem('theme')"));
        assert!(!is_client_only("count() + 1"));
    }
}
