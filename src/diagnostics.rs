//! Diagnostics for the Lumen compiler.
//!
//! Diagnostics are collected, never thrown: a file that only produces
//! warnings still yields a usable IR and client script. Fatality is decided
//! by the enclosing build pipeline, which treats any `Error`-severity
//! diagnostic as a failed file while other files continue to compile.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_SYNTAX: &str = "L-ERR-SYNTAX-001";
pub const ERR_NO_COMPONENT: &str = "L-ERR-COMPONENT-001";
pub const ERR_MISSING_DIRECTIVE: &str = "L-ERR-DIRECTIVE-001";
pub const ERR_UNSUPPORTED_EXPRESSION: &str = "L-ERR-EXPR-001";
pub const ERR_DUPLICATE_BINDING: &str = "L-ERR-SCOPE-001";

fn get_guarantee(code: &str) -> &'static str {
    match code {
        ERR_SYNTAX => "Component sources parse as TypeScript with JSX.",
        ERR_NO_COMPONENT => "Every compiled file exports exactly one component function.",
        ERR_MISSING_DIRECTIVE => {
            "Components with reactive state opt in to client behavior explicitly."
        }
        ERR_UNSUPPORTED_EXPRESSION => {
            "Expressions outside the supported subset are flagged, never miscompiled."
        }
        ERR_DUPLICATE_BINDING => "Component-scope names are declared at most once.",
        _ => "Unknown invariant.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerError {
    pub code: String,
    pub message: String,
    pub guarantee: String,
    pub file: String,
    pub location: SourceLocation,
    pub severity: Severity,
    pub hints: Vec<String>,
}

impl CompilerError {
    pub fn error(code: &str, message: &str, file: &str, line: u32, column: u32) -> Self {
        Self::with_details(code, message, file, line, column, Severity::Error, vec![])
    }

    pub fn warning(code: &str, message: &str, file: &str, line: u32, column: u32) -> Self {
        Self::with_details(code, message, file, line, column, Severity::Warning, vec![])
    }

    pub fn with_details(
        code: &str,
        message: &str,
        file: &str,
        line: u32,
        column: u32,
        severity: Severity,
        hints: Vec<String>,
    ) -> Self {
        CompilerError {
            code: code.to_string(),
            message: message.to_string(),
            guarantee: get_guarantee(code).to_string(),
            file: file.to_string(),
            location: SourceLocation { line, column },
            severity,
            hints,
        }
    }
}

/// Pipeline contract: a file fails iff it produced at least one error-severity
/// diagnostic. Warnings alone never fail a file.
pub fn has_errors(diagnostics: &[CompilerError]) -> bool {
    diagnostics.iter().any(|d| d.severity == Severity::Error)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_is_not_fatal() {
        let diags = vec![CompilerError::warning(
            ERR_MISSING_DIRECTIVE,
            "Reactive state without \"use client\".",
            "Counter.tsx",
            1,
            1,
        )];
        assert!(!has_errors(&diags));
    }

    #[test]
    fn test_error_is_fatal() {
        let diags = vec![
            CompilerError::warning(ERR_MISSING_DIRECTIVE, "warn", "a.tsx", 1, 1),
            CompilerError::error(ERR_SYNTAX, "broken", "a.tsx", 3, 7),
        ];
        assert!(has_errors(&diags));
    }

    #[test]
    fn test_serialization_shape() {
        let diag = CompilerError::error(ERR_SYNTAX, "broken", "a.tsx", 3, 7);
        let json = serde_json::to_string(&diag).expect("Should serialize");
        assert!(json.contains("\"severity\":\"error\""));
        assert!(json.contains("\"code\":\"L-ERR-SYNTAX-001\""));
    }
}
