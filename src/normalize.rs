//! Syntax normalization.
//!
//! Component sources are typed; generated hydration code is plain JavaScript.
//! Declarations and expressions captured as raw text are therefore rebuilt
//! without type annotations or value casts before they reach the emitter.
//! Reconstruction works from parsed spans, never from ad-hoc string surgery,
//! so string contents and object literals are never corrupted.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPattern, Expression, Statement, VariableDeclarationKind,
};
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType};

fn ts_source_type() -> SourceType {
    SourceType::default()
        .with_typescript(true)
        .with_jsx(true)
        .with_module(true)
}

fn snippet(source: &str, start: u32, end: u32) -> &str {
    source.get(start as usize..end as usize).unwrap_or("")
}

/// Peel `as` / non-null / `satisfies` wrappers down to the value expression.
fn unwrap_casts<'a, 'b>(expr: &'a Expression<'b>) -> &'a Expression<'b> {
    match expr {
        Expression::TSAsExpression(cast) => unwrap_casts(&cast.expression),
        Expression::TSNonNullExpression(cast) => unwrap_casts(&cast.expression),
        Expression::TSSatisfiesExpression(cast) => unwrap_casts(&cast.expression),
        Expression::ParenthesizedExpression(paren) => unwrap_casts(&paren.expression),
        _ => expr,
    }
}

fn kind_keyword(kind: VariableDeclarationKind) -> &'static str {
    match kind {
        VariableDeclarationKind::Var => "var",
        VariableDeclarationKind::Let => "let",
        _ => "const",
    }
}

/// Strip TypeScript type annotations and value casts from a single
/// declaration or expression. Unrecognized input is returned unchanged;
/// degradation is always local.
pub fn strip_type_annotations(code: &str) -> String {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, code, ts_source_type()).parse();
    if !ret.errors.is_empty() || ret.program.body.len() != 1 {
        return code.trim().to_string();
    }

    match &ret.program.body[0] {
        Statement::VariableDeclaration(var_decl) => {
            let keyword = kind_keyword(var_decl.kind);
            let mut parts = Vec::new();
            for decl in &var_decl.declarations {
                let name = match &decl.id {
                    BindingPattern::BindingIdentifier(id) => id.name.to_string(),
                    // Destructuring keeps its annotation problems; leave as-is.
                    _ => return code.trim().to_string(),
                };
                match &decl.init {
                    Some(init) => {
                        let value = unwrap_casts(init);
                        let span = value.span();
                        parts.push(format!("{} = {}", name, snippet(code, span.start, span.end)));
                    }
                    None => parts.push(name),
                }
            }
            format!("{} {}", keyword, parts.join(", "))
        }
        Statement::ExpressionStatement(stmt) => {
            let value = unwrap_casts(&stmt.expression);
            let span = value.span();
            snippet(code, span.start, span.end).trim().to_string()
        }
        _ => code.trim().to_string(),
    }
}

/// Reprint an expression in canonical form so textually-different spellings of
/// the same expression (`count()`, `count( )`) group into one update effect.
/// Falls back to the trimmed input when the expression does not parse.
pub fn canonical_expr_text(expr: &str) -> String {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, expr, ts_source_type()).parse();
    if !ret.errors.is_empty() || ret.program.body.is_empty() {
        return expr.trim().to_string();
    }
    let printed = Codegen::new().build(&ret.program).code;
    printed.trim().trim_end_matches(';').to_string()
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_union_annotation() {
        assert_eq!(strip_type_annotations("let x: number | null"), "let x");
    }

    #[test]
    fn test_strip_annotation_with_initializer() {
        assert_eq!(strip_type_annotations("let x: string = ''"), "let x = ''");
    }

    #[test]
    fn test_strip_value_cast() {
        assert_eq!(
            strip_type_annotations("e.target as HTMLElement"),
            "e.target"
        );
    }

    #[test]
    fn test_untyped_declaration_unchanged() {
        assert_eq!(strip_type_annotations("const n = 42"), "const n = 42");
    }

    #[test]
    fn test_multiple_declarators() {
        assert_eq!(
            strip_type_annotations("let a: number = 1, b: number = 2"),
            "let a = 1, b = 2"
        );
    }

    #[test]
    fn test_unparsable_input_unchanged() {
        assert_eq!(strip_type_annotations("let = = ="), "let = = =");
    }

    #[test]
    fn test_canonical_text_collapses_whitespace() {
        assert_eq!(
            canonical_expr_text("count(  )"),
            canonical_expr_text("count()")
        );
    }
}
