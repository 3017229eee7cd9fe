//! Pipeline entry point.
//!
//! `compile` is the whole single-file pipeline: parse, analyze, lower to IR,
//! generate the hydration script. It is synchronous, allocates everything
//! fresh, and shares no mutable state, so the enclosing build pipeline may run
//! any number of files concurrently.

use oxc_allocator::Allocator;
use oxc_parser::Parser;
use oxc_span::SourceType;
use serde::{Deserialize, Serialize};

use crate::analyzer::analyze;
use crate::codegen::generate_client_script;
use crate::diagnostics::{CompilerError, ERR_SYNTAX, ERR_UNSUPPORTED_EXPRESSION};
use crate::expr::classify_support;
use crate::ir::{AttrValue, ComponentIR, IRNode};
use crate::ir_builder::build_ir;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
    pub ir: ComponentIR,
    /// Empty when the component needs no client behavior.
    pub client_script: String,
    pub diagnostics: Vec<CompilerError>,
}

/// Compile one component source file. Never panics; problems surface as
/// diagnostics and the pipeline decides fatality.
pub fn compile(source_text: &str, file_path: &str) -> CompileResult {
    let allocator = Allocator::default();
    let source_type = SourceType::default()
        .with_typescript(true)
        .with_jsx(true)
        .with_module(true);
    let ret = Parser::new(&allocator, source_text, source_type).parse();

    let mut diagnostics = Vec::new();
    for error in &ret.errors {
        diagnostics.push(CompilerError::error(
            ERR_SYNTAX,
            &format!("{:?}", error),
            file_path,
            1,
            1,
        ));
    }

    let analysis = analyze(&ret.program, source_text, file_path);
    diagnostics.extend(analysis.metadata.errors.clone());

    let ctx = analysis.metadata.reactive_context();
    let root = build_ir(analysis.return_expr, source_text, &ctx);

    // Flag expressions outside the supported subset. They still compile; the
    // flag tells backend adapters not to pre-render them server-side.
    let mut renderable = Vec::new();
    collect_renderable_exprs(&root, &mut renderable);
    for text in renderable {
        let support = classify_support(&text);
        if !support.supported {
            diagnostics.push(CompilerError::warning(
                ERR_UNSUPPORTED_EXPRESSION,
                &format!(
                    "Expression `{}` cannot be pre-rendered: {}",
                    text,
                    support.reason.unwrap_or_default()
                ),
                file_path,
                1,
                1,
            ));
        }
    }

    let ir = ComponentIR {
        name: analysis.metadata.component_name.clone(),
        path: file_path.to_string(),
        root,
        metadata: analysis.metadata,
    };
    let client_script = generate_client_script(&ir);

    CompileResult {
        ir,
        client_script,
        diagnostics,
    }
}

/// Value positions a backend adapter may try to evaluate server-side: text
/// expressions, conditions, and dynamic attribute values. Event handlers and
/// loop bodies are structural and never pre-rendered, so they are not
/// classified here.
fn collect_renderable_exprs(node: &IRNode, out: &mut Vec<String>) {
    match node {
        IRNode::Expression(expr) => out.push(expr.expr.clone()),
        IRNode::Element(element) => {
            for attr in &element.attrs {
                if let AttrValue::Dynamic(dynamic) = &attr.value {
                    out.push(dynamic.expr.clone());
                }
            }
            for child in &element.children {
                collect_renderable_exprs(child, out);
            }
        }
        IRNode::Conditional(cond) => {
            out.push(cond.condition.clone());
            collect_renderable_exprs(&cond.when_true, out);
            if let Some(alternate) = &cond.when_false {
                collect_renderable_exprs(alternate, out);
            }
        }
        IRNode::Loop(lp) => {
            for child in &lp.children {
                collect_renderable_exprs(child, out);
            }
        }
        IRNode::Component(comp) => {
            for child in &comp.children {
                collect_renderable_exprs(child, out);
            }
        }
        IRNode::Fragment(frag) => {
            for child in &frag.children {
                collect_renderable_exprs(child, out);
            }
        }
        IRNode::Provider(provider) => {
            for child in &provider.children {
                collect_renderable_exprs(child, out);
            }
        }
        IRNode::IfStatement(stmt) => {
            for child in &stmt.consequent {
                collect_renderable_exprs(child, out);
            }
            for child in &stmt.alternate {
                collect_renderable_exprs(child, out);
            }
        }
        IRNode::Text(_) => {}
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::has_errors;

    #[test]
    fn test_compile_never_panics_on_garbage() {
        let result = compile("const = = = <<<", "broken.tsx");
        assert!(has_errors(&result.diagnostics));
    }

    #[test]
    fn test_compile_empty_source() {
        let result = compile("", "empty.tsx");
        // No component function: an error diagnostic, no client script.
        assert!(has_errors(&result.diagnostics));
        assert_eq!(result.client_script, "");
    }

    #[test]
    fn test_unsupported_expression_flagged_not_fatal() {
        let source = r#"export default function Stamp() {
  return <div>{formatTime(now)}</div>;
}"#;
        let result = compile(source, "Stamp.tsx");
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.code == crate::diagnostics::ERR_UNSUPPORTED_EXPRESSION));
        assert!(!has_errors(&result.diagnostics));
    }

    #[test]
    fn test_file_path_only_affects_default_name() {
        let source = "export default function Counter() { return <div>hi</div>; }";
        let a = compile(source, "a/one.tsx");
        let b = compile(source, "b/two.tsx");
        assert_eq!(a.ir.name, "Counter");
        assert_eq!(b.ir.name, "Counter");
        assert_eq!(a.client_script, b.client_script);
    }
}
