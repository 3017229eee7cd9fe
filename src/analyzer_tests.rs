//! Analyzer behavior tests: detection rules, scope guards, prop extraction.

#[cfg(test)]
mod tests {
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    use crate::analyzer::{analyze, ComponentMetadata};
    use crate::diagnostics::{ERR_MISSING_DIRECTIVE, Severity};

    fn analyze_source(source: &str) -> ComponentMetadata {
        let allocator = Allocator::default();
        let source_type = SourceType::default()
            .with_typescript(true)
            .with_jsx(true)
            .with_module(true);
        let ret = Parser::new(&allocator, source, source_type).parse();
        analyze(&ret.program, source, "Test.tsx").metadata
    }

    #[test]
    fn test_signal_detection() {
        let metadata = analyze_source(
            r#""use client";
export default function Counter() {
  const [count, setCount] = createSignal(0);
  return <div>{count()}</div>;
}"#,
        );
        assert_eq!(metadata.signals.len(), 1);
        assert_eq!(metadata.signals[0].getter, "count");
        assert_eq!(metadata.signals[0].setter, "setCount");
        assert_eq!(metadata.signals[0].initializer, "0");
        assert_eq!(metadata.signals[0].inferred_type, "number");
    }

    #[test]
    fn test_memo_detection_with_dependencies() {
        let metadata = analyze_source(
            r#""use client";
export default function Counter() {
  const [count, setCount] = createSignal(0);
  const doubled = createMemo(() => count() * 2);
  return <div>{doubled()}</div>;
}"#,
        );
        assert_eq!(metadata.memos.len(), 1);
        assert_eq!(metadata.memos[0].name, "doubled");
        assert_eq!(metadata.memos[0].computation, "count() * 2");
        assert_eq!(metadata.memos[0].dependencies, vec!["count"]);
    }

    #[test]
    fn test_memo_type_inferred_from_literal_computation() {
        let metadata = analyze_source(
            r#""use client";
export default function Labels() {
  const [count, setCount] = createSignal(0);
  const greeting = createMemo(() => "hello");
  const summary = createMemo(() => `total: ${count()}`);
  const doubled = createMemo(() => count() * 2);
  return <div>{greeting()}</div>;
}"#,
        );
        assert_eq!(metadata.memos[0].inferred_type, "string");
        assert_eq!(metadata.memos[1].inferred_type, "string");
        // Non-literal computations stay unresolved.
        assert_eq!(metadata.memos[2].inferred_type, "unknown");
    }

    #[test]
    fn test_effect_body_is_opaque() {
        // Locals declared inside an effect body are not component-scope.
        let metadata = analyze_source(
            r#""use client";
export default function Logger() {
  const [count, setCount] = createSignal(0);
  createEffect(() => { const hidden = count(); console.log(hidden); });
  return <div>{count()}</div>;
}"#,
        );
        assert_eq!(metadata.effects.len(), 1);
        assert!(metadata.effects[0].body.contains("console.log"));
        assert_eq!(metadata.effects[0].dependencies, vec!["count"]);
        assert!(!metadata.local_constants.iter().any(|c| c.name == "hidden"));
    }

    #[test]
    fn test_nested_function_locals_not_captured() {
        let metadata = analyze_source(
            r#"export default function App() {
  function helper() { const inner = 2; return inner; }
  const outer = helper();
  return <div>{outer}</div>;
}"#,
        );
        assert_eq!(metadata.local_functions.len(), 1);
        assert_eq!(metadata.local_functions[0].name, "helper");
        assert!(!metadata.local_functions[0].contains_markup);
        assert!(metadata.local_constants.iter().any(|c| c.name == "outer"));
        assert!(!metadata.local_constants.iter().any(|c| c.name == "inner"));
    }

    #[test]
    fn test_function_with_markup_flagged() {
        let metadata = analyze_source(
            r#"export default function App() {
  function renderRow() { return <tr><td>x</td></tr>; }
  return <table>{renderRow()}</table>;
}"#,
        );
        assert!(metadata.local_functions[0].contains_markup);
    }

    #[test]
    fn test_uninitialized_constant() {
        let metadata = analyze_source(
            r#"export default function App() {
  let pending;
  const limit = 10;
  return <div>{limit}</div>;
}"#,
        );
        let pending = metadata
            .local_constants
            .iter()
            .find(|c| c.name == "pending")
            .expect("pending recorded");
        assert!(pending.initializer.is_none());
        let limit = metadata
            .local_constants
            .iter()
            .find(|c| c.name == "limit")
            .expect("limit recorded");
        assert_eq!(limit.initializer.as_deref(), Some("10"));
    }

    #[test]
    fn test_destructured_props_with_defaults_and_rest() {
        let metadata = analyze_source(
            r#"interface Props { title?: string; max: number }
export default function Card({ title = "Card", max, ...rest }: Props) {
  return <div>{title}</div>;
}"#,
        );
        assert_eq!(metadata.props_params.len(), 2);
        assert_eq!(metadata.props_params[0].name, "title");
        assert_eq!(metadata.props_params[0].default_value.as_deref(), Some("\"Card\""));
        assert!(metadata.props_params[0].optional);
        assert_eq!(metadata.props_params[1].name, "max");
        assert_eq!(metadata.props_params[1].ty, "number");
        assert_eq!(metadata.rest_props_name.as_deref(), Some("rest"));
    }

    #[test]
    fn test_props_object_name() {
        let metadata = analyze_source(
            r#"export default function Card(props) {
  return <div>{props.title}</div>;
}"#,
        );
        assert_eq!(metadata.props_object_name.as_deref(), Some("props"));
        assert!(metadata.props_params.is_empty());
    }

    #[test]
    fn test_imports_recorded() {
        let metadata = analyze_source(
            r#"import { createSignal, createMemo } from "@lumen/runtime";
import Card from "./Card";
import type { Props } from "./types";
export default function App() { return <div />; }"#,
        );
        assert_eq!(metadata.imports.len(), 3);
        assert_eq!(metadata.imports[0].source, "@lumen/runtime");
        assert_eq!(metadata.imports[0].named, vec!["createSignal", "createMemo"]);
        assert_eq!(metadata.imports[1].default_specifier.as_deref(), Some("Card"));
        assert!(metadata.imports[2].type_only);
    }

    #[test]
    fn test_type_definitions_recorded() {
        let metadata = analyze_source(
            r#"interface Props { label: string }
type Mode = "light" | "dark";
export default function App() { return <div />; }"#,
        );
        assert_eq!(metadata.type_definitions.len(), 2);
        assert_eq!(metadata.type_definitions[0].name, "Props");
        assert!(metadata.type_definitions[0].definition.contains("label"));
        assert_eq!(metadata.type_definitions[1].name, "Mode");
    }

    #[test]
    fn test_missing_directive_warning() {
        let metadata = analyze_source(
            r#"export default function Counter() {
  const [count, setCount] = createSignal(0);
  return <div>{count()}</div>;
}"#,
        );
        let warning = metadata
            .errors
            .iter()
            .find(|e| e.code == ERR_MISSING_DIRECTIVE)
            .expect("warning expected");
        assert_eq!(warning.severity, Severity::Warning);
    }

    #[test]
    fn test_directive_suppresses_warning() {
        let metadata = analyze_source(
            r#""use client";
export default function Counter() {
  const [count, setCount] = createSignal(0);
  return <div>{count()}</div>;
}"#,
        );
        assert!(!metadata
            .errors
            .iter()
            .any(|e| e.code == ERR_MISSING_DIRECTIVE));
        assert!(metadata.has_directive);
    }

    #[test]
    fn test_component_name_from_declaration() {
        let metadata = analyze_source("export default function HeroBanner() { return <div />; }");
        assert_eq!(metadata.component_name, "HeroBanner");
    }

    #[test]
    fn test_arrow_component_with_implicit_return() {
        let metadata = analyze_source(
            r#"const Badge = ({ label }) => <span class="badge">{label}</span>;
export default Badge;"#,
        );
        assert_eq!(metadata.component_name, "Badge");
        assert_eq!(metadata.props_params.len(), 1);
        assert_eq!(metadata.props_params[0].name, "label");
    }

    #[test]
    fn test_on_mount_detection() {
        let metadata = analyze_source(
            r#""use client";
export default function App() {
  onMount(() => { document.title = "ready"; });
  return <div />;
}"#,
        );
        assert_eq!(metadata.on_mounts.len(), 1);
        assert!(metadata.on_mounts[0].body.contains("document.title"));
    }
}
