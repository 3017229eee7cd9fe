//! End-to-end pipeline tests: source text in, IR and client script out.

#[cfg(test)]
mod tests {
    use crate::compile::compile;
    use crate::diagnostics::{has_errors, ERR_MISSING_DIRECTIVE};

    const COUNTER: &str = r#""use client";
import { createSignal } from "@lumen/runtime";

export default function Counter() {
  const [count, setCount] = createSignal(0);
  function increment() { setCount(count() + 1); }
  return (
    <div>
      <span>{count()}</span>
      <button onClick={increment}>+</button>
    </div>
  );
}"#;

    #[test]
    fn test_compiling_twice_is_byte_identical() {
        let first = compile(COUNTER, "Counter.tsx");
        let second = compile(COUNTER, "Counter.tsx");
        assert_eq!(first.client_script, second.client_script);
        assert_eq!(
            serde_json::to_string(&first.ir).unwrap(),
            serde_json::to_string(&second.ir).unwrap()
        );
    }

    #[test]
    fn test_counter_script_shape() {
        let result = compile(COUNTER, "Counter.tsx");
        let script = &result.client_script;
        assert!(script.contains("const [count, setCount] = createSignal(0);"));
        // Exactly one update effect for the one text expression.
        assert_eq!(script.matches(".textContent").count(), 1);
        assert!(script.contains("addEventListener(\"click\""));
        assert!(script.contains("function increment()"));
        assert!(script.contains("window.__LUMEN_COMPONENTS__.set(\"Counter\""));
        assert!(script.contains("export { initCounter as init };"));
        assert!(!has_errors(&result.diagnostics));
    }

    #[test]
    fn test_identical_expressions_share_one_effect() {
        let source = r#""use client";
export default function Twice() {
  const [count, setCount] = createSignal(0);
  return (
    <div>
      <span>{count()}</span>
      <em>{count()}</em>
    </div>
  );
}"#;
        let script = compile(source, "Twice.tsx").client_script;
        assert_eq!(script.matches("const __v = count()").count(), 1);
        assert_eq!(script.matches(".textContent").count(), 2);
    }

    #[test]
    fn test_static_component_registers_template_only() {
        let source = r#"export default function Badge() {
  return <span class="badge">ok</span>;
}"#;
        let result = compile(source, "Badge.tsx");
        let script = &result.client_script;
        assert!(!script.is_empty());
        assert!(script.contains("init: null"));
        assert!(!script.contains("function initBadge"));
        assert!(script.contains("__template_Badge"));
        assert!(script.contains("class=\"badge\""));
    }

    #[test]
    fn test_unrenderable_static_component_emits_nothing() {
        // A helper call cannot be pre-rendered and nothing needs hydration.
        let source = r#"export default function Stamp() {
  return <div>{formatTime(now)}</div>;
}"#;
        let result = compile(source, "Stamp.tsx");
        assert_eq!(result.client_script, "");
    }

    #[test]
    fn test_static_prop_array_loop_hydrates_once() {
        let source = r#"export default function List({ items }) {
  return <ul>{items.map(item => <li>{item}</li>)}</ul>;
}"#;
        let result = compile(source, "List.tsx");
        let script = &result.client_script;
        assert!(script.contains("__reconcile_"));
        // Hydrated once: the reconcile call is not wrapped in an effect.
        assert!(!script.contains("createEffect(() => { __reconcile_"));
        match &result.ir.root {
            crate::ir::IRNode::Element(el) => match &el.children[0] {
                crate::ir::IRNode::Loop(lp) => assert!(lp.is_static_array),
                other => panic!("Expected loop, got {:?}", other),
            },
            other => panic!("Expected element root, got {:?}", other),
        }
    }

    #[test]
    fn test_signal_backed_loop_is_reactive() {
        let source = r#""use client";
export default function Todos() {
  const [todos, setTodos] = createSignal([]);
  return <ul>{todos().map(todo => <li key={todo.id}>{todo.title}</li>)}</ul>;
}"#;
        let result = compile(source, "Todos.tsx");
        let script = &result.client_script;
        assert!(script.contains("createEffect(() => { __reconcile_"));
        match &result.ir.root {
            crate::ir::IRNode::Element(el) => match &el.children[0] {
                crate::ir::IRNode::Loop(lp) => {
                    assert!(!lp.is_static_array);
                    assert_eq!(lp.key_expr.as_deref(), Some("todo.id"));
                }
                other => panic!("Expected loop, got {:?}", other),
            },
            other => panic!("Expected element root, got {:?}", other),
        }
    }

    #[test]
    fn test_conditional_branches_rebind_events() {
        let source = r#""use client";
export default function Toggle() {
  const [open, setOpen] = createSignal(false);
  return (
    <div>
      {open() ? <button onClick={() => setOpen(false)}>close</button> : <button onClick={() => setOpen(true)}>open</button>}
    </div>
  );
}"#;
        let script = compile(source, "Toggle.tsx").client_script;
        assert!(script.contains("__branch_"));
        assert!(script.contains("innerHTML"));
        // Both branches' handlers live in the rebind helper.
        assert!(script.contains("setOpen(false)"));
        assert!(script.contains("setOpen(true)"));
        // Branch events are not double-bound by the direct-event section.
        assert!(!script.contains("// 10. Event bindings and refs"));
    }

    #[test]
    fn test_client_only_conditional_renders_on_first_run() {
        let source = r#""use client";
export default function NoSsr() {
  const [n, setN] = createSignal(0);
  return (
    <div>
      {typeof window !== "undefined" ? <button onClick={() => setN(n() + 1)}>go</button> : <span>loading</span>}
    </div>
  );
}"#;
        let result = compile(source, "NoSsr.tsx");

        // The condition is browser-only: the conditional still gets a slot so
        // the init function has somewhere to attach.
        match &result.ir.root {
            crate::ir::IRNode::Element(el) => match &el.children[0] {
                crate::ir::IRNode::Conditional(cond) => {
                    assert!(cond.client_only);
                    assert!(!cond.reactive);
                    assert!(cond.slot_id.is_some());
                }
                other => panic!("Expected conditional, got {:?}", other),
            },
            other => panic!("Expected element root, got {:?}", other),
        }

        let script = &result.client_script;
        assert!(script.contains("__branch_"));
        // The server emitted an empty slot, so the first run materializes the
        // active branch instead of assuming SSR output; no swap guard exists.
        assert!(!script.contains("__swap"));
        assert!(script.contains(".innerHTML = __v"));
        assert!(script.contains("setN(n() + 1)"));
    }

    #[test]
    fn test_server_rendered_conditional_keeps_swap_guard() {
        let source = r#""use client";
export default function Toggle() {
  const [open, setOpen] = createSignal(false);
  return <div>{open() ? <b>on</b> : <i>off</i>}</div>;
}"#;
        let script = compile(source, "Toggle.tsx").client_script;
        // SSR already produced the initial branch; the first run must not
        // rebuild it.
        assert!(script.contains("if (__swap)"));
    }

    #[test]
    fn test_missing_directive_is_reported_but_not_fatal() {
        let source = r#"export default function Counter() {
  const [count, setCount] = createSignal(0);
  return <div>{count()}</div>;
}"#;
        let result = compile(source, "Counter.tsx");
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.code == ERR_MISSING_DIRECTIVE));
        assert!(!has_errors(&result.diagnostics));
        // Still produces a usable script.
        assert!(result.client_script.contains("createSignal(0)"));
    }

    #[test]
    fn test_controlled_signal_tracks_prop() {
        let source = r#""use client";
export default function Input({ value }) {
  const [value, setValue] = createSignal("");
  return <input value={value()} onInput={(e) => setValue(e.target.value)} />;
}"#;
        let script = compile(source, "Input.tsx").client_script;
        assert!(script.contains("createSignal(props.value)"));
        assert!(script.contains("createEffect(() => { setValue(props.value); });"));
    }

    #[test]
    fn test_reactive_attribute_effect() {
        let source = r#""use client";
export default function Theme() {
  const [theme, setTheme] = createSignal("light");
  return <div class={theme()}>content</div>;
}"#;
        let script = compile(source, "Theme.tsx").client_script;
        assert!(script.contains(".className = __v;"));
    }

    #[test]
    fn test_user_effect_and_mount_hook_emitted() {
        let source = r#""use client";
export default function App() {
  const [count, setCount] = createSignal(0);
  createEffect(() => { console.log(count()); });
  onMount(() => { console.log("mounted"); });
  return <div>{count()}</div>;
}"#;
        let script = compile(source, "App.tsx").client_script;
        assert!(script.contains("createEffect(() => { console.log(count()); });"));
        assert!(script.contains("onMount(() => { console.log(\"mounted\"); });"));
    }

    #[test]
    fn test_registration_carries_template_hash() {
        let result = compile(COUNTER, "Counter.tsx");
        let script = &result.client_script;
        let marker = "hash: \"";
        let start = script.find(marker).expect("hash present") + marker.len();
        let hash = &script[start..start + 12];
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_child_component_initialization() {
        let source = r#""use client";
export default function Page() {
  const [title, setTitle] = createSignal("home");
  return (
    <main>
      <Header label={title()} />
    </main>
  );
}"#;
        let script = compile(source, "Page.tsx").client_script;
        assert!(script.contains("window.__LUMEN_COMPONENTS__.has(\"Header\")"));
        assert!(script.contains("\"label\": title()"));
    }

    #[test]
    fn test_slot_ids_unique_within_component() {
        let result = compile(COUNTER, "Counter.tsx");
        let mut ids = Vec::new();
        crate::ir::collect_slot_ids(&result.ir.root, &mut ids);
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(ids.len(), deduped.len());
        assert!(!ids.is_empty());
    }

    #[test]
    fn test_build_time_condition_lowers_to_if_statement() {
        let source = r#"export default function Banner() {
  return <div>{import.meta.env.DEV ? <p>dev</p> : <p>prod</p>}</div>;
}"#;
        let result = compile(source, "Banner.tsx");
        let json = serde_json::to_string(&result.ir).unwrap();
        assert!(json.contains("\"type\":\"if-statement\""));
    }
}
