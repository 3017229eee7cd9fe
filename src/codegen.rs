//! Hydration Code Generator.
//!
//! Two phases. **Collection** walks the IR once and fills typed buckets:
//! interactive elements, dynamic text expressions, reactive conditionals,
//! loops, refs, child components, reactive attributes, providers. **Emission**
//! writes the init function in a fixed section order so declaration order is
//! always valid at runtime regardless of source order.
//!
//! The generated module is self-contained: it registers one initialization
//! entry point keyed by component name, to be invoked by the runtime
//! hydration layer with a DOM subtree root and an initial props object.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

use crate::analyzer::ComponentMetadata;
use crate::deps::{sort_declarations, Declaration, DeclarationKind};
use crate::hash::short_hash;
use crate::ir::{AttrValue, ComponentIR, ComponentProp, ConditionalNode, IRNode, LoopNode};
use crate::normalize::{canonical_expr_text, strip_type_annotations};
use crate::reactivity::ReactiveContext;
use crate::template::{loop_source_expr, render_static_template, TemplateRenderer};

lazy_static! {
    static ref BARE_IDENT_RE: Regex = Regex::new(r"^[a-zA-Z_$][a-zA-Z0-9_$]*$").unwrap();
    static ref BOOLEAN_ATTRS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        for name in [
            "disabled", "selected", "readonly", "required", "hidden", "open", "multiple",
            "autofocus",
        ] {
            s.insert(name);
        }
        s
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// COLLECTION
// ═══════════════════════════════════════════════════════════════════════════════

struct TextBinding {
    slot: String,
    expr: String,
    reactive: bool,
}

struct AttrBinding {
    slot: String,
    name: String,
    expr: String,
}

struct EventTarget {
    slot: String,
    event: String,
    handler: String,
}

struct RefBinding {
    slot: String,
    handler: String,
}

struct ComponentTarget {
    slot: String,
    name: String,
    props: Vec<ComponentProp>,
}

struct ProviderTarget {
    context_name: String,
    value_prop: String,
}

/// Mutable buckets threaded through the single collection walk; traversal
/// order is the only order, so emission is reproducible.
#[derive(Default)]
struct GeneratorContext {
    text_bindings: Vec<TextBinding>,
    attr_bindings: Vec<AttrBinding>,
    events: Vec<EventTarget>,
    refs: Vec<RefBinding>,
    conditionals: Vec<ConditionalNode>,
    loops: Vec<LoopNode>,
    components: Vec<ComponentTarget>,
    providers: Vec<ProviderTarget>,
}

impl GeneratorContext {
    fn is_empty(&self) -> bool {
        self.text_bindings.is_empty()
            && self.attr_bindings.is_empty()
            && self.events.is_empty()
            && self.refs.is_empty()
            && self.conditionals.is_empty()
            && self.loops.is_empty()
            && self.components.is_empty()
            && self.providers.is_empty()
    }
}

fn collect(node: &IRNode, inside_branch: bool, out: &mut GeneratorContext) {
    match node {
        IRNode::Element(element) => {
            if let Some(slot) = &element.slot_id {
                // Events and refs inside a conditional branch are bound by
                // that branch's swap logic; binding them here too would fire
                // handlers twice.
                if !inside_branch {
                    for event in &element.events {
                        out.events.push(EventTarget {
                            slot: slot.clone(),
                            event: event.event.clone(),
                            handler: event.handler.clone(),
                        });
                    }
                    if let Some(handler) = &element.ref_handler {
                        out.refs.push(RefBinding {
                            slot: slot.clone(),
                            handler: handler.clone(),
                        });
                    }
                }
                for attr in &element.attrs {
                    if let AttrValue::Dynamic(dynamic) = &attr.value {
                        if dynamic.reactive {
                            out.attr_bindings.push(AttrBinding {
                                slot: slot.clone(),
                                name: attr.name.clone(),
                                expr: dynamic.expr.clone(),
                            });
                        }
                    }
                }
            }
            for child in &element.children {
                collect(child, inside_branch, out);
            }
        }

        IRNode::Expression(expr) => {
            if let Some(slot) = &expr.slot_id {
                out.text_bindings.push(TextBinding {
                    slot: slot.clone(),
                    expr: expr.expr.clone(),
                    reactive: expr.reactive,
                });
            }
        }

        IRNode::Conditional(cond) => {
            if cond.slot_id.is_some() {
                out.conditionals.push(cond.clone());
            }
            collect(&cond.when_true, true, out);
            if let Some(alternate) = &cond.when_false {
                collect(alternate, true, out);
            }
        }

        // Loop interiors are rendered and bound per item by the
        // reconciliation routine, never by the global sections.
        IRNode::Loop(lp) => {
            out.loops.push(lp.clone());
        }

        IRNode::Component(comp) => {
            if let Some(slot) = &comp.slot_id {
                out.components.push(ComponentTarget {
                    slot: slot.clone(),
                    name: comp.name.clone(),
                    props: comp.props.clone(),
                });
            }
        }

        IRNode::Fragment(frag) => {
            for child in &frag.children {
                collect(child, inside_branch, out);
            }
        }

        IRNode::Provider(provider) => {
            out.providers.push(ProviderTarget {
                context_name: provider.context_name.clone(),
                value_prop: provider.value_prop.clone(),
            });
            for child in &provider.children {
                collect(child, inside_branch, out);
            }
        }

        IRNode::IfStatement(stmt) => {
            for child in &stmt.consequent {
                collect(child, inside_branch, out);
            }
            for child in &stmt.alternate {
                collect(child, inside_branch, out);
            }
        }

        IRNode::Text(_) => {}
    }
}

/// Elements with events or a ref inside a branch/item subtree, for rebinding.
fn collect_bind_targets(
    node: &IRNode,
    out: &mut Vec<(String, Vec<(String, String)>, Option<String>)>,
) {
    match node {
        IRNode::Element(element) => {
            if let Some(slot) = &element.slot_id {
                if !element.events.is_empty() || element.ref_handler.is_some() {
                    out.push((
                        slot.clone(),
                        element
                            .events
                            .iter()
                            .map(|e| (e.event.clone(), e.handler.clone()))
                            .collect(),
                        element.ref_handler.clone(),
                    ));
                }
            }
            for child in &element.children {
                collect_bind_targets(child, out);
            }
        }
        IRNode::Conditional(cond) => {
            collect_bind_targets(&cond.when_true, out);
            if let Some(alternate) = &cond.when_false {
                collect_bind_targets(alternate, out);
            }
        }
        IRNode::Fragment(frag) => {
            for child in &frag.children {
                collect_bind_targets(child, out);
            }
        }
        IRNode::Provider(provider) => {
            for child in &provider.children {
                collect_bind_targets(child, out);
            }
        }
        _ => {}
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EMISSION
// ═══════════════════════════════════════════════════════════════════════════════

pub fn generate_client_script(ir: &ComponentIR) -> String {
    let metadata = &ir.metadata;
    let ctx = metadata.reactive_context();

    let mut buckets = GeneratorContext::default();
    collect(&ir.root, false, &mut buckets);

    let needs_client = !buckets.is_empty()
        || !metadata.signals.is_empty()
        || !metadata.memos.is_empty()
        || !metadata.effects.is_empty()
        || !metadata.on_mounts.is_empty();

    let static_template = render_static_template(&ir.root, metadata, &ctx);
    let template_hash = short_hash(&TemplateRenderer::component(metadata, &ctx).render(&ir.root));

    if !needs_client {
        // Template-only path: no init behavior, but parents still need to
        // locate and render this component.
        return match static_template {
            Some(template) if !template.is_empty() => {
                registration_module(&ir.name, Some(template.as_str()), &template_hash)
            }
            _ => String::new(),
        };
    }

    let init_name = format!("init{}", ir.name);
    let mut body = String::new();

    emit_props(metadata, &mut body);
    let ordered = ordered_declarations(metadata);
    emit_declarations(metadata, &ctx, &ordered, &buckets, &mut body);
    emit_slot_lookups(&buckets, &mut body);
    emit_text_effects(&buckets, &mut body);
    emit_attr_effects(&buckets, &mut body);
    emit_conditionals(&buckets, &mut body);
    emit_loops(&buckets, &mut body);
    emit_events(&buckets, &mut body);
    emit_user_effects(metadata, &mut body);
    emit_children(&buckets, &mut body);

    let mut module = String::new();
    module.push_str("// Generated by the Lumen compiler. Do not edit.\n");
    module.push_str(
        "import { createSignal, createMemo, createEffect, onMount } from \"@lumen/runtime\";\n\n",
    );
    module.push_str(
        "const __lookup = (root, slot) => root.querySelector('[data-lumen-slot=\"' + slot + '\"]');\n",
    );
    module.push_str(
        "const __refresh = (root, el, slot) => (el && root.contains(el)) ? el : __lookup(root, slot);\n\n",
    );
    module.push_str(&format!(
        "function {}(root, {}) {{\n",
        init_name,
        props_param(metadata)
    ));
    module.push_str(&body);
    module.push_str("}\n\n");
    module.push_str(&registration_tail(
        &ir.name,
        Some(init_name.as_str()),
        static_template.as_deref(),
        &template_hash,
    ));
    module
}

fn props_param(metadata: &ComponentMetadata) -> String {
    metadata
        .props_object_name
        .clone()
        .unwrap_or_else(|| "props".to_string())
}

fn registration_module(name: &str, template: Option<&str>, hash: &str) -> String {
    let mut module = String::new();
    module.push_str("// Generated by the Lumen compiler. Do not edit.\n\n");
    module.push_str(&registration_tail(name, None, template, hash));
    module
}

fn registration_tail(
    name: &str,
    init_name: Option<&str>,
    template: Option<&str>,
    hash: &str,
) -> String {
    let mut out = String::new();
    match template {
        Some(template) => {
            out.push_str(&format!("const __template_{} = `{}`;\n\n", name, template));
        }
        None => {
            out.push_str(&format!(
                "// No static template: {} attaches to server-rendered markup only.\nconst __template_{} = null;\n\n",
                name, name
            ));
        }
    }
    out.push_str("if (typeof window !== \"undefined\") {\n");
    out.push_str("  if (!window.__LUMEN_COMPONENTS__) window.__LUMEN_COMPONENTS__ = new Map();\n");
    out.push_str(&format!(
        "  window.__LUMEN_COMPONENTS__.set(\"{}\", {{ init: {}, template: __template_{}, hash: \"{}\" }});\n",
        name,
        init_name.unwrap_or("null"),
        name,
        hash
    ));
    out.push_str("}\n");
    if let Some(init_name) = init_name {
        out.push_str(&format!("\nexport {{ {} as init }};\n", init_name));
    }
    out
}

// ───────────────────────────────────────────────────────────────────────────────
// Section 1: props
// ───────────────────────────────────────────────────────────────────────────────

fn controlled_signal_names(metadata: &ComponentMetadata) -> HashSet<String> {
    let prop_names: HashSet<&str> = metadata
        .props_params
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    metadata
        .signals
        .iter()
        .filter(|s| prop_names.contains(s.getter.as_str()))
        .map(|s| s.getter.clone())
        .collect()
}

fn emit_props(metadata: &ComponentMetadata, out: &mut String) {
    if metadata.props_params.is_empty() && metadata.rest_props_name.is_none() {
        return;
    }
    let controlled = controlled_signal_names(metadata);
    let mut parts = Vec::new();
    for param in &metadata.props_params {
        // A controlled signal keeps the name; its value flows in through the
        // tracking effect instead of a destructured binding.
        if controlled.contains(&param.name) {
            continue;
        }
        match &param.default_value {
            Some(default) => parts.push(format!("{} = {}", param.name, default)),
            None => parts.push(param.name.clone()),
        }
    }
    if let Some(rest) = &metadata.rest_props_name {
        parts.push(format!("...{}", rest));
    }
    if parts.is_empty() {
        return;
    }
    out.push_str("  // 1. Props\n");
    out.push_str(&format!(
        "  const {{ {} }} = {};\n",
        parts.join(", "),
        props_param(metadata)
    ));
    out.push('\n');
}

// ───────────────────────────────────────────────────────────────────────────────
// Sections 2-4: declarations in dependency order
// ───────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum EmittedDecl {
    Constant(usize),
    Signal(usize),
    Memo(usize),
    Function(usize),
}

fn ordered_declarations(metadata: &ComponentMetadata) -> Vec<EmittedDecl> {
    let mut decls = Vec::new();
    let mut tags = Vec::new();
    for (index, constant) in metadata.local_constants.iter().enumerate() {
        decls.push(Declaration::new(
            DeclarationKind::Constant,
            vec![constant.name.clone()],
            constant.initializer.as_deref().unwrap_or(""),
            constant.source_index,
        ));
        tags.push(EmittedDecl::Constant(index));
    }
    for (index, signal) in metadata.signals.iter().enumerate() {
        decls.push(Declaration::new(
            DeclarationKind::Signal,
            vec![signal.getter.clone(), signal.setter.clone()],
            &signal.initializer,
            signal.source_index,
        ));
        tags.push(EmittedDecl::Signal(index));
    }
    for (index, memo) in metadata.memos.iter().enumerate() {
        decls.push(Declaration::new(
            DeclarationKind::Memo,
            vec![memo.name.clone()],
            &memo.computation,
            memo.source_index,
        ));
        tags.push(EmittedDecl::Memo(index));
    }
    for (index, function) in metadata.local_functions.iter().enumerate() {
        decls.push(Declaration::new(
            DeclarationKind::Function,
            vec![function.name.clone()],
            &function.body,
            function.source_index,
        ));
        tags.push(EmittedDecl::Function(index));
    }
    sort_declarations(&decls).into_iter().map(|i| tags[i]).collect()
}

/// Local functions are emitted only when something generated actually calls
/// them, directly or through another emitted function.
fn referenced_functions(
    metadata: &ComponentMetadata,
    buckets: &GeneratorContext,
) -> HashSet<String> {
    let mut corpus: Vec<String> = Vec::new();
    for binding in &buckets.text_bindings {
        corpus.push(binding.expr.clone());
    }
    for binding in &buckets.attr_bindings {
        corpus.push(binding.expr.clone());
    }
    for event in &buckets.events {
        corpus.push(event.handler.clone());
    }
    for r in &buckets.refs {
        corpus.push(r.handler.clone());
    }
    let renderer = TemplateRenderer::instance();
    for cond in &buckets.conditionals {
        corpus.push(cond.condition.clone());
        let mut targets = Vec::new();
        collect_bind_targets(&cond.when_true, &mut targets);
        corpus.push(renderer.render(&cond.when_true));
        if let Some(alternate) = &cond.when_false {
            collect_bind_targets(alternate, &mut targets);
            corpus.push(renderer.render(alternate));
        }
        for (_, events, ref_handler) in targets {
            for (_, handler) in events {
                corpus.push(handler);
            }
            if let Some(handler) = ref_handler {
                corpus.push(handler);
            }
        }
    }
    for lp in &buckets.loops {
        corpus.push(loop_source_expr(lp));
        for child in &lp.children {
            corpus.push(renderer.render(child));
            let mut targets = Vec::new();
            collect_bind_targets(child, &mut targets);
            for (_, events, ref_handler) in targets {
                for (_, handler) in events {
                    corpus.push(handler);
                }
                if let Some(handler) = ref_handler {
                    corpus.push(handler);
                }
            }
        }
    }
    for component in &buckets.components {
        for prop in &component.props {
            if let AttrValue::Dynamic(dynamic) = &prop.value {
                corpus.push(dynamic.expr.clone());
            }
        }
    }
    for provider in &buckets.providers {
        corpus.push(provider.value_prop.clone());
    }
    for effect in &metadata.effects {
        corpus.push(effect.body.clone());
    }
    for hook in &metadata.on_mounts {
        corpus.push(hook.body.clone());
    }
    for memo in &metadata.memos {
        corpus.push(memo.computation.clone());
    }
    for signal in &metadata.signals {
        corpus.push(signal.initializer.clone());
    }
    for constant in &metadata.local_constants {
        if let Some(init) = &constant.initializer {
            corpus.push(init.clone());
        }
    }

    let mut referenced: HashSet<String> = HashSet::new();
    // Transitive closure: a kept function can pull in further helpers.
    loop {
        let mut changed = false;
        for function in &metadata.local_functions {
            if referenced.contains(&function.name) {
                continue;
            }
            let pattern = format!(r"\b{}\b", regex::escape(&function.name));
            let Ok(re) = Regex::new(&pattern) else {
                continue;
            };
            let hit = corpus.iter().any(|text| re.is_match(text))
                || metadata
                    .local_functions
                    .iter()
                    .filter(|f| referenced.contains(&f.name))
                    .any(|f| re.is_match(&f.body));
            if hit {
                referenced.insert(function.name.clone());
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    referenced
}

fn emit_memo_value(computation: &str) -> String {
    let trimmed = computation.trim();
    if BARE_IDENT_RE.is_match(trimmed) {
        // createMemo(compute): already a function reference.
        trimmed.to_string()
    } else if trimmed.starts_with('{') {
        format!("() => {}", trimmed)
    } else {
        format!("() => ({})", trimmed)
    }
}

fn emit_declarations(
    metadata: &ComponentMetadata,
    ctx: &ReactiveContext,
    ordered: &[EmittedDecl],
    buckets: &GeneratorContext,
    out: &mut String,
) {
    let kept_functions = referenced_functions(metadata, buckets);
    let controlled = controlled_signal_names(metadata);
    let props_object = props_param(metadata);

    // Partition the sorted order: constants whose value cannot change come
    // before functions and state; reactive-dependent constants come after.
    let mut early = Vec::new();
    let mut functions = Vec::new();
    let mut state = Vec::new();
    let mut late = Vec::new();
    for tag in ordered {
        match tag {
            EmittedDecl::Constant(index) => {
                let constant = &metadata.local_constants[*index];
                let reactive = constant
                    .initializer
                    .as_deref()
                    .map(|init| ctx.is_reactive(init))
                    .unwrap_or(false);
                if reactive {
                    late.push(*index);
                } else {
                    early.push(*index);
                }
            }
            EmittedDecl::Function(index) => functions.push(*index),
            EmittedDecl::Signal(index) => state.push((true, *index)),
            EmittedDecl::Memo(index) => state.push((false, *index)),
        }
    }

    if !early.is_empty() {
        out.push_str("  // 2. Constants\n");
        for index in early {
            emit_constant(&metadata.local_constants[index], out);
        }
        out.push('\n');
    }

    let kept: Vec<usize> = functions
        .into_iter()
        .filter(|&i| kept_functions.contains(&metadata.local_functions[i].name))
        .collect();
    if !kept.is_empty() {
        out.push_str("  // 3. Local functions\n");
        for index in kept {
            let function = &metadata.local_functions[index];
            out.push_str(&format!(
                "  function {}({}) {}\n",
                function.name,
                function.params.join(", "),
                function.body
            ));
        }
        out.push('\n');
    }

    if !state.is_empty() || !late.is_empty() {
        out.push_str("  // 4. Reactive state\n");
        for (is_signal, index) in state {
            if is_signal {
                let signal = &metadata.signals[index];
                if controlled.contains(&signal.getter) {
                    // Controlled signal: seeded from, and tracking, the prop.
                    out.push_str(&format!(
                        "  const [{}, {}] = createSignal({}.{});\n",
                        signal.getter, signal.setter, props_object, signal.getter
                    ));
                    out.push_str(&format!(
                        "  createEffect(() => {{ {}({}.{}); }});\n",
                        signal.setter, props_object, signal.getter
                    ));
                } else {
                    out.push_str(&format!(
                        "  const [{}, {}] = createSignal({});\n",
                        signal.getter,
                        signal.setter,
                        strip_type_annotations(&signal.initializer)
                    ));
                }
            } else {
                let memo = &metadata.memos[index];
                out.push_str(&format!(
                    "  const {} = createMemo({});\n",
                    memo.name,
                    emit_memo_value(&memo.computation)
                ));
            }
        }
        for index in late {
            emit_constant(&metadata.local_constants[index], out);
        }
        out.push('\n');
    }
}

fn emit_constant(constant: &crate::analyzer::ConstantInfo, out: &mut String) {
    match &constant.initializer {
        Some(init) => out.push_str(&format!(
            "  const {} = {};\n",
            constant.name,
            strip_type_annotations(init)
        )),
        None => out.push_str(&format!("  let {};\n", constant.name)),
    }
}

// ───────────────────────────────────────────────────────────────────────────────
// Section 5: slot lookups
// ───────────────────────────────────────────────────────────────────────────────

fn needed_slots(buckets: &GeneratorContext) -> Vec<String> {
    let mut slots: Vec<String> = Vec::new();
    let mut push = |slot: &str, slots: &mut Vec<String>| {
        if !slots.iter().any(|s| s == slot) {
            slots.push(slot.to_string());
        }
    };
    for binding in &buckets.text_bindings {
        push(&binding.slot, &mut slots);
    }
    for binding in &buckets.attr_bindings {
        push(&binding.slot, &mut slots);
    }
    for cond in &buckets.conditionals {
        if let Some(slot) = &cond.slot_id {
            push(slot, &mut slots);
        }
    }
    for lp in &buckets.loops {
        if let Some(slot) = &lp.slot_id {
            push(slot, &mut slots);
        }
    }
    for event in &buckets.events {
        push(&event.slot, &mut slots);
    }
    for r in &buckets.refs {
        push(&r.slot, &mut slots);
    }
    for component in &buckets.components {
        push(&component.slot, &mut slots);
    }
    slots
}

fn emit_slot_lookups(buckets: &GeneratorContext, out: &mut String) {
    let slots = needed_slots(buckets);
    if slots.is_empty() {
        return;
    }
    out.push_str("  // 5. Slot lookups\n");
    for slot in slots {
        out.push_str(&format!(
            "  let __el_{slot} = __lookup(root, \"{slot}\");\n",
            slot = slot
        ));
    }
    out.push('\n');
}

// ───────────────────────────────────────────────────────────────────────────────
// Section 6: text updates
// ───────────────────────────────────────────────────────────────────────────────

fn emit_text_effects(buckets: &GeneratorContext, out: &mut String) {
    if buckets.text_bindings.is_empty() {
        return;
    }
    out.push_str("  // 6. Text updates\n");

    // Identical expressions share one effect so the value computes once.
    let mut groups: Vec<(String, String, Vec<String>)> = Vec::new();
    let mut one_shots: Vec<&TextBinding> = Vec::new();
    for binding in &buckets.text_bindings {
        if !binding.reactive {
            one_shots.push(binding);
            continue;
        }
        let key = canonical_expr_text(&binding.expr);
        match groups.iter_mut().find(|(k, _, _)| *k == key) {
            Some((_, _, slots)) => slots.push(binding.slot.clone()),
            None => groups.push((key, binding.expr.clone(), vec![binding.slot.clone()])),
        }
    }

    for (_, expr, slots) in groups {
        out.push_str("  createEffect(() => {\n");
        out.push_str(&format!("    const __v = {};\n", expr));
        for slot in slots {
            out.push_str(&format!(
                "    __el_{slot} = __refresh(root, __el_{slot}, \"{slot}\");\n",
                slot = slot
            ));
            out.push_str(&format!(
                "    if (__el_{slot}) __el_{slot}.textContent = __v;\n",
                slot = slot
            ));
        }
        out.push_str("  });\n");
    }

    // Client-only but non-reactive values render once at attach time.
    for binding in one_shots {
        out.push_str(&format!(
            "  if (__el_{slot}) __el_{slot}.textContent = {expr};\n",
            slot = binding.slot,
            expr = binding.expr
        ));
    }
    out.push('\n');
}

// ───────────────────────────────────────────────────────────────────────────────
// Section 7: attribute updates
// ───────────────────────────────────────────────────────────────────────────────

fn attr_apply(slot: &str, name: &str) -> String {
    if name == "value" {
        format!("__el_{}.value = __v;", slot)
    } else if name == "checked" {
        format!("__el_{}.checked = !!__v;", slot)
    } else if name == "class" || name == "className" {
        format!("__el_{}.className = __v;", slot)
    } else if BOOLEAN_ATTRS.contains(name) {
        format!(
            "if (__v) __el_{slot}.setAttribute(\"{name}\", \"\"); else __el_{slot}.removeAttribute(\"{name}\");",
            slot = slot,
            name = name
        )
    } else {
        format!("__el_{}.setAttribute(\"{}\", __v);", slot, name)
    }
}

fn emit_attr_effects(buckets: &GeneratorContext, out: &mut String) {
    if buckets.attr_bindings.is_empty() {
        return;
    }
    out.push_str("  // 7. Attribute updates\n");
    for binding in &buckets.attr_bindings {
        out.push_str("  createEffect(() => {\n");
        out.push_str(&format!("    const __v = {};\n", binding.expr));
        out.push_str(&format!(
            "    __el_{slot} = __refresh(root, __el_{slot}, \"{slot}\");\n",
            slot = binding.slot
        ));
        out.push_str(&format!("    if (!__el_{}) return;\n", binding.slot));
        out.push_str(&format!(
            "    {}\n",
            attr_apply(&binding.slot, &binding.name)
        ));
        out.push_str("  });\n");
    }
    out.push('\n');
}

// ───────────────────────────────────────────────────────────────────────────────
// Section 8: conditional branches
// ───────────────────────────────────────────────────────────────────────────────

fn emit_branch_bind(container: &str, node: &IRNode, out: &mut String) {
    let mut targets = Vec::new();
    collect_bind_targets(node, &mut targets);
    for (slot, events, ref_handler) in targets {
        out.push_str(&format!(
            "    const __b_{slot} = __el_{container} ? __lookup(__el_{container}, \"{slot}\") : null;\n",
            slot = slot,
            container = container
        ));
        for (event, handler) in events {
            out.push_str(&format!(
                "    if (__b_{slot}) __b_{slot}.addEventListener(\"{event}\", (event) => ({handler})(event));\n",
                slot = slot,
                event = event,
                handler = handler
            ));
        }
        if let Some(handler) = ref_handler {
            out.push_str(&format!(
                "    if (__b_{slot}) ({handler})(__b_{slot});\n",
                slot = slot,
                handler = handler
            ));
        }
    }
}

fn emit_conditionals(buckets: &GeneratorContext, out: &mut String) {
    if buckets.conditionals.is_empty() {
        return;
    }
    out.push_str("  // 8. Conditional branches\n");
    let renderer = TemplateRenderer::instance();
    for cond in &buckets.conditionals {
        let Some(slot) = &cond.slot_id else { continue };
        let true_template = renderer.render(&cond.when_true);
        let false_template = cond
            .when_false
            .as_ref()
            .map(|n| renderer.render(n))
            .unwrap_or_default();
        out.push_str(&format!(
            "  const __branch_{slot}_true = () => `{template}`;\n",
            slot = slot,
            template = true_template
        ));
        out.push_str(&format!(
            "  const __branch_{slot}_false = () => `{template}`;\n",
            slot = slot,
            template = false_template
        ));
        out.push_str(&format!("  let __branch_{}_last;\n", slot));
        out.push_str(&format!("  const __bind_{} = () => {{\n", slot));
        emit_branch_bind(slot, &cond.when_true, out);
        if let Some(alternate) = &cond.when_false {
            emit_branch_bind(slot, alternate, out);
        }
        out.push_str("  };\n");
        out.push_str("  createEffect(() => {\n");
        out.push_str(&format!("    const __v = !!({});\n", cond.condition));
        out.push_str(&format!(
            "    if (__v === __branch_{}_last) return;\n",
            slot
        ));
        if cond.client_only {
            // Browser-only condition: the server emitted an empty slot, so
            // every run, including the first, materializes the active branch.
            out.push_str(&format!("    __branch_{}_last = __v;\n", slot));
            out.push_str(&format!(
                "    __el_{slot} = __refresh(root, __el_{slot}, \"{slot}\");\n",
                slot = slot
            ));
            out.push_str(&format!("    if (!__el_{}) return;\n", slot));
            out.push_str(&format!(
                "    __el_{slot}.innerHTML = __v ? __branch_{slot}_true() : __branch_{slot}_false();\n",
                slot = slot
            ));
        } else {
            // The server already rendered the initial branch; the first run
            // only records the state and binds, later runs swap the subtree.
            out.push_str(&format!(
                "    const __swap = __branch_{}_last !== undefined;\n",
                slot
            ));
            out.push_str(&format!("    __branch_{}_last = __v;\n", slot));
            out.push_str(&format!(
                "    __el_{slot} = __refresh(root, __el_{slot}, \"{slot}\");\n",
                slot = slot
            ));
            out.push_str(&format!("    if (!__el_{}) return;\n", slot));
            out.push_str(&format!(
                "    if (__swap) __el_{slot}.innerHTML = __v ? __branch_{slot}_true() : __branch_{slot}_false();\n",
                slot = slot
            ));
        }
        out.push_str(&format!("    __bind_{}();\n", slot));
        out.push_str("  });\n");
    }
    out.push('\n');
}

// ───────────────────────────────────────────────────────────────────────────────
// Section 9: loop reconciliation
// ───────────────────────────────────────────────────────────────────────────────

fn emit_loops(buckets: &GeneratorContext, out: &mut String) {
    if buckets.loops.is_empty() {
        return;
    }
    out.push_str("  // 9. Loop reconciliation\n");
    let renderer = TemplateRenderer::instance();
    for lp in &buckets.loops {
        let Some(slot) = &lp.slot_id else { continue };
        let index_param = lp
            .index_param
            .clone()
            .unwrap_or_else(|| "__index".to_string());
        let body: String = lp.children.iter().map(|c| renderer.render(c)).collect();
        let key_body = match &lp.key_expr {
            Some(key) => key.clone(),
            // Unkeyed loops diff positionally.
            None => index_param.clone(),
        };

        out.push_str(&format!(
            "  const __item_{slot} = ({item}, {index}) => `{body}`;\n",
            slot = slot,
            item = lp.item_param,
            index = index_param,
            body = body
        ));
        out.push_str(&format!(
            "  const __key_{slot} = ({item}, {index}) => ({key});\n",
            slot = slot,
            item = lp.item_param,
            index = index_param,
            key = key_body
        ));
        out.push_str(&format!("  let __keys_{} = null;\n", slot));

        out.push_str(&format!(
            "  const __bind_item_{slot} = (node, {item}, {index}) => {{\n",
            slot = slot,
            item = lp.item_param,
            index = index_param
        ));
        let mut targets = Vec::new();
        for child in &lp.children {
            collect_bind_targets(child, &mut targets);
        }
        for (target_slot, events, ref_handler) in targets {
            out.push_str(&format!(
                "    const __t_{slot} = node.matches('[data-lumen-slot=\"{slot}\"]') ? node : node.querySelector('[data-lumen-slot=\"{slot}\"]');\n",
                slot = target_slot
            ));
            for (event, handler) in events {
                out.push_str(&format!(
                    "    if (__t_{slot}) __t_{slot}.addEventListener(\"{event}\", (event) => ({handler})(event));\n",
                    slot = target_slot,
                    event = event,
                    handler = handler
                ));
            }
            if let Some(handler) = ref_handler {
                out.push_str(&format!(
                    "    if (__t_{slot}) ({handler})(__t_{slot});\n",
                    slot = target_slot,
                    handler = handler
                ));
            }
        }
        if let Some(child) = &lp.child_component {
            out.push_str(&format!(
                "    if (window.__LUMEN_COMPONENTS__ && window.__LUMEN_COMPONENTS__.has(\"{name}\")) window.__LUMEN_COMPONENTS__.get(\"{name}\").init(node, {{ {item}: {item}, {index}: {index} }});\n",
                name = child,
                item = lp.item_param,
                index = index_param
            ));
        }
        out.push_str("  };\n");

        out.push_str(&format!("  const __reconcile_{} = (items) => {{\n", slot));
        out.push_str("    const next = Array.from(items || []);\n");
        out.push_str(&format!(
            "    const nextKeys = next.map(({item}, {index}) => String(__key_{slot}({item}, {index})));\n",
            slot = slot,
            item = lp.item_param,
            index = index_param
        ));
        out.push_str(&format!(
            "    __el_{slot} = __refresh(root, __el_{slot}, \"{slot}\");\n",
            slot = slot
        ));
        out.push_str(&format!("    if (!__el_{}) return;\n", slot));
        // First run adopts the server-rendered children instead of churning.
        out.push_str(&format!("    if (__keys_{} === null) {{\n", slot));
        out.push_str(&format!("      __keys_{} = nextKeys;\n", slot));
        out.push_str(&format!(
            "      Array.from(__el_{slot}.children).forEach((child, i) => __bind_item_{slot}(child, next[i], i));\n",
            slot = slot
        ));
        out.push_str("      return;\n    }\n");
        out.push_str("    const existing = new Map();\n");
        out.push_str(&format!(
            "    Array.from(__el_{slot}.children).forEach((child, i) => existing.set(__keys_{slot}[i] !== undefined ? __keys_{slot}[i] : String(i), child));\n",
            slot = slot
        ));
        out.push_str("    next.forEach((item, i) => {\n");
        out.push_str("      const key = nextKeys[i];\n");
        out.push_str("      let child = existing.get(key);\n");
        out.push_str("      if (child) {\n");
        out.push_str("        existing.delete(key);\n");
        out.push_str(&format!(
            "        if (__el_{slot}.children[i] !== child) __el_{slot}.insertBefore(child, __el_{slot}.children[i] || null);\n",
            slot = slot
        ));
        out.push_str("      } else {\n");
        out.push_str("        const holder = document.createElement(\"template\");\n");
        out.push_str(&format!(
            "        holder.innerHTML = __item_{}(item, i);\n",
            slot
        ));
        out.push_str("        child = holder.content.firstElementChild;\n");
        out.push_str("        if (!child) return;\n");
        out.push_str(&format!(
            "        __el_{slot}.insertBefore(child, __el_{slot}.children[i] || null);\n",
            slot = slot
        ));
        out.push_str(&format!("        __bind_item_{}(child, item, i);\n", slot));
        out.push_str("      }\n");
        out.push_str("    });\n");
        out.push_str("    existing.forEach((child) => child.remove());\n");
        out.push_str(&format!("    __keys_{} = nextKeys;\n", slot));
        out.push_str("  };\n");

        let source = loop_source_expr(lp);
        if lp.is_static_array {
            // Hydrated once; later prop changes do not re-diff.
            out.push_str(&format!("  __reconcile_{}({});\n", slot, source));
        } else {
            out.push_str(&format!(
                "  createEffect(() => {{ __reconcile_{}({}); }});\n",
                slot, source
            ));
        }
    }
    out.push('\n');
}

// ───────────────────────────────────────────────────────────────────────────────
// Section 10: direct event bindings and refs
// ───────────────────────────────────────────────────────────────────────────────

fn emit_events(buckets: &GeneratorContext, out: &mut String) {
    if buckets.events.is_empty() && buckets.refs.is_empty() {
        return;
    }
    out.push_str("  // 10. Event bindings and refs\n");
    for event in &buckets.events {
        out.push_str(&format!(
            "  if (__el_{slot}) __el_{slot}.addEventListener(\"{event}\", (event) => ({handler})(event));\n",
            slot = event.slot,
            event = event.event,
            handler = event.handler
        ));
    }
    for r in &buckets.refs {
        out.push_str(&format!(
            "  if (__el_{slot}) ({handler})(__el_{slot});\n",
            slot = r.slot,
            handler = r.handler
        ));
    }
    out.push('\n');
}

// ───────────────────────────────────────────────────────────────────────────────
// Section 11: user effects and mount hooks
// ───────────────────────────────────────────────────────────────────────────────

fn emit_user_effects(metadata: &ComponentMetadata, out: &mut String) {
    if metadata.effects.is_empty() && metadata.on_mounts.is_empty() {
        return;
    }
    out.push_str("  // 11. User effects\n");
    for effect in &metadata.effects {
        out.push_str(&format!("  createEffect({});\n", effect.body));
    }
    for hook in &metadata.on_mounts {
        out.push_str(&format!("  onMount({});\n", hook.body));
    }
    out.push('\n');
}

// ───────────────────────────────────────────────────────────────────────────────
// Section 12: child components and context
// ───────────────────────────────────────────────────────────────────────────────

fn component_props_object(props: &[ComponentProp]) -> String {
    let entries: Vec<String> = props
        .iter()
        .map(|prop| match &prop.value {
            AttrValue::Static(value) => {
                format!("\"{}\": \"{}\"", prop.name, value.replace('"', "\\\""))
            }
            AttrValue::Dynamic(dynamic) => format!("\"{}\": {}", prop.name, dynamic.expr),
        })
        .collect();
    if entries.is_empty() {
        "{}".to_string()
    } else {
        format!("{{ {} }}", entries.join(", "))
    }
}

fn emit_children(buckets: &GeneratorContext, out: &mut String) {
    if buckets.components.is_empty() && buckets.providers.is_empty() {
        return;
    }
    out.push_str("  // 12. Child components and context\n");
    for provider in &buckets.providers {
        out.push_str("  if (!window.__LUMEN_CONTEXT__) window.__LUMEN_CONTEXT__ = {};\n");
        out.push_str(&format!(
            "  window.__LUMEN_CONTEXT__[\"{}\"] = () => ({});\n",
            provider.context_name, provider.value_prop
        ));
    }
    for component in &buckets.components {
        out.push_str(&format!(
            "  __el_{slot} = __refresh(root, __el_{slot}, \"{slot}\");\n",
            slot = component.slot
        ));
        out.push_str(&format!(
            "  if (__el_{slot} && window.__LUMEN_COMPONENTS__ && window.__LUMEN_COMPONENTS__.has(\"{name}\")) {{\n",
            slot = component.slot,
            name = component.name
        ));
        out.push_str(&format!(
            "    window.__LUMEN_COMPONENTS__.get(\"{name}\").init(__el_{slot}, {props});\n",
            name = component.name,
            slot = component.slot,
            props = component_props_object(&component.props)
        ));
        out.push_str("  }\n");
    }
    out.push('\n');
}
