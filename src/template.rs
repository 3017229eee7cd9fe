//! HTML Template Renderer.
//!
//! Converts an IR subtree into a markup template string with embedded `${...}`
//! placeholders and `data-lumen-slot` markers for later DOM lookup. Two
//! modes:
//!
//! - **instance** templates re-render a branch or list item at runtime with
//!   real signal/memo calls in scope;
//! - **component** templates register a reusable template function: bare prop
//!   references are rewritten to `props.<name>` and resolvable local
//!   constants are substituted with their inlined values.
//!
//! The static-template check proves an IR subtree has no residual reactivity,
//! so a component can register a template without any init function.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::analyzer::ComponentMetadata;
use crate::inline::inline_substitution_map;
use crate::inline::qualify_props;
use crate::inline::replace_identifier_refs;
use crate::ir::{AttrValue, ChainOrder, IRNode, LoopNode};
use crate::reactivity::ReactiveContext;

lazy_static! {
    static ref VOID_ELEMENTS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        for tag in [
            "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
            "source", "track", "wbr",
        ] {
            s.insert(tag);
        }
        s
    };
    static ref CALL_RE: Regex = Regex::new(r"[a-zA-Z_$][a-zA-Z0-9_$]*\s*\(").unwrap();
    static ref SIMPLE_ACCESS_RE: Regex =
        Regex::new(r"^[a-zA-Z_$][a-zA-Z0-9_$]*(\.[a-zA-Z_$][a-zA-Z0-9_$]*)*$").unwrap();
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\"', "&quot;")
        .replace('\'', "&#39;")
}

/// Static content lands inside a JS template literal; backticks and `${`
/// must not terminate it.
fn escape_template_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateMode {
    Instance,
    Component,
}

pub struct TemplateRenderer {
    mode: TemplateMode,
    prop_names: Vec<String>,
    props_object: String,
    inlined: HashMap<String, String>,
}

impl TemplateRenderer {
    /// Instance templates interpolate expressions verbatim.
    pub fn instance() -> Self {
        Self {
            mode: TemplateMode::Instance,
            prop_names: Vec::new(),
            props_object: "props".to_string(),
            inlined: HashMap::new(),
        }
    }

    /// Component templates qualify props and inline resolved constants.
    pub fn component(metadata: &ComponentMetadata, ctx: &ReactiveContext) -> Self {
        let constants: Vec<(String, Option<String>)> = metadata
            .local_constants
            .iter()
            .map(|c| (c.name.clone(), c.initializer.clone()))
            .collect();
        Self {
            mode: TemplateMode::Component,
            prop_names: metadata.props_params.iter().map(|p| p.name.clone()).collect(),
            props_object: metadata
                .props_object_name
                .clone()
                .unwrap_or_else(|| "props".to_string()),
            inlined: inline_substitution_map(&constants, ctx),
        }
    }

    fn rewrite(&self, expr: &str) -> String {
        match self.mode {
            TemplateMode::Instance => expr.to_string(),
            TemplateMode::Component => {
                let qualified = qualify_props(expr, &self.prop_names, &self.props_object);
                replace_identifier_refs(&qualified, &self.inlined)
            }
        }
    }

    pub fn render(&self, node: &IRNode) -> String {
        match node {
            IRNode::Text(text) => escape_template_text(&escape_html(&text.value)),

            IRNode::Expression(expr) => match &expr.slot_id {
                Some(slot) => {
                    if expr.client_only {
                        // Must not evaluate during server rendering; the init
                        // function fills it in once the browser attaches.
                        format!(
                            "<span data-lumen-slot=\"{}\" style=\"display: contents;\"></span>",
                            slot
                        )
                    } else {
                        format!(
                            "<span data-lumen-slot=\"{}\" style=\"display: contents;\">${{{}}}</span>",
                            slot,
                            self.rewrite(&expr.expr)
                        )
                    }
                }
                None => format!("${{{}}}", self.rewrite(&expr.expr)),
            },

            IRNode::Element(element) => {
                let mut attrs = Vec::new();
                if let Some(slot) = &element.slot_id {
                    attrs.push(format!("data-lumen-slot=\"{}\"", slot));
                }
                for attr in &element.attrs {
                    match &attr.value {
                        AttrValue::Static(value) => {
                            attrs.push(format!(
                                "{}=\"{}\"",
                                attr.name,
                                escape_template_text(&escape_html(value))
                            ));
                        }
                        AttrValue::Dynamic(dynamic) => {
                            attrs.push(format!(
                                "{}=\"${{{}}}\"",
                                attr.name,
                                self.rewrite(&dynamic.expr)
                            ));
                        }
                    }
                }
                let attr_str = if attrs.is_empty() {
                    String::new()
                } else {
                    format!(" {}", attrs.join(" "))
                };
                let children: String = element.children.iter().map(|c| self.render(c)).collect();
                if VOID_ELEMENTS.contains(element.tag.as_str()) && children.is_empty() {
                    format!("<{}{} />", element.tag, attr_str)
                } else {
                    format!("<{}{}>{}</{}>", element.tag, attr_str, children, element.tag)
                }
            }

            IRNode::Conditional(cond) => {
                let when_true = cond
                    .when_true
                    .as_ref();
                let true_branch = format!("`{}`", self.render(when_true));
                let false_branch = cond
                    .when_false
                    .as_ref()
                    .map(|n| format!("`{}`", self.render(n)))
                    .unwrap_or_else(|| "\"\"".to_string());
                let pick = if cond.client_only {
                    // Condition is browser-only; nothing renders server-side.
                    String::new()
                } else {
                    format!(
                        "${{({}) ? {} : {}}}",
                        self.rewrite(&cond.condition),
                        true_branch,
                        false_branch
                    )
                };
                match &cond.slot_id {
                    Some(slot) => format!(
                        "<div data-lumen-slot=\"{}\" style=\"display: contents;\">{}</div>",
                        slot, pick
                    ),
                    None => pick,
                }
            }

            IRNode::IfStatement(stmt) => {
                let consequent: String = stmt.consequent.iter().map(|n| self.render(n)).collect();
                let alternate: String = stmt.alternate.iter().map(|n| self.render(n)).collect();
                format!(
                    "${{({}) ? `{}` : `{}`}}",
                    self.rewrite(&stmt.condition),
                    consequent,
                    alternate
                )
            }

            IRNode::Loop(lp) => {
                let body: String = lp.children.iter().map(|c| self.render(c)).collect();
                let params = match &lp.index_param {
                    Some(index) => format!("({}, {})", lp.item_param, index),
                    None => format!("({})", lp.item_param),
                };
                let items = format!(
                    "${{({}).map({} => `{}`).join(\"\")}}",
                    self.rewrite(&loop_source_expr(lp)),
                    params,
                    body
                );
                match &lp.slot_id {
                    Some(slot) => format!(
                        "<div data-lumen-slot=\"{}\" style=\"display: contents;\">{}</div>",
                        slot, items
                    ),
                    None => items,
                }
            }

            IRNode::Component(comp) => {
                let children: String = comp.children.iter().map(|c| self.render(c)).collect();
                let slot = comp
                    .slot_id
                    .as_ref()
                    .map(|s| format!(" data-lumen-slot=\"{}\"", s))
                    .unwrap_or_default();
                format!(
                    "<div{} data-lumen-component=\"{}\" style=\"display: contents;\">{}</div>",
                    slot, comp.name, children
                )
            }

            IRNode::Fragment(frag) => frag.children.iter().map(|c| self.render(c)).collect(),

            IRNode::Provider(provider) => {
                provider.children.iter().map(|c| self.render(c)).collect()
            }
        }
    }
}

/// The full array expression a loop iterates, with its filter/sort chain in
/// application order.
pub fn loop_source_expr(lp: &LoopNode) -> String {
    let mut source = lp.array.clone();
    match lp.chain_order {
        Some(ChainOrder::FilterThenSort) => {
            if let Some(filter) = &lp.filter_predicate {
                source = format!("{}.filter({})", source, filter);
            }
            if let Some(sort) = &lp.sort_comparator {
                source = format!("{}.sort({})", source, sort);
            }
        }
        Some(ChainOrder::SortThenFilter) => {
            if let Some(sort) = &lp.sort_comparator {
                source = format!("{}.sort({})", source, sort);
            }
            if let Some(filter) = &lp.filter_predicate {
                source = format!("{}.filter({})", source, filter);
            }
        }
        None => {
            if let Some(filter) = &lp.filter_predicate {
                source = format!("{}.filter({})", source, filter);
            }
            if let Some(sort) = &lp.sort_comparator {
                source = format!("{}.sort({})", source, sort);
            }
        }
    }
    source
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATIC TEMPLATE ELIGIBILITY
// ═══════════════════════════════════════════════════════════════════════════════

/// An expression that calls a function needs values not resolvable outside a
/// running component instance; a simple member chain does not.
fn expr_blocks_static(expr: &str) -> bool {
    CALL_RE.is_match(expr) && !SIMPLE_ACCESS_RE.is_match(expr.trim())
}

/// A subtree can register as a static template only when every construct in
/// it is resolvable without a component instance: no loops, no component
/// references, no function-calling expressions.
pub fn can_generate_static_template(node: &IRNode) -> bool {
    match node {
        IRNode::Text(_) => true,
        IRNode::Loop(_) | IRNode::Component(_) => false,
        IRNode::Expression(expr) => !expr_blocks_static(&expr.expr),
        IRNode::Element(element) => {
            for attr in &element.attrs {
                if let AttrValue::Dynamic(dynamic) = &attr.value {
                    if expr_blocks_static(&dynamic.expr) {
                        return false;
                    }
                }
            }
            element.children.iter().all(can_generate_static_template)
        }
        IRNode::Conditional(cond) => {
            if expr_blocks_static(&cond.condition) {
                return false;
            }
            can_generate_static_template(&cond.when_true)
                && cond
                    .when_false
                    .as_ref()
                    .map(|n| can_generate_static_template(n))
                    .unwrap_or(true)
        }
        IRNode::IfStatement(stmt) => {
            stmt.consequent.iter().all(can_generate_static_template)
                && stmt.alternate.iter().all(can_generate_static_template)
        }
        IRNode::Fragment(frag) => frag.children.iter().all(can_generate_static_template),
        IRNode::Provider(provider) => provider.children.iter().all(can_generate_static_template),
    }
}

/// Component-mode render, gated on eligibility: `None` proves nothing; it
/// just means an init function is required.
pub fn render_static_template(
    node: &IRNode,
    metadata: &ComponentMetadata,
    ctx: &ReactiveContext,
) -> Option<String> {
    if !can_generate_static_template(node) {
        return None;
    }
    Some(TemplateRenderer::component(metadata, ctx).render(node))
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{
        ConditionalNode, DynamicValue, ElementNode, ExpressionNode, IRAttribute, TextNode,
    };

    fn text(value: &str) -> IRNode {
        IRNode::Text(TextNode {
            value: value.to_string(),
        })
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>&</b>"), "&lt;b&gt;&amp;&lt;/b&gt;");
    }

    #[test]
    fn test_template_text_escaping() {
        assert_eq!(escape_template_text("a`b${c}"), "a\\`b\\${c}");
    }

    #[test]
    fn test_render_element_with_slot() {
        let node = IRNode::Element(ElementNode {
            tag: "button".to_string(),
            attrs: vec![IRAttribute {
                name: "class".to_string(),
                value: AttrValue::Static("btn".to_string()),
            }],
            events: vec![],
            ref_handler: None,
            children: vec![text("go")],
            slot_id: Some("s0".to_string()),
        });
        let html = TemplateRenderer::instance().render(&node);
        assert_eq!(
            html,
            "<button data-lumen-slot=\"s0\" class=\"btn\">go</button>"
        );
    }

    #[test]
    fn test_render_void_element() {
        let node = IRNode::Element(ElementNode {
            tag: "input".to_string(),
            attrs: vec![],
            events: vec![],
            ref_handler: None,
            children: vec![],
            slot_id: None,
        });
        assert_eq!(TemplateRenderer::instance().render(&node), "<input />");
    }

    #[test]
    fn test_render_reactive_expression_span() {
        let node = IRNode::Expression(ExpressionNode {
            expr: "count()".to_string(),
            reactive: true,
            client_only: false,
            slot_id: Some("s1".to_string()),
        });
        let html = TemplateRenderer::instance().render(&node);
        assert_eq!(
            html,
            "<span data-lumen-slot=\"s1\" style=\"display: contents;\">${count()}</span>"
        );
    }

    #[test]
    fn test_client_only_expression_renders_empty() {
        let node = IRNode::Expression(ExpressionNode {
            expr: "window.innerWidth".to_string(),
            reactive: false,
            client_only: true,
            slot_id: Some("s1".to_string()),
        });
        let html = TemplateRenderer::instance().render(&node);
        assert!(!html.contains("innerWidth"));
    }

    #[test]
    fn test_component_mode_qualifies_props() {
        let mut metadata = ComponentMetadata::default();
        metadata.props_params.push(crate::analyzer::ParamInfo {
            name: "title".to_string(),
            ty: "string".to_string(),
            optional: false,
            default_value: None,
        });
        let ctx = metadata.reactive_context();
        let node = IRNode::Expression(ExpressionNode {
            expr: "title".to_string(),
            reactive: true,
            client_only: false,
            slot_id: Some("s0".to_string()),
        });
        let html = TemplateRenderer::component(&metadata, &ctx).render(&node);
        assert!(html.contains("${props.title}"));
    }

    #[test]
    fn test_component_mode_inlines_constants() {
        let mut metadata = ComponentMetadata::default();
        metadata.local_constants.push(crate::analyzer::ConstantInfo {
            name: "greeting".to_string(),
            initializer: Some("\"hi\"".to_string()),
            source_index: 0,
        });
        let ctx = metadata.reactive_context();
        let node = IRNode::Expression(ExpressionNode {
            expr: "greeting".to_string(),
            reactive: false,
            client_only: false,
            slot_id: None,
        });
        let html = TemplateRenderer::component(&metadata, &ctx).render(&node);
        assert_eq!(html, "${\"hi\"}");
    }

    #[test]
    fn test_static_rejects_function_calls() {
        let node = IRNode::Expression(ExpressionNode {
            expr: "formatDate(now)".to_string(),
            reactive: false,
            client_only: false,
            slot_id: None,
        });
        assert!(!can_generate_static_template(&node));
    }

    #[test]
    fn test_static_allows_prop_access() {
        let node = IRNode::Expression(ExpressionNode {
            expr: "props.title".to_string(),
            reactive: true,
            client_only: false,
            slot_id: None,
        });
        assert!(can_generate_static_template(&node));
    }

    #[test]
    fn test_static_rejects_loops() {
        let node = IRNode::Loop(LoopNode {
            array: "props.items".to_string(),
            item_param: "item".to_string(),
            index_param: None,
            key_expr: None,
            children: vec![],
            child_component: None,
            filter_predicate: None,
            sort_comparator: None,
            chain_order: None,
            is_static_array: true,
            slot_id: Some("s0".to_string()),
        });
        assert!(!can_generate_static_template(&node));
    }

    #[test]
    fn test_conditional_renders_both_branches() {
        let node = IRNode::Conditional(ConditionalNode {
            condition: "open()".to_string(),
            when_true: Box::new(text("yes")),
            when_false: Some(Box::new(text("no"))),
            reactive: true,
            client_only: false,
            slot_id: Some("s3".to_string()),
        });
        let html = TemplateRenderer::instance().render(&node);
        assert!(html.contains("data-lumen-slot=\"s3\""));
        assert!(html.contains("`yes`"));
        assert!(html.contains("`no`"));
    }

    #[test]
    fn test_loop_source_chain_order() {
        let mut lp = LoopNode {
            array: "items()".to_string(),
            item_param: "item".to_string(),
            index_param: None,
            key_expr: None,
            children: vec![],
            child_component: None,
            filter_predicate: Some("i => i.done".to_string()),
            sort_comparator: Some("(a, b) => a.rank - b.rank".to_string()),
            chain_order: Some(ChainOrder::FilterThenSort),
            is_static_array: false,
            slot_id: None,
        };
        assert_eq!(
            loop_source_expr(&lp),
            "items().filter(i => i.done).sort((a, b) => a.rank - b.rank)"
        );
        lp.chain_order = Some(ChainOrder::SortThenFilter);
        assert_eq!(
            loop_source_expr(&lp),
            "items().sort((a, b) => a.rank - b.rank).filter(i => i.done)"
        );
    }

    #[test]
    fn test_dynamic_attr_expr_reused_attr_value() {
        let node = IRNode::Element(ElementNode {
            tag: "div".to_string(),
            attrs: vec![IRAttribute {
                name: "class".to_string(),
                value: AttrValue::Dynamic(DynamicValue {
                    expr: "theme()".to_string(),
                    reactive: true,
                }),
            }],
            events: vec![],
            ref_handler: None,
            children: vec![],
            slot_id: Some("s0".to_string()),
        });
        let html = TemplateRenderer::instance().render(&node);
        assert!(html.contains("class=\"${theme()}\""));
    }
}
