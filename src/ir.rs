//! Backend-agnostic IR for compiled components.
//!
//! The IR is a normalized node tree plus component metadata, independent of
//! any output backend. Backend adapters consume it as JSON and must handle
//! every variant; an adapter that cannot represent a construct degrades to a
//! best-effort static rendering instead of failing the build.
//!
//! Every node referenced by a dynamic runtime update carries a slot id that is
//! unique within its component, so the generated script and the rendered
//! markup can be correlated at runtime.

use serde::{Deserialize, Serialize};

use crate::analyzer::ComponentMetadata;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum IRNode {
    Element(ElementNode),
    Text(TextNode),
    Expression(ExpressionNode),
    Conditional(ConditionalNode),
    Loop(LoopNode),
    Component(ComponentRefNode),
    Fragment(FragmentNode),
    Provider(ProviderNode),
    IfStatement(IfStatementNode),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Static(String),
    Dynamic(DynamicValue),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicValue {
    pub expr: String,
    pub reactive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IRAttribute {
    pub name: String,
    pub value: AttrValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBinding {
    /// DOM event name without the `on` prefix ("click", "input").
    pub event: String,
    /// Handler expression text, an identifier or inline arrow.
    pub handler: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementNode {
    pub tag: String,
    pub attrs: Vec<IRAttribute>,
    pub events: Vec<EventBinding>,
    #[serde(rename = "ref")]
    pub ref_handler: Option<String>,
    pub children: Vec<IRNode>,
    pub slot_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionNode {
    pub expr: String,
    pub reactive: bool,
    pub client_only: bool,
    pub slot_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalNode {
    pub condition: String,
    pub when_true: Box<IRNode>,
    pub when_false: Option<Box<IRNode>>,
    pub reactive: bool,
    pub client_only: bool,
    pub slot_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainOrder {
    FilterThenSort,
    SortThenFilter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopNode {
    /// The array expression, before any filter/sort chain.
    pub array: String,
    pub item_param: String,
    pub index_param: Option<String>,
    pub key_expr: Option<String>,
    pub children: Vec<IRNode>,
    /// Set when the loop body is a single child-component reference.
    pub child_component: Option<String>,
    pub filter_predicate: Option<String>,
    pub sort_comparator: Option<String>,
    pub chain_order: Option<ChainOrder>,
    /// A loop over a plain prop array is hydrated once, not kept reactive.
    pub is_static_array: bool,
    pub slot_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentProp {
    pub name: String,
    pub value: AttrValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRefNode {
    pub name: String,
    pub props: Vec<ComponentProp>,
    pub children: Vec<IRNode>,
    pub slot_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentNode {
    pub children: Vec<IRNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderNode {
    pub context_name: String,
    pub value_prop: String,
    pub children: Vec<IRNode>,
}

/// Compile-time-only branching; never reactive, never hydrated. Adapters fold
/// it during server rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IfStatementNode {
    pub condition: String,
    pub consequent: Vec<IRNode>,
    pub alternate: Vec<IRNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentIR {
    pub name: String,
    pub path: String,
    pub root: IRNode,
    pub metadata: ComponentMetadata,
}

impl ComponentIR {
    /// Backend adapters consume the IR as JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl IRNode {
    pub fn slot_id(&self) -> Option<&str> {
        match self {
            IRNode::Element(el) => el.slot_id.as_deref(),
            IRNode::Expression(expr) => expr.slot_id.as_deref(),
            IRNode::Conditional(cond) => cond.slot_id.as_deref(),
            IRNode::Loop(lp) => lp.slot_id.as_deref(),
            IRNode::Component(comp) => comp.slot_id.as_deref(),
            _ => None,
        }
    }
}

/// All slot ids in a subtree, in traversal order.
pub fn collect_slot_ids(node: &IRNode, out: &mut Vec<String>) {
    if let Some(id) = node.slot_id() {
        out.push(id.to_string());
    }
    match node {
        IRNode::Element(el) => {
            for child in &el.children {
                collect_slot_ids(child, out);
            }
        }
        IRNode::Conditional(cond) => {
            collect_slot_ids(&cond.when_true, out);
            if let Some(alt) = &cond.when_false {
                collect_slot_ids(alt, out);
            }
        }
        IRNode::Loop(lp) => {
            for child in &lp.children {
                collect_slot_ids(child, out);
            }
        }
        IRNode::Component(comp) => {
            for child in &comp.children {
                collect_slot_ids(child, out);
            }
        }
        IRNode::Fragment(frag) => {
            for child in &frag.children {
                collect_slot_ids(child, out);
            }
        }
        IRNode::Provider(provider) => {
            for child in &provider.children {
                collect_slot_ids(child, out);
            }
        }
        IRNode::IfStatement(stmt) => {
            for child in &stmt.consequent {
                collect_slot_ids(child, out);
            }
            for child in &stmt.alternate {
                collect_slot_ids(child, out);
            }
        }
        _ => {}
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_serialization_tag() {
        let node = IRNode::Text(TextNode {
            value: "hello".to_string(),
        });
        let json = serde_json::to_string(&node).expect("Should serialize");
        assert!(json.contains("\"type\":\"text\""));

        let node = IRNode::IfStatement(IfStatementNode {
            condition: "import.meta.env.DEV".to_string(),
            consequent: vec![],
            alternate: vec![],
        });
        let json = serde_json::to_string(&node).expect("Should serialize");
        assert!(json.contains("\"type\":\"if-statement\""));
    }

    #[test]
    fn test_attr_value_untagged() {
        let attr = IRAttribute {
            name: "class".to_string(),
            value: AttrValue::Static("card".to_string()),
        };
        let json = serde_json::to_string(&attr).expect("Should serialize");
        assert!(json.contains("\"value\":\"card\""));

        let attr = IRAttribute {
            name: "class".to_string(),
            value: AttrValue::Dynamic(DynamicValue {
                expr: "theme()".to_string(),
                reactive: true,
            }),
        };
        let json = serde_json::to_string(&attr).expect("Should serialize");
        assert!(json.contains("\"expr\":\"theme()\""));
    }

    #[test]
    fn test_collect_slot_ids_traversal_order() {
        let root = IRNode::Element(ElementNode {
            tag: "div".to_string(),
            attrs: vec![],
            events: vec![],
            ref_handler: None,
            children: vec![
                IRNode::Expression(ExpressionNode {
                    expr: "count()".to_string(),
                    reactive: true,
                    client_only: false,
                    slot_id: Some("s1".to_string()),
                }),
                IRNode::Element(ElementNode {
                    tag: "button".to_string(),
                    attrs: vec![],
                    events: vec![EventBinding {
                        event: "click".to_string(),
                        handler: "increment".to_string(),
                    }],
                    ref_handler: None,
                    children: vec![],
                    slot_id: Some("s2".to_string()),
                }),
            ],
            slot_id: Some("s0".to_string()),
        });
        let mut ids = Vec::new();
        collect_slot_ids(&root, &mut ids);
        assert_eq!(ids, vec!["s0", "s1", "s2"]);
    }
}
