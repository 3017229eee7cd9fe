//! Markup-to-IR lowering.
//!
//! Walks the returned JSX tree once and produces the normalized IR node tree.
//! Dynamic locations (reactive expressions, conditionals, loops, interactive
//! elements, component references) receive slot ids here, from a single
//! per-compile counter, so ids are deterministic and unique within the
//! component.

use oxc_ast::ast::{
    Expression, JSXAttributeItem, JSXAttributeName, JSXAttributeValue, JSXChild, JSXElement,
    JSXElementName, JSXFragment, JSXMemberExpression, JSXMemberExpressionObject, Statement,
};
use oxc_span::{GetSpan, Span};

use crate::ir::{
    AttrValue, ChainOrder, ComponentProp, ComponentRefNode, ConditionalNode, DynamicValue,
    ElementNode, EventBinding, ExpressionNode, FragmentNode, IRNode, IfStatementNode, LoopNode,
    ProviderNode, TextNode,
};
use crate::normalize::strip_type_annotations;
use crate::reactivity::{is_client_only, ReactiveContext};

pub struct IrBuilder<'a> {
    source: &'a str,
    ctx: &'a ReactiveContext,
    slot_counter: usize,
}

/// Lower the component's returned markup into the IR. A component without a
/// return expression gets an empty fragment.
pub fn build_ir(
    return_expr: Option<&Expression>,
    source: &str,
    ctx: &ReactiveContext,
) -> IRNode {
    let mut builder = IrBuilder {
        source,
        ctx,
        slot_counter: 0,
    };
    match return_expr {
        Some(expr) => {
            let mut nodes = builder.lower_expression(expr);
            if nodes.len() == 1 {
                nodes.remove(0)
            } else {
                IRNode::Fragment(FragmentNode { children: nodes })
            }
        }
        None => IRNode::Fragment(FragmentNode { children: vec![] }),
    }
}

impl<'a> IrBuilder<'a> {
    fn next_slot(&mut self) -> String {
        let id = format!("s{}", self.slot_counter);
        self.slot_counter += 1;
        id
    }

    fn snippet(&self, span: Span) -> String {
        self.source
            .get(span.start as usize..span.end as usize)
            .unwrap_or("")
            .to_string()
    }

    fn expr_text(&self, expr: &Expression) -> String {
        strip_type_annotations(&self.snippet(expr.span()))
    }

    // ───────────────────────────────────────────────────────────────────────
    // Elements
    // ───────────────────────────────────────────────────────────────────────

    fn tag_name(&self, name: &JSXElementName) -> String {
        match name {
            JSXElementName::Identifier(id) => id.name.to_string(),
            JSXElementName::IdentifierReference(id) => id.name.to_string(),
            JSXElementName::NamespacedName(ns) => {
                format!("{}:{}", ns.namespace.name, ns.name.name)
            }
            JSXElementName::MemberExpression(member) => self.member_name(member),
            JSXElementName::ThisExpression(_) => "this".to_string(),
        }
    }

    fn member_name(&self, member: &JSXMemberExpression) -> String {
        let object = match &member.object {
            JSXMemberExpressionObject::IdentifierReference(id) => id.name.to_string(),
            JSXMemberExpressionObject::MemberExpression(inner) => self.member_name(inner),
            _ => "unknown".to_string(),
        };
        format!("{}.{}", object, member.property.name)
    }

    fn attribute_expr_text(&self, value: &Option<JSXAttributeValue>) -> Option<String> {
        match value {
            Some(JSXAttributeValue::ExpressionContainer(container)) => container
                .expression
                .as_expression()
                .map(|e| self.expr_text(e)),
            Some(JSXAttributeValue::StringLiteral(s)) => Some(s.value.to_string()),
            _ => None,
        }
    }

    fn lower_element(&mut self, element: &JSXElement) -> IRNode {
        let tag = self.tag_name(&element.opening_element.name);

        // <Context.Provider value={...}> is a context boundary, not an element.
        if let JSXElementName::MemberExpression(member) = &element.opening_element.name {
            if member.property.name == "Provider" {
                let context_name = match &member.object {
                    JSXMemberExpressionObject::IdentifierReference(id) => id.name.to_string(),
                    JSXMemberExpressionObject::MemberExpression(inner) => self.member_name(inner),
                    _ => "unknown".to_string(),
                };
                let value_prop = element
                    .opening_element
                    .attributes
                    .iter()
                    .find_map(|item| match item {
                        JSXAttributeItem::Attribute(attr) => match &attr.name {
                            JSXAttributeName::Identifier(id) if id.name == "value" => {
                                self.attribute_expr_text(&attr.value)
                            }
                            _ => None,
                        },
                        _ => None,
                    })
                    .unwrap_or_else(|| "undefined".to_string());
                let children = self.lower_children(&element.children);
                return IRNode::Provider(ProviderNode {
                    context_name,
                    value_prop,
                    children,
                });
            }
        }

        if tag.chars().next().map(|c| c.is_uppercase()).unwrap_or(false) {
            return self.lower_component(&tag, element);
        }

        let mut attrs = Vec::new();
        let mut events = Vec::new();
        let mut ref_handler = None;
        let mut has_reactive_attr = false;

        for item in &element.opening_element.attributes {
            let attr = match item {
                JSXAttributeItem::Attribute(attr) => attr,
                // Spread attributes cannot be enumerated statically; adapters
                // render them as-is and they carry no client behavior.
                JSXAttributeItem::SpreadAttribute(_) => continue,
            };
            let name = match &attr.name {
                JSXAttributeName::Identifier(id) => id.name.to_string(),
                JSXAttributeName::NamespacedName(ns) => {
                    format!("{}:{}", ns.namespace.name, ns.name.name)
                }
            };

            if name.len() > 2 && name.starts_with("on") {
                let event = name[2..].to_lowercase();
                if let Some(handler) = self.attribute_expr_text(&attr.value) {
                    events.push(EventBinding { event, handler });
                }
                continue;
            }
            if name == "ref" {
                ref_handler = self.attribute_expr_text(&attr.value);
                continue;
            }

            let value = match &attr.value {
                None => AttrValue::Static("true".to_string()),
                Some(JSXAttributeValue::StringLiteral(s)) => AttrValue::Static(s.value.to_string()),
                Some(JSXAttributeValue::ExpressionContainer(container)) => {
                    match container.expression.as_expression() {
                        Some(expr) => {
                            let text = self.expr_text(expr);
                            let reactive = self.ctx.is_reactive(&text);
                            has_reactive_attr = has_reactive_attr || reactive;
                            AttrValue::Dynamic(DynamicValue {
                                expr: text,
                                reactive,
                            })
                        }
                        None => AttrValue::Static("true".to_string()),
                    }
                }
                _ => AttrValue::Static("true".to_string()),
            };
            attrs.push(crate::ir::IRAttribute { name, value });
        }

        let needs_slot = !events.is_empty() || ref_handler.is_some() || has_reactive_attr;
        let slot_id = if needs_slot {
            Some(self.next_slot())
        } else {
            None
        };
        let children = self.lower_children(&element.children);

        IRNode::Element(ElementNode {
            tag,
            attrs,
            events,
            ref_handler,
            children,
            slot_id,
        })
    }

    fn lower_component(&mut self, name: &str, element: &JSXElement) -> IRNode {
        let mut props = Vec::new();
        for item in &element.opening_element.attributes {
            if let JSXAttributeItem::Attribute(attr) = item {
                let prop_name = match &attr.name {
                    JSXAttributeName::Identifier(id) => id.name.to_string(),
                    JSXAttributeName::NamespacedName(ns) => {
                        format!("{}:{}", ns.namespace.name, ns.name.name)
                    }
                };
                let value = match &attr.value {
                    None => AttrValue::Static("true".to_string()),
                    Some(JSXAttributeValue::StringLiteral(s)) => {
                        AttrValue::Static(s.value.to_string())
                    }
                    Some(JSXAttributeValue::ExpressionContainer(container)) => {
                        match container.expression.as_expression() {
                            Some(expr) => {
                                let text = self.expr_text(expr);
                                let reactive = self.ctx.is_reactive(&text);
                                AttrValue::Dynamic(DynamicValue {
                                    expr: text,
                                    reactive,
                                })
                            }
                            None => AttrValue::Static("true".to_string()),
                        }
                    }
                    _ => AttrValue::Static("true".to_string()),
                };
                props.push(ComponentProp {
                    name: prop_name,
                    value,
                });
            }
        }
        let slot_id = Some(self.next_slot());
        let children = self.lower_children(&element.children);
        IRNode::Component(ComponentRefNode {
            name: name.to_string(),
            props,
            children,
            slot_id,
        })
    }

    fn lower_fragment(&mut self, fragment: &JSXFragment) -> IRNode {
        IRNode::Fragment(FragmentNode {
            children: self.lower_children(&fragment.children),
        })
    }

    fn lower_children(&mut self, children: &[JSXChild]) -> Vec<IRNode> {
        let mut nodes = Vec::new();
        for child in children {
            match child {
                JSXChild::Text(text) => {
                    let value = text.value.trim();
                    if !value.is_empty() {
                        nodes.push(IRNode::Text(TextNode {
                            value: value.to_string(),
                        }));
                    }
                }
                JSXChild::Element(element) => nodes.push(self.lower_element(element)),
                JSXChild::Fragment(fragment) => nodes.push(self.lower_fragment(fragment)),
                JSXChild::ExpressionContainer(container) => {
                    if let Some(expr) = container.expression.as_expression() {
                        nodes.extend(self.lower_expression(expr));
                    }
                }
                JSXChild::Spread(_) => {}
            }
        }
        nodes
    }

    // ───────────────────────────────────────────────────────────────────────
    // Expression containers
    // ───────────────────────────────────────────────────────────────────────

    fn lower_expression(&mut self, expr: &Expression) -> Vec<IRNode> {
        let expr = unwrap_parens(expr);
        match expr {
            Expression::JSXElement(element) => vec![self.lower_element(element)],
            Expression::JSXFragment(fragment) => vec![self.lower_fragment(fragment)],

            Expression::ConditionalExpression(cond) => {
                let true_is_markup = contains_markup(&cond.consequent);
                let false_is_markup = contains_markup(&cond.alternate);
                if true_is_markup || false_is_markup {
                    return vec![self.lower_conditional(
                        &cond.test,
                        &cond.consequent,
                        Some(&cond.alternate),
                    )];
                }
                vec![self.lower_value_expression(expr)]
            }

            Expression::LogicalExpression(logical) => {
                let op = self
                    .source
                    .get(logical.left.span().end as usize..logical.right.span().start as usize)
                    .unwrap_or("")
                    .trim()
                    .to_string();
                if op == "&&" && contains_markup(&logical.right) {
                    return vec![self.lower_conditional(&logical.left, &logical.right, None)];
                }
                vec![self.lower_value_expression(expr)]
            }

            Expression::CallExpression(_) => {
                if let Some(node) = self.try_lower_loop(expr) {
                    return vec![node];
                }
                vec![self.lower_value_expression(expr)]
            }

            _ => vec![self.lower_value_expression(expr)],
        }
    }

    fn lower_value_expression(&mut self, expr: &Expression) -> IRNode {
        let text = self.expr_text(expr);
        let reactive = self.ctx.is_reactive(&text);
        let client_only = is_client_only(&text);
        let slot_id = if reactive || client_only {
            Some(self.next_slot())
        } else {
            None
        };
        IRNode::Expression(ExpressionNode {
            expr: text,
            reactive,
            client_only,
            slot_id,
        })
    }

    fn lower_branch(&mut self, expr: &Expression) -> IRNode {
        let mut nodes = self.lower_expression(expr);
        if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            IRNode::Fragment(FragmentNode { children: nodes })
        }
    }

    fn lower_conditional(
        &mut self,
        test: &Expression,
        consequent: &Expression,
        alternate: Option<&Expression>,
    ) -> IRNode {
        let condition = self.expr_text(test);

        // Build-time environment conditions fold at compile time; they are
        // never reactive and never hydrated.
        if condition.contains("import.meta.env") && !self.ctx.is_reactive(&condition) {
            let consequent_nodes = self.lower_expression(consequent);
            let alternate_nodes = alternate
                .map(|alt| self.lower_expression(alt))
                .unwrap_or_default();
            return IRNode::IfStatement(IfStatementNode {
                condition,
                consequent: consequent_nodes,
                alternate: alternate_nodes,
            });
        }

        let reactive = self.ctx.is_reactive(&condition);
        let client_only = is_client_only(&condition);
        // A browser-only condition renders nothing server-side, so it needs a
        // slot for the init function to fill, exactly like a client-only
        // expression.
        let slot_id = if reactive || client_only {
            Some(self.next_slot())
        } else {
            None
        };
        let when_true = Box::new(self.lower_branch(consequent));
        let when_false = match alternate {
            Some(alt) if !is_null_or_undefined(alt) => Some(Box::new(self.lower_branch(alt))),
            _ => None,
        };
        IRNode::Conditional(ConditionalNode {
            condition,
            when_true,
            when_false,
            reactive,
            client_only,
            slot_id,
        })
    }

    // ───────────────────────────────────────────────────────────────────────
    // Loops
    // ───────────────────────────────────────────────────────────────────────

    /// `items.map((item, i) => <li/>)`, optionally behind `.filter()` /
    /// `.sort()` links.
    fn try_lower_loop(&mut self, expr: &Expression) -> Option<IRNode> {
        let call = match expr {
            Expression::CallExpression(call) => call,
            _ => return None,
        };
        let member = match &call.callee {
            Expression::StaticMemberExpression(member) => member,
            _ => return None,
        };
        if member.property.name != "map" {
            return None;
        }
        let arrow = match call.arguments.first().and_then(|arg| arg.as_expression()) {
            Some(Expression::ArrowFunctionExpression(arrow)) => arrow,
            _ => return None,
        };

        // Parameters: (item) or (item, index).
        let mut params = Vec::new();
        for param in &arrow.params.items {
            if let oxc_ast::ast::BindingPattern::BindingIdentifier(id) = &param.pattern {
                params.push(id.name.to_string());
            }
        }
        let item_param = params.first()?.clone();
        let index_param = params.get(1).cloned();

        // The body must be markup for this to be a structural loop.
        let body_expr = match arrow.body.statements.first() {
            Some(Statement::ExpressionStatement(stmt)) if arrow.body.statements.len() == 1 => {
                unwrap_parens(&stmt.expression)
            }
            _ => return None,
        };
        if !contains_markup(body_expr) {
            return None;
        }

        // Walk the chain below `.map`: the outermost link is applied last.
        let mut filter_predicate = None;
        let mut sort_comparator = None;
        let mut chain: Vec<&str> = Vec::new();
        let mut base: &Expression = &member.object;
        loop {
            let inner = unwrap_parens(base);
            let Expression::CallExpression(link) = inner else {
                break;
            };
            let Expression::StaticMemberExpression(link_member) = &link.callee else {
                break;
            };
            let method = link_member.property.name.as_str();
            let arg_text = link
                .arguments
                .first()
                .and_then(|arg| arg.as_expression())
                .map(|a| self.expr_text(a));
            match method {
                "filter" if filter_predicate.is_none() => {
                    filter_predicate = arg_text;
                    chain.push("filter");
                }
                "sort" if sort_comparator.is_none() => {
                    sort_comparator = arg_text;
                    chain.push("sort");
                }
                _ => break,
            }
            base = &link_member.object;
        }
        // `chain` is outermost-first; application order is the reverse.
        let chain_order = if filter_predicate.is_some() && sort_comparator.is_some() {
            match chain.first() {
                Some(&"sort") => Some(ChainOrder::FilterThenSort),
                _ => Some(ChainOrder::SortThenFilter),
            }
        } else {
            None
        };

        let array = self.expr_text(base);
        let full_chain = self.expr_text(&member.object);
        let is_static_array = !self.ctx.reads_reactive_state(&full_chain);

        let slot_id = Some(self.next_slot());
        let mut children = self.lower_expression(body_expr);

        // A `key` attribute on the item root becomes the loop's key expression.
        let mut key_expr = None;
        if let Some(IRNode::Element(element)) = children.first_mut() {
            if let Some(position) = element.attrs.iter().position(|a| a.name == "key") {
                let attr = element.attrs.remove(position);
                key_expr = Some(match attr.value {
                    AttrValue::Static(text) => format!("\"{}\"", text),
                    AttrValue::Dynamic(dynamic) => dynamic.expr,
                });
            }
        }
        let child_component = match children.first() {
            Some(IRNode::Component(comp)) if children.len() == 1 => Some(comp.name.clone()),
            _ => None,
        };

        Some(IRNode::Loop(LoopNode {
            array,
            item_param,
            index_param,
            key_expr,
            children,
            child_component,
            filter_predicate,
            sort_comparator,
            chain_order,
            is_static_array,
            slot_id,
        }))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPRESSION SHAPE CHECKS
// ═══════════════════════════════════════════════════════════════════════════════

fn unwrap_parens<'a, 'b>(expr: &'a Expression<'b>) -> &'a Expression<'b> {
    match expr {
        Expression::ParenthesizedExpression(paren) => unwrap_parens(&paren.expression),
        _ => expr,
    }
}

fn contains_markup(expr: &Expression) -> bool {
    match unwrap_parens(expr) {
        Expression::JSXElement(_) | Expression::JSXFragment(_) => true,
        Expression::ConditionalExpression(cond) => {
            contains_markup(&cond.consequent) || contains_markup(&cond.alternate)
        }
        Expression::LogicalExpression(logical) => contains_markup(&logical.right),
        Expression::CallExpression(call) => {
            // A nested `.map(...)` body counts as markup.
            if let Expression::StaticMemberExpression(member) = &call.callee {
                if member.property.name == "map" {
                    if let Some(Expression::ArrowFunctionExpression(arrow)) =
                        call.arguments.first().and_then(|arg| arg.as_expression())
                    {
                        if let Some(Statement::ExpressionStatement(stmt)) =
                            arrow.body.statements.first()
                        {
                            return contains_markup(&stmt.expression);
                        }
                    }
                }
            }
            false
        }
        _ => false,
    }
}

fn is_null_or_undefined(expr: &Expression) -> bool {
    match unwrap_parens(expr) {
        Expression::NullLiteral(_) => true,
        Expression::Identifier(id) => id.name == "undefined",
        _ => false,
    }
}
