//! Source Analyzer for the Lumen compiler.
//!
//! A single pass over a component source file extracts reactive declarations
//! (signals, memos, effects, mount hooks), plain local declarations, function
//! declarations, prop parameters, imports, type declarations, and the returned
//! markup tree. The pass never descends into nested function or lambda bodies
//! when collecting declarations; their locals are not component-scope, and
//! effect bodies are treated as opaque blocks.

use lazy_static::lazy_static;
use oxc_ast::ast::{
    ArrowFunctionExpression, BindingPattern, Declaration as AstDeclaration,
    ExportDefaultDeclarationKind, Expression, Function, ImportDeclarationSpecifier,
    ModuleExportName, Program, PropertyKey, Statement,
};
use oxc_span::{GetSpan, Span};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::diagnostics::{CompilerError, ERR_DUPLICATE_BINDING, ERR_MISSING_DIRECTIVE, ERR_NO_COMPONENT};
use crate::reactivity::ReactiveContext;

lazy_static! {
    /// Markup detection inside raw body text.
    static ref MARKUP_RE: Regex = Regex::new(r"<[a-zA-Z]").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT METADATA
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ComponentMetadata {
    pub component_name: String,
    /// Opt-in marker for client-observable behavior ("use client").
    pub has_directive: bool,
    pub props_params: Vec<ParamInfo>,
    /// Set when props are accessed as a whole object rather than destructured.
    pub props_object_name: Option<String>,
    pub rest_props_name: Option<String>,
    pub signals: Vec<SignalInfo>,
    pub memos: Vec<MemoInfo>,
    pub effects: Vec<EffectInfo>,
    pub on_mounts: Vec<OnMountInfo>,
    pub local_functions: Vec<FunctionInfo>,
    pub local_constants: Vec<ConstantInfo>,
    pub imports: Vec<ImportInfo>,
    pub type_definitions: Vec<TypeDef>,
    pub errors: Vec<CompilerError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub optional: bool,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalInfo {
    pub getter: String,
    pub setter: String,
    pub initializer: String,
    pub inferred_type: String,
    pub source_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoInfo {
    pub name: String,
    pub computation: String,
    pub inferred_type: String,
    pub dependencies: Vec<String>,
    pub source_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectInfo {
    pub body: String,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnMountInfo {
    pub body: String,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionInfo {
    pub name: String,
    pub params: Vec<String>,
    pub body: String,
    pub contains_markup: bool,
    pub source_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstantInfo {
    pub name: String,
    /// Absent for uninitialized declarations.
    pub initializer: Option<String>,
    pub source_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportInfo {
    pub source: String,
    pub default_specifier: Option<String>,
    pub named: Vec<String>,
    pub namespace: Option<String>,
    pub type_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDef {
    pub name: String,
    pub definition: String,
}

impl ComponentMetadata {
    /// The reactive-name universe this component's expressions are classified
    /// against.
    pub fn reactive_context(&self) -> ReactiveContext {
        ReactiveContext::new(
            self.signals.iter().map(|s| s.getter.clone()).collect(),
            self.memos.iter().map(|m| m.name.clone()).collect(),
            self.props_params.iter().map(|p| p.name.clone()).collect(),
            Some(
                self.props_object_name
                    .clone()
                    .unwrap_or_else(|| "props".to_string()),
            ),
        )
    }
}

/// Analyzer output: owned metadata plus a handle to the returned markup
/// expression for the IR builder.
pub struct Analysis<'a> {
    pub metadata: ComponentMetadata,
    pub return_expr: Option<&'a Expression<'a>>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIRECTIVE DETECTION
// ═══════════════════════════════════════════════════════════════════════════════

/// A leading `"use client"` / `'use client'`, preceded only by whitespace and
/// comments, opts the file into client behavior. The same text anywhere after
/// other code does not count.
pub fn has_client_directive(source: &str) -> bool {
    let mut rest = source;
    loop {
        let trimmed = rest.trim_start();
        if let Some(stripped) = trimmed.strip_prefix("//") {
            rest = match stripped.find('\n') {
                Some(index) => &stripped[index + 1..],
                None => "",
            };
        } else if let Some(stripped) = trimmed.strip_prefix("/*") {
            rest = match stripped.find("*/") {
                Some(index) => &stripped[index + 2..],
                None => "",
            };
        } else {
            return trimmed.starts_with("\"use client\"") || trimmed.starts_with("'use client'");
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn snippet(source: &str, span: Span) -> String {
    source
        .get(span.start as usize..span.end as usize)
        .unwrap_or("")
        .to_string()
}

fn is_call_to(expr: &Expression, name: &str) -> bool {
    if let Expression::CallExpression(call) = expr {
        if let Expression::Identifier(id) = &call.callee {
            return id.name == name;
        }
    }
    false
}

fn first_call_arg<'a, 'b>(expr: &'a Expression<'b>) -> Option<&'a Expression<'b>> {
    if let Expression::CallExpression(call) = expr {
        return call.arguments.first().and_then(|arg| arg.as_expression());
    }
    None
}

fn unwrap_parens<'a, 'b>(expr: &'a Expression<'b>) -> &'a Expression<'b> {
    match expr {
        Expression::ParenthesizedExpression(paren) => unwrap_parens(&paren.expression),
        _ => expr,
    }
}

fn infer_literal_type(expr: Option<&Expression>) -> String {
    match expr.map(unwrap_parens) {
        Some(Expression::NumericLiteral(_)) => "number".to_string(),
        Some(Expression::StringLiteral(_)) | Some(Expression::TemplateLiteral(_)) => {
            "string".to_string()
        }
        Some(Expression::BooleanLiteral(_)) => "boolean".to_string(),
        Some(Expression::ArrayExpression(_)) => "array".to_string(),
        Some(Expression::ObjectExpression(_)) => "object".to_string(),
        Some(Expression::NullLiteral(_)) => "null".to_string(),
        Some(Expression::UnaryExpression(unary)) => {
            infer_literal_type(Some(&unary.argument))
        }
        _ => "unknown".to_string(),
    }
}

/// Recover a declared prop type from the component's own type definitions.
fn prop_type_from_typedefs(name: &str, typedefs: &[TypeDef]) -> Option<(String, bool)> {
    let pattern = format!(r"\b{}\s*(\??)\s*:\s*([^;,\n}}]+)", regex::escape(name));
    let re = Regex::new(&pattern).ok()?;
    for def in typedefs {
        if let Some(captures) = re.captures(&def.definition) {
            let optional = captures.get(1).map(|m| m.as_str() == "?").unwrap_or(false);
            let ty = captures
                .get(2)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            return Some((ty, optional));
        }
    }
    None
}

/// Derive a PascalCase default component name from the file path.
fn component_name_from_path(file_path: &str) -> String {
    let stem = file_path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_path)
        .split('.')
        .next()
        .unwrap_or("Component");
    let mut name = String::new();
    for part in stem.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            name.push(first.to_ascii_uppercase());
            name.extend(chars);
        }
    }
    if name.is_empty() {
        "Component".to_string()
    } else {
        name
    }
}

fn is_component_name(name: &str) -> bool {
    name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT FUNCTION DISCOVERY
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy)]
enum ComponentFn<'a> {
    Function(&'a Function<'a>),
    Arrow(&'a ArrowFunctionExpression<'a>),
}

fn arrow_candidate<'a>(init: &'a Expression<'a>) -> Option<ComponentFn<'a>> {
    match unwrap_parens(init) {
        Expression::ArrowFunctionExpression(arrow) => Some(ComponentFn::Arrow(&**arrow)),
        Expression::FunctionExpression(func) => Some(ComponentFn::Function(&**func)),
        _ => None,
    }
}

/// Locate the component function: the default export wins, then an exported
/// capitalized declaration, then the first capitalized top-level declaration.
fn find_component<'a>(program: &'a Program<'a>) -> Option<(Option<String>, ComponentFn<'a>)> {
    let mut named: Vec<(String, ComponentFn<'a>)> = Vec::new();
    let mut exported: Option<(String, ComponentFn<'a>)> = None;
    let mut default_direct: Option<(Option<String>, ComponentFn<'a>)> = None;
    let mut default_name: Option<String> = None;

    let mut record = |out: &mut Vec<(String, ComponentFn<'a>)>, name: String, func: ComponentFn<'a>| {
        if is_component_name(&name) {
            out.push((name, func));
        }
    };

    for stmt in &program.body {
        match stmt {
            Statement::FunctionDeclaration(func) => {
                if let Some(id) = &func.id {
                    record(&mut named, id.name.to_string(), ComponentFn::Function(&**func));
                }
            }
            Statement::VariableDeclaration(var_decl) => {
                for decl in &var_decl.declarations {
                    if let BindingPattern::BindingIdentifier(id) = &decl.id {
                        if let Some(init) = &decl.init {
                            if let Some(func) = arrow_candidate(init) {
                                record(&mut named, id.name.to_string(), func);
                            }
                        }
                    }
                }
            }
            Statement::ExportNamedDeclaration(export) => {
                if let Some(decl) = &export.declaration {
                    match decl {
                        AstDeclaration::FunctionDeclaration(func) => {
                            if let Some(id) = &func.id {
                                let name = id.name.to_string();
                                if is_component_name(&name) && exported.is_none() {
                                    exported = Some((name.clone(), ComponentFn::Function(&**func)));
                                }
                                record(&mut named, name, ComponentFn::Function(&**func));
                            }
                        }
                        AstDeclaration::VariableDeclaration(var_decl) => {
                            for d in &var_decl.declarations {
                                if let BindingPattern::BindingIdentifier(id) = &d.id {
                                    if let Some(init) = &d.init {
                                        if let Some(func) = arrow_candidate(init) {
                                            let name = id.name.to_string();
                                            if is_component_name(&name) && exported.is_none() {
                                                exported = Some((name.clone(), func));
                                            }
                                            record(&mut named, name, func);
                                        }
                                    }
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
            Statement::ExportDefaultDeclaration(export) => match &export.declaration {
                ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                    let name = func.id.as_ref().map(|id| id.name.to_string());
                    default_direct = Some((name, ComponentFn::Function(&**func)));
                }
                other => {
                    if let Some(expr) = other.as_expression() {
                        match unwrap_parens(expr) {
                            Expression::ArrowFunctionExpression(arrow) => {
                                default_direct = Some((None, ComponentFn::Arrow(&**arrow)));
                            }
                            Expression::FunctionExpression(func) => {
                                let name = func.id.as_ref().map(|id| id.name.to_string());
                                default_direct = Some((name, ComponentFn::Function(&**func)));
                            }
                            Expression::Identifier(id) => {
                                default_name = Some(id.name.to_string());
                            }
                            _ => {}
                        }
                    }
                }
            },
            _ => {}
        }
    }

    if let Some((name, func)) = default_direct {
        return Some((name, func));
    }
    if let Some(wanted) = default_name {
        if let Some((name, func)) = named.iter().find(|(n, _)| *n == wanted) {
            return Some((Some(name.clone()), *func));
        }
    }
    if let Some((name, func)) = exported {
        return Some((Some(name), func));
    }
    named
        .into_iter()
        .next()
        .map(|(name, func)| (Some(name), func))
}

// ═══════════════════════════════════════════════════════════════════════════════
// ANALYSIS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn analyze<'a>(program: &'a Program<'a>, source: &str, file_path: &str) -> Analysis<'a> {
    let mut metadata = ComponentMetadata {
        component_name: component_name_from_path(file_path),
        has_directive: has_client_directive(source),
        ..Default::default()
    };

    collect_module_items(program, source, &mut metadata);

    let component = find_component(program);
    let mut return_expr = None;
    match component {
        Some((name, func)) => {
            if let Some(name) = name {
                metadata.component_name = name;
            }
            collect_props(func, source, &mut metadata);
            return_expr = collect_body(func, source, &mut metadata);
        }
        None => {
            metadata.errors.push(CompilerError::error(
                ERR_NO_COMPONENT,
                "No component function found; expected an exported function returning markup.",
                file_path,
                1,
                1,
            ));
        }
    }

    // Resolve dependency lists now that the full reactive universe is known.
    let ctx = metadata.reactive_context();
    for memo in &mut metadata.memos {
        memo.dependencies = ctx.dependencies(&memo.computation);
    }
    for effect in &mut metadata.effects {
        effect.dependencies = ctx.dependencies(&effect.body);
    }
    for hook in &mut metadata.on_mounts {
        hook.dependencies = ctx.dependencies(&hook.body);
    }

    check_duplicate_bindings(file_path, &mut metadata);

    if !metadata.signals.is_empty() && !metadata.has_directive {
        metadata.errors.push(CompilerError::warning(
            ERR_MISSING_DIRECTIVE,
            &format!(
                "Component \"{}\" declares reactive state but is missing the \"use client\" directive.",
                metadata.component_name
            ),
            file_path,
            1,
            1,
        ));
    }

    Analysis {
        metadata,
        return_expr,
    }
}

fn collect_module_items(program: &Program, source: &str, metadata: &mut ComponentMetadata) {
    for stmt in &program.body {
        match stmt {
            Statement::ImportDeclaration(import_decl) => {
                let mut info = ImportInfo {
                    source: import_decl.source.value.to_string(),
                    default_specifier: None,
                    named: Vec::new(),
                    namespace: None,
                    type_only: import_decl.import_kind.is_type(),
                };
                if let Some(specifiers) = &import_decl.specifiers {
                    for specifier in specifiers {
                        match specifier {
                            ImportDeclarationSpecifier::ImportSpecifier(s) => {
                                let imported = match &s.imported {
                                    ModuleExportName::IdentifierName(id) => id.name.to_string(),
                                    ModuleExportName::StringLiteral(lit) => lit.value.to_string(),
                                    _ => s.local.name.to_string(),
                                };
                                info.named.push(imported);
                            }
                            ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                                info.default_specifier = Some(s.local.name.to_string());
                            }
                            ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                                info.namespace = Some(s.local.name.to_string());
                            }
                        }
                    }
                }
                metadata.imports.push(info);
            }
            Statement::TSInterfaceDeclaration(decl) => {
                metadata.type_definitions.push(TypeDef {
                    name: decl.id.name.to_string(),
                    definition: snippet(source, decl.span),
                });
            }
            Statement::TSTypeAliasDeclaration(decl) => {
                metadata.type_definitions.push(TypeDef {
                    name: decl.id.name.to_string(),
                    definition: snippet(source, decl.span),
                });
            }
            _ => {}
        }
    }
}

fn collect_props(func: ComponentFn, source: &str, metadata: &mut ComponentMetadata) {
    let params = match func {
        ComponentFn::Function(f) => &f.params,
        ComponentFn::Arrow(a) => &a.params,
    };
    let Some(first) = params.items.first() else {
        return;
    };
    match &first.pattern {
        BindingPattern::BindingIdentifier(id) => {
            metadata.props_object_name = Some(id.name.to_string());
        }
        BindingPattern::ObjectPattern(obj) => {
            for prop in &obj.properties {
                let name = match &prop.key {
                    PropertyKey::StaticIdentifier(id) => id.name.to_string(),
                    _ => continue,
                };
                let default_value = match &prop.value {
                    BindingPattern::AssignmentPattern(assign) => {
                        Some(snippet(source, assign.right.span()))
                    }
                    _ => None,
                };
                let declared = prop_type_from_typedefs(&name, &metadata.type_definitions);
                let ty = declared
                    .as_ref()
                    .map(|(t, _)| t.clone())
                    .unwrap_or_else(|| match &prop.value {
                        BindingPattern::AssignmentPattern(assign) => {
                            infer_literal_type(Some(&assign.right))
                        }
                        _ => "unknown".to_string(),
                    });
                let optional =
                    declared.map(|(_, opt)| opt).unwrap_or(false) || default_value.is_some();
                metadata.props_params.push(ParamInfo {
                    name,
                    ty,
                    optional,
                    default_value,
                });
            }
            if let Some(rest) = &obj.rest {
                if let BindingPattern::BindingIdentifier(id) = &rest.argument {
                    metadata.rest_props_name = Some(id.name.to_string());
                }
            }
        }
        _ => {}
    }
}

/// True when the lone statement of an arrow body is the returned markup.
fn is_markup_expression(expr: &Expression) -> bool {
    match unwrap_parens(expr) {
        Expression::JSXElement(_) | Expression::JSXFragment(_) => true,
        Expression::ConditionalExpression(cond) => {
            is_markup_expression(&cond.consequent) || is_markup_expression(&cond.alternate)
        }
        Expression::LogicalExpression(logical) => is_markup_expression(&logical.right),
        _ => false,
    }
}

fn collect_body<'a>(
    func: ComponentFn<'a>,
    source: &str,
    metadata: &mut ComponentMetadata,
) -> Option<&'a Expression<'a>> {
    let statements = match func {
        ComponentFn::Function(f) => match &f.body {
            Some(body) => &body.statements,
            None => return None,
        },
        ComponentFn::Arrow(a) => {
            // Implicit-return arrows carry the markup as their only statement.
            if a.body.statements.len() == 1 {
                if let Statement::ExpressionStatement(stmt) = &a.body.statements[0] {
                    if is_markup_expression(&stmt.expression) {
                        return Some(unwrap_parens(&stmt.expression));
                    }
                }
            }
            &a.body.statements
        }
    };

    let mut return_expr = None;
    let mut source_index = 0usize;

    for stmt in statements.iter() {
        match stmt {
            Statement::VariableDeclaration(var_decl) => {
                for decl in &var_decl.declarations {
                    collect_declarator(decl, source, metadata, &mut source_index);
                }
            }
            Statement::ExpressionStatement(expr_stmt) => {
                let expr = unwrap_parens(&expr_stmt.expression);
                if is_call_to(expr, "createEffect") {
                    // The argument is opaque; its internals are never
                    // captured as component-scope locals.
                    let body = first_call_arg(expr)
                        .map(|arg| snippet(source, arg.span()))
                        .unwrap_or_default();
                    metadata.effects.push(EffectInfo {
                        body,
                        dependencies: Vec::new(),
                    });
                } else if is_call_to(expr, "onMount") {
                    let body = first_call_arg(expr)
                        .map(|arg| snippet(source, arg.span()))
                        .unwrap_or_default();
                    metadata.on_mounts.push(OnMountInfo {
                        body,
                        dependencies: Vec::new(),
                    });
                }
            }
            Statement::FunctionDeclaration(inner) => {
                let name = match &inner.id {
                    Some(id) => id.name.to_string(),
                    None => continue,
                };
                let mut params = Vec::new();
                for param in &inner.params.items {
                    if let BindingPattern::BindingIdentifier(id) = &param.pattern {
                        params.push(id.name.to_string());
                    }
                }
                let body = inner
                    .body
                    .as_ref()
                    .map(|b| snippet(source, b.span))
                    .unwrap_or_default();
                let contains_markup = MARKUP_RE.is_match(&body);
                metadata.local_functions.push(FunctionInfo {
                    name,
                    params,
                    body,
                    contains_markup,
                    source_index,
                });
                source_index += 1;
            }
            Statement::ReturnStatement(ret) => {
                if let Some(arg) = &ret.argument {
                    return_expr = Some(unwrap_parens(arg));
                }
            }
            _ => {}
        }
    }

    return_expr
}

fn collect_declarator(
    decl: &oxc_ast::ast::VariableDeclarator,
    source: &str,
    metadata: &mut ComponentMetadata,
    source_index: &mut usize,
) {
    match &decl.id {
        // [getter, setter] = createSignal(init)
        BindingPattern::ArrayPattern(arr) => {
            let init_is_signal = decl
                .init
                .as_ref()
                .map(|init| is_call_to(unwrap_parens(init), "createSignal"))
                .unwrap_or(false);
            let mut names = Vec::new();
            for element in &arr.elements {
                if let Some(BindingPattern::BindingIdentifier(id)) = element {
                    names.push(id.name.to_string());
                }
            }
            if init_is_signal && names.len() == 2 && arr.rest.is_none() {
                let init = decl.init.as_ref().map(unwrap_parens);
                let arg = init.and_then(first_call_arg);
                metadata.signals.push(SignalInfo {
                    getter: names[0].clone(),
                    setter: names[1].clone(),
                    initializer: arg
                        .map(|a| snippet(source, a.span()))
                        .unwrap_or_else(|| "undefined".to_string()),
                    inferred_type: infer_literal_type(arg),
                    source_index: *source_index,
                });
                *source_index += 1;
                return;
            }
            // Any other destructuring is a set of plain, non-inlinable locals.
            for name in names {
                metadata.local_constants.push(ConstantInfo {
                    name,
                    initializer: None,
                    source_index: *source_index,
                });
                *source_index += 1;
            }
        }

        BindingPattern::BindingIdentifier(id) => {
            let name = id.name.to_string();
            let init = decl.init.as_ref().map(unwrap_parens);
            if let Some(init_expr) = init {
                if is_call_to(init_expr, "createMemo") {
                    let arg = first_call_arg(init_expr);
                    // The type comes from the computation's literal shape,
                    // like a signal's comes from its initializer.
                    let (computation, inferred_type) = match arg {
                        Some(Expression::ArrowFunctionExpression(arrow))
                            if arrow.body.statements.len() == 1 =>
                        {
                            match &arrow.body.statements[0] {
                                Statement::ExpressionStatement(stmt) => (
                                    snippet(source, stmt.expression.span()),
                                    infer_literal_type(Some(&stmt.expression)),
                                ),
                                _ => (
                                    snippet(source, arrow.body.span),
                                    "unknown".to_string(),
                                ),
                            }
                        }
                        Some(other) => {
                            (snippet(source, other.span()), "unknown".to_string())
                        }
                        None => (String::new(), "unknown".to_string()),
                    };
                    metadata.memos.push(MemoInfo {
                        name,
                        inferred_type,
                        computation,
                        dependencies: Vec::new(),
                        source_index: *source_index,
                    });
                    *source_index += 1;
                    return;
                }
            }
            metadata.local_constants.push(ConstantInfo {
                name,
                initializer: init.map(|e| snippet(source, e.span())),
                source_index: *source_index,
            });
            *source_index += 1;
        }

        BindingPattern::ObjectPattern(obj) => {
            for prop in &obj.properties {
                if let BindingPattern::BindingIdentifier(id) = &prop.value {
                    metadata.local_constants.push(ConstantInfo {
                        name: id.name.to_string(),
                        initializer: None,
                        source_index: *source_index,
                    });
                    *source_index += 1;
                }
            }
        }

        _ => {}
    }
}

fn check_duplicate_bindings(file_path: &str, metadata: &mut ComponentMetadata) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut duplicates: Vec<String> = Vec::new();
    let mut check = |name: &str, duplicates: &mut Vec<String>, seen: &mut HashSet<String>| {
        if !seen.insert(name.to_string()) {
            duplicates.push(name.to_string());
        }
    };
    for signal in &metadata.signals {
        check(&signal.getter, &mut duplicates, &mut seen);
        check(&signal.setter, &mut duplicates, &mut seen);
    }
    for memo in &metadata.memos {
        check(&memo.name, &mut duplicates, &mut seen);
    }
    for func in &metadata.local_functions {
        check(&func.name, &mut duplicates, &mut seen);
    }
    for constant in &metadata.local_constants {
        check(&constant.name, &mut duplicates, &mut seen);
    }
    for name in duplicates {
        metadata.errors.push(CompilerError::warning(
            ERR_DUPLICATE_BINDING,
            &format!("Name \"{}\" is declared more than once in component scope.", name),
            file_path,
            1,
            1,
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_detection_double_quoted() {
        assert!(has_client_directive("\"use client\";\nconst x = 1;"));
    }

    #[test]
    fn test_directive_detection_single_quoted() {
        assert!(has_client_directive("'use client';"));
    }

    #[test]
    fn test_directive_after_comments_and_whitespace() {
        assert!(has_client_directive(
            "// counter component\n/* docs */\n  \"use client\";\n"
        ));
    }

    #[test]
    fn test_directive_after_code_not_detected() {
        assert!(!has_client_directive("const x = 1;\n\"use client\";"));
    }

    #[test]
    fn test_directive_absent() {
        assert!(!has_client_directive("const x = 1;"));
    }

    #[test]
    fn test_component_name_from_path() {
        assert_eq!(component_name_from_path("src/hero-card.tsx"), "HeroCard");
        assert_eq!(component_name_from_path("Counter.tsx"), "Counter");
    }
}
