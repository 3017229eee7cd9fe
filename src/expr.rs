//! Expression Parser for the Lumen compiler.
//!
//! Parses an isolated expression string into a small typed expression AST and
//! classifies it into a support tier. Some backend adapters cannot evaluate
//! arbitrary code server-side, so only expressions within a supported tier can
//! be pre-rendered there; everything else is deferred to the client.
//!
//! `parse` never fails: unparsable or disallowed syntax yields an
//! `Unsupported` leaf so downstream stages skip optimizations gracefully.

use oxc_allocator::Allocator;
use oxc_ast::ast::Expression;
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType};
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// EXPRESSION AST
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedExpr {
    Identifier(String),
    Literal {
        raw: String,
    },
    Call {
        callee: Box<ParsedExpr>,
        args: Vec<ParsedExpr>,
    },
    Member {
        object: Box<ParsedExpr>,
        property: String,
        computed: bool,
    },
    Binary {
        op: String,
        left: Box<ParsedExpr>,
        right: Box<ParsedExpr>,
    },
    Unary {
        op: String,
        argument: Box<ParsedExpr>,
    },
    Logical {
        op: String,
        left: Box<ParsedExpr>,
        right: Box<ParsedExpr>,
    },
    Conditional {
        test: Box<ParsedExpr>,
        consequent: Box<ParsedExpr>,
        alternate: Box<ParsedExpr>,
    },
    Template {
        parts: Vec<ParsedExpr>,
    },
    Arrow {
        params: Vec<String>,
        body: Box<ParsedExpr>,
    },
    HigherOrderCall {
        target: Box<ParsedExpr>,
        method: String,
        predicate: Box<ParsedExpr>,
    },
    Unsupported {
        raw: String,
        reason: String,
    },
}

/// Array methods that form the supported higher-order tier when given a
/// simple predicate.
const HIGHER_ORDER_SUPPORTED: [&str; 3] = ["filter", "every", "some"];

/// Array methods we recognize but never pre-render.
const HIGHER_ORDER_UNSUPPORTED: [&str; 7] = [
    "map", "reduce", "sort", "forEach", "flatMap", "find", "findIndex",
];

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse an isolated expression string. Never panics and never errors.
pub fn parse(expr: &str) -> ParsedExpr {
    let allocator = Allocator::default();
    let source_type = SourceType::default().with_typescript(true).with_jsx(true);
    match Parser::new(&allocator, expr, source_type).parse_expression() {
        Ok(parsed) => convert(&parsed, expr),
        Err(_) => ParsedExpr::Unsupported {
            raw: expr.to_string(),
            reason: "expression does not parse".to_string(),
        },
    }
}

fn snippet(source: &str, start: u32, end: u32) -> String {
    source
        .get(start as usize..end as usize)
        .unwrap_or("")
        .to_string()
}

/// The operator token lives in the gap between the operand spans.
fn op_between(source: &str, left_end: u32, right_start: u32) -> String {
    snippet(source, left_end, right_start).trim().to_string()
}

fn convert(expr: &Expression, source: &str) -> ParsedExpr {
    match expr {
        Expression::Identifier(id) => ParsedExpr::Identifier(id.name.to_string()),

        Expression::StringLiteral(_)
        | Expression::NumericLiteral(_)
        | Expression::BooleanLiteral(_)
        | Expression::NullLiteral(_) => {
            let span = expr.span();
            ParsedExpr::Literal {
                raw: snippet(source, span.start, span.end),
            }
        }

        Expression::TemplateLiteral(tpl) => ParsedExpr::Template {
            parts: tpl
                .expressions
                .iter()
                .map(|e| convert(e, source))
                .collect(),
        },

        Expression::StaticMemberExpression(member) => ParsedExpr::Member {
            object: Box::new(convert(&member.object, source)),
            property: member.property.name.to_string(),
            computed: false,
        },

        Expression::ComputedMemberExpression(member) => {
            let key_span = member.expression.span();
            ParsedExpr::Member {
                object: Box::new(convert(&member.object, source)),
                property: snippet(source, key_span.start, key_span.end),
                computed: true,
            }
        }

        Expression::CallExpression(call) => {
            // Array method chains: the method name decides the tier.
            if let Expression::StaticMemberExpression(member) = &call.callee {
                let method = member.property.name.to_string();
                if HIGHER_ORDER_SUPPORTED.contains(&method.as_str()) {
                    if call.arguments.len() == 1 {
                        if let Some(arg) = call.arguments[0].as_expression() {
                            if matches!(arg, Expression::ArrowFunctionExpression(_)) {
                                return ParsedExpr::HigherOrderCall {
                                    target: Box::new(convert(&member.object, source)),
                                    method,
                                    predicate: Box::new(convert(arg, source)),
                                };
                            }
                        }
                    }
                    let span = expr.span();
                    return ParsedExpr::Unsupported {
                        raw: snippet(source, span.start, span.end),
                        reason: format!(
                            "L5_UNSUPPORTED: `{}` requires a single arrow predicate",
                            method
                        ),
                    };
                }
                if HIGHER_ORDER_UNSUPPORTED.contains(&method.as_str()) {
                    let span = expr.span();
                    return ParsedExpr::Unsupported {
                        raw: snippet(source, span.start, span.end),
                        reason: format!(
                            "L5_UNSUPPORTED: array method `{}` cannot be pre-rendered",
                            method
                        ),
                    };
                }
            }

            let mut args = Vec::new();
            for arg in &call.arguments {
                match arg.as_expression() {
                    Some(e) => args.push(convert(e, source)),
                    None => {
                        let span = expr.span();
                        return ParsedExpr::Unsupported {
                            raw: snippet(source, span.start, span.end),
                            reason: "spread arguments are not supported".to_string(),
                        };
                    }
                }
            }
            ParsedExpr::Call {
                callee: Box::new(convert(&call.callee, source)),
                args,
            }
        }

        Expression::BinaryExpression(bin) => ParsedExpr::Binary {
            op: op_between(source, bin.left.span().end, bin.right.span().start),
            left: Box::new(convert(&bin.left, source)),
            right: Box::new(convert(&bin.right, source)),
        },

        Expression::UnaryExpression(unary) => {
            let span = expr.span();
            ParsedExpr::Unary {
                op: op_between(source, span.start, unary.argument.span().start),
                argument: Box::new(convert(&unary.argument, source)),
            }
        }

        Expression::LogicalExpression(logical) => ParsedExpr::Logical {
            op: op_between(
                source,
                logical.left.span().end,
                logical.right.span().start,
            ),
            left: Box::new(convert(&logical.left, source)),
            right: Box::new(convert(&logical.right, source)),
        },

        Expression::ConditionalExpression(cond) => ParsedExpr::Conditional {
            test: Box::new(convert(&cond.test, source)),
            consequent: Box::new(convert(&cond.consequent, source)),
            alternate: Box::new(convert(&cond.alternate, source)),
        },

        Expression::ArrowFunctionExpression(arrow) => {
            let mut params = Vec::new();
            for param in &arrow.params.items {
                if let oxc_ast::ast::BindingPattern::BindingIdentifier(id) = &param.pattern {
                    params.push(id.name.to_string());
                } else {
                    let span = expr.span();
                    return ParsedExpr::Unsupported {
                        raw: snippet(source, span.start, span.end),
                        reason: "destructuring arrow parameters are not supported".to_string(),
                    };
                }
            }
            // An implicit-return arrow body is a single expression statement.
            let body = if arrow.body.statements.len() == 1 {
                match &arrow.body.statements[0] {
                    oxc_ast::ast::Statement::ExpressionStatement(stmt) => {
                        convert(&stmt.expression, source)
                    }
                    _ => {
                        let span = arrow.body.span();
                        ParsedExpr::Unsupported {
                            raw: snippet(source, span.start, span.end),
                            reason: "block-bodied arrows are not supported".to_string(),
                        }
                    }
                }
            } else {
                let span = arrow.body.span();
                ParsedExpr::Unsupported {
                    raw: snippet(source, span.start, span.end),
                    reason: "block-bodied arrows are not supported".to_string(),
                }
            };
            ParsedExpr::Arrow {
                params,
                body: Box::new(body),
            }
        }

        Expression::ParenthesizedExpression(paren) => convert(&paren.expression, source),
        Expression::TSAsExpression(cast) => convert(&cast.expression, source),
        Expression::TSNonNullExpression(cast) => convert(&cast.expression, source),
        Expression::TSSatisfiesExpression(cast) => convert(&cast.expression, source),

        _ => {
            let span = expr.span();
            ParsedExpr::Unsupported {
                raw: snippet(source, span.start, span.end),
                reason: "syntax outside the supported expression subset".to_string(),
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SUPPORT TIERS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SupportTier {
    #[serde(rename = "L1")]
    L1Identifier,
    #[serde(rename = "L2")]
    L2Member,
    #[serde(rename = "L3")]
    L3Arithmetic,
    #[serde(rename = "L4")]
    L4Logical,
    #[serde(rename = "L5")]
    L5HigherOrder,
    #[serde(rename = "unsupported")]
    Unsupported,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportResult {
    pub supported: bool,
    pub tier: SupportTier,
    pub reason: Option<String>,
}

/// Assign a support tier to an expression string.
pub fn classify_support(expr: &str) -> SupportResult {
    let parsed = parse(expr);
    match tier_of(&parsed) {
        Ok(level) => SupportResult {
            supported: true,
            tier: tier_from_level(level),
            reason: None,
        },
        Err(reason) => SupportResult {
            supported: false,
            tier: SupportTier::Unsupported,
            reason: Some(reason),
        },
    }
}

fn tier_from_level(level: u8) -> SupportTier {
    match level {
        1 => SupportTier::L1Identifier,
        2 => SupportTier::L2Member,
        3 => SupportTier::L3Arithmetic,
        4 => SupportTier::L4Logical,
        _ => SupportTier::L5HigherOrder,
    }
}

fn tier_of(expr: &ParsedExpr) -> Result<u8, String> {
    match expr {
        ParsedExpr::Identifier(_) | ParsedExpr::Literal { .. } => Ok(1),

        ParsedExpr::Call { callee, args } => {
            // A zero-argument identifier call is a signal or memo read.
            if args.is_empty() {
                if let ParsedExpr::Identifier(_) = callee.as_ref() {
                    return Ok(1);
                }
            }
            Err("function calls cannot be pre-rendered".to_string())
        }

        ParsedExpr::Member { object, .. } => {
            let object_tier = tier_of(object)?;
            Ok(object_tier.max(2))
        }

        ParsedExpr::Binary { left, right, .. } => {
            let left_tier = tier_of(left)?;
            let right_tier = tier_of(right)?;
            Ok(left_tier.max(right_tier).max(3))
        }

        ParsedExpr::Unary { argument, .. } => Ok(tier_of(argument)?.max(4)),

        ParsedExpr::Logical { left, right, .. } => {
            let left_tier = tier_of(left)?;
            let right_tier = tier_of(right)?;
            Ok(left_tier.max(right_tier).max(4))
        }

        ParsedExpr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            let tier = tier_of(test)?
                .max(tier_of(consequent)?)
                .max(tier_of(alternate)?);
            Ok(tier.max(4))
        }

        ParsedExpr::Template { parts } => {
            let mut tier = 4;
            for part in parts {
                tier = tier.max(tier_of(part)?);
            }
            Ok(tier)
        }

        ParsedExpr::HigherOrderCall {
            target,
            method,
            predicate,
        } => {
            tier_of(target)?;
            let body = match predicate.as_ref() {
                ParsedExpr::Arrow { body, .. } => body,
                _ => return Err(format!("`{}` predicate must be an arrow", method)),
            };
            let predicate_tier = tier_of(body)?;
            if predicate_tier >= 5 {
                return Err(format!(
                    "L5_UNSUPPORTED: nested higher-order call inside `{}` predicate",
                    method
                ));
            }
            Ok(5)
        }

        ParsedExpr::Arrow { .. } => Err("function values cannot be pre-rendered".to_string()),

        ParsedExpr::Unsupported { reason, .. } => Err(reason.clone()),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
