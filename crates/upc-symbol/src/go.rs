//! tree-sitter lowering of Go source

use crate::expr::{unquote, CompositeLiteral, Expr, Field};
use crate::source::{GoSource, ParseMode, ValueDecl};
use tree_sitter::Node;

/// Lower `text` through tree-sitter-go; `None` when the tree has errors
pub(crate) fn lower(text: &str) -> Option<GoSource> {
    let language: tree_sitter::Language = tree_sitter_go::LANGUAGE.into();
    let mut parser = tree_sitter::Parser::new();
    parser.set_language(&language).ok()?;
    let tree = parser.parse(text, None)?;
    let root = tree.root_node();
    if root.has_error() {
        return None;
    }

    let mut out = GoSource::empty(ParseMode::Structural);
    visit(root, text, None, &mut out);
    Some(out)
}

fn text_of<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

/// Named children under `field`; the grammar also files separating commas there
fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor)
        .filter(Node::is_named)
        .collect()
}

fn visit(node: Node<'_>, source: &str, struct_name: Option<&str>, out: &mut GoSource) {
    let mut type_scope = struct_name.map(str::to_string);

    match node.kind() {
        "const_spec" | "var_spec" => {
            if let Some(values) = node.child_by_field_name("value") {
                let names = field_children(node, "name");
                let values = named_children(values);
                if names.len() == values.len() {
                    for (name, value) in names.into_iter().zip(values) {
                        out.decls.push(ValueDecl {
                            name: text_of(name, source).to_string(),
                            value: lower_expr(value, source),
                        });
                    }
                }
            }
        }
        "assignment_statement"
            if node
                .child_by_field_name("operator")
                .is_some_and(|op| text_of(op, source) == "=") =>
        {
            let left = node.child_by_field_name("left").map(named_children);
            let right = node.child_by_field_name("right").map(named_children);
            if let (Some(left), Some(right)) = (left, right) {
                if let ([target], [value]) = (left.as_slice(), right.as_slice()) {
                    if target.kind() == "identifier" {
                        out.assignments.push(ValueDecl {
                            name: text_of(*target, source).to_string(),
                            value: lower_expr(*value, source),
                        });
                    }
                }
            }
        }
        "type_spec" => {
            type_scope = node
                .child_by_field_name("name")
                .map(|n| text_of(n, source).to_string());
        }
        "field_declaration" => {
            if let Some(tag) = node.child_by_field_name("tag") {
                let raw = unquote(text_of(tag, source)).unwrap_or_default();
                for name in field_children(node, "name") {
                    out.tags
                        .insert_raw(type_scope.as_deref(), text_of(name, source), &raw);
                }
            }
        }
        "composite_literal" => {
            if let Expr::Composite(lit) = lower_expr(node, source) {
                out.composites.push(lit);
            }
        }
        "literal_value" => {
            let is_body = node
                .parent()
                .is_some_and(|p| p.kind() == "composite_literal");
            if !is_body {
                out.composites.push(CompositeLiteral {
                    type_name: None,
                    fields: lower_elements(node, source),
                });
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    for child in children {
        visit(child, source, type_scope.as_deref(), out);
    }
}

fn lower_expr(node: Node<'_>, source: &str) -> Expr {
    let text = text_of(node, source);
    match node.kind() {
        "interpreted_string_literal" | "raw_string_literal" | "rune_literal" => {
            unquote(text).map_or_else(|| Expr::Other(text.to_string()), Expr::Str)
        }
        "int_literal" => Expr::Int(text.to_string()),
        "float_literal" => Expr::Float(text.to_string()),
        "true" => Expr::Bool(true),
        "false" => Expr::Bool(false),
        "nil" => Expr::Nil,
        "identifier" | "field_identifier" | "type_identifier" | "package_identifier" => {
            Expr::Ident(text.to_string())
        }
        "selector_expression" => {
            let operand = node.child_by_field_name("operand");
            let field = node.child_by_field_name("field");
            match (operand, field) {
                (Some(operand), Some(field)) if operand.kind() == "identifier" => {
                    Expr::Qualified {
                        package: text_of(operand, source).to_string(),
                        name: text_of(field, source).to_string(),
                    }
                }
                _ => Expr::Other(text.to_string()),
            }
        }
        "qualified_type" => {
            let package = node.child_by_field_name("package");
            let name = node.child_by_field_name("name");
            match (package, name) {
                (Some(package), Some(name)) => Expr::Qualified {
                    package: text_of(package, source).to_string(),
                    name: text_of(name, source).to_string(),
                },
                _ => Expr::Other(text.to_string()),
            }
        }
        "call_expression" => {
            let function = node
                .child_by_field_name("function")
                .map(|f| compact(text_of(f, source)))
                .unwrap_or_default();
            let args = node
                .child_by_field_name("arguments")
                .map(|a| {
                    named_children(a)
                        .into_iter()
                        .map(|arg| lower_expr(arg, source))
                        .collect()
                })
                .unwrap_or_default();
            Expr::Call { function, args }
        }
        "binary_expression" => {
            let left = node.child_by_field_name("left");
            let op = node.child_by_field_name("operator");
            let right = node.child_by_field_name("right");
            match (left, op, right) {
                (Some(left), Some(op), Some(right)) => Expr::Binary {
                    left: Box::new(lower_expr(left, source)),
                    op: text_of(op, source).to_string(),
                    right: Box::new(lower_expr(right, source)),
                },
                _ => Expr::Other(text.to_string()),
            }
        }
        "unary_expression" => {
            let op = node
                .child_by_field_name("operator")
                .map(|o| text_of(o, source))
                .unwrap_or_default();
            let operand = node.child_by_field_name("operand");
            match (op, operand) {
                ("&" | "+", Some(operand)) => lower_expr(operand, source),
                ("-", Some(operand)) => lower_expr(operand, source).negated(),
                _ => Expr::Other(text.to_string()),
            }
        }
        "parenthesized_expression" | "literal_element" => named_children(node)
            .first()
            .map_or_else(|| Expr::Other(text.to_string()), |n| lower_expr(*n, source)),
        "composite_literal" => {
            let type_name = node
                .child_by_field_name("type")
                .map(|t| compact(text_of(t, source)));
            let fields = node
                .child_by_field_name("body")
                .map(|body| lower_elements(body, source))
                .unwrap_or_default();
            Expr::Composite(CompositeLiteral { type_name, fields })
        }
        "literal_value" => Expr::Composite(CompositeLiteral {
            type_name: None,
            fields: lower_elements(node, source),
        }),
        _ => Expr::Other(text.to_string()),
    }
}

fn lower_elements(body: Node<'_>, source: &str) -> Vec<Field> {
    named_children(body)
        .into_iter()
        .map(|element| {
            if element.kind() == "keyed_element" {
                let parts = named_children(element);
                if let [key, value] = parts.as_slice() {
                    return Field {
                        key: lower_expr(*key, source).key_text(),
                        value: lower_expr(*value, source),
                    };
                }
            }
            Field {
                key: None,
                value: lower_expr(element, source),
            }
        })
        .collect()
}

fn compact(text: &str) -> String {
    text.split_whitespace().collect()
}
