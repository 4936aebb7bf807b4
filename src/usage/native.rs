//! Mode A: native syntactic walk over sample files.
//!
//! Finds call expressions whose callee is a member access and surfaces the
//! `(receiver, method)` pair. Receiver resolution is intentionally shallow:
//! a simple identifier, a trailing property name, or `this`.

/// One call site observed in a sample file.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleCall {
    pub receiver: String,
    pub method: String,
    pub line: u32,
}

/// Collect member-access call sites from one sample file. Unparseable files
/// yield no calls.
pub fn calls_in_file(parser: &mut tree_sitter::Parser, source: &str) -> Vec<SampleCall> {
    let Some(tree) = parser.parse(source, None) else {
        return Vec::new();
    };
    let mut calls = Vec::new();
    walk(tree.root_node(), source.as_bytes(), &mut calls);
    calls
}

fn walk(node: tree_sitter::Node, source: &[u8], calls: &mut Vec<SampleCall>) {
    if node.kind() == "invocation_expression"
        && let Some(call) = extract_invocation(node, source)
    {
        calls.push(call);
    }
    for i in 0..node.child_count() {
        walk(node.child(i).unwrap(), source, calls);
    }
}

fn extract_invocation(node: tree_sitter::Node, source: &[u8]) -> Option<SampleCall> {
    let callee = node.child(0)?;
    let line = node.start_position().row as u32 + 1;

    match callee.kind() {
        "member_access_expression" => {
            let method = node_text(callee.child_by_field_name("name")?, source);
            let receiver_node = callee
                .child_by_field_name("expression")
                .or_else(|| callee.child(0))?;
            let receiver = receiver_surface_name(receiver_node, source)?;
            Some(SampleCall { receiver, method: method.to_string(), line })
        }
        "conditional_access_expression" => {
            let receiver = receiver_surface_name(callee.child(0)?, source)?;
            let binding = find_child_by_kind(callee, "member_binding_expression")
                .or_else(|| find_descendant_binding(callee))?;
            let method = binding
                .child_by_field_name("name")
                .map(|n| node_text(n, source))?;
            Some(SampleCall { receiver, method: method.to_string(), line })
        }
        // `c?.Refresh()` can also parse with the invocation nested inside the
        // conditional access; the receiver then lives on the enclosing node.
        "member_binding_expression" => {
            let method = callee
                .child_by_field_name("name")
                .map(|n| node_text(n, source))?;
            let mut ancestor = node.parent();
            while let Some(a) = ancestor {
                if a.kind() == "conditional_access_expression" {
                    let receiver = receiver_surface_name(a.child(0)?, source)?;
                    return Some(SampleCall { receiver, method: method.to_string(), line });
                }
                ancestor = a.parent();
            }
            None
        }
        _ => None,
    }
}

/// Surface name of a receiver expression: identifier, trailing property
/// name, or `this`. Anything deeper is out of scope for the heuristic.
fn receiver_surface_name(node: tree_sitter::Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "identifier" => Some(node_text(node, source).to_string()),
        "this_expression" => Some("this".to_string()),
        "member_access_expression" => node
            .child_by_field_name("name")
            .map(|n| node_text(n, source).to_string()),
        _ => None,
    }
}

fn find_descendant_binding(node: tree_sitter::Node) -> Option<tree_sitter::Node> {
    for i in 0..node.named_child_count() {
        let child = node.named_child(i).unwrap();
        if child.kind() == "member_binding_expression" {
            return Some(child);
        }
        if let Some(found) = find_descendant_binding(child) {
            return Some(found);
        }
    }
    None
}

fn node_text<'a>(node: tree_sitter::Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

fn find_child_by_kind<'a>(node: tree_sitter::Node<'a>, kind: &str) -> Option<tree_sitter::Node<'a>> {
    for i in 0..node.child_count() {
        let child = node.child(i).unwrap();
        if child.kind() == kind {
            return Some(child);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::new_parser;

    fn calls(source: &str) -> Vec<SampleCall> {
        let mut parser = new_parser();
        calls_in_file(&mut parser, source)
    }

    #[test]
    fn test_simple_member_call() {
        let found = calls(
            r#"
            class Program {
                static void Main() {
                    var client = new WidgetClient();
                    client.GetWidget("id");
                }
            }
            "#,
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].receiver, "client");
        assert_eq!(found[0].method, "GetWidget");
        assert_eq!(found[0].line, 5);
    }

    #[test]
    fn test_this_receiver() {
        let found = calls(
            r#"
            class Program {
                void Run() { this.Helper(); }
            }
            "#,
        );
        assert_eq!(found[0].receiver, "this");
        assert_eq!(found[0].method, "Helper");
    }

    #[test]
    fn test_trailing_property_receiver() {
        let found = calls(
            r#"
            class Program {
                static void Main(WidgetClient client) {
                    client.Widgets.List();
                }
            }
            "#,
        );
        // receiver is the trailing property name of the access chain
        assert_eq!(found[0].receiver, "Widgets");
        assert_eq!(found[0].method, "List");
    }

    #[test]
    fn test_nested_invocations_found_once_each() {
        let found = calls(
            r#"
            class Program {
                static void Main(Client c) {
                    c.Outer(c.Inner());
                }
            }
            "#,
        );
        let methods: Vec<&str> = found.iter().map(|c| c.method.as_str()).collect();
        assert_eq!(methods, vec!["Outer", "Inner"]);
    }

    #[test]
    fn test_conditional_access_call() {
        let found = calls(
            r#"
            class Program {
                static void Main(Client c) {
                    c?.Refresh();
                }
            }
            "#,
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].receiver, "c");
        assert_eq!(found[0].method, "Refresh");
    }

    #[test]
    fn test_bare_call_ignored() {
        let found = calls(
            r#"
            class Program {
                static void Main() { Helper(); }
            }
            "#,
        );
        assert!(found.is_empty());
    }

    #[test]
    fn test_garbage_yields_no_calls() {
        assert!(calls("not c# ((((").is_empty());
    }
}
