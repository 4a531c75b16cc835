use crate::tree::{compact_text, range_of};
use sable_core::Diagnostic;
use tree_sitter::Node;

const SNIPPET_CHARS: usize = 32;

/// One diagnostic per outermost `ERROR` region and per `MISSING` node.
pub(crate) fn collect_syntax_errors(source: &str, root: Node<'_>, out: &mut Vec<Diagnostic>) {
    if !root.has_error() {
        return;
    }

    let start = out.len();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_missing() {
            out.push(Diagnostic::syntax_error(
                range_of(node),
                format!("missing `{}`", node.kind()),
            ));
            continue;
        }
        if node.is_error() {
            out.push(Diagnostic::syntax_error(range_of(node), unexpected(source, node)));
            continue;
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<_> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    out[start..].sort_by_key(|diag| (diag.range.start(), diag.range.end()));
}

fn unexpected(source: &str, node: Node<'_>) -> String {
    let text = compact_text(source, node);
    if text.is_empty() {
        return "unexpected input".to_string();
    }
    let mut snippet: String = text.chars().take(SNIPPET_CHARS).collect();
    if snippet.len() < text.len() {
        snippet.push_str("...");
    }
    format!("unexpected `{snippet}`")
}
