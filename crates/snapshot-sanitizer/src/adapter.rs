use std::sync::Arc;

use dom_model::{node_html, trim_depth, visible_html, Document, NodeData, NodeKey};
use tracing::trace;

use crate::policy::SanitizerPolicyHandle;
use crate::sanitizer::{AmmoniaSanitizer, HtmlSanitizer, SanitizeRules};

/// Produces the three snapshot flavours used in summaries.
#[derive(Clone)]
pub struct SnapshotAdapter {
    policy: SanitizerPolicyHandle,
    sanitizer: Arc<dyn HtmlSanitizer>,
}

impl Default for SnapshotAdapter {
    fn default() -> Self {
        Self::new(SanitizerPolicyHandle::default())
    }
}

impl SnapshotAdapter {
    pub fn new(policy: SanitizerPolicyHandle) -> Self {
        Self::with_sanitizer(policy, Arc::new(AmmoniaSanitizer))
    }

    pub fn with_sanitizer(policy: SanitizerPolicyHandle, sanitizer: Arc<dyn HtmlSanitizer>) -> Self {
        Self { policy, sanitizer }
    }

    pub fn policy(&self) -> &SanitizerPolicyHandle {
        &self.policy
    }

    /// Fragment whitelist, applied only above the size threshold.
    pub fn sanitize_fragment(&self, html: String) -> String {
        let policy = self.policy.snapshot();
        if html.chars().count() <= policy.fragment_threshold {
            return html;
        }
        let rules = SanitizeRules {
            tags: &policy.fragment_tags,
            attrs: &policy.fragment_attrs,
            strip_style: false,
        };
        self.sanitizer.sanitize(&html, &rules)
    }

    /// Page whitelist over already visibility-filtered markup.
    pub fn sanitize_full_page(&self, visible: &str) -> String {
        let policy = self.policy.snapshot();
        let rules = SanitizeRules {
            tags: &policy.page_tags,
            attrs: &policy.page_attrs,
            strip_style: policy.strip_inline_style,
        };
        self.sanitizer.sanitize(visible, &rules)
    }

    /// Snapshot of the element an action is attributed to.
    pub fn target_snapshot(&self, doc: &Document, node: NodeKey, depth: usize) -> String {
        self.sanitize_fragment(trim_depth(doc, node, depth))
    }

    /// Snapshot of a node referenced by a typed event. Character data is
    /// passed through as-is.
    pub fn changed_node_snapshot(&self, doc: &Document, node: NodeKey, depth: usize) -> String {
        let html = node_html(doc, node, depth);
        match doc.node(node).map(|n| &n.data) {
            Some(NodeData::Element(_)) => self.sanitize_fragment(html),
            _ => html,
        }
    }

    pub fn page_snapshot(&self, doc: &Document) -> String {
        let visible = visible_html(doc);
        let page = self.sanitize_full_page(&visible);
        trace!(
            target: "sanitizer",
            visible_len = visible.len(),
            sanitized_len = page.len(),
            "page snapshot"
        );
        page
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_model::NodeSpec;

    struct Marker;

    impl HtmlSanitizer for Marker {
        fn sanitize(&self, html: &str, rules: &SanitizeRules<'_>) -> String {
            format!("[{}:{}]{}", rules.tags.len(), rules.strip_style, html.len())
        }
    }

    fn adapter() -> SnapshotAdapter {
        SnapshotAdapter::with_sanitizer(SanitizerPolicyHandle::default(), Arc::new(Marker))
    }

    #[test]
    fn short_fragments_skip_sanitization() {
        let adapter = adapter();
        assert_eq!(adapter.sanitize_fragment("<b>x</b>".into()), "<b>x</b>");
        let long = "a".repeat(201);
        assert!(adapter.sanitize_fragment(long).starts_with('['));
        let exact = "a".repeat(200);
        assert_eq!(adapter.sanitize_fragment(exact.clone()), exact);
    }

    #[test]
    fn page_snapshot_uses_page_rules() {
        let adapter = adapter();
        let doc = Document::from_spec(
            "https://a.test/",
            &NodeSpec::element("html").child(NodeSpec::element("body")),
        )
        .unwrap();
        let page = adapter.page_snapshot(&doc);
        let tags = adapter.policy().snapshot().page_tags.len();
        assert!(page.starts_with(&format!("[{tags}:true]")));
    }

    #[test]
    fn real_sanitizer_strips_style_from_page() {
        let adapter = SnapshotAdapter::default();
        let doc = Document::from_spec(
            "https://a.test/",
            &NodeSpec::element("html").child(
                NodeSpec::element("body").child(
                    NodeSpec::element("div")
                        .attr("style", "display:flex")
                        .id("app")
                        .child(NodeSpec::text("Hello")),
                ),
            ),
        )
        .unwrap();
        let page = adapter.page_snapshot(&doc);
        assert!(page.contains("<div id=\"app\">Hello</div>"));
        assert!(!page.contains("display:flex"));
    }
}
