use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use ammonia::Builder;

/// Tags whose content is dropped outright and that can never be whitelisted.
const CONTENT_DROPPED: [&str; 2] = ["script", "style"];

/// Whitelist applied by one sanitize call.
#[derive(Debug, Clone, Copy)]
pub struct SanitizeRules<'a> {
    pub tags: &'a [String],
    pub attrs: &'a [String],
    /// Remove inline `style` after attribute filtering.
    pub strip_style: bool,
}

/// Whitelist-based markup sanitizer.
pub trait HtmlSanitizer: Send + Sync {
    fn sanitize(&self, html: &str, rules: &SanitizeRules<'_>) -> String;
}

/// [`HtmlSanitizer`] backed by `ammonia`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AmmoniaSanitizer;

impl HtmlSanitizer for AmmoniaSanitizer {
    fn sanitize(&self, html: &str, rules: &SanitizeRules<'_>) -> String {
        let tags: HashSet<&str> = rules
            .tags
            .iter()
            .map(String::as_str)
            .filter(|tag| !CONTENT_DROPPED.contains(tag))
            .collect();
        let attrs: HashSet<&str> = rules.attrs.iter().map(String::as_str).collect();

        let mut builder = Builder::default();
        builder
            .tags(tags)
            .generic_attributes(attrs)
            .tag_attributes(HashMap::new())
            .link_rel(None)
            .strip_comments(true);
        if rules.strip_style {
            builder.attribute_filter(|_element, attribute, value| {
                if attribute == "style" {
                    None
                } else {
                    Some(Cow::Borrowed(value))
                }
            });
        }
        builder.clean(html).to_string()
    }
}
