use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

const FRAGMENT_TAGS: &[&str] = &[
    "a", "article", "aside", "b", "button", "details", "div", "em", "fieldset", "footer", "form",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "i", "img", "input", "label", "legend", "li",
    "main", "nav", "ol", "optgroup", "option", "p", "section", "select", "small", "span",
    "strong", "summary", "table", "tbody", "td", "textarea", "th", "thead", "tr", "ul",
];

const FRAGMENT_ATTRS: &[&str] = &[
    "alt", "aria-label", "checked", "class", "disabled", "for", "href", "id", "name",
    "placeholder", "role", "selected", "src", "title", "type", "value",
];

const PAGE_TAGS: &[&str] = &[
    "a", "abbr", "address", "article", "aside", "audio", "b", "blockquote", "body", "br",
    "button", "caption", "cite", "code", "col", "colgroup", "data", "datalist", "dd", "del",
    "details", "div", "dl", "dt", "em", "fieldset", "figcaption", "figure", "footer", "form",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "html", "i", "img", "input", "ins",
    "label", "legend", "li", "main", "menu", "nav", "ol", "option", "output", "p", "pre",
    "progress", "q", "s", "section", "select", "small", "span", "strong", "sub", "summary",
    "sup", "svg", "table", "tbody", "td", "textarea", "tfoot", "th", "thead", "time", "title",
    "tr", "ul", "video",
];

const PAGE_ATTRS: &[&str] = &[
    "abbr", "accept", "accept-charset", "accesskey", "action", "align", "alt",
    "aria-describedby", "aria-hidden", "aria-label", "aria-labelledby", "border", "cellpadding",
    "cellspacing", "checked", "cite", "class", "cols", "colspan", "content", "data", "datetime",
    "default", "dir", "disabled", "download", "draggable", "enctype", "for", "height", "hidden",
    "high", "href", "hreflang", "id", "inputmode", "ismap", "label", "lang", "list", "loop", "low",
    "max", "maxlength", "media", "method", "min", "multiple", "muted", "name", "novalidate",
    "placeholder", "poster", "preload", "readonly", "rel", "required", "reversed", "rows",
    "rowspan", "sandbox", "scope", "selected", "shape", "size", "span", "spellcheck", "src",
    "srcdoc", "start", "step", "style", "tabindex", "target", "title", "translate", "type",
    "usemap", "value", "width", "wrap",
];

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MaskRule {
    pub name: String,
    pub pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SanitizerPolicyView {
    /// Whitelists for target and changed-node snapshots.
    pub fragment_tags: Vec<String>,
    pub fragment_attrs: Vec<String>,
    /// Whitelists for the full-page snapshot.
    pub page_tags: Vec<String>,
    pub page_attrs: Vec<String>,
    /// Fragments at or below this many characters skip sanitization.
    pub fragment_threshold: usize,
    /// Drop every inline `style` attribute from full-page snapshots.
    pub strip_inline_style: bool,
    /// Control names (regex, case-insensitive) whose values are masked outright.
    pub sensitive_fields: Vec<String>,
    /// Value patterns replaced inside otherwise harmless values.
    pub value_rules: Vec<MaskRule>,
    pub mask: String,
}

impl Default for SanitizerPolicyView {
    fn default() -> Self {
        Self {
            fragment_tags: owned(FRAGMENT_TAGS),
            fragment_attrs: owned(FRAGMENT_ATTRS),
            page_tags: owned(PAGE_TAGS),
            page_attrs: owned(PAGE_ATTRS),
            fragment_threshold: 200,
            strip_inline_style: true,
            sensitive_fields: vec![
                "pass(word)?|pwd".into(),
                "card|cc-?num|cvv|cvc".into(),
                "ssn|social".into(),
                "token|secret|otp".into(),
            ],
            value_rules: vec![
                MaskRule {
                    name: "email".into(),
                    pattern: r"(?i)[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}".into(),
                },
                MaskRule {
                    name: "credit_card".into(),
                    pattern: r"\b(?:4[0-9]{12}(?:[0-9]{3})?|5[1-5][0-9]{14}|3[47][0-9]{13}|6(?:011|5[0-9]{2})[0-9]{12})\b".into(),
                },
                MaskRule {
                    name: "secret_token".into(),
                    pattern: r"(sk|pk|tok)_[A-Za-z0-9]{16,}".into(),
                },
            ],
            mask: "***".into(),
        }
    }
}

/// Shared, swappable sanitizer policy.
#[derive(Clone, Default)]
pub struct SanitizerPolicyHandle {
    inner: Arc<RwLock<SanitizerPolicyView>>,
}

impl SanitizerPolicyHandle {
    pub fn new(view: SanitizerPolicyView) -> Self {
        Self {
            inner: Arc::new(RwLock::new(view)),
        }
    }

    pub fn snapshot(&self) -> SanitizerPolicyView {
        self.inner.read().clone()
    }

    pub fn update(&self, view: SanitizerPolicyView) {
        *self.inner.write() = view;
    }

    pub fn fragment_threshold(&self) -> usize {
        self.inner.read().fragment_threshold
    }
}
