//! Snapshot production for summaries: depth-bounded fragments, the visible
//! page, whitelist sanitization and masking of sensitive values.

pub mod adapter;
pub mod mask;
pub mod policy;
pub mod sanitizer;

pub use adapter::SnapshotAdapter;
pub use mask::SensitiveDataMasker;
pub use policy::{MaskRule, SanitizerPolicyHandle, SanitizerPolicyView};
pub use sanitizer::{AmmoniaSanitizer, HtmlSanitizer, SanitizeRules};
