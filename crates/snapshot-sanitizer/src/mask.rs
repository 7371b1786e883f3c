use actiontrail_core_types::{EventPayload, FieldValue, SummaryEvent};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::policy::SanitizerPolicyView;

static PASSWORD_INPUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)type\s*=\s*"?password"#).expect("password regex"));
static NAME_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"name="([^"]*)""#).expect("name attr regex"));

/// Masks values that look sensitive before a summary leaves the process.
#[derive(Debug, Clone)]
pub struct SensitiveDataMasker {
    fields: Vec<Regex>,
    values: Vec<Regex>,
    mask: String,
}

impl SensitiveDataMasker {
    pub fn from_policy(view: &SanitizerPolicyView) -> Self {
        let fields = view
            .sensitive_fields
            .iter()
            .filter_map(|pattern| compile(&format!("(?i){pattern}")))
            .collect();
        let values = view
            .value_rules
            .iter()
            .filter_map(|rule| compile(&rule.pattern))
            .collect();
        Self {
            fields,
            values,
            mask: view.mask.clone(),
        }
    }

    pub fn is_sensitive_field(&self, name: &str) -> bool {
        self.fields.iter().any(|re| re.is_match(name))
    }

    pub fn mask_text(&self, text: &str) -> String {
        let mut masked = text.to_string();
        for re in &self.values {
            masked = re.replace_all(&masked, self.mask.as_str()).into_owned();
        }
        masked
    }

    /// Apply masking to the payload and target value of `summary` in place.
    pub fn mask_summary(&self, summary: &mut SummaryEvent) {
        let target = &summary.event_target;
        let sensitive_target = self.is_sensitive_field(&target.target_id)
            || PASSWORD_INPUT.is_match(&target.target)
            || self.names_sensitive_control(&target.target);

        match &mut summary.all_events {
            EventPayload::InputValue {
                old_value,
                new_value,
            } => {
                if sensitive_target {
                    *old_value = self.mask.clone();
                    *new_value = self.mask.clone();
                } else {
                    *old_value = self.mask_text(old_value);
                    *new_value = self.mask_text(new_value);
                }
            }
            EventPayload::FormFields(fields) => {
                for (name, value) in fields.iter_mut() {
                    if let FieldValue::Text(text) = value {
                        *text = if self.is_sensitive_field(name) {
                            self.mask.clone()
                        } else {
                            self.mask_text(text)
                        };
                    }
                }
            }
            EventPayload::Events(_) => {}
        }

        if let Some(value) = summary.event_target.value.as_mut() {
            *value = if sensitive_target {
                self.mask.clone()
            } else {
                self.mask_text(value)
            };
        }
    }

    fn names_sensitive_control(&self, html: &str) -> bool {
        NAME_ATTR
            .captures(html)
            .and_then(|caps| caps.get(1))
            .map(|name| self.is_sensitive_field(name.as_str()))
            .unwrap_or(false)
    }
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(err) => {
            warn!(target: "sanitizer", pattern, %err, "skipping invalid mask pattern");
            None
        }
    }
}
