//! `{{placeholder}}` rendering for client messages.
//!
//! Unknown or unresolved placeholders are left in the output verbatim so a
//! missing value is visible in the preview instead of silently empty.

use std::collections::HashMap;

use bizpilot_core::store::{BusinessProfile, Client};

/// Values available to a message template.
#[derive(Debug, Default, Clone)]
pub struct TemplateVars {
    values: HashMap<&'static str, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Variables for one client of one business. A missing profile or phone
    /// leaves the business placeholders unresolved.
    pub fn for_client(client: &Client, business: Option<&BusinessProfile>) -> Self {
        let mut vars = Self::new()
            .set("client_name", &client.name)
            .set("first_name", client.first_name());
        if let Some(business) = business {
            vars = vars.set("business_name", &business.name);
            if let Some(phone) = &business.phone {
                vars = vars.set("business_phone", phone);
            }
        }
        vars
    }

    pub fn set(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(key, value.into());
        self
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Substitute every `{{ name }}` whose name has a value.
pub fn render(template: &str, vars: &TemplateVars) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = after_open[..end].trim();
        match vars.get(key) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after_open[end + 2..];
    }

    out.push_str(rest);
    out
}
