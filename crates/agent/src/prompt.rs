//! System prompt assembly.

use chrono::NaiveDate;

use crate::knowledge::KnowledgeFragment;

const TOOL_RULES: &str = "\
- Use the tools to look things up instead of guessing.
- Tools that change data or contact clients return a preview first. Show the preview to the user and call the tool again with confirmed=true only after they clearly approve. Never set confirmed=true on your own.
- If a tool says more than one record matches, list the matches and ask the user which one they mean. Never pick one yourself.
- If a tool returns an error, explain it plainly and suggest what to try next.
- Keep answers short and use the business's own product and client names.";

/// Builder for the per-request system prompt.
#[derive(Debug, Clone)]
pub struct SystemPrompt<'a> {
    today: NaiveDate,
    business_name: Option<&'a str>,
    page_hint: Option<&'a str>,
    knowledge: Vec<&'a KnowledgeFragment>,
}

impl<'a> SystemPrompt<'a> {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            business_name: None,
            page_hint: None,
            knowledge: Vec::new(),
        }
    }

    pub fn business(mut self, name: &'a str) -> Self {
        self.business_name = Some(name);
        self
    }

    /// The dashboard page the user is looking at, if the client sent one.
    pub fn page_hint(mut self, hint: Option<&'a str>) -> Self {
        self.page_hint = hint.map(str::trim).filter(|h| !h.is_empty());
        self
    }

    pub fn knowledge(mut self, fragments: Vec<&'a KnowledgeFragment>) -> Self {
        self.knowledge = fragments;
        self
    }

    pub fn render(&self) -> String {
        let mut prompt = match self.business_name {
            Some(name) => format!(
                "You are BizPilot, the assistant built into the business dashboard of {name}."
            ),
            None => "You are BizPilot, the assistant built into a small-business dashboard.".into(),
        };
        prompt.push_str(&format!(" Today is {}.", self.today.format("%A, %B %-d, %Y")));
        if let Some(hint) = self.page_hint {
            prompt.push_str(&format!("\nThe user is currently on the {hint} page."));
        }

        prompt.push_str("\n\n## Using tools\n");
        prompt.push_str(TOOL_RULES);

        if !self.knowledge.is_empty() {
            prompt.push_str("\n\n## Reference");
            for fragment in &self.knowledge {
                prompt.push_str(&format!("\n\n### {}\n{}", fragment.label, fragment.data));
            }
        }
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    #[test]
    fn includes_business_date_and_rules() {
        let prompt = SystemPrompt::new(date()).business("Harbor & Pine").render();
        assert!(prompt.contains("Harbor & Pine"));
        assert!(prompt.contains("Friday, March 14, 2025"));
        assert!(prompt.contains("confirmed=true"));
        assert!(!prompt.contains("## Reference"));
    }

    #[test]
    fn knowledge_under_labelled_headings() {
        let fragment = KnowledgeFragment {
            id: "pricing".into(),
            label: "Pricing".into(),
            data: "Prices are in cents.".into(),
            keywords: vec![],
            priority: None,
        };
        let prompt = SystemPrompt::new(date())
            .page_hint(Some(" Inventory "))
            .knowledge(vec![&fragment])
            .render();
        assert!(prompt.contains("on the Inventory page"));
        assert!(prompt.contains("### Pricing\nPrices are in cents."));
    }

    #[test]
    fn blank_page_hint_ignored() {
        let prompt = SystemPrompt::new(date()).page_hint(Some("  ")).render();
        assert!(!prompt.contains("currently on"));
    }
}
