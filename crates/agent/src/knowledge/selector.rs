//! Keyword scoring over the catalog.

use std::sync::Arc;

use bizpilot_config::KnowledgeConfig;
use bizpilot_core::message::Transcript;
use serde::Serialize;
use tracing::debug;

use super::catalog::{KnowledgeCatalog, KnowledgeFragment};

/// Upper bound on fragments injected per turn.
pub const MAX_SELECTED: usize = 5;

/// Prior user messages considered besides the latest one.
const HISTORY_MESSAGES: usize = 2;

/// Points for one matched keyword. Longer keywords are more specific and
/// weigh more.
pub fn keyword_weight(keyword: &str) -> i64 {
    match keyword.chars().count() {
        n if n > 6 => 3,
        n if n > 3 => 2,
        _ => 1,
    }
}

/// Keyword score of `fragment` against lowercased `haystack`, with its
/// priority added if anything matched.
fn score(fragment: &KnowledgeFragment, haystack: &str) -> i64 {
    let matched: i64 = fragment
        .keywords
        .iter()
        .filter(|k| haystack.contains(k.as_str()))
        .map(|k| keyword_weight(k))
        .sum();
    if matched > 0 {
        matched + fragment.priority.unwrap_or(0)
    } else {
        0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredFragment<'a> {
    pub fragment: &'a KnowledgeFragment,
    pub score: i64,
}

/// The outcome of one selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection<'a> {
    /// Best first. Defaults carry a score of 0.
    pub entries: Vec<ScoredFragment<'a>>,
    /// Nothing matched and the catalog's default set was used.
    pub used_defaults: bool,
}

impl<'a> Selection<'a> {
    pub fn fragments(&self) -> Vec<&'a KnowledgeFragment> {
        self.entries.iter().map(|e| e.fragment).collect()
    }
}

/// Picks the fragments most relevant to the recent conversation.
///
/// Selection is deterministic: equal input gives equal, equally ordered
/// output, and ties keep catalog order.
#[derive(Debug, Clone)]
pub struct KnowledgeSelector {
    catalog: Arc<KnowledgeCatalog>,
    max_results: usize,
}

impl KnowledgeSelector {
    pub fn new(catalog: Arc<KnowledgeCatalog>) -> Self {
        Self {
            catalog,
            max_results: MAX_SELECTED,
        }
    }

    pub fn from_config(catalog: Arc<KnowledgeCatalog>, config: &KnowledgeConfig) -> Self {
        Self::new(catalog).with_max_results(config.max_results)
    }

    /// Limit the selection size, clamped to `1..=MAX_SELECTED`.
    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max.clamp(1, MAX_SELECTED);
        self
    }

    pub fn catalog(&self) -> &KnowledgeCatalog {
        &self.catalog
    }

    /// Fragments for `latest` plus the last two of `recent` (oldest first).
    pub fn select(&self, latest: &str, recent: &[String]) -> Vec<&KnowledgeFragment> {
        self.select_scored(latest, recent).fragments()
    }

    /// Like [`select`](Self::select), with scores.
    pub fn select_scored(&self, latest: &str, recent: &[String]) -> Selection<'_> {
        let history = &recent[recent.len().saturating_sub(HISTORY_MESSAGES)..];
        let mut haystack = latest.to_lowercase();
        for text in history {
            haystack.push('\n');
            haystack.push_str(&text.to_lowercase());
        }

        let mut entries: Vec<ScoredFragment<'_>> = self
            .catalog
            .fragments()
            .iter()
            .map(|fragment| ScoredFragment {
                fragment,
                score: score(fragment, &haystack),
            })
            .filter(|e| e.score > 0)
            .collect();
        // stable: equal scores keep catalog order
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(self.max_results);

        if entries.is_empty() {
            debug!("No knowledge fragment matched, using defaults");
            return Selection {
                entries: self
                    .catalog
                    .defaults()
                    .into_iter()
                    .take(self.max_results)
                    .map(|fragment| ScoredFragment { fragment, score: 0 })
                    .collect(),
                used_defaults: true,
            };
        }

        debug!(
            selected = ?entries.iter().map(|e| e.fragment.id.as_str()).collect::<Vec<_>>(),
            "Selected knowledge fragments"
        );
        Selection {
            entries,
            used_defaults: false,
        }
    }

    /// Selection for the latest user message of a conversation and the two
    /// user messages before it.
    pub fn select_for(&self, transcript: &Transcript) -> Selection<'_> {
        let latest = transcript.latest_user_text().unwrap_or_default();
        let recent = transcript.prior_user_texts(HISTORY_MESSAGES);
        self.select_scored(&latest, &recent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizpilot_core::message::Message;

    fn fragment(id: &str, keywords: &[&str], priority: Option<i64>) -> KnowledgeFragment {
        KnowledgeFragment {
            id: id.into(),
            label: id.into(),
            data: format!("{id} data"),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            priority,
        }
    }

    fn selector(fragments: Vec<KnowledgeFragment>, defaults: &[&str]) -> KnowledgeSelector {
        let defaults: Vec<String> = defaults.iter().map(|s| s.to_string()).collect();
        KnowledgeSelector::new(Arc::new(
            KnowledgeCatalog::new("test", fragments, &defaults).unwrap(),
        ))
    }

    fn ids<'a>(fragments: &[&'a KnowledgeFragment]) -> Vec<&'a str> {
        fragments.iter().map(|f| f.id.as_str()).collect()
    }

    #[test]
    fn keyword_weights_by_length() {
        assert_eq!(keyword_weight("vip"), 1);
        assert_eq!(keyword_weight("sale"), 2);
        assert_eq!(keyword_weight("pricing"), 3);
        assert_eq!(keyword_weight("refund"), 2);
    }

    #[test]
    fn scores_and_orders() {
        let s = selector(
            vec![
                fragment("short", &["tag"], None),
                fragment("long", &["inventory"], None),
                fragment("mid", &["stock", "sku"], None),
                fragment("none", &["billing"], None),
            ],
            &["none"],
        );
        let selection = s.select_scored("Inventory: stock by SKU and tag", &[]);
        let scores: Vec<(&str, i64)> = selection
            .entries
            .iter()
            .map(|e| (e.fragment.id.as_str(), e.score))
            .collect();
        assert_eq!(scores, vec![("long", 3), ("mid", 3), ("short", 1)]);
        assert!(!selection.used_defaults);
    }

    #[test]
    fn priority_only_counts_when_something_matched() {
        let s = selector(
            vec![
                fragment("plain", &["message"], None),
                fragment("boosted", &["send"], Some(4)),
                fragment("idle", &["refund"], Some(10)),
            ],
            &["plain"],
        );
        let selection = s.select_scored("send a message", &[]);
        let scores: Vec<(&str, i64)> = selection
            .entries
            .iter()
            .map(|e| (e.fragment.id.as_str(), e.score))
            .collect();
        assert_eq!(scores, vec![("boosted", 6), ("plain", 3)]);
    }

    #[test]
    fn at_most_five_results() {
        let fragments: Vec<_> = (0..8)
            .map(|i| fragment(&format!("f{i}"), &["stock"], None))
            .collect();
        let s = selector(fragments, &["f0"]);
        let selected = s.select("stock", &[]);
        assert_eq!(ids(&selected), vec!["f0", "f1", "f2", "f3", "f4"]);

        let narrow = s.clone().with_max_results(2);
        assert_eq!(narrow.select("stock", &[]).len(), 2);
        let wide = s.with_max_results(50);
        assert_eq!(wide.select("stock", &[]).len(), MAX_SELECTED);
    }

    #[test]
    fn only_the_last_two_prior_messages_count() {
        let s = selector(
            vec![
                fragment("old", &["billing"], None),
                fragment("recent", &["calendar"], None),
                fragment("fallback", &["zzz"], None),
            ],
            &["fallback"],
        );
        let history = vec![
            "billing question".to_string(),
            "calendar question".to_string(),
            "thanks".to_string(),
        ];
        assert_eq!(ids(&s.select("ok", &history)), vec!["recent"]);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let s = selector(vec![fragment("a", &["low stock"], None)], &["a"]);
        let selection = s.select_scored("What's LOW STOCK right now?", &[]);
        assert!(!selection.used_defaults);
        assert_eq!(selection.entries[0].score, 3);
    }

    #[test]
    fn no_match_returns_defaults() {
        let s = KnowledgeSelector::new(Arc::new(KnowledgeCatalog::builtin()));
        let selection = s.select_scored("what is the weather like on mars", &[]);
        assert!(selection.used_defaults);
        assert_eq!(
            ids(&selection.fragments()),
            vec!["getting_started", "assistant_capabilities"]
        );
    }

    #[test]
    fn selection_is_deterministic() {
        let s = KnowledgeSelector::new(Arc::new(KnowledgeCatalog::builtin()));
        let history = vec!["can you text my vip clients".to_string()];
        let first = s.select("send a price update to everyone", &history);
        let second = s.select("send a price update to everyone", &history);
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn price_question_surfaces_pricing() {
        let s = KnowledgeSelector::new(Arc::new(KnowledgeCatalog::builtin()));
        let selected = s.select("set the price of Aspen chain to $12", &[]);
        assert_eq!(selected[0].id, "pricing");
    }

    #[test]
    fn select_for_uses_user_text_only() {
        let s = selector(
            vec![
                fragment("cal", &["calendar"], None),
                fragment("bill", &["billing"], None),
                fragment("fallback", &["zzz"], None),
            ],
            &["fallback"],
        );
        let transcript = Transcript::default()
            .with(Message::user("open my calendar"))
            .with(Message::assistant("billing is under settings"))
            .with(Message::user("thanks"));
        let selection = s.select_for(&transcript);
        assert_eq!(ids(&selection.fragments()), vec!["cal"]);
    }
}
