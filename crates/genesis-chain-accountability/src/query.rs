//! Filters over recorded statements.

use genesis_chain_core::StatementRecord;

/// Conjunctive filter. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementQuery {
    pub speaker_id: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    /// Inclusive lower bound on the statement timestamp.
    pub from: Option<i64>,
    /// Inclusive upper bound on the statement timestamp.
    pub to: Option<i64>,
    /// Case-insensitive substring of the statement text.
    pub text: Option<String>,
}

impl StatementQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn speaker(mut self, speaker_id: impl Into<String>) -> Self {
        self.speaker_id = Some(speaker_id.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn between(mut self, from: i64, to: i64) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn matches(&self, record: &StatementRecord) -> bool {
        if let Some(speaker) = &self.speaker_id {
            if &record.speaker_id != speaker {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &record.metadata.context_category != category {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !record.metadata.has_tag(tag) {
                return false;
            }
        }
        if self.from.is_some_and(|from| record.timestamp < from) {
            return false;
        }
        if self.to.is_some_and(|to| record.timestamp > to) {
            return false;
        }
        if let Some(text) = &self.text {
            if !record
                .statement
                .to_lowercase()
                .contains(&text.to_lowercase())
            {
                return false;
            }
        }
        true
    }
}
