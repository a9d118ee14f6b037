//! Server-held story draft.
//!
//! The draft is the single source of truth for page text while a session
//! is live. Clients address pages by index; every page also carries a
//! stable string id so structural edits can be echoed unambiguously.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title applied when the first text lands on an untitled draft.
pub const DEFAULT_DRAFT_TITLE: &str = "Collaborative Story";

/// One page of the draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftPage {
    /// Stable page id.
    #[serde(default = "new_page_id")]
    pub id: String,
    /// Page text.
    #[serde(default)]
    pub text: String,
}

impl DraftPage {
    /// Creates an empty page with a fresh id.
    pub fn blank() -> Self {
        Self {
            id: new_page_id(),
            text: String::new(),
        }
    }
}

/// Ordered pages plus a title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryDraft {
    /// Story title.
    #[serde(default)]
    pub title: String,
    /// Ordered pages. Never null, defaults to empty.
    #[serde(default)]
    pub pages: Vec<DraftPage>,
}

impl StoryDraft {
    /// Builds a draft seeded from an existing story.
    pub fn seeded(title: impl Into<String>, texts: impl IntoIterator<Item = String>) -> Self {
        Self {
            title: title.into(),
            pages: texts
                .into_iter()
                .map(|text| DraftPage {
                    id: new_page_id(),
                    text,
                })
                .collect(),
        }
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Writes `text` at `index`, growing the page list as needed.
    ///
    /// Pages are never removed here; only [`StoryDraft::remove_page`]
    /// shrinks the draft.
    pub fn set_page_text(&mut self, index: usize, text: impl Into<String>) {
        while self.pages.len() <= index {
            self.pages.push(DraftPage::blank());
        }
        self.pages[index].text = text.into();
        if self.title.is_empty() {
            self.title = DEFAULT_DRAFT_TITLE.to_string();
        }
    }

    /// Inserts a blank page and returns its resulting index and id.
    ///
    /// An in-range `requested` index inserts there; anything else appends.
    pub fn insert_page(&mut self, requested: Option<usize>) -> (usize, String) {
        let page = DraftPage::blank();
        let id = page.id.clone();
        match requested {
            Some(index) if index <= self.pages.len() => {
                self.pages.insert(index, page);
                (index, id)
            }
            _ => {
                self.pages.push(page);
                (self.pages.len() - 1, id)
            }
        }
    }

    /// Removes the page at `index`, shifting later pages down.
    pub fn remove_page(&mut self, index: usize) -> Option<DraftPage> {
        (index < self.pages.len()).then(|| self.pages.remove(index))
    }

    /// Looks a page up by its stable id.
    pub fn index_of(&self, page_id: &str) -> Option<usize> {
        self.pages.iter().position(|p| p.id == page_id)
    }

    /// Replaces the title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }
}

fn new_page_id() -> String {
    Uuid::new_v4().to_string()
}
