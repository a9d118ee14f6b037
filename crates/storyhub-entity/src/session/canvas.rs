//! Opaque canvas payloads kept per page and for the cover.
//!
//! Two layers are stored: lightweight snapshots (rendered images) and the
//! richer canvas state (serialized scene). The state layer is authoritative
//! whenever both hold a value for the same target.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a canvas payload belongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanvasTarget {
    /// The story cover.
    Cover,
    /// A page, keyed by page id.
    Page(String),
}

impl CanvasTarget {
    /// Resolves a target from the loosely-typed fields clients send.
    ///
    /// String ids are used as-is and numeric ids are stringified. Without a
    /// page id the page index is used as the key.
    pub fn resolve(is_cover: bool, page_id: Option<&Value>, page_index: Option<i64>) -> Option<Self> {
        if is_cover {
            return Some(Self::Cover);
        }
        match page_id {
            Some(Value::String(id)) if !id.is_empty() => Some(Self::Page(id.clone())),
            Some(Value::Number(n)) => Some(Self::Page(n.to_string())),
            _ => page_index.map(|i| Self::Page(i.to_string())),
        }
    }
}

/// Cover plus per-page payloads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasData {
    /// Cover payload.
    #[serde(rename = "cover_image", default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<Value>,
    /// Page id (or page index, when the client sent no id) → payload.
    #[serde(default)]
    pub pages: BTreeMap<String, Value>,
}

impl CanvasData {
    /// Returns the payload for a target.
    pub fn get(&self, target: &CanvasTarget) -> Option<&Value> {
        match target {
            CanvasTarget::Cover => self.cover.as_ref(),
            CanvasTarget::Page(id) => self.pages.get(id),
        }
    }

    /// Overwrites the payload for a target.
    pub fn set(&mut self, target: CanvasTarget, value: Value) {
        match target {
            CanvasTarget::Cover => self.cover = Some(value),
            CanvasTarget::Page(id) => {
                self.pages.insert(id, value);
            }
        }
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.cover.is_none() && self.pages.is_empty()
    }

    /// Moves payloads stored under positional keys. `remap` returns the new
    /// index, or `None` to drop the payload. Id keys are left alone.
    fn reindex(&mut self, remap: impl Fn(usize) -> Option<usize>) {
        let positional: Vec<(String, usize)> = self
            .pages
            .keys()
            .filter_map(|key| key.parse::<usize>().ok().map(|index| (key.clone(), index)))
            .collect();

        let mut moved = Vec::with_capacity(positional.len());
        for (key, index) in positional {
            if let Some(value) = self.pages.remove(&key) {
                if let Some(to) = remap(index) {
                    moved.push((to.to_string(), value));
                }
            }
        }
        self.pages.extend(moved);
    }
}

/// Snapshot and state layers of a session canvas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasLayers {
    /// Rendered snapshots.
    #[serde(default)]
    pub snapshot: CanvasData,
    /// Serialized canvas state.
    #[serde(default)]
    pub state: CanvasData,
}

impl CanvasLayers {
    /// Stores a rendered snapshot.
    pub fn write_snapshot(&mut self, target: CanvasTarget, value: Value) {
        self.snapshot.set(target, value);
    }

    /// Stores a canvas state.
    pub fn write_state(&mut self, target: CanvasTarget, value: Value) {
        self.state.set(target, value);
    }

    /// The stored canvas for a target, state first.
    pub fn authoritative(&self, target: &CanvasTarget) -> Option<&Value> {
        self.state.get(target).or_else(|| self.snapshot.get(target))
    }

    /// Both layers collapsed into one view, state winning per key.
    pub fn merged(&self) -> CanvasData {
        let mut merged = self.snapshot.clone();
        if let Some(cover) = &self.state.cover {
            merged.cover = Some(cover.clone());
        }
        for (id, value) in &self.state.pages {
            merged.pages.insert(id.clone(), value.clone());
        }
        merged
    }

    /// Drops every payload stored for the page deleted at `index` and
    /// shifts positional keys of later pages down by one.
    pub fn forget_page(&mut self, index: usize, page_id: &str) {
        for layer in [&mut self.snapshot, &mut self.state] {
            layer.pages.remove(page_id);
            layer.reindex(|i| match i.cmp(&index) {
                Ordering::Less => Some(i),
                Ordering::Equal => None,
                Ordering::Greater => Some(i - 1),
            });
        }
    }

    /// Shifts positional keys at or after `index` up by one for a page
    /// inserted there.
    pub fn make_room(&mut self, index: usize) {
        for layer in [&mut self.snapshot, &mut self.state] {
            layer.reindex(|i| Some(if i >= index { i + 1 } else { i }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_supersedes_snapshot() {
        let mut layers = CanvasLayers::default();
        let page = CanvasTarget::Page("p1".into());
        layers.write_snapshot(page.clone(), json!("data:image/png;base64,AAA"));
        assert_eq!(layers.authoritative(&page), Some(&json!("data:image/png;base64,AAA")));

        layers.write_state(page.clone(), json!({"objects": []}));
        assert_eq!(layers.authoritative(&page), Some(&json!({"objects": []})));

        layers.write_snapshot(page.clone(), json!("data:image/png;base64,BBB"));
        assert_eq!(layers.authoritative(&page), Some(&json!({"objects": []})));
    }

    #[test]
    fn test_merged_view_prefers_state() {
        let mut layers = CanvasLayers::default();
        layers.write_snapshot(CanvasTarget::Page("a".into()), json!(1));
        layers.write_snapshot(CanvasTarget::Page("b".into()), json!(2));
        layers.write_state(CanvasTarget::Page("b".into()), json!(3));
        layers.write_snapshot(CanvasTarget::Cover, json!("cover"));

        let merged = layers.merged();
        assert_eq!(merged.pages["a"], json!(1));
        assert_eq!(merged.pages["b"], json!(3));
        assert_eq!(merged.cover, Some(json!("cover")));
    }

    #[test]
    fn test_forget_page_shifts_positional_keys() {
        let mut layers = CanvasLayers::default();
        for i in 0..3 {
            layers.write_state(CanvasTarget::Page(i.to_string()), json!({"page": i}));
        }
        layers.write_snapshot(CanvasTarget::Page("2".into()), json!("img2"));
        layers.write_state(CanvasTarget::Page("abc".into()), json!("by id"));

        layers.forget_page(1, "deleted-id");

        let page = |i: usize| CanvasTarget::Page(i.to_string());
        assert_eq!(layers.authoritative(&page(0)), Some(&json!({"page": 0})));
        assert_eq!(layers.authoritative(&page(1)), Some(&json!({"page": 2})));
        assert_eq!(layers.authoritative(&page(2)), None);
        assert_eq!(layers.snapshot.pages.get("1"), Some(&json!("img2")));
        assert_eq!(layers.state.pages.get("abc"), Some(&json!("by id")));
    }

    #[test]
    fn test_forget_page_drops_id_key() {
        let mut layers = CanvasLayers::default();
        layers.write_snapshot(CanvasTarget::Page("p-9".into()), json!(1));
        layers.write_state(CanvasTarget::Page("p-9".into()), json!(2));
        layers.forget_page(0, "p-9");
        assert!(layers.snapshot.is_empty());
        assert!(layers.state.is_empty());
    }

    #[test]
    fn test_make_room_shifts_later_keys_up() {
        let mut layers = CanvasLayers::default();
        layers.write_state(CanvasTarget::Page("0".into()), json!("a"));
        layers.write_state(CanvasTarget::Page("1".into()), json!("b"));
        layers.make_room(1);
        assert_eq!(layers.state.pages.get("0"), Some(&json!("a")));
        assert_eq!(layers.state.pages.get("1"), None);
        assert_eq!(layers.state.pages.get("2"), Some(&json!("b")));
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(CanvasTarget::resolve(true, None, None), Some(CanvasTarget::Cover));
        assert_eq!(
            CanvasTarget::resolve(false, Some(&json!("abc")), Some(2)),
            Some(CanvasTarget::Page("abc".into()))
        );
        assert_eq!(
            CanvasTarget::resolve(false, Some(&json!(7)), None),
            Some(CanvasTarget::Page("7".into()))
        );
        assert_eq!(
            CanvasTarget::resolve(false, None, Some(4)),
            Some(CanvasTarget::Page("4".into()))
        );
        assert_eq!(CanvasTarget::resolve(false, Some(&Value::Null), None), None);
    }

    #[test]
    fn test_cover_serializes_as_cover_image() {
        let mut data = CanvasData::default();
        data.set(CanvasTarget::Cover, json!("img"));
        let value = serde_json::to_value(&data).expect("serialize");
        assert_eq!(value["cover_image"], json!("img"));
    }
}
