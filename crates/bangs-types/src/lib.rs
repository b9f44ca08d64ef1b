//! Shared types for bangs components.
//!
//! This crate provides the data model used across bangs-core and the CLI:
//! bang records, the sorted dataset, suggestions, and the events and updates
//! exchanged with an address-bar surface. All types are serializable.

use serde::{Deserialize, Serialize};

/// A single bang definition.
///
/// Stored as a 5-element JSON array `[key, label, urlWithoutParam,
/// urlBeforeParam, urlAfterParam]`. Reading also accepts an object with
/// camelCase field names.
///
/// Field order matters: the derived `Ord` compares `key` first, then the
/// remaining fields, which is the total order datasets are sorted by.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", into = "BangRecord")]
pub struct Bang {
    /// Short keyword typed in the address bar
    pub key: String,

    /// Human-readable description
    pub label: String,

    /// Target used when no parameter is given
    pub url_without_param: String,

    /// Text placed before the parameter
    #[serde(default)]
    pub url_before_param: String,

    /// Text placed after the parameter
    #[serde(default)]
    pub url_after_param: String,
}

/// Positional on-disk form of a [`Bang`]
#[derive(Serialize)]
struct BangRecord(String, String, String, String, String);

impl From<Bang> for BangRecord {
    fn from(bang: Bang) -> Self {
        Self(
            bang.key,
            bang.label,
            bang.url_without_param,
            bang.url_before_param,
            bang.url_after_param,
        )
    }
}

impl Bang {
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        url_without_param: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            url_without_param: url_without_param.into(),
            url_before_param: String::new(),
            url_after_param: String::new(),
        }
    }

    /// Set the two halves a parameter is spliced between.
    #[must_use]
    pub fn with_param_template(
        mut self,
        before: impl Into<String>,
        after: impl Into<String>,
    ) -> Self {
        self.url_before_param = before.into();
        self.url_after_param = after.into();
        self
    }

    /// Whether a parameter can be substituted into this bang
    #[must_use]
    pub fn accepts_param(&self) -> bool {
        !self.url_before_param.is_empty()
    }
}

/// Ordered collection of bangs.
///
/// Always sorted by the total order of [`Bang`]. Every constructor sorts, so a
/// `Dataset` read from storage or built by an edit is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "Vec<Bang>", into = "Vec<Bang>")]
pub struct Dataset(Vec<Bang>);

impl From<Vec<Bang>> for Dataset {
    fn from(bangs: Vec<Bang>) -> Self {
        Self::new(bangs)
    }
}

impl From<Dataset> for Vec<Bang> {
    fn from(dataset: Dataset) -> Self {
        dataset.0
    }
}

impl Dataset {
    #[must_use]
    pub fn new(mut bangs: Vec<Bang>) -> Self {
        bangs.sort();
        Self(bangs)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Bang] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bang> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Find the bang with exactly this key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Bang> {
        self.0.iter().find(|b| b.key == key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// New dataset with `bang` appended and re-sorted
    #[must_use]
    pub fn with_added(&self, bang: Bang) -> Self {
        let mut bangs = self.0.clone();
        bangs.push(bang);
        Self::new(bangs)
    }

    /// New dataset where the record keyed `key` is replaced by `bang`
    #[must_use]
    pub fn with_replaced(&self, key: &str, bang: &Bang) -> Self {
        let bangs = self
            .0
            .iter()
            .map(|b| if b.key == key { bang.clone() } else { b.clone() })
            .collect();
        Self::new(bangs)
    }

    /// New dataset without the record keyed `key`
    #[must_use]
    pub fn without(&self, key: &str) -> Self {
        Self(self.0.iter().filter(|b| b.key != key).cloned().collect())
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Bang;
    type IntoIter = std::slice::Iter<'a, Bang>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One entry of the address-bar suggestion list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Target URL
    pub content: String,
    /// Text shown to the user
    pub description: String,
}

/// Where a committed URL should be opened
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Disposition {
    #[default]
    CurrentTab,
    NewForegroundTab,
    NewBackgroundTab,
}

/// Request for the tab-opening surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TabAction {
    /// Navigate the active tab
    Update { url: String },
    /// Open a new tab, in the foreground when `active`
    Create { url: String, active: bool },
}

impl TabAction {
    #[must_use]
    pub fn for_disposition(url: String, disposition: Disposition) -> Self {
        match disposition {
            Disposition::CurrentTab => Self::Update { url },
            Disposition::NewForegroundTab => Self::Create { url, active: true },
            Disposition::NewBackgroundTab => Self::Create { url, active: false },
        }
    }
}

/// Events sent from the address bar to core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OmniboxEvent {
    /// User typed the extension keyword; a new interaction begins
    InputStarted,

    /// Text after the keyword changed
    InputChanged { text: String },

    /// User committed an entry
    InputEntered {
        url: String,
        #[serde(default)]
        disposition: Disposition,
    },
}

/// Updates sent from core to the address bar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OmniboxUpdate {
    /// Fallback text shown above the suggestions
    DefaultSuggestion { description: String },

    /// Ordered suggestion list (full replacement)
    Suggestions { suggestions: Vec<Suggestion> },

    /// Open a tab for a committed entry
    OpenTab(TabAction),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn google() -> Bang {
        Bang::new("g", "Google", "https://google.com")
            .with_param_template("https://google.com/search?q=", "")
    }

    #[test]
    fn test_bang_serializes_as_array() {
        let json = serde_json::to_value(google()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                "g",
                "Google",
                "https://google.com",
                "https://google.com/search?q=",
                ""
            ])
        );
    }

    #[test]
    fn test_bang_deserializes_from_array() {
        let bang: Bang = serde_json::from_str(
            r#"["w", "Wikipedia", "https://wikipedia.org", "https://wikipedia.org/wiki/", ""]"#,
        )
        .unwrap();
        assert_eq!(bang.key, "w");
        assert_eq!(bang.url_before_param, "https://wikipedia.org/wiki/");
    }

    #[test]
    fn test_bang_deserializes_from_object() {
        let bang: Bang = serde_json::from_str(
            r#"{"key": "yt", "label": "YouTube", "urlWithoutParam": "https://youtube.com"}"#,
        )
        .unwrap();
        assert_eq!(bang.key, "yt");
        assert_eq!(bang.url_without_param, "https://youtube.com");
        assert!(bang.url_before_param.is_empty());
        assert!(!bang.accepts_param());
    }

    #[test]
    fn test_bang_rejects_short_array() {
        let result = serde_json::from_str::<Bang>(r#"["g", "Google"]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_dataset_sorted_on_construction() {
        let dataset = Dataset::new(vec![
            Bang::new("w", "Wikipedia", "https://wikipedia.org"),
            google(),
            Bang::new("gh", "GitHub", "https://github.com"),
        ]);
        let keys: Vec<_> = dataset.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["g", "gh", "w"]);
    }

    #[test]
    fn test_dataset_sorted_on_deserialize() {
        let dataset: Dataset = serde_json::from_str(
            r#"[["z", "Zed", "https://z.example", "", ""], ["a", "Ay", "https://a.example", "", ""]]"#,
        )
        .unwrap();
        assert_eq!(dataset.as_slice()[0].key, "a");
        assert_eq!(dataset.as_slice()[1].key, "z");
    }

    #[test]
    fn test_dataset_with_added_then_without() {
        let dataset = Dataset::new(vec![google()]);
        let added = dataset.with_added(Bang::new("a", "Amazon", "https://amazon.com"));
        assert_eq!(added.len(), 2);
        assert_eq!(added.as_slice()[0].key, "a");

        let removed = added.without("a");
        assert_eq!(removed, dataset);
    }

    #[test]
    fn test_dataset_with_replaced_resorts() {
        let dataset = Dataset::new(vec![
            google(),
            Bang::new("w", "Wikipedia", "https://wikipedia.org"),
        ]);
        let replaced = dataset.with_replaced("w", &Bang::new("a", "Archive", "https://archive.org"));
        let keys: Vec<_> = replaced.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "g"]);
    }

    #[test]
    fn test_dataset_get() {
        let dataset = Dataset::new(vec![google()]);
        assert_eq!(dataset.get("g").map(|b| b.label.as_str()), Some("Google"));
        assert!(dataset.get("G").is_none());
        assert!(!dataset.contains_key("gh"));
    }

    #[test]
    fn test_tab_action_for_disposition() {
        let url = "https://example.com".to_string();
        assert_eq!(
            TabAction::for_disposition(url.clone(), Disposition::CurrentTab),
            TabAction::Update { url: url.clone() }
        );
        assert_eq!(
            TabAction::for_disposition(url.clone(), Disposition::NewForegroundTab),
            TabAction::Create {
                url: url.clone(),
                active: true
            }
        );
        assert_eq!(
            TabAction::for_disposition(url.clone(), Disposition::NewBackgroundTab),
            TabAction::Create { url, active: false }
        );
    }

    #[test]
    fn test_disposition_wire_names() {
        let json = serde_json::to_string(&Disposition::NewBackgroundTab).unwrap();
        assert_eq!(json, "\"newBackgroundTab\"");
        let parsed: Disposition = serde_json::from_str("\"currentTab\"").unwrap();
        assert_eq!(parsed, Disposition::CurrentTab);
    }

    #[test]
    fn test_omnibox_event_tagged() {
        let event: OmniboxEvent = serde_json::from_str(
            r#"{"type": "input_entered", "url": "g cats", "disposition": "newForegroundTab"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            OmniboxEvent::InputEntered {
                url: "g cats".to_string(),
                disposition: Disposition::NewForegroundTab,
            }
        );
    }
}
