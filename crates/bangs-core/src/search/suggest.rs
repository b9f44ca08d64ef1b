use super::entry::{self, Entry};
use super::matcher;
use bangs_types::{Bang, Dataset, Suggestion};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};

/// How a parameter is written into a bang URL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamEncoding {
    /// Spliced verbatim
    #[default]
    Raw,
    /// Percent-encoded, every non-alphanumeric byte escaped
    Percent,
}

impl ParamEncoding {
    fn apply(self, param: &str) -> std::borrow::Cow<'_, str> {
        match self {
            Self::Raw => param.into(),
            Self::Percent => utf8_percent_encode(param, NON_ALPHANUMERIC).into(),
        }
    }
}

/// Build the suggestion for one bang.
///
/// Falls back to `url_without_param` when there is no parameter or the bang
/// has no template. The description always ends with `" " + param`, so an
/// empty parameter leaves a trailing space.
#[must_use]
pub fn build(bang: &Bang, param: &str, encoding: ParamEncoding) -> Suggestion {
    let content = if param.is_empty() || !bang.accepts_param() {
        bang.url_without_param.clone()
    } else {
        format!(
            "{}{}{}",
            bang.url_before_param,
            encoding.apply(param),
            bang.url_after_param
        )
    };

    Suggestion {
        content,
        description: format!("({}) {} {}", bang.key, bang.label, param),
    }
}

/// Parse, match and build over a dataset
#[derive(Debug, Clone, Copy, Default)]
pub struct SuggestionBuilder {
    encoding: ParamEncoding,
}

impl SuggestionBuilder {
    #[must_use]
    pub fn new(encoding: ParamEncoding) -> Self {
        Self { encoding }
    }

    /// One suggestion per matching bang, in dataset order
    #[must_use]
    pub fn suggest(&self, input: &str, dataset: &Dataset) -> Vec<Suggestion> {
        let Entry { key, param } = entry::parse(input);
        matcher::matching(key, dataset)
            .map(|bang| build(bang, param, self.encoding))
            .collect()
    }

    /// Suggestion for the first matching bang only
    #[must_use]
    pub fn first(&self, input: &str, dataset: &Dataset) -> Option<Suggestion> {
        let Entry { key, param } = entry::parse(input);
        matcher::first_match(key, dataset).map(|bang| build(bang, param, self.encoding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn google() -> Bang {
        Bang::new("g", "Google", "https://google.com")
            .with_param_template("https://google.com/search?q=", "")
    }

    fn wiki() -> Bang {
        Bang::new("w", "Wikipedia", "https://wikipedia.org")
            .with_param_template("https://en.wikipedia.org/w/index.php?search=", "&go=Go")
    }

    #[test]
    fn test_build_with_param() {
        let s = build(&google(), "cats", ParamEncoding::Raw);
        assert_eq!(s.content, "https://google.com/search?q=cats");
        assert_eq!(s.description, "(g) Google cats");
    }

    #[test]
    fn test_build_without_param_keeps_trailing_space() {
        let s = build(&google(), "", ParamEncoding::Raw);
        assert_eq!(s.content, "https://google.com");
        assert_eq!(s.description, "(g) Google ");
    }

    #[test]
    fn test_build_splices_between_halves() {
        let s = build(&wiki(), "rust lang", ParamEncoding::Raw);
        assert_eq!(
            s.content,
            "https://en.wikipedia.org/w/index.php?search=rust lang&go=Go"
        );
    }

    #[test]
    fn test_build_no_template_ignores_param() {
        let bang = Bang::new("hn", "Hacker News", "https://news.ycombinator.com");
        let s = build(&bang, "rust", ParamEncoding::Raw);
        assert_eq!(s.content, "https://news.ycombinator.com");
        assert_eq!(s.description, "(hn) Hacker News rust");
    }

    #[test]
    fn test_build_raw_does_not_escape() {
        let s = build(&google(), "a&b=c d", ParamEncoding::Raw);
        assert_eq!(s.content, "https://google.com/search?q=a&b=c d");
    }

    #[test]
    fn test_build_percent_escapes_param_only() {
        let s = build(&google(), "a&b c", ParamEncoding::Percent);
        assert_eq!(s.content, "https://google.com/search?q=a%26b%20c");
        assert_eq!(s.description, "(g) Google a&b c");
    }

    #[test]
    fn test_suggest_scenario() {
        let dataset = Dataset::new(vec![google()]);
        let builder = SuggestionBuilder::default();
        let suggestions = builder.suggest("g cats", &dataset);
        assert_eq!(
            suggestions,
            vec![Suggestion {
                content: "https://google.com/search?q=cats".to_string(),
                description: "(g) Google cats".to_string(),
            }]
        );
    }

    #[test]
    fn test_suggest_key_only_scenario() {
        let dataset = Dataset::new(vec![google()]);
        let suggestions = SuggestionBuilder::default().suggest("g", &dataset);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].content, "https://google.com");
    }

    #[test]
    fn test_suggest_preserves_match_order() {
        let dataset = Dataset::new(vec![
            wiki(),
            Bang::new("gh", "GitHub", "https://github.com"),
            google(),
        ]);
        let suggestions = SuggestionBuilder::default().suggest("g x", &dataset);
        let descriptions: Vec<_> = suggestions.iter().map(|s| s.description.as_str()).collect();
        assert_eq!(descriptions, vec!["(g) Google x", "(gh) GitHub x"]);
    }

    #[test]
    fn test_first() {
        let dataset = Dataset::new(vec![google(), wiki()]);
        let builder = SuggestionBuilder::default();
        assert_eq!(
            builder.first("w rust", &dataset).map(|s| s.content),
            Some("https://en.wikipedia.org/w/index.php?search=rust&go=Go".to_string())
        );
        assert!(builder.first("zz", &dataset).is_none());
    }

    #[test]
    fn test_param_encoding_deserialize() {
        let enc: ParamEncoding = serde_json::from_str("\"percent\"").unwrap();
        assert_eq!(enc, ParamEncoding::Percent);
        assert_eq!(ParamEncoding::default(), ParamEncoding::Raw);
    }
}
