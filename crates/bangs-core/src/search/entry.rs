/// Raw address-bar input split into a bang keyword and its parameter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Entry<'a> {
    pub key: &'a str,
    pub param: &'a str,
}

/// Split input on the first space.
///
/// Everything before the first space is the key; everything after it is the
/// parameter, kept verbatim (further spaces included). Without a space the
/// whole input is the key and the parameter is empty.
#[must_use]
pub fn parse(input: &str) -> Entry<'_> {
    match input.split_once(' ') {
        Some((key, param)) => Entry { key, param },
        None => Entry {
            key: input,
            param: "",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_only() {
        assert_eq!(
            parse("gh"),
            Entry {
                key: "gh",
                param: ""
            }
        );
    }

    #[test]
    fn test_parse_splits_on_first_space_only() {
        assert_eq!(
            parse("a bc d"),
            Entry {
                key: "a",
                param: "bc d"
            }
        );
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse(""), Entry::default());
    }

    #[test]
    fn test_parse_trailing_space_gives_empty_param() {
        assert_eq!(
            parse("g "),
            Entry {
                key: "g",
                param: ""
            }
        );
    }

    #[test]
    fn test_parse_leading_space_gives_empty_key() {
        assert_eq!(
            parse(" cats"),
            Entry {
                key: "",
                param: "cats"
            }
        );
    }

    #[test]
    fn test_parse_tab_is_not_a_separator() {
        assert_eq!(parse("g\tcats").key, "g\tcats");
    }
}
