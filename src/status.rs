//! Decoder for the compact status format carried over a room connection.
//!
//! A status string is `"<options>$<text>"`. The options segment is a list of
//! comma-separated tokens; the first character of each token is the option
//! key and the remainder is its value. Only the `n` key (participant count)
//! is currently defined. Everything after the first `$` is free text and is
//! never interpreted, including further `$` characters.

/// Structured metadata decoded from a single status string.
///
/// Produced fresh by every [`Status::decode`] call; decoding is total, so
/// arbitrarily malformed input degrades to absent fields rather than an
/// error.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Status {
    /// Number of clients in the room, if the string carried a usable count.
    pub clients: Option<u32>,
    /// Free-text payload after the delimiter. `Some("")` when the delimiter
    /// is present but nothing follows it, which is distinct from `None`.
    pub text: Option<String>,
}

impl Status {
    /// Decode a raw status string.
    ///
    /// Duplicate option keys are resolved last-wins. An encoded count of `0`
    /// decodes to `None`: the wire format uses zero and absence
    /// interchangeably for "no count", and this decoder keeps that contract.
    #[must_use]
    pub fn decode(raw: &str) -> Self {
        let (options, text) = match raw.split_once('$') {
            Some((options, text)) => (options, Some(text.to_owned())),
            None => (raw, None),
        };

        let mut clients = None;
        for token in options.split(',').filter(|token| !token.is_empty()) {
            let mut chars = token.chars();
            let key = chars.next();
            let value = chars.as_str();
            if key == Some('n') {
                clients = value.parse::<u32>().ok().filter(|count| *count != 0);
            }
        }

        Self { clients, text }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_and_text() {
        let status = Status::decode("n12$x");
        assert_eq!(status.clients, Some(12));
        assert_eq!(status.text.as_deref(), Some("x"));
    }

    #[test]
    fn empty_input_is_all_absent() {
        assert_eq!(Status::decode(""), Status::default());
    }

    #[test]
    fn no_delimiter_means_no_text() {
        let status = Status::decode("n5");
        assert_eq!(status.clients, Some(5));
        assert_eq!(status.text, None);
    }

    #[test]
    fn only_first_delimiter_splits() {
        let status = Status::decode("n3$pay$load$");
        assert_eq!(status.clients, Some(3));
        assert_eq!(status.text.as_deref(), Some("pay$load$"));
    }

    #[test]
    fn trailing_delimiter_yields_empty_text() {
        let status = Status::decode("z9,n3$");
        assert_eq!(status.clients, Some(3));
        assert_eq!(status.text.as_deref(), Some(""));
    }

    #[test]
    fn leading_delimiter_yields_empty_options() {
        let status = Status::decode("$hello");
        assert_eq!(status.clients, None);
        assert_eq!(status.text.as_deref(), Some("hello"));
    }

    #[test]
    fn zero_count_decodes_as_absent() {
        // Zero and "unspecified" are the same thing on the wire.
        let status = Status::decode("n0");
        assert_eq!(status.clients, None);
        assert_eq!(status.text, None);
    }

    #[test]
    fn non_numeric_count_is_absent() {
        assert_eq!(Status::decode("nabc").clients, None);
        assert_eq!(Status::decode("n-3").clients, None);
        assert_eq!(Status::decode("n").clients, None);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let status = Status::decode("q7,n4,zfoo$hi");
        assert_eq!(status.clients, Some(4));
        assert_eq!(status.text.as_deref(), Some("hi"));
    }

    #[test]
    fn duplicate_keys_last_wins() {
        assert_eq!(Status::decode("n1,n2").clients, Some(2));
        // A later unparseable value still overwrites an earlier good one.
        assert_eq!(Status::decode("n5,nx").clients, None);
    }

    #[test]
    fn empty_tokens_are_skipped() {
        let status = Status::decode(",,n4,");
        assert_eq!(status.clients, Some(4));
    }

    #[test]
    fn multibyte_option_keys_do_not_panic() {
        let status = Status::decode("é12,n2$ok");
        assert_eq!(status.clients, Some(2));
        assert_eq!(status.text.as_deref(), Some("ok"));
    }

    #[test]
    fn text_round_trips_verbatim() {
        let raw = "n8$  spaces, commas, and $ survive  ";
        assert_eq!(
            Status::decode(raw).text.as_deref(),
            Some("  spaces, commas, and $ survive  ")
        );
    }
}
