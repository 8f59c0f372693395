//! Label stream parsing: comment/whitespace stripping, normalization.
use std::io::BufRead;

use crate::error::ScoutResult;
use crate::hostname::normalize_label;

/// Read lines from `reader`: strip `#`-comments and blank lines, take the
/// first whitespace-delimited token, strip leading/trailing dots, and
/// normalize. An invalid label fails the whole stream.
pub fn read_label_stream<R: BufRead>(reader: R) -> ScoutResult<Vec<String>> {
    let mut labels = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let without_comment = line.split('#').next().unwrap_or("");
        let Some(token) = without_comment.split_whitespace().next() else {
            continue;
        };
        labels.push(normalize_label(token)?);
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn strips_comments_and_blank_lines() {
        let input = "www\n# comment\n\n  api  \nmail # inline comment\n";
        let labels = read_label_stream(Cursor::new(input)).unwrap();
        assert_eq!(labels, vec!["www", "api", "mail"]);
    }

    #[test]
    fn normalizes_case_and_dots() {
        let labels = read_label_stream(Cursor::new(".WWW.\n")).unwrap();
        assert_eq!(labels, vec!["www"]);
    }

    #[test]
    fn invalid_label_fails_entire_stream() {
        assert!(read_label_stream(Cursor::new("bad_label\n")).is_err());
    }

    #[test]
    fn takes_first_whitespace_token_only() {
        let labels = read_label_stream(Cursor::new("www extra-ignored-token\n")).unwrap();
        assert_eq!(labels, vec!["www"]);
    }
}
