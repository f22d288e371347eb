use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::AccessionId;
use crate::error::SeqvaultError;

static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s,]+").expect("valid separator regex"));

/// Splits free-form text on runs of whitespace and commas.
pub fn parse_accession_list(text: &str) -> Result<Vec<AccessionId>, SeqvaultError> {
    SEPARATOR_RE
        .split(text.trim())
        .filter(|token| !token.is_empty())
        .map(str::parse)
        .collect()
}

/// Reads one accession per non-blank line.
pub fn parse_accession_lines(text: &str) -> Result<Vec<AccessionId>, SeqvaultError> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::parse)
        .collect()
}

pub fn read_accession_file(path: &Path) -> Result<Vec<AccessionId>, SeqvaultError> {
    let content =
        fs::read_to_string(path).map_err(|_| SeqvaultError::InputRead(path.to_path_buf()))?;
    parse_accession_lines(&content)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn split_mixed_separators() {
        let ids = parse_accession_list(" P12345, P67890\nNP_000509.1 ,,\tQ9Y6K9 ").unwrap();
        let values = ids.iter().map(AccessionId::as_str).collect::<Vec<_>>();
        assert_eq!(values, vec!["P12345", "P67890", "NP_000509.1", "Q9Y6K9"]);
    }

    #[test]
    fn blank_text_yields_nothing() {
        assert!(parse_accession_list("  \n ,").unwrap().is_empty());
    }

    #[test]
    fn lines_reject_embedded_spaces() {
        assert_matches!(
            parse_accession_lines("P12345\nP6 7890\n"),
            Err(SeqvaultError::InvalidAccession(_))
        );
    }
}
