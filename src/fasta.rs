use std::io::{self, Write};
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{AccessionId, SequenceRecord};
use crate::error::ParseError;

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^>(\S+)\s*(.*)$").expect("valid FASTA header regex"));

/// Parses a single FASTA record.
///
/// The identifier is the first token after `>`, the description is the rest of
/// the header line, and every following line is appended to the sequence with
/// only its line terminator removed. The body ends at the next `>` line, so a
/// reply carrying several records yields the first one. The residue alphabet is
/// not checked.
pub fn parse_record(raw: &str) -> Result<SequenceRecord, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut lines = trimmed.lines();
    let header = lines.next().unwrap_or_default().trim_end();
    let captures = HEADER_RE
        .captures(header)
        .ok_or_else(|| ParseError::MalformedHeader(header.to_string()))?;
    let accession_id: AccessionId = captures[1]
        .parse()
        .map_err(|_| ParseError::MalformedHeader(header.to_string()))?;
    let description = captures[2].trim_end().to_string();

    let sequence = lines
        .take_while(|line| !line.starts_with('>'))
        .collect::<String>();
    if sequence.is_empty() {
        return Err(ParseError::MissingSequence(accession_id.to_string()));
    }

    Ok(SequenceRecord {
        accession_id,
        description,
        sequence,
    })
}

pub fn format_record(record: &SequenceRecord) -> String {
    if record.description.is_empty() {
        format!(">{}\n{}\n", record.accession_id, record.sequence)
    } else {
        format!(
            ">{} {}\n{}\n",
            record.accession_id, record.description, record.sequence
        )
    }
}

pub fn write_fasta<'a, W, I>(writer: &mut W, records: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a SequenceRecord>,
{
    for record in records {
        writer.write_all(format_record(record).as_bytes())?;
    }
    Ok(())
}
