use std::io::Write;

use crate::domain::{OutputFormat, SequenceRecord};
use crate::error::SeqvaultError;
use crate::fasta::write_fasta;
use crate::reconcile::Resolution;

pub fn write_csv<'a, W, I>(writer: W, records: I) -> Result<(), SeqvaultError>
where
    W: Write,
    I: IntoIterator<Item = &'a SequenceRecord>,
{
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["accession_id", "description", "sequence"])
        .map_err(|err| SeqvaultError::Export(err.to_string()))?;
    for record in records {
        csv.write_record([
            record.accession_id.as_str(),
            record.description.as_str(),
            record.sequence.as_str(),
        ])
        .map_err(|err| SeqvaultError::Export(err.to_string()))?;
    }
    csv.flush()
        .map_err(|err| SeqvaultError::Export(err.to_string()))?;
    Ok(())
}

pub fn write_resolution<W: Write>(
    mut writer: W,
    resolution: &Resolution,
    format: OutputFormat,
) -> Result<(), SeqvaultError> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, resolution)
                .map_err(|err| SeqvaultError::Export(err.to_string()))?;
            writer
                .write_all(b"\n")
                .map_err(|err| SeqvaultError::Export(err.to_string()))?;
        }
        OutputFormat::Csv => write_csv(&mut writer, &resolution.records)?,
        OutputFormat::Fasta => write_fasta(&mut writer, &resolution.records)
            .map_err(|err| SeqvaultError::Export(err.to_string()))?,
    }
    writer
        .flush()
        .map_err(|err| SeqvaultError::Export(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_quotes_descriptions_with_commas() {
        let records = vec![SequenceRecord::new(
            "NP_000509.1".parse().unwrap(),
            "hemoglobin, beta",
            "MVHL",
        )];
        let mut out = Vec::new();
        write_csv(&mut out, &records).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "accession_id,description,sequence\nNP_000509.1,\"hemoglobin, beta\",MVHL\n"
        );
    }
}
