//! Case-document ingestion from the Parquet interchange format.
//!
//! The document source is trusted only for transport: each row is
//! checked for required-field presence, and malformed rows are skipped
//! and counted rather than aborting the batch.

use std::path::Path;

use arrow::array::{Array, Date32Array, LargeStringArray, StringArray};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use veredicto_core::{Document, PipelineError, Result};

/// Counts for one ingestion run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IngestReport {
    pub ingested: usize,
    pub skipped: usize,
}

/// Read case documents from a Parquet file.
///
/// Expects the `caselaw` schema columns: `tribunal`, `fecha` (Date32),
/// `materia`, `partes`, `expediente`, `full_text`, `url`. Rows missing a
/// required field are skipped and counted; `partes` and `url` default to
/// empty.
pub fn read_documents(path: &Path) -> Result<(Vec<Document>, IngestReport)> {
    let file = std::fs::File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut documents = Vec::new();
    let mut skipped = 0usize;

    for batch in reader {
        let batch = batch?;
        extract_rows(&batch, &mut documents, &mut skipped)?;
    }

    let report = IngestReport {
        ingested: documents.len(),
        skipped,
    };
    if skipped > 0 {
        warn!(skipped, "skipped malformed case documents during ingestion");
    }
    info!(path = %path.display(), ingested = report.ingested, "read case documents");
    Ok((documents, report))
}

fn extract_rows(
    batch: &RecordBatch,
    documents: &mut Vec<Document>,
    skipped: &mut usize,
) -> Result<()> {
    let tribunal = required_column(batch, "tribunal")?;
    let fecha = batch
        .column_by_name("fecha")
        .ok_or_else(|| PipelineError::Other("missing 'fecha' column".into()))?;
    let fecha = fecha
        .as_any()
        .downcast_ref::<Date32Array>()
        .ok_or_else(|| PipelineError::Other("'fecha' column is not Date32".into()))?;
    let materia = required_column(batch, "materia")?;
    let partes = batch.column_by_name("partes");
    let expediente = required_column(batch, "expediente")?;
    let full_text = required_column(batch, "full_text")?;
    let url = batch.column_by_name("url");

    for row in 0..batch.num_rows() {
        let doc = (|| {
            let tribunal = non_empty(get_string(tribunal, row)?)?;
            let date = date_value(fecha, row)?;
            let matter = non_empty(get_string(materia, row)?)?;
            let docket_id = non_empty(get_string(expediente, row)?)?;
            let full_text = non_empty(get_string(full_text, row)?)?;
            let parties = partes
                .and_then(|col| get_string(col.as_ref(), row))
                .unwrap_or_default();
            let source_url = url
                .and_then(|col| get_string(col.as_ref(), row))
                .unwrap_or_default();

            Some(Document {
                tribunal,
                date,
                matter,
                parties,
                docket_id,
                full_text,
                source_url,
            })
        })();

        match doc {
            Some(doc) => documents.push(doc),
            None => *skipped += 1,
        }
    }
    Ok(())
}

fn required_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a dyn Array> {
    batch
        .column_by_name(name)
        .map(|c| c.as_ref())
        .ok_or_else(|| PipelineError::Other(format!("missing '{name}' column")))
}

/// Extract a string value, handling both Utf8 and LargeUtf8.
fn get_string(col: &dyn Array, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|arr| arr.value(row).to_string())
        .or_else(|| {
            col.as_any()
                .downcast_ref::<LargeStringArray>()
                .map(|arr| arr.value(row).to_string())
        })
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() { None } else { Some(value) }
}

fn date_value(col: &Date32Array, row: usize) -> Option<NaiveDate> {
    if col.is_null(row) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    epoch.checked_add_signed(Duration::days(col.value(row) as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Date32Array, StringArray};
    use parquet::arrow::ArrowWriter;
    use std::sync::Arc;
    use tempfile::TempDir;
    use veredicto_core::schema::caselaw;

    fn days(date: (i32, u32, u32)) -> i32 {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let d = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        (d - epoch).num_days() as i32
    }

    fn write_parquet(path: &std::path::Path, rows: &[(&str, i32, &str, &str, &str, &str, &str)]) {
        let schema = Arc::new(caselaw::case_document_schema());
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(
                    rows.iter().map(|r| r.0).collect::<Vec<_>>(),
                )),
                Arc::new(Date32Array::from(
                    rows.iter().map(|r| r.1).collect::<Vec<_>>(),
                )),
                Arc::new(StringArray::from(
                    rows.iter().map(|r| r.2).collect::<Vec<_>>(),
                )),
                Arc::new(StringArray::from(
                    rows.iter().map(|r| r.3).collect::<Vec<_>>(),
                )),
                Arc::new(StringArray::from(
                    rows.iter().map(|r| r.4).collect::<Vec<_>>(),
                )),
                Arc::new(StringArray::from(
                    rows.iter().map(|r| r.5).collect::<Vec<_>>(),
                )),
                Arc::new(StringArray::from(
                    rows.iter().map(|r| r.6).collect::<Vec<_>>(),
                )),
            ],
        )
        .unwrap();

        let file = std::fs::File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn reads_well_formed_documents() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("casos.parquet");
        write_parquet(
            &path,
            &[
                (
                    "Juzgado Penal 1",
                    days((2021, 5, 20)),
                    "penal",
                    "Fiscal c/ Pérez",
                    "EXP-100",
                    "el tribunal condena al acusado",
                    "https://example.org/100",
                ),
                (
                    "Cámara Civil",
                    days((2022, 1, 10)),
                    "civil",
                    "",
                    "EXP-101",
                    "se rechaza la demanda",
                    "",
                ),
            ],
        );

        let (docs, report) = read_documents(&path).unwrap();
        assert_eq!(report.ingested, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(docs[0].docket_id, "EXP-100");
        assert_eq!(docs[0].date, NaiveDate::from_ymd_opt(2021, 5, 20).unwrap());
        assert_eq!(docs[1].parties, "");
    }

    #[test]
    fn malformed_rows_are_skipped_and_counted() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("casos.parquet");
        write_parquet(
            &path,
            &[
                (
                    "Juzgado Penal 1",
                    days((2021, 5, 20)),
                    "penal",
                    "",
                    "EXP-100",
                    "condena firme",
                    "",
                ),
                // Empty full_text: required field missing.
                ("Cámara Civil", days((2022, 1, 10)), "civil", "", "EXP-101", "", ""),
                // Empty tribunal.
                ("", days((2022, 2, 2)), "laboral", "", "EXP-102", "se acepta el reclamo", ""),
                (
                    "Juzgado Laboral 3",
                    days((2023, 3, 3)),
                    "laboral",
                    "",
                    "EXP-103",
                    "se acepta el reclamo del trabajador",
                    "",
                ),
            ],
        );

        let (docs, report) = read_documents(&path).unwrap();
        assert_eq!(report.ingested, 2);
        assert_eq!(report.skipped, 2);
        assert_eq!(docs[0].docket_id, "EXP-100");
        assert_eq!(docs[1].docket_id, "EXP-103");
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = read_documents(std::path::Path::new("/nonexistent/casos.parquet"));
        assert!(matches!(result, Err(PipelineError::Io(_))));
    }
}
