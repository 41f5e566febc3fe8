//! Loading the per-customer metrics table from CSV or JSON.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use rfm_core::{CustomerMetricsRecord, RfmError, RfmResult};
use tracing::info;

const REQUIRED_COLUMNS: [&str; 4] = ["customer_id", "recency_days", "frequency", "monetary"];

/// Loads a metrics table, picking the parser from the file extension.
pub fn load_metrics(path: &Path) -> RfmResult<Vec<CustomerMetricsRecord>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let file = File::open(path)?;
    let records = match extension.as_deref() {
        Some("csv") => read_csv(BufReader::new(file))?,
        Some("json") => read_json(BufReader::new(file))?,
        _ => {
            return Err(RfmError::Dataset(format!(
                "unsupported metrics file (expected .csv or .json): {}",
                path.display()
            )))
        }
    };

    info!(path = %path.display(), customers = records.len(), "Loaded customer metrics");
    Ok(records)
}

/// Reads a JSON array of metrics records.
pub fn read_json<R: Read>(reader: R) -> RfmResult<Vec<CustomerMetricsRecord>> {
    let records: Vec<CustomerMetricsRecord> = serde_json::from_reader(reader)?;
    ensure_unique(&records)?;
    Ok(records)
}

/// Reads a headed CSV table. Columns are matched by name and unknown columns
/// are ignored; `state`, `city` and `total_freight` may be absent or empty.
pub fn read_csv<R: Read>(reader: R) -> RfmResult<Vec<CustomerMetricsRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    // A leading UTF-8 BOM sticks to the first header name.
    let headers: csv::StringRecord = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|name| name.trim_start_matches('\u{feff}').trim())
        .collect();
    if headers.iter().all(str::is_empty) {
        return Err(RfmError::Dataset("metrics file is empty".into()));
    }
    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|name| name == required) {
            return Err(RfmError::Dataset(format!("missing required column: {required}")));
        }
    }
    reader.set_headers(headers);

    let records = reader
        .deserialize::<CustomerMetricsRecord>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(csv_error)?;

    ensure_unique(&records)?;
    Ok(records)
}

pub(crate) fn csv_error(err: csv::Error) -> RfmError {
    match err.position() {
        Some(position) => RfmError::Dataset(format!("line {}: {err}", position.line())),
        None => RfmError::Dataset(err.to_string()),
    }
}

fn ensure_unique(records: &[CustomerMetricsRecord]) -> RfmResult<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.customer_id.as_str()) {
            return Err(RfmError::Dataset(format!(
                "duplicate customer_id: {}",
                record.customer_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
customer_id,recency_days,frequency,monetary,total_freight,state,city
0000366f3b9a7992bf8c76cfdf3221e2,111,1,129.9,12.0,SP,cajamar
0000b849f77a49e4a4ce2b2a4ca5be3f,114,1,18.9,8.29,SP,osasco
\"0000f46a3911fa3c0805444483337064\",536,1,69.0,,SC,\"sao jose, centro\"
";

    #[test]
    fn test_read_csv() {
        let records = read_csv(SAMPLE.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].recency_days, 111);
        assert_eq!(records[0].total_freight, Some(12.0));
        assert_eq!(records[1].city.as_deref(), Some("osasco"));
        assert_eq!(records[2].customer_id, "0000f46a3911fa3c0805444483337064");
        assert_eq!(records[2].total_freight, None);
        assert_eq!(records[2].city.as_deref(), Some("sao jose, centro"));
    }

    #[test]
    fn test_read_csv_only_required_columns() {
        let csv = "monetary,frequency,customer_id,recency_days\n10.5,2,a,3\n";
        let records = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(records[0], CustomerMetricsRecord::new("a", 3, 2, 10.5));
    }

    #[test]
    fn test_read_csv_bom_and_crlf() {
        let csv = "\u{feff}customer_id,recency_days,frequency,monetary,city\r\na,3,2,10.5,\"two\r\nlines\"\r\nb,4,1,1.0,\r\n";
        let records = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].customer_id, "a");
        assert_eq!(records[0].city.as_deref(), Some("two\r\nlines"));
        assert_eq!(records[1].city, None);
    }

    #[test]
    fn test_read_csv_quoted_newline_and_escapes() {
        let csv = "customer_id,recency_days,frequency,monetary,city\nx,1,1,5,\"say \"\"hi\"\"\nthere\"\n";
        let records = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(records[0].city.as_deref(), Some("say \"hi\"\nthere"));
    }

    #[test]
    fn test_read_csv_errors() {
        let missing = "customer_id,recency_days,frequency\na,1,1\n";
        let err = read_csv(missing.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("monetary"));

        let bad_number = "customer_id,recency_days,frequency,monetary\na,soon,1,5\n";
        assert!(matches!(
            read_csv(bad_number.as_bytes()),
            Err(RfmError::Dataset(_))
        ));

        let duplicate = "customer_id,recency_days,frequency,monetary\na,1,1,5\na,2,1,5\n";
        let err = read_csv(duplicate.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("duplicate"));

        let ragged = "customer_id,recency_days,frequency,monetary\na,1,1\n";
        assert!(read_csv(ragged.as_bytes()).is_err());

        assert!(read_csv("".as_bytes()).is_err());
    }

    #[test]
    fn test_read_json() {
        let json = r#"[
            {"customer_id": "a", "recency_days": 4, "frequency": 2, "monetary": 99.5, "state": "RJ"},
            {"customer_id": "b", "recency_days": 40, "frequency": 1, "monetary": 10.0}
        ]"#;
        let records = read_json(json.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].state.as_deref(), Some("RJ"));
        assert_eq!(records[1].city, None);
    }

    #[test]
    fn test_load_metrics_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();

        let csv_path = dir.path().join("metrics.CSV");
        std::fs::write(&csv_path, SAMPLE).unwrap();
        assert_eq!(load_metrics(&csv_path).unwrap().len(), 3);

        let parquet = dir.path().join("metrics.parquet");
        std::fs::write(&parquet, "x").unwrap();
        assert!(matches!(load_metrics(&parquet), Err(RfmError::Dataset(_))));
    }
}
