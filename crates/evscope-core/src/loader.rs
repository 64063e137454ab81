//! Record loaders for JSON, JSON Lines and CSV feed exports
//!
//! Malformed entries are skipped and counted; only unreadable files and
//! unparsable top-level documents are errors.

use crate::{EngineError, VehicleRecord};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// A top-level array of record objects.
    Json,
    /// One record object per line.
    JsonLines,
    /// Header row with the feed field names.
    Csv,
}

impl RecordFormat {
    pub fn from_path(path: &Path) -> Option<RecordFormat> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(RecordFormat::Json),
            "jsonl" | "ndjson" => Some(RecordFormat::JsonLines),
            "csv" => Some(RecordFormat::Csv),
            _ => None,
        }
    }
}

/// What a load pass saw.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub files: usize,
    pub records: usize,
    /// Entries that could not be decoded as a record.
    pub skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct LoadedRecords {
    pub records: Vec<VehicleRecord>,
    pub report: LoadReport,
}

/// Load one file, or every supported file under a directory in path order.
pub fn load_records(path: &Path) -> Result<LoadedRecords, EngineError> {
    let files = collect_files(path)?;
    let mut loaded = LoadedRecords::default();

    for (file, format) in files {
        let bytes = std::fs::read(&file).map_err(|source| EngineError::Io {
            path: file.clone(),
            source,
        })?;
        let (records, skipped) = parse_records(bytes, format, &file)?;

        tracing::debug!(
            file = %file.display(),
            records = records.len(),
            skipped,
            "loaded record file"
        );
        if skipped > 0 {
            tracing::warn!(
                file = %file.display(),
                skipped,
                "skipped malformed records"
            );
        }

        loaded.report.files += 1;
        loaded.report.records += records.len();
        loaded.report.skipped += skipped;
        loaded.records.extend(records);
    }

    Ok(loaded)
}

fn collect_files(path: &Path) -> Result<Vec<(PathBuf, RecordFormat)>, EngineError> {
    if path.is_file() {
        let format = RecordFormat::from_path(path).unwrap_or(RecordFormat::Json);
        return Ok(vec![(path.to_path_buf(), format)]);
    }

    if !path.is_dir() {
        return Err(EngineError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
        });
    }

    let files = WalkDir::new(path)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let format = RecordFormat::from_path(entry.path())?;
            Some((entry.into_path(), format))
        })
        .collect();

    Ok(files)
}

/// Decode `bytes` in the given format. Returns the records and the number of
/// entries that were skipped as malformed.
pub fn parse_records(
    bytes: Vec<u8>,
    format: RecordFormat,
    source: &Path,
) -> Result<(Vec<VehicleRecord>, usize), EngineError> {
    match format {
        RecordFormat::Json => parse_json_array(bytes, source),
        RecordFormat::JsonLines => Ok(parse_json_lines(&bytes)),
        RecordFormat::Csv => parse_csv(&bytes, source),
    }
}

fn parse_json_array(
    mut bytes: Vec<u8>,
    source: &Path,
) -> Result<(Vec<VehicleRecord>, usize), EngineError> {
    let values: Vec<simd_json::OwnedValue> =
        simd_json::from_slice(&mut bytes).map_err(|e| EngineError::Parse {
            path: source.to_path_buf(),
            message: e.to_string(),
        })?;

    let mut records = Vec::with_capacity(values.len());
    let mut skipped = 0;
    for value in values {
        match simd_json::serde::from_owned_value::<VehicleRecord>(value) {
            Ok(record) => records.push(record),
            Err(_) => skipped += 1,
        }
    }
    Ok((records, skipped))
}

fn parse_json_lines(bytes: &[u8]) -> (Vec<VehicleRecord>, usize) {
    let mut records = Vec::new();
    let mut skipped = 0;

    for line in bytes.split(|b| *b == b'\n') {
        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            continue;
        }
        let mut owned = trimmed.to_vec();
        match simd_json::from_slice::<VehicleRecord>(&mut owned) {
            Ok(record) => records.push(record),
            Err(_) => skipped += 1,
        }
    }

    (records, skipped)
}

fn parse_csv(bytes: &[u8], source: &Path) -> Result<(Vec<VehicleRecord>, usize), EngineError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    reader.headers().map_err(|e| EngineError::Parse {
        path: source.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut records = Vec::new();
    let mut skipped = 0;
    for row in reader.deserialize::<VehicleRecord>() {
        match row {
            Ok(record) => records.push(record),
            Err(_) => skipped += 1,
        }
    }
    Ok((records, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const JSON_FIXTURE: &str = r#"[
        {"Make": "TESLA", "Model": "MODEL 3", "Model Year": 2020, "Base MSRP": 0, "Electric Range": 266, "County": "King", "City": "Seattle", "State": "WA"},
        {"Make": "NISSAN", "Model": "LEAF", "Model Year": "2015", "Base MSRP": 29010, "Electric Range": 84},
        42,
        {"Make": "BMW", "Model": "I3", "Extra": {"nested": true}}
    ]"#;

    #[test]
    fn test_json_array_skips_malformed_elements() {
        let (records, skipped) =
            parse_records(JSON_FIXTURE.as_bytes().to_vec(), RecordFormat::Json, Path::new("t.json"))
                .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(skipped, 1);
        assert_eq!(records[1].model_year(), Some(2015));
        assert_eq!(records[2].make(), "BMW");
    }

    #[test]
    fn test_json_top_level_not_array_is_parse_error() {
        let result = parse_records(b"{\"Make\": 1}".to_vec(), RecordFormat::Json, Path::new("t.json"));
        assert!(matches!(result, Err(EngineError::Parse { .. })));
    }

    #[test]
    fn test_json_lines() {
        let input = b"{\"Make\": \"KIA\", \"Model\": \"NIRO\"}\n\nnot json\n{\"Make\": \"FORD\"}\n";
        let (records, skipped) =
            parse_records(input.to_vec(), RecordFormat::JsonLines, Path::new("t.jsonl")).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(skipped, 1);
        assert_eq!(records[1].make(), "FORD");
    }

    #[test]
    fn test_csv_with_feed_headers() {
        let input = "Make,Model,Model Year,Electric Vehicle Type,Base MSRP,Electric Range,County,City,State,Clean Alternative Fuel Vehicle (CAFV) Eligibility\n\
                     TESLA,MODEL Y,2022,Battery Electric Vehicle (BEV),0,0,King,Seattle,WA,Eligibility unknown as battery range has not been researched\n\
                     CHEVROLET,VOLT,2017,Plug-in Hybrid Electric Vehicle (PHEV),,53,,Tacoma,WA,Clean Alternative Fuel Vehicle Eligible\n";
        let (records, skipped) =
            parse_records(input.as_bytes().to_vec(), RecordFormat::Csv, Path::new("t.csv")).unwrap();

        assert_eq!(skipped, 0);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].model_year(), Some(2022));
        assert_eq!(records[1].msrp(), None);
        assert_eq!(records[1].range(), Some(53.0));
        assert_eq!(records[1].region_key(), Some("Tacoma"));
    }

    #[test]
    fn test_load_directory_in_path_order() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("b.jsonl"),
            "{\"Make\": \"SECOND\"}\n",
        )
        .unwrap();
        fs::write(tmp.path().join("a.json"), "[{\"Make\": \"FIRST\"}, 7]").unwrap();
        fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let loaded = load_records(tmp.path()).unwrap();
        assert_eq!(loaded.report.files, 2);
        assert_eq!(loaded.report.records, 2);
        assert_eq!(loaded.report.skipped, 1);
        assert_eq!(loaded.records[0].make(), "FIRST");
        assert_eq!(loaded.records[1].make(), "SECOND");
    }

    #[test]
    fn test_load_missing_path_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_records(&tmp.path().join("missing.json"));
        assert!(matches!(result, Err(EngineError::Io { .. })));
    }
}
