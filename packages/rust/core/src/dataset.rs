//! Dataset and backing-file persistence.
//!
//! The dataset of record is a JSON array of organization objects; each
//! processed record additionally gets one backing file under the output
//! directory, keyed by a sanitized version of its listing title. Backing-file
//! existence is the cache/idempotence signal for reruns.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::info;

use listscribe_shared::{ListscribeError, OrganizationRecord, Result, TaskKind};

// ---------------------------------------------------------------------------
// JSON dataset
// ---------------------------------------------------------------------------

/// Load the ordered record set from a JSON dataset file.
pub fn load_dataset(path: &Path) -> Result<Vec<OrganizationRecord>> {
    let content = std::fs::read_to_string(path).map_err(|e| ListscribeError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| {
        ListscribeError::dataset(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Overwrite the dataset file with the full updated record set, same order.
pub fn save_dataset(path: &Path, records: &[OrganizationRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(records)
        .map_err(|e| ListscribeError::dataset(format!("failed to serialize dataset: {e}")))?;
    std::fs::write(path, json).map_err(|e| ListscribeError::io(path, e))?;
    info!(path = %path.display(), records = records.len(), "dataset written");
    Ok(())
}

// ---------------------------------------------------------------------------
// Backing files
// ---------------------------------------------------------------------------

/// Collapse characters unsafe in filenames to `_`.
///
/// Runs of anything outside `[A-Za-z0-9._-]` become a single underscore;
/// leading/trailing underscores and dots are trimmed. Deterministic for a
/// given title, which is what makes the backing file a stable cache key.
pub fn sanitize_file_name(title: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let unsafe_chars = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap());

    let cleaned = unsafe_chars.replace_all(title, "_");
    let trimmed = cleaned.trim_matches(|c| c == '_' || c == '.');

    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Path of the backing file for one record and task.
pub fn backing_file_path(output_dir: &Path, task: TaskKind, listing_title: &str) -> PathBuf {
    output_dir.join(task.subdir()).join(format!(
        "{}.{}",
        sanitize_file_name(listing_title),
        task.file_extension()
    ))
}

/// Remove stray code-fence markers the model sometimes emits despite
/// instructions (` ```html ` openers and bare ` ``` `).
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```html", "").replace("```", "")
}

// ---------------------------------------------------------------------------
// CSV conversion
// ---------------------------------------------------------------------------

/// Convert a CSV dataset to the JSON form the pipeline consumes.
///
/// Every column is carried through as a string field. A `location` field is
/// synthesized from `city` and `state` columns when they are present.
pub fn csv_to_json(csv_path: &Path, json_path: &Path) -> Result<usize> {
    let mut reader =
        csv::Reader::from_path(csv_path).map_err(|e| ListscribeError::dataset(e.to_string()))?;

    let headers = reader
        .headers()
        .map_err(|e| ListscribeError::dataset(e.to_string()))?
        .clone();

    let mut rows: Vec<serde_json::Map<String, serde_json::Value>> = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|e| ListscribeError::dataset(e.to_string()))?;
        let mut row = serde_json::Map::new();

        for (header, field) in headers.iter().zip(record.iter()) {
            row.insert(header.to_string(), serde_json::Value::String(field.into()));
        }

        let city = record_field(&row, "city");
        let state = record_field(&row, "state");
        let location = format!("{city}, {state}")
            .trim()
            .trim_matches(',')
            .trim()
            .to_string();
        if !location.is_empty() {
            row.insert("location".into(), serde_json::Value::String(location));
        }

        rows.push(row);
    }

    let json = serde_json::to_string_pretty(&rows)
        .map_err(|e| ListscribeError::dataset(e.to_string()))?;
    std::fs::write(json_path, json).map_err(|e| ListscribeError::io(json_path, e))?;

    info!(rows = rows.len(), out = %json_path.display(), "CSV converted to JSON");
    Ok(rows.len())
}

fn record_field(row: &serde_json::Map<String, serde_json::Value>, key: &str) -> String {
    row.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Convert a JSON dataset back to CSV.
///
/// Column order follows the first record's key order, with columns seen only
/// in later records appended. Missing values become empty cells.
pub fn json_to_csv(json_path: &Path, csv_path: &Path) -> Result<usize> {
    let content =
        std::fs::read_to_string(json_path).map_err(|e| ListscribeError::io(json_path, e))?;
    let rows: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(&content)
        .map_err(|e| {
            ListscribeError::dataset(format!("failed to parse {}: {e}", json_path.display()))
        })?;

    if rows.is_empty() {
        return Err(ListscribeError::dataset("JSON dataset is empty"));
    }

    let mut headers: Vec<String> = Vec::new();
    for row in &rows {
        for key in row.keys() {
            if !headers.iter().any(|h| h == key) {
                headers.push(key.clone());
            }
        }
    }

    let mut writer =
        csv::Writer::from_path(csv_path).map_err(|e| ListscribeError::dataset(e.to_string()))?;
    writer
        .write_record(&headers)
        .map_err(|e| ListscribeError::dataset(e.to_string()))?;

    for row in &rows {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| match row.get(h) {
                None | Some(serde_json::Value::Null) => String::new(),
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            })
            .collect();
        writer
            .write_record(&cells)
            .map_err(|e| ListscribeError::dataset(e.to_string()))?;
    }

    writer
        .flush()
        .map_err(|e| ListscribeError::io(csv_path, e))?;

    info!(rows = rows.len(), out = %csv_path.display(), "JSON converted to CSV");
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn temp_path(name: &str) -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("listscribe-test-{}-{n}-{name}", std::process::id()))
    }

    #[test]
    fn sanitize_collapses_unsafe_runs() {
        assert_eq!(
            sanitize_file_name("Desert Low Vision Center"),
            "Desert_Low_Vision_Center"
        );
        assert_eq!(sanitize_file_name("A / B : C?"), "A_B_C");
        assert_eq!(sanitize_file_name("..hidden.."), "hidden");
        assert_eq!(sanitize_file_name("***"), "untitled");
    }

    #[test]
    fn sanitize_is_deterministic() {
        let a = sanitize_file_name("Órgão & Co.");
        let b = sanitize_file_name("Órgão & Co.");
        assert_eq!(a, b);
    }

    #[test]
    fn backing_file_paths_are_task_specific() {
        let dir = Path::new("/tmp/out");
        let desc = backing_file_path(dir, TaskKind::Description, "My Org");
        let exc = backing_file_path(dir, TaskKind::Excerpt, "My Org");
        assert_eq!(desc, Path::new("/tmp/out/descriptions/My_Org.html"));
        assert_eq!(exc, Path::new("/tmp/out/excerpts/My_Org.txt"));
    }

    #[test]
    fn strips_fence_markers_only() {
        let text = "```html\n<section>Real content</section>\n```";
        let stripped = strip_code_fences(text);
        assert!(!stripped.contains("```"));
        assert!(stripped.contains("<section>Real content</section>"));
        // Fence-free text is untouched.
        assert_eq!(strip_code_fences("plain"), "plain");
    }

    #[test]
    fn dataset_roundtrip_preserves_order_and_columns() {
        let path = temp_path("dataset.json");
        let records: Vec<OrganizationRecord> = serde_json::from_str(
            r#"[
                {"listing_title": "B Org", "website": "b.example.org", "county": "Pima"},
                {"listing_title": "A Org"}
            ]"#,
        )
        .unwrap();

        save_dataset(&path, &records).unwrap();
        let loaded = load_dataset(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].listing_title, "B Org");
        assert_eq!(loaded[1].listing_title, "A Org");
        assert_eq!(
            loaded[0].extra.get("county").and_then(|v| v.as_str()),
            Some("Pima")
        );

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn csv_to_json_synthesizes_location() {
        let csv_path = temp_path("in.csv");
        let json_path = temp_path("out.json");
        std::fs::write(
            &csv_path,
            "listing_title,city,state\nDesert Center,Phoenix,AZ\nNo Place,,\n",
        )
        .unwrap();

        let count = csv_to_json(&csv_path, &json_path).unwrap();
        assert_eq!(count, 2);

        let rows: Vec<serde_json::Value> =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(rows[0]["location"], "Phoenix, AZ");
        // Empty city/state produce no location field.
        assert!(rows[1].get("location").is_none());

        let _ = std::fs::remove_file(&csv_path);
        let _ = std::fs::remove_file(&json_path);
    }

    #[test]
    fn json_to_csv_unions_columns() {
        let json_path = temp_path("in.json");
        let csv_path = temp_path("out.csv");
        std::fs::write(
            &json_path,
            r#"[
                {"listing_title": "A", "website": "a.org"},
                {"listing_title": "B", "phone": "555"}
            ]"#,
        )
        .unwrap();

        json_to_csv(&json_path, &csv_path).unwrap();
        let csv = std::fs::read_to_string(&csv_path).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("listing_title,website,phone"));
        assert_eq!(lines.next(), Some("A,a.org,"));
        assert_eq!(lines.next(), Some("B,,555"));

        let _ = std::fs::remove_file(&json_path);
        let _ = std::fs::remove_file(&csv_path);
    }

    #[test]
    fn empty_json_dataset_is_an_error() {
        let json_path = temp_path("empty.json");
        let csv_path = temp_path("never.csv");
        std::fs::write(&json_path, "[]").unwrap();
        assert!(json_to_csv(&json_path, &csv_path).is_err());
        let _ = std::fs::remove_file(&json_path);
    }
}
