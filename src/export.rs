// CSV export: serialize the expense snapshot and drop it into a
// SpendTrack folder under the user's documents directory.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::db::Expense;

pub const CSV_FILE_NAME: &str = "expenses.csv";
pub const EXPORT_DIR_NAME: &str = "SpendTrack";

const CSV_HEADER: &str = "date,amount,description\n";

/// Render the records as an RFC4180-style document:
///
/// ```text
/// date,amount,description
/// "2024-05-10 08:30:00",12.50,"He said ""hi"""
/// ```
///
/// One `\n`-terminated line per record, in input order (the caller supplies
/// records pre-sorted, newest first). Date and description are quoted, the
/// amount is not; literal double quotes in the description are doubled.
/// Newlines inside a description pass through unescaped - a known
/// limitation of the format.
pub fn serialize_expenses<Tz: TimeZone>(expenses: &[Expense], zone: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::with_capacity(CSV_HEADER.len() + expenses.len() * 48);
    out.push_str(CSV_HEADER);

    for expense in expenses {
        let date_text = format_timestamp(expense.timestamp_ms, zone);
        let amount_text = format_amount(expense.amount);
        let escaped_description = expense.description.replace('"', "\"\"");

        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "\"{}\",{},\"{}\"",
            date_text, amount_text, escaped_description
        );
    }

    out
}

/// Serialize using the system's local zone at the time of the call.
pub fn serialize_expenses_local(expenses: &[Expense]) -> String {
    serialize_expenses(expenses, &Local)
}

/// Fixed `yyyy-MM-dd HH:mm:ss` rendering of an epoch-millisecond instant
/// in the given zone. An out-of-range timestamp falls back to the epoch.
fn format_timestamp<Tz: TimeZone>(timestamp_ms: i64, zone: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let utc: DateTime<Utc> = DateTime::from_timestamp_millis(timestamp_ms).unwrap_or_default();
    utc.with_timezone(zone)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Two decimal places, `.` as separator regardless of locale. Records are
/// validated before entry, so a non-finite amount should never reach this
/// point; if one does, render a safe zero instead of `NaN`/`inf` text.
fn format_amount(amount: f64) -> String {
    if amount.is_finite() {
        format!("{:.2}", amount)
    } else {
        "0.00".to_string()
    }
}

// ============================================================================
// EXPORT ENTRY POINT
// The serializer itself happily produces a header-only document; refusing an
// empty snapshot is this layer's policy. I/O failures are reduced to `false`,
// the only signal the caller gets.
// ============================================================================

/// Write the snapshot to `<documents_dir>/SpendTrack/expenses.csv` (UTF-8,
/// overwriting any previous export). Returns `true` only when the file was
/// fully written; an empty snapshot is a refused no-op.
pub fn export_expenses(expenses: &[Expense], documents_dir: &Path) -> bool {
    if expenses.is_empty() {
        return false;
    }

    let content = serialize_expenses_local(expenses);
    write_document(&content, documents_dir).is_ok()
}

/// Where `export_expenses` will place the file.
pub fn export_path(documents_dir: &Path) -> PathBuf {
    documents_dir.join(EXPORT_DIR_NAME).join(CSV_FILE_NAME)
}

/// The platform's shared documents area, `$HOME/Documents` on Unix-likes.
pub fn default_documents_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => Path::new(&home).join("Documents"),
        None => PathBuf::from("."),
    }
}

fn write_document(content: &str, documents_dir: &Path) -> std::io::Result<()> {
    let target_dir = documents_dir.join(EXPORT_DIR_NAME);
    fs::create_dir_all(&target_dir)?;
    fs::write(target_dir.join(CSV_FILE_NAME), content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use serde::Deserialize;

    fn utc_zone() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn expense(amount: f64, description: &str, timestamp_ms: i64) -> Expense {
        Expense::new(amount, description, timestamp_ms)
    }

    #[test]
    fn test_empty_input_yields_header_only() {
        let document = serialize_expenses(&[], &utc_zone());
        assert_eq!(document, "date,amount,description\n");
    }

    #[test]
    fn test_quote_doubling_and_two_decimal_amount() {
        let expenses = vec![expense(12.5, "He said \"hi\"", 0)];
        let document = serialize_expenses(&expenses, &utc_zone());

        assert_eq!(
            document,
            "date,amount,description\n\"1970-01-01 00:00:00\",12.50,\"He said \"\"hi\"\"\"\n"
        );
    }

    #[test]
    fn test_date_rendered_in_given_zone() {
        let east2 = FixedOffset::east_opt(2 * 3600).unwrap();
        let expenses = vec![expense(1.0, "Coffee", 0)];
        let document = serialize_expenses(&expenses, &east2);

        assert!(document.contains("\"1970-01-01 02:00:00\""));
    }

    #[test]
    fn test_lines_preserve_input_order() {
        let expenses = vec![
            expense(10.0, "Coffee", 60_000),
            expense(5.5, "Tea", 0),
        ];
        let document = serialize_expenses(&expenses, &utc_zone());

        let lines: Vec<&str> = document.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "date,amount,description");
        assert_eq!(lines[1], "\"1970-01-01 00:01:00\",10.00,\"Coffee\"");
        assert_eq!(lines[2], "\"1970-01-01 00:00:00\",5.50,\"Tea\"");
    }

    #[test]
    fn test_serialization_is_idempotent() {
        let expenses = vec![
            expense(10.0, "Coffee", 1_000),
            expense(5.5, "Tea, with \"milk\"", 2_000),
        ];

        let first = serialize_expenses(&expenses, &utc_zone());
        let second = serialize_expenses(&expenses, &utc_zone());

        assert_eq!(first, second, "Same input must yield byte-identical output");
    }

    #[test]
    fn test_non_finite_amount_renders_safe_zero() {
        let expenses = vec![
            expense(f64::NAN, "corrupt", 0),
            expense(f64::INFINITY, "also corrupt", 0),
        ];
        let document = serialize_expenses(&expenses, &utc_zone());

        for line in document.lines().skip(1) {
            assert!(line.contains(",0.00,"), "got line: {}", line);
        }
        assert!(!document.contains("NaN"));
        assert!(!document.contains("inf"));
    }

    #[derive(Debug, Deserialize)]
    struct ExportedRow {
        date: String,
        amount: f64,
        description: String,
    }

    #[test]
    fn test_exported_document_parses_back() {
        let expenses = vec![
            expense(12.5, "He said \"hi\"", 0),
            expense(7.25, "Tea, black", 3_600_000),
        ];
        let document = serialize_expenses(&expenses, &utc_zone());

        let mut reader = csv::Reader::from_reader(document.as_bytes());
        let rows: Vec<ExportedRow> = reader
            .deserialize()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].description, "He said \"hi\"");
        assert_eq!(rows[0].amount, 12.5);
        assert_eq!(rows[0].date, "1970-01-01 00:00:00");
        assert_eq!(rows[1].description, "Tea, black");
        assert_eq!(rows[1].date, "1970-01-01 01:00:00");
    }

    #[test]
    fn test_export_refuses_empty_snapshot() {
        let dir = std::env::temp_dir().join(format!("spendtrack-empty-{}", std::process::id()));

        assert!(!export_expenses(&[], &dir));
        assert!(!export_path(&dir).exists(), "No file may be written");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_export_writes_expected_file() {
        let dir = std::env::temp_dir().join(format!("spendtrack-export-{}", std::process::id()));
        let expenses = vec![expense(10.0, "Coffee", 0)];

        assert!(export_expenses(&expenses, &dir));

        let written = fs::read_to_string(export_path(&dir)).unwrap();
        assert!(written.starts_with("date,amount,description\n"));
        assert!(written.contains(",10.00,\"Coffee\""));

        // Exporting again overwrites rather than appending.
        assert!(export_expenses(&expenses, &dir));
        let rewritten = fs::read_to_string(export_path(&dir)).unwrap();
        assert_eq!(written, rewritten);

        let _ = fs::remove_dir_all(&dir);
    }
}
