use anyhow::Result;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

/// A single logged expense.
///
/// Immutable once constructed: there is no edit or delete flow in this
/// system, only append. `id` is the SQLite rowid, assigned at insert time;
/// a record that has not been persisted yet carries `id = 0`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Expense {
    pub id: i64,

    /// Positive amount in the app's single fixed currency.
    pub amount: f64,

    /// Free text, non-empty after trimming (enforced at entry,
    /// see `validate_description`).
    pub description: String,

    /// Absolute instant as epoch milliseconds (UTC), never a local date.
    pub timestamp_ms: i64,
}

impl Expense {
    /// Build a not-yet-persisted expense (`id = 0`).
    pub fn new(amount: f64, description: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            id: 0,
            amount,
            description: description.into(),
            timestamp_ms,
        }
    }
}

// ============================================================================
// ENTRY VALIDATION
// Runs in the collaborator that constructs a record, before the core ever
// sees it. The core itself never rejects records.
// ============================================================================

/// Parse user-typed amount text. Accepts `,` as a decimal separator and
/// requires a finite value strictly greater than zero.
pub fn parse_amount_input(text: &str) -> Option<f64> {
    let normalized = text.trim().replace(',', ".");
    match normalized.parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount > 0.0 => Some(amount),
        _ => None,
    }
}

/// Trim a user-typed description, rejecting empty input.
pub fn validate_description(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ============================================================================
// STORE
// One long-lived Connection, passed by reference to consumers.
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS expenses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            amount REAL NOT NULL,
            description TEXT NOT NULL,
            timestamp INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_expenses_timestamp ON expenses(timestamp)",
        [],
    )?;

    Ok(())
}

/// Insert one expense and return the id the store assigned to it.
pub fn insert_expense(conn: &Connection, expense: &Expense) -> Result<i64> {
    conn.execute(
        "INSERT INTO expenses (amount, description, timestamp) VALUES (?1, ?2, ?3)",
        params![expense.amount, expense.description, expense.timestamp_ms],
    )?;

    Ok(conn.last_insert_rowid())
}

/// Full snapshot, newest first. This is the list the presentation layer
/// holds and re-reads after every insert.
pub fn get_all_expenses(conn: &Connection) -> Result<Vec<Expense>> {
    let mut stmt = conn.prepare(
        "SELECT id, amount, description, timestamp
         FROM expenses
         ORDER BY timestamp DESC",
    )?;

    let expenses = stmt
        .query_map([], |row| {
            Ok(Expense {
                id: row.get(0)?,
                amount: row.get(1)?,
                description: row.get(2)?,
                timestamp_ms: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(expenses)
}

/// Sum of amounts with `start_ms <= timestamp <= end_ms` (BETWEEN is
/// inclusive on both ends). Empty match set sums to 0.
pub fn total_between(conn: &Connection, start_ms: i64, end_ms: i64) -> Result<f64> {
    let total: f64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM expenses WHERE timestamp BETWEEN ?1 AND ?2",
        params![start_ms, end_ms],
        |row| row.get(0),
    )?;

    Ok(total)
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM expenses", [], |row| row.get(0))?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_assigns_increasing_ids() {
        let conn = open_test_db();

        let id1 = insert_expense(&conn, &Expense::new(10.0, "Coffee", 1_000)).unwrap();
        let id2 = insert_expense(&conn, &Expense::new(5.5, "Tea", 2_000)).unwrap();

        assert_eq!(id1, 1, "First insert should get id 1");
        assert_eq!(id2, 2, "Second insert should get id 2");
        assert_eq!(verify_count(&conn).unwrap(), 2);
    }

    #[test]
    fn test_snapshot_is_newest_first() {
        let conn = open_test_db();

        insert_expense(&conn, &Expense::new(1.0, "oldest", 1_000)).unwrap();
        insert_expense(&conn, &Expense::new(2.0, "newest", 3_000)).unwrap();
        insert_expense(&conn, &Expense::new(3.0, "middle", 2_000)).unwrap();

        let snapshot = get_all_expenses(&conn).unwrap();
        let order: Vec<&str> = snapshot.iter().map(|e| e.description.as_str()).collect();

        assert_eq!(order, vec!["newest", "middle", "oldest"]);
    }

    #[test]
    fn test_total_between_is_inclusive_on_both_ends() {
        let conn = open_test_db();

        insert_expense(&conn, &Expense::new(1.0, "at start", 1_000)).unwrap();
        insert_expense(&conn, &Expense::new(2.0, "inside", 1_500)).unwrap();
        insert_expense(&conn, &Expense::new(4.0, "at end", 2_000)).unwrap();
        insert_expense(&conn, &Expense::new(8.0, "outside", 2_001)).unwrap();

        let total = total_between(&conn, 1_000, 2_000).unwrap();
        assert_eq!(total, 7.0, "Boundary records must be counted");
    }

    #[test]
    fn test_total_between_empty_table_is_zero() {
        let conn = open_test_db();
        assert_eq!(total_between(&conn, 0, i64::MAX).unwrap(), 0.0);
    }

    #[test]
    fn test_parse_amount_input() {
        assert_eq!(parse_amount_input("12.50"), Some(12.5));
        assert_eq!(parse_amount_input("  3,75 "), Some(3.75));
        assert_eq!(parse_amount_input("0"), None);
        assert_eq!(parse_amount_input("-4.20"), None);
        assert_eq!(parse_amount_input("NaN"), None);
        assert_eq!(parse_amount_input("inf"), None);
        assert_eq!(parse_amount_input("coffee"), None);
        assert_eq!(parse_amount_input(""), None);
    }

    #[test]
    fn test_validate_description() {
        assert_eq!(validate_description("  Coffee  "), Some("Coffee".to_string()));
        assert_eq!(validate_description("   "), None);
        assert_eq!(validate_description(""), None);
    }
}
