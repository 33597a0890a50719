use anyhow::{bail, Context, Result};
use chrono::Local;
use rusqlite::Connection;
use std::env;
use std::path::PathBuf;

use spendtrack::{
    default_documents_dir, export_expenses, export_path, get_all_expenses, insert_expense,
    parse_amount_input, setup_database, total_for_trailing_days, validate_description, Expense,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("add") => run_add(&args[2..]),
        Some("list") => run_list(),
        Some("total") => run_total(args.get(2).map(String::as_str)),
        Some("export") => run_export(),
        Some(other) => bail!(
            "Unknown command '{}'. Commands: add, list, total, export (no command starts the UI)",
            other
        ),
        None => run_ui_mode(),
    }
}

fn db_path() -> PathBuf {
    env::var_os("SPENDTRACK_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("spendtrack.db"))
}

fn open_db() -> Result<Connection> {
    let path = db_path();
    let conn = Connection::open(&path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

fn run_add(args: &[String]) -> Result<()> {
    let (amount_text, description_parts) = match args.split_first() {
        Some(split) => split,
        None => bail!("Usage: spendtrack add <amount> <description...>"),
    };

    let amount = match parse_amount_input(amount_text) {
        Some(amount) => amount,
        None => bail!("'{}' is not a positive amount", amount_text),
    };

    let description = match validate_description(&description_parts.join(" ")) {
        Some(description) => description,
        None => bail!("Description must not be empty"),
    };

    let conn = open_db()?;
    let now = Local::now();
    let expense = Expense::new(amount, description, now.timestamp_millis());
    let id = insert_expense(&conn, &expense)?;

    println!(
        "✓ Saved expense #{}: {:.2} - {}",
        id, expense.amount, expense.description
    );

    Ok(())
}

fn run_list() -> Result<()> {
    let conn = open_db()?;
    let expenses = get_all_expenses(&conn)?;

    if expenses.is_empty() {
        println!("No expenses logged yet.");
        return Ok(());
    }

    println!("{:<20} {:>10}  Description", "Date", "Amount");
    for expense in &expenses {
        let date_text = chrono::DateTime::from_timestamp_millis(expense.timestamp_ms)
            .unwrap_or_default()
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S");
        println!(
            "{:<20} {:>10.2}  {}",
            date_text, expense.amount, expense.description
        );
    }
    println!("\n✓ {} expenses", expenses.len());

    Ok(())
}

fn run_total(days_arg: Option<&str>) -> Result<()> {
    let days: i64 = match days_arg {
        Some(text) => text
            .parse()
            .with_context(|| format!("'{}' is not a number of days", text))?,
        None => 1,
    };

    let conn = open_db()?;
    let expenses = get_all_expenses(&conn)?;
    let total = total_for_trailing_days(&expenses, days, Local::now());

    if days == 1 {
        println!("Spent today: {:.2}", total);
    } else {
        println!("Spent over the last {} days: {:.2}", days, total);
    }

    Ok(())
}

fn run_export() -> Result<()> {
    let conn = open_db()?;
    let expenses = get_all_expenses(&conn)?;

    if expenses.is_empty() {
        println!("No expenses to export.");
        return Ok(());
    }

    let documents_dir = default_documents_dir();
    if export_expenses(&expenses, &documents_dir) {
        println!(
            "✓ Exported {} expenses to {}",
            expenses.len(),
            export_path(&documents_dir).display()
        );
    } else {
        bail!("Export failed");
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode() -> Result<()> {
    use spendtrack::ui;

    let conn = open_db()?;
    let mut app = ui::App::new(conn, default_documents_dir())?;
    ui::run_ui(&mut app)?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode() -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the CLI: spendtrack add | list | total | export");
    std::process::exit(1);
}
