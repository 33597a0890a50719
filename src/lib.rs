// SpendTrack - Core Library
// Exposes all modules for use in the CLI, the TUI and tests

pub mod aggregate;
pub mod db;
pub mod export;
pub mod presets;

#[cfg(feature = "tui")]
pub mod ui;

// Re-export commonly used types
pub use aggregate::{
    start_of_local_day, total_for_calendar_day, total_for_trailing_days, total_in_window,
};
pub use db::{
    get_all_expenses, insert_expense, parse_amount_input, setup_database, total_between,
    validate_description, verify_count, Expense,
};
pub use export::{
    default_documents_dir, export_expenses, export_path, serialize_expenses,
    serialize_expenses_local, CSV_FILE_NAME, EXPORT_DIR_NAME,
};
pub use presets::{timestamp_for_preset, TimestampPreset};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
