use crate::aggregate::{total_for_calendar_day, total_for_trailing_days};
use crate::db::{
    get_all_expenses, insert_expense, parse_amount_input, validate_description, Expense,
};
use crate::export::{export_expenses, export_path};
use crate::presets::{timestamp_for_preset, TimestampPreset};
use anyhow::Result;
use chrono::{Local, TimeZone};
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use rusqlite::Connection;
use std::io;
use std::path::PathBuf;

pub const MAX_RANGE_DAYS: i64 = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    AddExpense,
    ViewSpend,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Home => Page::AddExpense,
            Page::AddExpense => Page::ViewSpend,
            Page::ViewSpend => Page::Home,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Home => "Home",
            Page::AddExpense => "Add Expense",
            Page::ViewSpend => "View Spend",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddField {
    Amount,
    Description,
}

/// Form state for the add-expense screen.
pub struct AddForm {
    pub amount_input: String,
    pub description_input: String,
    pub focus: AddField,
    pub preset: TimestampPreset,
    pub error: Option<String>,
}

impl AddForm {
    fn new() -> Self {
        Self {
            amount_input: String::new(),
            description_input: String::new(),
            focus: AddField::Amount,
            preset: TimestampPreset::Now,
            error: None,
        }
    }

    fn focused_input(&mut self) -> &mut String {
        match self.focus {
            AddField::Amount => &mut self.amount_input,
            AddField::Description => &mut self.description_input,
        }
    }
}

pub struct App {
    conn: Connection,
    pub expenses: Vec<Expense>,
    pub state: TableState,
    pub current_page: Page,
    pub selected_days: i64,
    pub add_form: AddForm,
    pub status: Option<String>,
    pub documents_dir: PathBuf,
}

impl App {
    pub fn new(conn: Connection, documents_dir: PathBuf) -> Result<Self> {
        let expenses = get_all_expenses(&conn)?;

        let mut state = TableState::default();
        if !expenses.is_empty() {
            state.select(Some(0));
        }

        Ok(Self {
            conn,
            expenses,
            state,
            current_page: Page::Home,
            selected_days: 1,
            add_form: AddForm::new(),
            status: None,
            documents_dir,
        })
    }

    /// Re-read the full snapshot from the store. Mirrors the observable
    /// feed re-delivering the whole list after every insert.
    fn reload_snapshot(&mut self) -> Result<()> {
        self.expenses = get_all_expenses(&self.conn)?;

        match self.state.selected() {
            Some(i) if i < self.expenses.len() => {}
            _ if self.expenses.is_empty() => self.state.select(None),
            _ => self.state.select(Some(0)),
        }

        Ok(())
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
        self.status = None;
    }

    pub fn next(&mut self) {
        let len = self.expenses.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.expenses.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn widen_range(&mut self) {
        if self.selected_days < MAX_RANGE_DAYS {
            self.selected_days += 1;
        }
    }

    pub fn narrow_range(&mut self) {
        if self.selected_days > 1 {
            self.selected_days -= 1;
        }
    }

    pub fn range_total(&self) -> f64 {
        total_for_trailing_days(&self.expenses, self.selected_days, Local::now())
    }

    pub fn today_total(&self) -> f64 {
        total_for_calendar_day(&self.expenses, Local::now())
    }

    fn open_add_form(&mut self) {
        self.add_form = AddForm::new();
        self.current_page = Page::AddExpense;
        self.status = None;
    }

    fn save_expense(&mut self) {
        self.add_form.error = None;

        let amount = match parse_amount_input(&self.add_form.amount_input) {
            Some(amount) => amount,
            None => {
                self.add_form.error = Some("Enter an amount greater than zero".to_string());
                return;
            }
        };

        let description = match validate_description(&self.add_form.description_input) {
            Some(description) => description,
            None => {
                self.add_form.error = Some("Enter a description".to_string());
                return;
            }
        };

        let timestamp_ms = timestamp_for_preset(self.add_form.preset, &Local::now());
        let expense = Expense::new(amount, description, timestamp_ms);

        match insert_expense(&self.conn, &expense).and_then(|_| self.reload_snapshot()) {
            Ok(()) => {
                self.status = Some(format!("Saved expense of {:.2}", amount));
                self.add_form = AddForm::new();
                self.current_page = Page::Home;
            }
            Err(e) => {
                self.add_form.error = Some(format!("Save failed: {}", e));
            }
        }
    }

    fn export(&mut self) {
        if self.expenses.is_empty() {
            self.status = Some("No expenses to export".to_string());
            return;
        }

        if export_expenses(&self.expenses, &self.documents_dir) {
            self.status = Some(format!(
                "Exported to {}",
                export_path(&self.documents_dir).display()
            ));
        } else {
            self.status = Some("Export failed".to_string());
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match app.current_page {
                // The add form owns the keyboard while typing.
                Page::AddExpense => match key.code {
                    KeyCode::Esc => {
                        app.current_page = Page::Home;
                    }
                    KeyCode::Enter => app.save_expense(),
                    KeyCode::Tab => {
                        app.add_form.focus = match app.add_form.focus {
                            AddField::Amount => AddField::Description,
                            AddField::Description => AddField::Amount,
                        };
                    }
                    KeyCode::Up | KeyCode::Down => {
                        app.add_form.preset = app.add_form.preset.next();
                    }
                    KeyCode::Backspace => {
                        app.add_form.focused_input().pop();
                    }
                    KeyCode::Char(c) => {
                        app.add_form.focused_input().push(c);
                    }
                    _ => {}
                },
                Page::Home => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Char('a') => app.open_add_form(),
                    KeyCode::Char('v') => {
                        app.current_page = Page::ViewSpend;
                        app.status = None;
                    }
                    KeyCode::Tab => app.next_page(),
                    _ => {}
                },
                Page::ViewSpend => match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Esc => {
                        app.current_page = Page::Home;
                        app.status = None;
                    }
                    KeyCode::Tab => app.next_page(),
                    KeyCode::Char('e') => app.export(),
                    KeyCode::Down | KeyCode::Char('j') => app.next(),
                    KeyCode::Up | KeyCode::Char('k') => app.previous(),
                    KeyCode::Right => app.widen_range(),
                    KeyCode::Left => app.narrow_range(),
                    _ => {}
                },
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Home => render_home(f, chunks[1], app),
        Page::AddExpense => render_add_form(f, chunks[1], app),
        Page::ViewSpend => render_view_spend(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Home, Page::AddExpense, Page::ViewSpend];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Expenses: {}", app.expenses.len()),
        Style::default().fg(Color::White),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn render_home(f: &mut Frame, area: Rect, app: &App) {
    // Recomputed on every draw so a midnight rollover never shows stale.
    let today = app.today_total();

    let content = vec![
        Line::from(""),
        Line::from(vec![Span::styled(
            "  SpendTrack",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from(vec![
            Span::raw("  Spent today: "),
            Span::styled(
                format!("{:.2}", today),
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("a", Style::default().fg(Color::Yellow)),
            Span::raw(" Add expense    "),
            Span::styled("v", Style::default().fg(Color::Yellow)),
            Span::raw(" View spend    "),
            Span::styled("q", Style::default().fg(Color::Red)),
            Span::raw(" Quit"),
        ]),
    ];

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Home "),
    );

    f.render_widget(paragraph, area);
}

fn render_add_form(f: &mut Frame, area: Rect, app: &App) {
    let form = &app.add_form;

    let field_line = |label: &str, value: &str, focused: bool| {
        let marker = if focused { "→ " } else { "  " };
        let style = if focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        Line::from(vec![
            Span::styled(marker.to_string(), Style::default().fg(Color::Green)),
            Span::styled(format!("{:<13}", label), style),
            Span::raw(value.to_string()),
            Span::styled(if focused { "_" } else { "" }, Style::default().fg(Color::Yellow)),
        ])
    };

    let now = Local::now();
    let resolved_ms = timestamp_for_preset(form.preset, &now);
    let resolved_text = Local
        .timestamp_millis_opt(resolved_ms)
        .earliest()
        .map(|dt| dt.format("%d %b %Y %H:%M").to_string())
        .unwrap_or_default();

    let mut content = vec![
        Line::from(""),
        field_line("Amount:", &form.amount_input, form.focus == AddField::Amount),
        Line::from(""),
        field_line(
            "Description:",
            &form.description_input,
            form.focus == AddField::Description,
        ),
        Line::from(""),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("When:        ", Style::default().fg(Color::White)),
            Span::styled(
                form.preset.label(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  ("),
            Span::raw(resolved_text),
            Span::raw(")"),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("Tab", Style::default().fg(Color::Yellow)),
            Span::raw(" Field | "),
            Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
            Span::raw(" When | "),
            Span::styled("Enter", Style::default().fg(Color::Yellow)),
            Span::raw(" Save | "),
            Span::styled("Esc", Style::default().fg(Color::Yellow)),
            Span::raw(" Cancel"),
        ]),
    ];

    if let Some(error) = &form.error {
        content.push(Line::from(""));
        content.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(
                error.clone(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
        ]));
    }

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Add Expense "),
    );

    f.render_widget(paragraph, area);
}

fn render_view_spend(f: &mut Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Range total
            Constraint::Min(0),    // Expense table
        ])
        .split(area);

    let range_line = Line::from(vec![
        Span::raw(" Last "),
        Span::styled(
            format!("{}", app.selected_days),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::raw(if app.selected_days == 1 { " day: " } else { " days: " }),
        Span::styled(
            format!("{:.2}", app.range_total()),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        Span::raw("   (←/→ to adjust, up to 31 days)"),
    ]);

    let range = Paragraph::new(vec![range_line]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Total "),
    );
    f.render_widget(range, chunks[0]);

    if app.expenses.is_empty() {
        let empty = Paragraph::new("\n  No expenses yet. Press Esc, then a to add one.").block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Expenses "),
        );
        f.render_widget(empty, chunks[1]);
        return;
    }

    let header_cells = ["Date", "Amount", "Description"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.expenses.iter().map(|expense| {
        let date_text = Local
            .timestamp_millis_opt(expense.timestamp_ms)
            .earliest()
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();

        let cells = vec![
            Cell::from(date_text),
            Cell::from(format!("{:.2}", expense.amount))
                .style(Style::default().fg(Color::Green)),
            Cell::from(truncate(&expense.description, 40)),
        ];

        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(18),
            Constraint::Length(12),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Expenses "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, chunks[1], &mut app.state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![];

    if let Some(status) = &app.status {
        status_spans.push(Span::styled(
            format!(" {} ", status),
            Style::default().fg(Color::Green),
        ));
        status_spans.push(Span::raw("| "));
    }

    match app.current_page {
        Page::Home => {
            status_spans.push(Span::styled("a", Style::default().fg(Color::Yellow)));
            status_spans.push(Span::raw(" Add | "));
            status_spans.push(Span::styled("v", Style::default().fg(Color::Yellow)));
            status_spans.push(Span::raw(" View | "));
        }
        Page::AddExpense => {
            status_spans.push(Span::styled("Enter", Style::default().fg(Color::Yellow)));
            status_spans.push(Span::raw(" Save | "));
            status_spans.push(Span::styled("Esc", Style::default().fg(Color::Yellow)));
            status_spans.push(Span::raw(" Cancel | "));
        }
        Page::ViewSpend => {
            status_spans.push(Span::styled("e", Style::default().fg(Color::Yellow)));
            status_spans.push(Span::raw(" Export CSV | "));
            status_spans.push(Span::styled("←/→", Style::default().fg(Color::Yellow)));
            status_spans.push(Span::raw(" Range | "));
            status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
            status_spans.push(Span::raw(" Nav | "));
        }
    }

    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
