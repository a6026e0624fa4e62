pub mod data;

use std::io::stdout;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame, Terminal,
};
use stockcheck_io::{ExportOptions, Upload};
use stockcheck_recon::Evaluation;

use crate::util;
use data::{partition_tabs, PartitionTab, TableData};

/// Viewer settings resolved from the settings file
pub struct ViewConfig {
    pub export: ExportOptions,
    /// Where `w` writes the report
    pub export_path: PathBuf,
}

struct TuiApp {
    upload: Upload,
    config: ViewConfig,
    /// Filter currently applied
    filter: String,
    /// Filter being typed after `/`; every keystroke re-evaluates
    draft: Option<String>,
    evaluation: Evaluation,
    tabs: Vec<PartitionTab>,
    active_tab: usize,
    cursor_row: usize,
    cursor_col: usize,
    scroll_row: usize,
    scroll_col: usize,
    file_name: String,
    should_quit: bool,
    show_help: bool,
    /// One-shot message shown in the status bar (cleared on next key)
    message: Option<String>,
}

impl TuiApp {
    fn new(upload: Upload, filter: String, config: ViewConfig) -> Self {
        let evaluation = upload.evaluate(&filter);
        let tabs = partition_tabs(&evaluation, 0);
        let file_name = upload.source.name.clone();
        Self {
            upload,
            config,
            filter,
            draft: None,
            evaluation,
            tabs,
            active_tab: 0,
            cursor_row: 0,
            cursor_col: 0,
            scroll_row: 0,
            scroll_col: 0,
            file_name,
            should_quit: false,
            show_help: false,
            message: None,
        }
    }

    fn data(&self) -> &TableData {
        &self.tabs[self.active_tab].data
    }

    /// Recompute partitions for `filter`; an invalid pattern shows all rows.
    fn apply_filter(&mut self, filter: &str) {
        self.evaluation = self.upload.evaluate(filter);
        self.tabs = partition_tabs(&self.evaluation, 0);
        self.cursor_row = 0;
        self.scroll_row = 0;
    }

    fn switch_tab(&mut self, idx: usize) {
        if idx >= self.tabs.len() || idx == self.active_tab {
            return;
        }
        self.active_tab = idx;
        self.cursor_row = 0;
        self.cursor_col = 0;
        self.scroll_row = 0;
        self.scroll_col = 0;
    }

    fn next_tab(&mut self) {
        let next = (self.active_tab + 1) % self.tabs.len();
        self.switch_tab(next);
    }

    fn prev_tab(&mut self) {
        let prev = if self.active_tab == 0 { self.tabs.len() - 1 } else { self.active_tab - 1 };
        self.switch_tab(prev);
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if self.show_help {
            // Any key dismisses help
            self.show_help = false;
            return;
        }
        if self.draft.is_some() {
            self.handle_filter_key(key);
            return;
        }
        self.message = None;

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => self.should_quit = true,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('/') => self.draft = Some(self.filter.clone()),
            KeyCode::Char('w') => self.write_export(),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1, 0),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1, 0),
            KeyCode::Left | KeyCode::Char('h') => self.move_cursor(0, -1),
            KeyCode::Right | KeyCode::Char('l') => self.move_cursor(0, 1),
            KeyCode::PageUp => self.page_up(),
            KeyCode::PageDown => self.page_down(),
            KeyCode::Home | KeyCode::Char('g') => self.cursor_row = 0,
            KeyCode::End | KeyCode::Char('G') => {
                if self.data().num_rows > 0 {
                    self.cursor_row = self.data().num_rows - 1;
                }
            }
            KeyCode::Char('0') => self.cursor_col = 0,
            KeyCode::Char('$') => {
                if self.data().num_cols > 0 {
                    self.cursor_col = self.data().num_cols - 1;
                }
            }
            KeyCode::Char(c @ '1'..='3') => {
                let idx = (c as usize) - ('1' as usize);
                self.switch_tab(idx);
            }
            KeyCode::Tab => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.prev_tab();
                } else {
                    self.next_tab();
                }
            }
            KeyCode::BackTab => self.prev_tab(),
            _ => {}
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) {
        let Some(draft) = self.draft.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Enter => {
                self.filter = draft.clone();
                self.draft = None;
            }
            KeyCode::Esc => {
                // Abandon the edit and restore the applied filter
                self.draft = None;
                let filter = self.filter.clone();
                self.apply_filter(&filter);
            }
            KeyCode::Backspace => {
                draft.pop();
                let current = draft.clone();
                self.apply_filter(&current);
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                draft.push(c);
                let current = draft.clone();
                self.apply_filter(&current);
            }
            _ => {}
        }
    }

    fn write_export(&mut self) {
        let path = self.config.export_path.clone();
        let result = self
            .upload
            .report(&self.filter, &self.config.export)
            .map_err(|e| e.to_string())
            .and_then(|bundle| {
                bundle
                    .write_export(&path)
                    .map(|_| bundle.export_result.rows_exported)
                    .map_err(|e| format!("failed to write {}: {}", path.display(), e))
            });
        self.message = Some(match result {
            Ok(rows) => format!("wrote {} ({} rows)", path.display(), rows),
            Err(e) => format!("export failed: {}", e),
        });
    }

    fn move_cursor(&mut self, drow: i32, dcol: i32) {
        let data = self.data();
        if data.num_rows == 0 || data.num_cols == 0 {
            return;
        }
        let new_row = (self.cursor_row as i32 + drow)
            .max(0)
            .min(data.num_rows as i32 - 1) as usize;
        let new_col = (self.cursor_col as i32 + dcol)
            .max(0)
            .min(data.num_cols as i32 - 1) as usize;
        self.cursor_row = new_row;
        self.cursor_col = new_col;
    }

    fn page_up(&mut self) {
        let jump = 20;
        self.cursor_row = self.cursor_row.saturating_sub(jump);
    }

    fn page_down(&mut self) {
        let jump = 20;
        let num_rows = self.data().num_rows;
        if num_rows > 0 {
            self.cursor_row = (self.cursor_row + jump).min(num_rows - 1);
        }
    }

    fn ensure_visible(&mut self, visible_rows: usize, area_width: u16) {
        if self.cursor_row < self.scroll_row {
            self.scroll_row = self.cursor_row;
        }
        if visible_rows > 0 && self.cursor_row >= self.scroll_row + visible_rows {
            self.scroll_row = self.cursor_row - visible_rows + 1;
        }

        let available = area_width as usize;
        if self.cursor_col < self.scroll_col {
            self.scroll_col = self.cursor_col;
        }
        while self.scroll_col < self.cursor_col {
            let cols = self.visible_columns(self.scroll_col, available);
            if cols.last().is_some_and(|&last| last >= self.cursor_col) {
                break;
            }
            self.scroll_col += 1;
        }
    }

    fn visible_columns(&self, start_col: usize, available: usize) -> Vec<usize> {
        let data = self.data();
        let mut cols = Vec::new();
        let mut used = 0usize;
        for c in start_col..data.num_cols {
            let w = data.col_widths.get(c).copied().unwrap_or(3) + 1;
            if used + w > available && !cols.is_empty() {
                break;
            }
            used += w;
            cols.push(c);
        }
        cols
    }

    fn highlight_color(&self) -> Color {
        let rgb = self.config.export.highlight_rgb;
        Color::Rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);

        self.draw_title(frame, chunks[0]);
        self.draw_tab_bar(frame, chunks[1]);
        self.draw_grid(frame, chunks[2]);
        self.draw_status(frame, chunks[3]);

        if self.show_help {
            self.draw_help(frame, area);
        }
    }

    fn draw_tab_bar(&self, frame: &mut Frame, area: Rect) {
        let mut spans = Vec::new();
        for (i, tab) in self.tabs.iter().enumerate() {
            let label = format!(
                " {}:{} ({}, {} *) ",
                i + 1,
                tab.title,
                tab.data.num_rows,
                tab.data.highlighted_count()
            );
            if i == self.active_tab {
                spans.push(Span::styled(
                    label,
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ));
            } else {
                spans.push(Span::styled(
                    label,
                    Style::default().fg(Color::Gray).bg(Color::DarkGray),
                ));
            }
            spans.push(Span::styled(" ", Style::default().bg(Color::Black)));
        }
        let para = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
        frame.render_widget(para, area);
    }

    fn draw_title(&self, frame: &mut Frame, area: Rect) {
        let summary = &self.evaluation.summary;
        let filter = if self.filter.trim().is_empty() {
            String::new()
        } else {
            format!(" | filter: {}", self.filter)
        };
        let title = format!(
            " stockcheck: {} | {} rows, {} with differences{} ",
            self.file_name, summary.total_rows, summary.highlighted, filter
        );
        let para = Paragraph::new(Line::from(vec![Span::styled(
            title,
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )]))
        .style(Style::default().bg(Color::Cyan));
        frame.render_widget(para, area);
    }

    fn draw_grid(&self, frame: &mut Frame, area: Rect) {
        let data = self.data();
        if data.num_rows == 0 {
            let msg = Paragraph::new("(no rows)").style(Style::default().fg(Color::DarkGray));
            frame.render_widget(msg, area);
            return;
        }

        let vis_cols = self.visible_columns(self.scroll_col, area.width as usize);
        let data_height = area.height.saturating_sub(1);

        let mut header_spans = Vec::new();
        for &c in &vis_cols {
            let name = data.col_names.get(c).map(|s| s.as_str()).unwrap_or("?");
            let w = data.col_widths.get(c).copied().unwrap_or(3);
            let display = util::fit(name, w, util::Align::Left);
            let style = if c == self.cursor_col {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            };
            header_spans.push(Span::styled(format!("{} ", display), style));
        }

        let visible_rows = data_height as usize;
        let end_row = (self.scroll_row + visible_rows).min(data.num_rows);
        let highlight = self.highlight_color();

        let mut lines: Vec<Line> = Vec::with_capacity(visible_rows + 1);
        lines.push(Line::from(header_spans));

        for r in self.scroll_row..end_row {
            let row_data = &data.rows[r];
            let is_cursor_row = r == self.cursor_row;
            let is_highlighted = data.highlighted.get(r).copied().unwrap_or(false);

            let mut spans = Vec::new();
            for &c in &vis_cols {
                let value = row_data.get(c).map(|s| s.as_str()).unwrap_or("");
                let w = data.col_widths.get(c).copied().unwrap_or(3);
                let display = util::fit(value, w, data::column_align(c));

                let base = if is_highlighted {
                    Style::default().fg(Color::Black).bg(highlight)
                } else {
                    Style::default().fg(Color::Gray)
                };
                let style = if is_cursor_row && c == self.cursor_col {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::White)
                        .add_modifier(Modifier::BOLD)
                } else if is_cursor_row {
                    base.add_modifier(Modifier::BOLD)
                } else {
                    base
                };

                spans.push(Span::styled(format!("{} ", display), style));
            }

            lines.push(Line::from(spans));
        }

        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect) {
        let (left, style) = if let Some(draft) = &self.draft {
            (format!(" /{}_", draft), Style::default().fg(Color::White).bg(Color::Blue))
        } else if let Some(message) = &self.message {
            (format!(" {}", message), Style::default().fg(Color::Black).bg(Color::Green))
        } else if let Some(warning) = &self.evaluation.warning {
            (
                format!(" {} (showing all rows)", warning),
                Style::default().fg(Color::White).bg(Color::Red),
            )
        } else {
            let data = self.data();
            let cell_value = data
                .rows
                .get(self.cursor_row)
                .and_then(|row| row.get(self.cursor_col))
                .map(|s| s.as_str())
                .unwrap_or("");
            let col_name = data.col_names.get(self.cursor_col).map(|s| s.as_str()).unwrap_or("?");
            (
                format!(" {} = {:?}", col_name, cell_value),
                Style::default().fg(Color::Black).bg(Color::DarkGray),
            )
        };

        let data = self.data();
        let row_info = if data.num_rows == 0 {
            "Row 0/0".to_string()
        } else {
            format!("Row {}/{}", self.cursor_row + 1, data.num_rows)
        };
        // A pending draft also shows a warning so typing feedback is live
        let right = match (&self.draft, &self.evaluation.warning) {
            (Some(_), Some(_)) => format!("invalid pattern  {}  ?: help ", row_info),
            _ => format!("{}  ?: help ", row_info),
        };

        let padding = (area.width as usize)
            .saturating_sub(util::display_width(&left) + util::display_width(&right));
        let status = format!("{}{:pad$}{}", left, "", right, pad = padding);

        let para = Paragraph::new(Line::from(vec![Span::styled(status, style)])).style(style);
        frame.render_widget(para, area);
    }

    fn draw_help(&self, frame: &mut Frame, area: Rect) {
        let help_lines = [
            "",
            "  Navigation",
            "  ----------",
            "  arrows / hjkl    Move cursor",
            "  PgUp / PgDn      Page up/down",
            "  Home / g          First row",
            "  End  / G          Last row",
            "  0 / $             First/last column",
            "",
            "  Partitions",
            "  ----------",
            "  Tab / Shift+Tab   Next/prev tab",
            "  1..3              Jump to tab",
            "",
            "  Report",
            "  ------",
            "  /                 Edit filter (Enter/Esc)",
            "  w                 Write report workbook",
            "",
            "  General",
            "  -------",
            "  q / Esc           Quit",
            "  ?                 Toggle this help",
            "",
        ];
        let help_width: u16 = 44;
        let help_height: u16 = help_lines.len() as u16 + 2;

        let x = area.width.saturating_sub(help_width) / 2;
        let y = area.height.saturating_sub(help_height) / 2;
        let popup = Rect::new(
            area.x + x,
            area.y + y,
            help_width.min(area.width),
            help_height.min(area.height),
        );

        let lines: Vec<Line> = help_lines
            .iter()
            .map(|s| Line::from(Span::styled(*s, Style::default().fg(Color::White))))
            .collect();

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Keybindings ")
            .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .style(Style::default().bg(Color::Black));

        frame.render_widget(Clear, popup);
        frame.render_widget(Paragraph::new(lines).block(block), popup);
    }
}

/// Run the interactive viewer over one upload.
pub fn run(upload: Upload, filter: String, config: ViewConfig) -> Result<(), String> {
    let app = TuiApp::new(upload, filter, config);
    run_app(app)
}

fn run_app(mut app: TuiApp) -> Result<(), String> {
    terminal::enable_raw_mode().map_err(|e| format!("failed to enable raw mode: {}", e))?;
    stdout()
        .execute(EnterAlternateScreen)
        .map_err(|e| format!("failed to enter alternate screen: {}", e))?;

    struct Cleanup;
    impl Drop for Cleanup {
        fn drop(&mut self) {
            let _ = stdout().execute(LeaveAlternateScreen);
            let _ = terminal::disable_raw_mode();
        }
    }
    let _cleanup = Cleanup;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend).map_err(|e| format!("failed to create terminal: {}", e))?;

    loop {
        let term_size = terminal
            .size()
            .map(|s| Rect::new(0, 0, s.width, s.height))
            .unwrap_or_default();
        // title + tabs + header + status
        let visible_rows = term_size.height.saturating_sub(4) as usize;
        app.ensure_visible(visible_rows, term_size.width);

        terminal
            .draw(|frame| app.draw(frame))
            .map_err(|e| format!("draw error: {}", e))?;

        if event::poll(Duration::from_millis(100)).map_err(|e| format!("event poll error: {}", e))? {
            if let Event::Key(key) = event::read().map_err(|e| format!("event read error: {}", e))? {
                app.handle_key(key);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockcheck_io::SourceInfo;
    use stockcheck_recon::{RawCell, RawSheet, RawWorkbook};

    fn app(dir: &std::path::Path) -> TuiApp {
        let t = |s: &str| RawCell::Text(s.into());
        let n = RawCell::Number;
        let workbook = RawWorkbook {
            sheets: vec![
                RawSheet::new(
                    "Inventaire",
                    vec!["Code article".into(), "Libelle".into(), "Qte inventaire".into()],
                    vec![vec![t("1001"), t("Lait"), n(10.0)], vec![t("2002"), t("Beurre"), n(5.0)]],
                ),
                RawSheet::new(
                    "Reception",
                    vec!["Code article".into(), "Libelle".into(), "Qte recue (UVC)".into()],
                    vec![vec![t("1001"), t("Lait"), n(7.0)], vec![t("4004"), t("Farine"), n(2.0)]],
                ),
            ],
        };
        let upload = Upload::from_workbook(SourceInfo::from_bytes("stock.xlsx", b""), &workbook).unwrap();
        let config = ViewConfig {
            export: ExportOptions::default(),
            export_path: dir.join("report.xlsx"),
        };
        TuiApp::new(upload, String::new(), config)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(app: &mut TuiApp, s: &str) {
        for c in s.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn filter_edit_is_live() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        assert_eq!(app.evaluation.summary.total_rows, 3);

        app.handle_key(key(KeyCode::Char('/')));
        type_str(&mut app, "beur");
        assert_eq!(app.evaluation.summary.total_rows, 1);
        assert_eq!(app.tabs[1].data.num_rows, 1);

        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.filter, "beur");
        assert!(app.draft.is_none());
    }

    #[test]
    fn escape_restores_applied_filter() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        app.handle_key(key(KeyCode::Char('/')));
        type_str(&mut app, "farine");
        assert_eq!(app.evaluation.summary.total_rows, 1);

        app.handle_key(key(KeyCode::Esc));
        assert!(app.draft.is_none());
        assert_eq!(app.evaluation.summary.total_rows, 3);
        assert!(!app.should_quit);
    }

    #[test]
    fn invalid_pattern_keeps_all_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        app.handle_key(key(KeyCode::Char('/')));
        type_str(&mut app, "(lait");
        assert_eq!(app.evaluation.summary.total_rows, 3);
        assert!(app.evaluation.warning.is_some());

        app.handle_key(key(KeyCode::Char(')')));
        assert!(app.evaluation.warning.is_none());
        assert_eq!(app.evaluation.summary.total_rows, 1);
    }

    #[test]
    fn write_key_exports_current_filter() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        app.filter = "lait".into();
        app.apply_filter("lait");
        app.handle_key(key(KeyCode::Char('w')));

        let bytes = std::fs::read(dir.path().join("report.xlsx")).unwrap();
        let sheets = stockcheck_io::read_export(&bytes).unwrap();
        assert_eq!(sheets[0].rows.len(), 1);
        assert!(sheets[1].rows.is_empty());
        assert!(app.message.as_deref().unwrap_or("").starts_with("wrote"));
    }

    #[test]
    fn tab_navigation() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.active_tab, 1);
        app.handle_key(key(KeyCode::Char('3')));
        assert_eq!(app.active_tab, 2);
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.active_tab, 0);
        app.handle_key(key(KeyCode::BackTab));
        assert_eq!(app.active_tab, 2);
    }
}
