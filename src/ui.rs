use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};

use crate::browser::{LoadState, PAGE_SIZES, RecordBrowser};
use crate::domain::{CMDMode, HELP_TEXT};
use crate::form::EditForm;
use crate::model::{Modus, Model};
use crate::record::Column;

const SKELETON: &str = "░░░░░░░░░░░░░░░░░░░░░░░░";

/// Screen offset for a character position, pinned to the last column when it does not fit.
fn cell_offset(chars: usize) -> u16 {
    u16::try_from(chars).unwrap_or(u16::MAX)
}

#[derive(Debug, Default)]
pub struct TableUI {}

impl TableUI {
    pub fn new() -> Self {
        Self {}
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let [title_area, table_area, footer_area, status_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        self.draw_title(model, frame, title_area);

        let browser = model.browser();
        match browser.load_state() {
            LoadState::Loading => self.draw_skeleton(browser, frame, table_area),
            LoadState::Failed(message) => self.draw_error(browser, message, frame, table_area),
            LoadState::Ready => {
                self.draw_table(browser, frame, table_area);
                self.draw_footer(browser, frame, footer_area);
            }
        }

        self.draw_status(model, frame, status_area);

        match model.modus() {
            Modus::RECORD => self.draw_record(model, frame),
            Modus::FORM => {
                if let Some(form) = model.form() {
                    self.draw_form(form, frame);
                }
            }
            Modus::CONFIRM => self.draw_confirm(model, frame),
            Modus::POPUP => self.draw_help(frame),
            Modus::TABLE | Modus::CMDINPUT => (),
        }
    }

    fn draw_title(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let browser = model.browser();
        let mut spans = vec![
            " folio ".bold().reversed(),
            format!(" {} ", browser.collection().label()).bold(),
            format!("({})", model.source()).dim(),
        ];
        if !browser.search_term().is_empty() {
            spans.push(format!("  search: {}", browser.search_term()).yellow());
        }
        // Hidden columns, with the key that brings them back
        for (i, (column, visible)) in browser.visibility().entries().iter().enumerate() {
            if !visible {
                spans.push(format!("  {}:{}", i + 1, column.name()).dim().crossed_out());
            }
        }
        frame.render_widget(Line::from(spans), area);
    }

    fn table_block(&self, browser: &RecordBrowser) -> Block<'static> {
        let title = Line::from(format!(" All {} ", browser.collection().label()).bold());
        let instructions = Line::from(vec![
            " View ".into(),
            "<v>".blue().bold(),
            " Edit ".into(),
            "<e>".blue().bold(),
            " Delete ".into(),
            "<d>".blue().bold(),
            " New ".into(),
            "<n>".blue().bold(),
            " Search ".into(),
            "</>".blue().bold(),
            " Help ".into(),
            "<?> ".blue().bold(),
        ]);
        Block::bordered()
            .title(title.centered())
            .title_bottom(instructions.centered())
            .border_set(border::THICK)
    }

    fn header(&self, browser: &RecordBrowser, columns: &[Column]) -> Row<'static> {
        let collection = browser.collection();
        let mut cells: Vec<Cell> = columns.iter().map(|c| Cell::from(c.header(collection))).collect();
        cells.push(Cell::from("Actions"));
        Row::new(cells).style(Style::default().add_modifier(Modifier::BOLD)).bottom_margin(1)
    }

    fn widths(columns: &[Column]) -> Vec<Constraint> {
        let mut widths: Vec<Constraint> = columns
            .iter()
            .map(|c| match c {
                Column::Title => Constraint::Fill(3),
                Column::Tags | Column::Technologies | Column::Features => Constraint::Fill(2),
                Column::ProjectType => Constraint::Length(10),
                Column::Views => Constraint::Length(6),
                Column::CreatedAt => Constraint::Length(11),
            })
            .collect();
        widths.push(Constraint::Length(11));
        widths
    }

    fn draw_table(&self, browser: &RecordBrowser, frame: &mut Frame, area: Rect) {
        let columns: Vec<Column> = browser.visibility().visible().collect();
        let block = self.table_block(browser);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let slice = browser.page_slice();
        let rows: Vec<Row> = slice
            .iter()
            .map(|record| {
                let mut cells: Vec<Cell> = columns.iter().map(|&c| Cell::from(record.cell(c))).collect();
                cells.push(Cell::from("v e d".dim()));
                Row::new(cells)
            })
            .collect();

        let table = Table::new(rows, Self::widths(&columns))
            .header(self.header(browser, &columns))
            .column_spacing(2)
            .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
            .highlight_symbol("> ");

        let mut state = TableState::default();
        if !slice.is_empty() {
            state.select(Some(browser.cursor()));
        }
        frame.render_stateful_widget(table, inner, &mut state);

        if slice.is_empty() && inner.height > 2 {
            let empty = Rect { y: inner.y + 2, height: 1, ..inner };
            let message = format!("No {} found", browser.collection().label());
            frame.render_widget(Paragraph::new(message.italic()).centered(), empty);
        }
    }

    fn draw_skeleton(&self, browser: &RecordBrowser, frame: &mut Frame, area: Rect) {
        let columns: Vec<Column> = browser.visibility().visible().collect();
        let block = self.table_block(browser);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows: Vec<Row> = (0..browser.page().size)
            .map(|_| {
                let cells = (0..=columns.len()).map(|_| Cell::from(SKELETON.dim()));
                Row::new(cells.collect::<Vec<Cell>>())
            })
            .collect();
        let table = Table::new(rows, Self::widths(&columns))
            .header(self.header(browser, &columns))
            .column_spacing(2);
        frame.render_widget(table, inner);
    }

    fn draw_error(&self, browser: &RecordBrowser, message: &str, frame: &mut Frame, area: Rect) {
        let block = Block::bordered()
            .title(Line::from(" Something went wrong ".bold()).centered())
            .border_style(Style::default().fg(Color::Red))
            .border_set(border::THICK);
        let text = Text::from(vec![
            Line::from(""),
            Line::from(format!("Could not load {}", browser.collection().label()).bold().red()),
            Line::from(""),
            Line::from(message.to_string()),
            Line::from(""),
            Line::from(vec!["Press ".into(), "<r>".blue().bold(), " to retry".into()]),
        ]);
        frame.render_widget(
            Paragraph::new(text).centered().wrap(Wrap { trim: true }).block(block),
            area,
        );
    }

    fn draw_footer(&self, browser: &RecordBrowser, frame: &mut Frame, area: Rect) {
        let [left, middle, right] =
            Layout::horizontal([Constraint::Fill(1), Constraint::Fill(1), Constraint::Fill(1)]).areas(area);

        let page = browser.page();
        let mut sizes: Vec<Span> = vec![" Rows per page: ".into()];
        for size in PAGE_SIZES {
            if size == page.size {
                sizes.push(format!("[{size}]").yellow().bold());
            } else {
                sizes.push(format!(" {size} ").dim());
            }
        }
        frame.render_widget(Line::from(sizes), left);

        let showing = format!(
            "Showing {} of {} {}",
            browser.visible_record_count(),
            browser.filtered_len(),
            browser.collection().label()
        );
        frame.render_widget(Line::from(showing).centered(), middle);

        let affordance = |label: &'static str, enabled: bool| -> Span<'static> {
            if enabled { label.bold() } else { label.dim() }
        };
        let pages = Line::from(vec![
            affordance("« prev", browser.can_go_previous()),
            format!("  Page {} of {}  ", page.index, browser.total_pages().max(1)).into(),
            affordance("next » ", browser.can_go_next()),
        ]);
        frame.render_widget(pages.right_aligned(), right);
    }

    fn draw_status(&self, model: &Model, frame: &mut Frame, area: Rect) {
        if let Some((mode, input)) = model.cmd_input() {
            let prefix = match mode {
                CMDMode::Search => "/",
                CMDMode::Raw => ":",
            };
            frame.render_widget(Line::from(format!("{prefix}{}", input.input)), area);
            let x = area.x.saturating_add(1).saturating_add(cell_offset(input.cursor));
            frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
            return;
        }
        let (message, is_error) = model.status_message();
        let line = if is_error {
            Line::from(message.to_string().red().bold())
        } else if message.is_empty() {
            Line::from(" r refresh  s rows per page  1-9 columns  Tab switch  : command  q quit".dim())
        } else {
            Line::from(message.to_string())
        };
        frame.render_widget(line, area);
    }

    // -------------------- Popups ---------------------- //

    fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
        let [area] = Layout::vertical([Constraint::Length(height)]).flex(Flex::Center).areas(area);
        let [area] = Layout::horizontal([Constraint::Length(width)]).flex(Flex::Center).areas(area);
        area
    }

    fn draw_record(&self, model: &Model, frame: &mut Frame) {
        let Some(dialog) = model.browser().dialog() else {
            return;
        };
        let record = &dialog.record;
        let mut lines = Vec::new();
        for (label, value) in record.fields() {
            lines.push(Line::from(format!("{label}:").bold()));
            for part in value.lines() {
                lines.push(Line::from(format!("  {part}")));
            }
            lines.push(Line::from(""));
        }
        let area = Self::popup_area(frame.area(), 72, 24);
        let block = Block::bordered()
            .title(Line::from(format!(" {} ", record.title()).bold()).centered())
            .title_bottom(Line::from(" Scroll <j/k> Edit <e> Close <Esc> ").centered());
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .scroll((model.record_scroll(), 0))
                .block(block),
            area,
        );
    }

    fn draw_form(&self, form: &EditForm, frame: &mut Frame) {
        let mut lines = Vec::new();
        for (i, field) in form.fields().iter().enumerate() {
            let focused = i == form.focus();
            let label = if focused { field.key.label().yellow().bold() } else { field.key.label().bold() };
            lines.push(Line::from(label));
            let marker = if focused { "> " } else { "  " };
            lines.push(Line::from(format!("{marker}{}", field.value)));
        }
        lines.push(Line::from(""));
        if form.submitting {
            lines.push(Line::from("Saving ...".italic()));
        } else if let Some(error) = &form.error {
            lines.push(Line::from(error.clone().red().bold()));
        }

        let height = lines.len() as u16 + 2;
        let area = Self::popup_area(frame.area(), 72, height);
        let block = Block::bordered()
            .title(Line::from(format!(" {} ", form.heading()).bold()).centered())
            .title_bottom(Line::from(" Next <Tab> Save <Enter> Cancel <Esc> ").centered());
        let inner = block.inner(area);
        frame.render_widget(Clear, area);
        frame.render_widget(Paragraph::new(lines).block(block), area);

        let y = inner
            .y
            .saturating_add(cell_offset(form.focus()).saturating_mul(2))
            .saturating_add(1);
        let x = inner.x.saturating_add(2).saturating_add(cell_offset(form.cursor()));
        if y < inner.bottom() {
            frame.set_cursor_position((x.min(inner.right().saturating_sub(1)), y));
        }
    }

    fn draw_confirm(&self, model: &Model, frame: &mut Frame) {
        let Some(dialog) = model.browser().dialog() else {
            return;
        };
        let noun = dialog.record.collection().noun().to_lowercase();
        let action = if model.deleting() {
            Line::from("Deleting ...".italic())
        } else {
            Line::from(vec!["<y>".red().bold(), " delete   ".into(), "<n>".blue().bold(), " cancel".into()])
        };
        let text = Text::from(vec![
            Line::from(format!("Delete {noun} \"{}\"?", dialog.record.title())),
            Line::from("This cannot be undone.".dim()),
            Line::from(""),
            action,
        ]);
        let area = Self::popup_area(frame.area(), 60, 6);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(text)
                .centered()
                .wrap(Wrap { trim: true })
                .block(Block::bordered().border_style(Style::default().fg(Color::Red))),
            area,
        );
    }

    fn draw_help(&self, frame: &mut Frame) {
        let height = HELP_TEXT.lines().count() as u16 + 2;
        let area = Self::popup_area(frame.area(), 64, height);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(HELP_TEXT).block(Block::bordered().title(Line::from(" Keys ".bold()).centered())),
            area,
        );
    }
}
