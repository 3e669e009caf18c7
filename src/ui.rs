use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Position, Rect},
    style::{Modifier, Style, Stylize},
    symbols::border,
    text::Line,
    widgets::{Block, Cell, Clear, Paragraph, Row, Table},
};

use crate::domain::CMDMode;
use crate::model::{Model, Status, UIData};

pub const CMDLINE_HEIGH: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const TABLE_BORDER: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;

const STATUS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
pub struct TableUI {}

impl TableUI {
    pub fn new() -> Self {
        Self {}
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [table_area, status_area] = Layout::vertical([
            Constraint::Min(0),
            Constraint::Length(CMDLINE_HEIGH as u16),
        ])
        .areas(frame.area());

        if uidata.table.is_empty() {
            self.draw_empty(model, &uidata, table_area, frame);
        } else {
            self.draw_table(&uidata, table_area, frame);
        }
        self.draw_statusline(&uidata, status_area, frame);

        if uidata.show_popup {
            self.draw_popup(&uidata, frame);
        }
    }

    fn table_block(uidata: &UIData) -> Block<'static> {
        let title = Line::from(format!(" {} ", uidata.name).bold());
        let counts = if uidata.filter.is_empty() {
            format!(" {} rows ", uidata.total_rows)
        } else {
            format!(" {}/{} rows ", uidata.nrows, uidata.total_rows)
        };
        let instructions = Line::from(vec![
            counts.into(),
            " Help ".into(),
            "<?>".blue().bold(),
            " Quit ".into(),
            "<Q> ".blue().bold(),
        ]);
        Block::bordered()
            .title(title.centered())
            .title_bottom(instructions.centered())
            .border_set(border::THICK)
    }

    fn draw_empty(&self, model: &Model, uidata: &UIData, area: Rect, frame: &mut Frame) {
        let message = match model.status {
            Status::LOADING => "Loading ...",
            _ => "No records to show",
        };
        let paragraph = Paragraph::new(Line::from(message.yellow()))
            .centered()
            .block(Self::table_block(uidata));
        frame.render_widget(paragraph, area);
    }

    fn draw_table(&self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        let header = Row::new(uidata.table.iter().enumerate().map(|(idx, column)| {
            let mut style = Style::new().add_modifier(Modifier::BOLD);
            if uidata.selected_column == Some(idx) {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Cell::from(column.name.clone()).style(style)
        }))
        .height(TABLE_HEADER_HEIGHT as u16)
        .style(Style::new().on_dark_gray());

        let nrows = uidata.table[0].data.len();
        let rows = (0..nrows).map(|ridx| {
            let row = Row::new(uidata.table.iter().enumerate().map(|(cidx, column)| {
                let cell = Cell::from(column.data[ridx].clone());
                if ridx == uidata.selected_row && uidata.selected_column == Some(cidx) {
                    cell.style(Style::new().add_modifier(Modifier::REVERSED))
                } else {
                    cell
                }
            }));
            if ridx == uidata.selected_row {
                row.style(Style::new().add_modifier(Modifier::BOLD).on_black())
            } else {
                row
            }
        });
        let widths = uidata
            .table
            .iter()
            .map(|column| Constraint::Length(column.width as u16));

        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(1)
            .flex(Flex::Start)
            .block(Self::table_block(uidata));
        frame.render_widget(table, area);
    }

    fn draw_statusline(&self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        if uidata.active_cmdinput {
            let prompt = match uidata.cmd_mode {
                Some(CMDMode::Filter) | None => "/",
            };
            let line = Line::from(vec![
                prompt.blue().bold(),
                uidata.cmdinput.input.clone().into(),
            ]);
            frame.render_widget(Paragraph::new(line), area);
            frame.set_cursor_position(Position::new(
                area.x + (prompt.len() + uidata.cmdinput.curser_pos) as u16,
                area.y,
            ));
            return;
        }

        let message = if uidata.last_status_message_update.elapsed() < STATUS_MESSAGE_TIMEOUT {
            uidata.status_message.clone()
        } else {
            String::new()
        };
        let mut spans = vec![message.into()];
        if !uidata.filter.is_empty() {
            spans.push(" filter: ".dark_gray());
            spans.push(uidata.filter.clone().yellow());
        }
        if uidata.nrows > 0 {
            spans.push(format!(" [{}/{}]", uidata.abs_selected_row + 1, uidata.nrows).dark_gray());
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_popup(&self, uidata: &UIData, frame: &mut Frame) {
        let lines = uidata.popup_message.lines().count() as u16 + 2;
        let width = uidata
            .popup_message
            .lines()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0) as u16
            + 4;
        let [area] = Layout::vertical([Constraint::Length(lines)])
            .flex(Flex::Center)
            .areas(frame.area());
        let [area] = Layout::horizontal([Constraint::Length(width)])
            .flex(Flex::Center)
            .areas(area);

        let popup = Paragraph::new(uidata.popup_message.clone()).block(
            Block::bordered()
                .title(Line::from(" Help ".bold()).centered())
                .title_bottom(Line::from(" Close <Esc> ").centered()),
        );
        frame.render_widget(Clear, area);
        frame.render_widget(popup, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LVConfig;
    use ratatui::{Terminal, backend::TestBackend};
    use serde_json::json;

    fn rendered(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|line| line.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn model() -> Model {
        let records = [json!({
            "street": {"number": 4, "name": "Elm"},
            "city": "Paris",
            "coordinates": {"latitude": "1", "longitude": "2"}
        })];
        let records: Vec<_> = records
            .into_iter()
            .filter_map(|r| r.as_object().cloned())
            .collect();
        let mut model = Model::init(&LVConfig::default(), 60, 10);
        model.start_loading("people");
        model.load_records(&records);
        model
    }

    #[test]
    fn draws_headers_and_rows() {
        let model = model();
        let mut terminal = Terminal::new(TestBackend::new(60, 10)).unwrap();
        let mut ui = TableUI::new();
        terminal.draw(|f| ui.draw(&model, f)).unwrap();

        let screen = rendered(&terminal);
        let lines: Vec<&str> = screen.lines().collect();
        assert!(lines[0].contains("people"));
        assert!(lines[1].starts_with("┃city"));
        assert!(lines[1].contains("longitude"));
        assert!(lines[2].contains("Paris"));
        assert!(lines[2].contains("Elm"));
    }

    #[test]
    fn draws_loading_state() {
        let mut model = Model::init(&LVConfig::default(), 40, 8);
        model.start_loading("people");
        let mut terminal = Terminal::new(TestBackend::new(40, 8)).unwrap();
        terminal.draw(|f| TableUI::new().draw(&model, f)).unwrap();
        assert!(rendered(&terminal).contains("Loading ..."));
    }
}
