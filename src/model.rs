use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::domain::{CMDMode, HELP_TEXT, LVConfig, LVError, Message};
use crate::filter::filter_rows;
use crate::flatten::{Dataset, FlatRow, RawRecord, Value, flatten};
use crate::inputter::{InputResult, Inputter};
use crate::sorting::SortState;
use crate::ui::{CMDLINE_HEIGH, COLUMN_WIDTH_MARGIN, TABLE_BORDER, TABLE_HEADER_HEIGHT};

#[derive(Debug, PartialEq)]
pub enum Status {
    EMPTY,
    LOADING,
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    POPUP,
    CMDINPUT,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub data: Vec<String>,
}

pub struct UIData {
    pub name: String,
    pub table: Vec<ColumnView>,
    pub nrows: usize, // Rows left after filtering
    pub total_rows: usize,
    pub selected_row: usize,
    pub selected_column: Option<usize>,
    pub abs_selected_row: usize,
    pub show_popup: bool,
    pub popup_message: String,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub filter: String,
    pub status_message: String,
    pub last_status_message_update: Instant,
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width: ui_width.saturating_sub(2 * TABLE_BORDER),
            table_height: ui_height
                .saturating_sub(CMDLINE_HEIGH + TABLE_HEADER_HEIGHT + 2 * TABLE_BORDER),
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

/// Owns the loaded dataset, its sort state and the filter query, and turns
/// messages into changes of that state.
pub struct Model {
    config: LVConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    name: String,
    dataset: Dataset,
    sort_state: SortState,
    filter_query: String,
    column_widths: Vec<usize>, // Natural width of each column, computed on load
    curser_row: usize,         // Index into the visible rows
    offset_row: usize,
    curser_column: usize, // Index into the headers
    offset_column: usize,
    uilayout: UILayout,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    popup_message: String,
    load_started: Instant,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(config: &LVConfig, ui_width: usize, ui_height: usize) -> Self {
        Self {
            config: config.clone(),
            status: Status::EMPTY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            name: String::new(),
            dataset: Dataset::default(),
            sort_state: SortState::default(),
            filter_query: String::new(),
            column_widths: Vec::new(),
            curser_row: 0,
            offset_row: 0,
            curser_column: 0,
            offset_column: 0,
            uilayout: UILayout::from_values(ui_width, ui_height),
            clipboard: None,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            popup_message: String::new(),
            load_started: Instant::now(),
            status_message: "Started lv!".to_string(),
            last_status_message_update: Instant::now(),
        }
    }

    pub fn start_loading(&mut self, name: &str) {
        self.name = name.to_string();
        self.status = Status::LOADING;
        self.load_started = Instant::now();
        self.set_status_message(format!("Loading {name} ..."));
    }

    /// Replaces the dataset with the flattened `records`. Every column starts unsorted.
    pub fn load_records(&mut self, records: &[RawRecord]) {
        let dataset = flatten(records);
        let sort_state = SortState::new(dataset.headers.len());
        let column_widths = (0..dataset.headers.len())
            .map(|idx| Self::natural_column_width(&dataset, idx))
            .collect();

        self.dataset = dataset;
        self.sort_state = sort_state;
        self.column_widths = column_widths;
        self.curser_row = 0;
        self.offset_row = 0;
        self.curser_column = 0;
        self.offset_column = 0;
        self.status = Status::READY;

        let loading_duration = self.load_started.elapsed().as_millis();
        info!(
            "Loaded {} rows with {} columns in {loading_duration}ms",
            self.dataset.rows.len(),
            self.dataset.headers.len()
        );
        debug!("Headers: {:?}", self.dataset.headers);
        self.set_status_message(format!(
            "Loaded {} rows in {loading_duration}ms ...",
            self.dataset.rows.len()
        ));
    }

    /// Keeps whatever was loaded before and only reports the failure.
    pub fn on_load_failed(&mut self, err: LVError) {
        error!("Loading {} failed: {err}", self.name);
        self.status = if self.dataset.rows.is_empty() {
            Status::EMPTY
        } else {
            Status::READY
        };
        self.set_status_message(format!("Loading failed: {err}"));
    }

    pub fn headers(&self) -> &[String] {
        &self.dataset.headers
    }

    pub fn rows(&self) -> &[FlatRow] {
        &self.dataset.rows
    }

    /// Rows matching the current filter, recomputed on every call.
    pub fn visible_rows(&self) -> Vec<&FlatRow> {
        filter_rows(&self.dataset.rows, &self.filter_query)
    }

    pub fn sort_state(&self) -> &SortState {
        &self.sort_state
    }

    pub fn filter_query(&self) -> &str {
        &self.filter_query
    }

    pub fn on_header_activated(&mut self, header: &str) {
        let Some(column) = self.dataset.column_of(header) else {
            warn!("Ignoring activation of unknown header \"{header}\"");
            return;
        };
        let start_time = Instant::now();
        self.sort_state.toggle(&mut self.dataset.rows, column);
        trace!(
            "Sorting \"{header}\" took {}ms",
            start_time.elapsed().as_millis()
        );

        if let Some((_, order)) = self.sort_state.active() {
            self.set_status_message(format!("Sorted by {header} {}", order.symbol()));
        }
    }

    pub fn on_filter_input_changed(&mut self, query: impl Into<String>) {
        self.filter_query = query.into();
        self.curser_row = 0;
        self.offset_row = 0;
        trace!("Filter query is now \"{}\"", self.filter_query);
        if self.filter_query.is_empty() {
            self.set_status_message("Filter cleared");
        } else {
            let matches = self.visible_rows().len();
            self.set_status_message(format!(
                "Filter matches {matches} of {} rows",
                self.dataset.rows.len()
            ));
        }
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), LVError> {
        let Some(msg) = message else {
            return Ok(());
        };

        // Not bound to a modus
        let msg = match msg {
            Message::DataLoaded(result) => {
                match result {
                    Ok(records) => self.load_records(&records),
                    Err(err) => self.on_load_failed(err),
                }
                return Ok(());
            }
            Message::Resize(width, height) => {
                self.ui_resize(width, height);
                return Ok(());
            }
            other => other,
        };

        match self.modus {
            Modus::TABLE => match msg {
                Message::Quit => self.quit(),
                Message::MoveDown => self.move_selection_down(1),
                Message::MoveUp => self.move_selection_up(1),
                Message::MoveLeft => self.move_selection_left(),
                Message::MoveRight => self.move_selection_right(),
                Message::MovePageUp => self.move_selection_up(self.uilayout.table_height.max(1)),
                Message::MovePageDown => {
                    self.move_selection_down(self.uilayout.table_height.max(1))
                }
                Message::MoveBeginning => self.move_selection_up(usize::MAX),
                Message::MoveEnd => self.move_selection_down(usize::MAX),
                Message::MoveToFirstColumn => self.select_column(0),
                Message::MoveToLastColumn => {
                    self.select_column(self.dataset.headers.len().saturating_sub(1))
                }
                Message::SortColumn | Message::Enter => self.sort_current_column(),
                Message::Click(x, y) => self.click(x, y),
                Message::Filter => self.enter_cmd_mode(CMDMode::Filter),
                Message::CopyCell => self.copy_cell(),
                Message::CopyRow => self.copy_row(),
                Message::Help => self.show_help(),
                Message::Exit => self.exit(),
                _ => (),
            },
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Exit | Message::Enter | Message::Help => self.exit(),
                _ => (),
            },
            Modus::CMDINPUT => {
                if let Message::RawKey(key) = msg {
                    self.raw_input(key)
                }
            }
        }
        Ok(())
    }

    /// Snapshot of everything the ui needs to draw one frame.
    pub fn get_uidata(&self) -> UIData {
        let rows = self.visible_rows();
        let rbegin = std::cmp::min(self.offset_row, rows.len());
        let rend = std::cmp::min(rbegin + self.uilayout.table_height, rows.len());
        let columns = self.visible_columns();
        let active = self.sort_state().active();

        let table = columns
            .iter()
            .map(|&(idx, width)| {
                let label = match active {
                    Some((column, order)) if column == idx => {
                        format!("{} {}", self.headers()[idx], order.symbol())
                    }
                    _ => self.headers()[idx].clone(),
                };
                ColumnView {
                    name: Self::get_visible_name(&label, width),
                    width,
                    data: rows[rbegin..rend]
                        .iter()
                        .map(|row| Self::cell_text(row.get(idx)))
                        .collect(),
                }
            })
            .collect();

        UIData {
            name: self.name.clone(),
            table,
            nrows: rows.len(),
            total_rows: self.rows().len(),
            selected_row: self.curser_row.saturating_sub(self.offset_row),
            selected_column: columns
                .iter()
                .position(|&(idx, _)| idx == self.curser_column),
            abs_selected_row: self.curser_row,
            show_popup: self.modus == Modus::POPUP,
            popup_message: self.popup_message.clone(),
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.active_cmdinput,
            filter: self.filter_query().to_string(),
            status_message: self.status_message.clone(),
            last_status_message_update: self.last_status_message_update,
        }
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }

    fn cell_text(value: Option<&Value>) -> String {
        match value {
            None | Some(Value::Null) => String::from("∅"),
            Some(v) => v.to_string().replace("\r\n", " ↵ ").replace('\n', " ↵ "),
        }
    }

    fn natural_column_width(dataset: &Dataset, idx: usize) -> usize {
        // Leave room for the sort symbol behind the header name
        let header_width = dataset.headers[idx].chars().count() + 2;
        let max_width = dataset
            .rows
            .iter()
            .map(|row| Self::cell_text(row.get(idx)).chars().count())
            .max()
            .unwrap_or(0);
        std::cmp::max(header_width, max_width) + COLUMN_WIDTH_MARGIN
    }

    fn render_width(&self, idx: usize) -> usize {
        std::cmp::min(
            self.column_widths.get(idx).copied().unwrap_or(0),
            self.config.max_column_width,
        )
    }

    /// Columns that fit into the table starting at the column offset, with the
    /// width each is rendered at. The last one may be cut short.
    fn visible_columns(&self) -> Vec<(usize, usize)> {
        let mut columns = Vec::new();
        let mut visible_width = 0;
        for idx in self.offset_column..self.dataset.headers.len() {
            let width = self.render_width(idx);
            if visible_width + width + 1 <= self.uilayout.table_width {
                columns.push((idx, width));
                visible_width += width + 1;
            } else {
                if visible_width < self.uilayout.table_width {
                    columns.push((idx, self.uilayout.table_width - visible_width));
                }
                break;
            }
        }
        columns
    }

    fn get_visible_name(name: &str, width: usize) -> String {
        if width < 3 {
            return String::new();
        }
        if name.chars().count() > width {
            let mut reduced_name: String = name.chars().take(width - 3).collect();
            reduced_name.push_str("...");
            reduced_name
        } else {
            name.to_string()
        }
    }

    /// Column under the terminal x coordinate, if the click hits a column.
    fn column_at(&self, x: u16) -> Option<usize> {
        let mut x = (x as usize).checked_sub(TABLE_BORDER)?;
        for (idx, width) in self.visible_columns() {
            if x < width {
                return Some(idx);
            }
            if x == width {
                return None; // column spacer
            }
            x -= width + 1;
        }
        None
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        self.scroll_to_row();
        self.scroll_to_column();
    }

    // -------------------- Control handling functions ---------------------- //

    fn exit(&mut self) {
        match self.modus {
            Modus::TABLE => {
                if !self.filter_query.is_empty() {
                    self.on_filter_input_changed(String::new());
                }
            }
            Modus::POPUP => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
            }
            Modus::CMDINPUT => {}
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.popup_message = HELP_TEXT.to_string();
    }

    fn sort_current_column(&mut self) {
        if let Some(header) = self.dataset.headers.get(self.curser_column).cloned() {
            self.on_header_activated(&header);
        }
    }

    fn click(&mut self, x: u16, y: u16) {
        let y = y as usize;
        let header_row = TABLE_BORDER;
        if y == header_row {
            if let Some(column) = self.column_at(x) {
                self.curser_column = column;
                let header = self.dataset.headers[column].clone();
                self.on_header_activated(&header);
            }
        } else if y > header_row && y < header_row + TABLE_HEADER_HEIGHT + self.uilayout.table_height
        {
            let row = self.offset_row + y - header_row - TABLE_HEADER_HEIGHT;
            if row < self.visible_rows().len() {
                self.curser_row = row;
            }
            if let Some(column) = self.column_at(x) {
                self.curser_column = column;
            }
        }
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode {mode:?} ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.active_cmdinput = true;

        self.input.clear();
        self.input.set(&self.filter_query);
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if !self.active_cmdinput {
            return;
        }
        self.last_input = self.input.read(key);
        if self.last_input.changed {
            match self.cmd_mode {
                Some(CMDMode::Filter) => self.on_filter_input_changed(self.last_input.input.clone()),
                None => info!("Input without command mode: {}", self.last_input.input),
            }
        }
        if self.last_input.finished {
            self.leave_cmd_mode();
        }
    }

    fn leave_cmd_mode(&mut self) {
        trace!("Leaving command mode with \"{}\"", self.last_input.input);
        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;
        self.cmd_mode = None;
    }

    fn selected_row(&self) -> Option<&FlatRow> {
        self.visible_rows().get(self.curser_row).copied()
    }

    fn clipboard(&mut self) -> Option<&mut Clipboard> {
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => error!("Clipboard is not available: {e}"),
            }
        }
        self.clipboard.as_mut()
    }

    fn copy_to_clipboard(&mut self, text: String, what: &str) {
        match self.clipboard().map(|clipboard| clipboard.set_text(text)) {
            Some(Ok(())) => self.set_status_message(format!("Copied {what} to clipboard")),
            Some(Err(e)) => {
                error!("Failed to copy {what}: {e}");
                self.set_status_message(format!("Failed to copy {what}!"));
            }
            None => self.set_status_message("Clipboard not available!"),
        }
    }

    fn copy_cell(&mut self) {
        let text = self
            .selected_row()
            .and_then(|row| row.get(self.curser_column))
            .map(|v| v.to_string());
        if let Some(text) = text {
            self.copy_to_clipboard(text, "cell");
        }
    }

    fn copy_row(&mut self) {
        let text = self.selected_row().map(|row| {
            row.cells()
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join("\t")
        });
        if let Some(text) = text {
            self.copy_to_clipboard(text, "row");
        }
    }

    fn scroll_to_row(&mut self) {
        let height = self.uilayout.table_height.max(1);
        if self.curser_row < self.offset_row {
            self.offset_row = self.curser_row;
        } else if self.curser_row >= self.offset_row + height {
            self.offset_row = self.curser_row + 1 - height;
        }
    }

    fn scroll_to_column(&mut self) {
        if self.curser_column < self.offset_column {
            self.offset_column = self.curser_column;
            return;
        }
        // Move right until the selected column is rendered at full width
        while self.offset_column < self.curser_column {
            let fully_visible = self
                .visible_columns()
                .iter()
                .any(|&(idx, width)| idx == self.curser_column && width == self.render_width(idx));
            if fully_visible {
                break;
            }
            self.offset_column += 1;
        }
    }

    fn move_selection_up(&mut self, size: usize) {
        self.curser_row = self.curser_row.saturating_sub(size);
        self.scroll_to_row();
    }

    fn move_selection_down(&mut self, size: usize) {
        let last = self.visible_rows().len().saturating_sub(1);
        self.curser_row = std::cmp::min(self.curser_row.saturating_add(size), last);
        self.scroll_to_row();
    }

    fn move_selection_left(&mut self) {
        self.select_column(self.curser_column.saturating_sub(1));
    }

    fn move_selection_right(&mut self) {
        self.select_column(self.curser_column + 1);
    }

    fn select_column(&mut self, column: usize) {
        if column < self.dataset.headers.len() {
            self.curser_column = column;
            self.scroll_to_column();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sorting::SortDirection;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};
    use serde_json::json;

    fn location(number: i64, name: &str, city: &str, state: &str) -> RawRecord {
        let value = json!({
            "street": {"number": number, "name": name},
            "city": city,
            "state": state,
            "coordinates": {"latitude": "10.5", "longitude": "-3.25"},
            "timezone": {"offset": "+1:00", "description": "Paris"}
        });
        match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn records() -> Vec<RawRecord> {
        vec![
            location(12, "Oak", "Boston", "Ohio"),
            location(7, "Birch", "Austin", "Texas"),
            location(31, "Elm", "Denver", "Colorado"),
        ]
    }

    fn loaded_model() -> Model {
        let mut model = Model::init(&LVConfig::default(), 120, 30);
        model.start_loading("test");
        model.load_records(&records());
        model
    }

    fn column(model: &Model, header: &str) -> Vec<String> {
        let idx = model.dataset.column_of(header).unwrap();
        model
            .visible_rows()
            .iter()
            .map(|row| row.get(idx).unwrap().to_string())
            .collect()
    }

    fn key(code: KeyCode) -> Message {
        Message::RawKey(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn sort_then_filter_end_to_end() {
        let mut model = loaded_model();
        let headers = model.headers().to_vec();
        assert_eq!(
            headers,
            vec!["city", "state", "number", "name", "latitude", "longitude"]
        );

        model.on_header_activated("name");
        assert_eq!(column(&model, "name"), vec!["Birch", "Elm", "Oak"]);

        model.on_filter_input_changed("b");
        assert_eq!(column(&model, "name"), vec!["Birch", "Oak"]);
        assert_eq!(model.rows().len(), 3);
        assert_eq!(model.headers(), headers.as_slice());
    }

    #[test]
    fn double_toggle_reverses_order() {
        let mut model = loaded_model();
        model.on_header_activated("number");
        assert_eq!(column(&model, "number"), vec!["7", "12", "31"]);
        model.on_header_activated("number");
        assert_eq!(column(&model, "number"), vec!["31", "12", "7"]);
    }

    #[test]
    fn toggling_another_header_keeps_previous_direction() {
        let mut model = loaded_model();
        model.on_header_activated("city");
        model.on_header_activated("number");

        let city = model.dataset.column_of("city").unwrap();
        let number = model.dataset.column_of("number").unwrap();
        assert_eq!(model.sort_state().direction(city), SortDirection::Descending);
        assert_eq!(model.sort_state().direction(number), SortDirection::Descending);
        assert_eq!(column(&model, "city"), vec!["Austin", "Boston", "Denver"]);
        assert_eq!(model.sort_state().active(), Some((number, SortDirection::Ascending)));
    }

    #[test]
    fn unknown_header_is_ignored() {
        let mut model = loaded_model();
        let before = model.rows().to_vec();
        model.on_header_activated("timezone");
        assert_eq!(model.rows(), before.as_slice());
        assert_eq!(model.sort_state().active(), None);
    }

    #[test]
    fn filter_is_case_asymmetric() {
        let mut model = loaded_model();
        model.on_filter_input_changed("den");
        assert_eq!(column(&model, "city"), vec!["Denver"]);
        model.on_filter_input_changed("DEN");
        assert!(model.visible_rows().is_empty());
        model.on_filter_input_changed("");
        assert_eq!(model.visible_rows().len(), 3);
    }

    #[test]
    fn filter_updates_on_every_keystroke() {
        let mut model = loaded_model();
        model.update(Some(Message::Filter)).unwrap();
        assert!(model.raw_keyevents());

        model.update(Some(key(KeyCode::Char('t')))).unwrap();
        assert_eq!(model.filter_query(), "t");
        assert_eq!(model.visible_rows().len(), 2); // Boston, Austin/Texas

        model.update(Some(key(KeyCode::Char('e')))).unwrap();
        assert_eq!(model.filter_query(), "te");
        assert_eq!(column(&model, "state"), vec!["Texas"]);

        model.update(Some(key(KeyCode::Enter))).unwrap();
        assert!(!model.raw_keyevents());
        assert_eq!(model.filter_query(), "te");

        // Esc in table mode drops the filter
        model.update(Some(Message::Exit)).unwrap();
        assert_eq!(model.filter_query(), "");
    }

    #[test]
    fn escape_in_filter_prompt_clears_query() {
        let mut model = loaded_model();
        model.update(Some(Message::Filter)).unwrap();
        model.update(Some(key(KeyCode::Char('o')))).unwrap();
        assert_eq!(model.visible_rows().len(), 2);
        model.update(Some(key(KeyCode::Esc))).unwrap();
        assert_eq!(model.filter_query(), "");
        assert_eq!(model.visible_rows().len(), 3);
        assert!(!model.raw_keyevents());
    }

    #[test]
    fn failed_load_keeps_previous_rows() {
        let mut model = loaded_model();
        model
            .update(Some(Message::DataLoaded(Err(LVError::FileNotFound))))
            .unwrap();
        assert_eq!(model.rows().len(), 3);
        assert_eq!(model.status, Status::READY);
        assert!(model.get_uidata().status_message.contains("file not found"));

        let mut empty = Model::init(&LVConfig::default(), 80, 24);
        empty
            .update(Some(Message::DataLoaded(Err(LVError::FileNotFound))))
            .unwrap();
        assert_eq!(empty.status, Status::EMPTY);
        assert!(empty.headers().is_empty());
    }

    #[test]
    fn data_loaded_message_builds_dataset() {
        let mut model = Model::init(&LVConfig::default(), 80, 24);
        model.update(Some(Message::DataLoaded(Ok(records())))).unwrap();
        assert_eq!(model.status, Status::READY);
        assert_eq!(model.headers().len(), 6);
        assert!(model.sort_state().active().is_none());
        for idx in 0..6 {
            assert_eq!(model.sort_state().direction(idx), SortDirection::Unsorted);
        }
    }

    #[test]
    fn keyboard_sort_uses_selected_column() {
        let mut model = loaded_model();
        model.update(Some(Message::MoveRight)).unwrap();
        model.update(Some(Message::SortColumn)).unwrap();
        assert_eq!(column(&model, "state"), vec!["Colorado", "Ohio", "Texas"]);
        model.update(Some(Message::Enter)).unwrap();
        assert_eq!(column(&model, "state"), vec!["Texas", "Ohio", "Colorado"]);
    }

    #[test]
    fn clicking_a_header_sorts_it() {
        let mut model = loaded_model();
        // "city" is the first column, starting right after the border
        model.update(Some(Message::Click(1, 1))).unwrap();
        assert_eq!(column(&model, "city"), vec!["Austin", "Boston", "Denver"]);

        let name = model.dataset.column_of("name").unwrap();
        let x: usize = TABLE_BORDER + (0..name).map(|i| model.render_width(i) + 1).sum::<usize>();
        model.update(Some(Message::Click(x as u16, 1))).unwrap();
        assert_eq!(column(&model, "name"), vec!["Birch", "Elm", "Oak"]);
        assert_eq!(model.curser_column, name);
    }

    #[test]
    fn clicking_a_row_selects_it() {
        let mut model = loaded_model();
        model.update(Some(Message::Click(1, 3))).unwrap();
        assert_eq!(model.curser_row, 1);
        model.update(Some(Message::Click(1, 20))).unwrap();
        assert_eq!(model.curser_row, 1);
    }

    #[test]
    fn uidata_shows_sorted_and_filtered_window() {
        let mut model = loaded_model();
        model.on_header_activated("city");
        model.on_filter_input_changed("o");

        let uidata = model.get_uidata();
        assert_eq!(uidata.total_rows, 3);
        assert_eq!(uidata.nrows, 2);
        assert_eq!(uidata.table[0].name, "city ↑");
        assert_eq!(uidata.table[0].data, vec!["Boston", "Denver"]);
        assert_eq!(uidata.selected_column, Some(0));
        assert_eq!(uidata.filter, "o");
    }

    #[test]
    fn columns_are_cut_to_the_table_width() {
        let config = LVConfig::default().max_column_width(10);
        let mut model = Model::init(&config, 24, 10);
        model.load_records(&records());

        let columns = model.visible_columns();
        let total: usize = columns.iter().map(|(_, w)| w + 1).sum();
        assert!(total <= model.uilayout.table_width + 1);
        assert_eq!(columns[0], (0, 7)); // "city" + sort symbol + margin

        // Walking right scrolls the offset so the selection stays visible
        for _ in 0..5 {
            model.update(Some(Message::MoveRight)).unwrap();
        }
        assert_eq!(model.curser_column, 5);
        assert!(model.offset_column > 0);
        let uidata = model.get_uidata();
        assert!(uidata.selected_column.is_some());
    }

    #[test]
    fn row_cursor_stays_in_bounds() {
        let mut model = loaded_model();
        model.update(Some(Message::MovePageDown)).unwrap();
        assert_eq!(model.curser_row, 2);
        model.update(Some(Message::MoveUp)).unwrap();
        assert_eq!(model.curser_row, 1);
        model.update(Some(Message::MoveBeginning)).unwrap();
        assert_eq!(model.curser_row, 0);
        model.on_filter_input_changed("zzz");
        model.update(Some(Message::MoveDown)).unwrap();
        assert_eq!(model.curser_row, 0);
    }

    #[test]
    fn help_popup_opens_and_closes() {
        let mut model = loaded_model();
        model.update(Some(Message::Help)).unwrap();
        assert!(model.get_uidata().show_popup);
        model.update(Some(Message::MoveDown)).unwrap();
        assert_eq!(model.curser_row, 0);
        model.update(Some(Message::Exit)).unwrap();
        assert!(!model.get_uidata().show_popup);
    }

    #[test]
    fn quit() {
        let mut model = loaded_model();
        model.update(Some(Message::Quit)).unwrap();
        assert_eq!(model.status, Status::QUITTING);
    }

    #[test]
    fn visible_name_is_shortened() {
        assert_eq!(Model::get_visible_name("longitude", 20), "longitude");
        assert_eq!(Model::get_visible_name("longitude", 6), "lon...");
        assert_eq!(Model::get_visible_name("straße", 5), "st...");
        assert_eq!(Model::get_visible_name("city", 2), "");
    }
}
