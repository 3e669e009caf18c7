use std::time::Duration;
use tracing::trace;

use crate::domain::{LVConfig, LVError, Message};
use crate::model::Model;
use ratatui::crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &LVConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, LVError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(None);
        }
        let message = match event::read()? {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                if model.raw_keyevents() {
                    Some(Message::RawKey(key))
                } else {
                    self.handle_key(key)
                }
            }
            Event::Mouse(mouse) if !model.raw_keyevents() => self.handle_mouse(mouse),
            Event::Resize(width, height) => Some(Message::Resize(width as usize, height as usize)),
            _ => None,
        };
        Ok(message)
    }

    fn handle_key(&self, key: KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Char('j') | KeyCode::Down, _) => Some(Message::MoveDown),
            (KeyCode::Char('k') | KeyCode::Up, _) => Some(Message::MoveUp),
            (KeyCode::Char('h') | KeyCode::Left, _) => Some(Message::MoveLeft),
            (KeyCode::Char('l') | KeyCode::Right, _) => Some(Message::MoveRight),
            (KeyCode::PageDown, _) => Some(Message::MovePageDown),
            (KeyCode::PageUp, _) => Some(Message::MovePageUp),
            (KeyCode::Char('g') | KeyCode::Home, _) => Some(Message::MoveBeginning),
            (KeyCode::Char('G') | KeyCode::End, _) => Some(Message::MoveEnd),
            (KeyCode::Char('^'), _) => Some(Message::MoveToFirstColumn),
            (KeyCode::Char('$'), _) => Some(Message::MoveToLastColumn),
            (KeyCode::Char('s'), _) => Some(Message::SortColumn),
            (KeyCode::Enter, _) => Some(Message::Enter),
            (KeyCode::Char('/'), _) => Some(Message::Filter),
            (KeyCode::Char('c'), _) => Some(Message::CopyCell),
            (KeyCode::Char('y'), _) => Some(Message::CopyRow),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Esc, _) => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }

    fn handle_mouse(&self, mouse: MouseEvent) -> Option<Message> {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => Some(Message::Click(mouse.column, mouse.row)),
            MouseEventKind::ScrollDown => Some(Message::MoveDown),
            MouseEventKind::ScrollUp => Some(Message::MoveUp),
            _ => None,
        }
    }
}
