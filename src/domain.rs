use std::fmt;
use std::io::Error;
use std::path::PathBuf;

use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;

use crate::flatten::RawRecord;

pub const DEFAULT_API_URL: &str = "https://randomuser.me/api/";

pub const HELP_TEXT: &str = "\
Navigation
  ←/h →/l     select column
  ↑/k ↓/j     select row
  PgUp/PgDn   page up/down
  g/G         first/last row
  ^/$         first/last column

Table
  s, Enter    toggle sort of the selected column
  click       toggle sort of the clicked header
  /           filter rows (updates while typing)
  Esc         clear filter / close popup
  c           copy cell
  y           copy row

  ?           show this help
  q           quit";

#[derive(Debug)]
pub enum LVError {
    IoError(Error),
    HttpError(reqwest::Error),
    ParseError(serde_json::Error),
    UnexpectedPayload(String),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
}

impl fmt::Display for LVError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LVError::IoError(e) => write!(f, "io error: {e}"),
            LVError::HttpError(e) => write!(f, "request failed: {e}"),
            LVError::ParseError(e) => write!(f, "invalid json: {e}"),
            LVError::UnexpectedPayload(msg) => write!(f, "unexpected payload: {msg}"),
            LVError::LoadingFailed(msg) => write!(f, "loading failed: {msg}"),
            LVError::FileNotFound => write!(f, "file not found"),
            LVError::PermissionDenied => write!(f, "permission denied"),
        }
    }
}

impl std::error::Error for LVError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LVError::IoError(e) => Some(e),
            LVError::HttpError(e) => Some(e),
            LVError::ParseError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Error> for LVError {
    fn from(err: Error) -> Self {
        LVError::IoError(err)
    }
}

impl From<reqwest::Error> for LVError {
    fn from(err: reqwest::Error) -> Self {
        LVError::HttpError(err)
    }
}

impl From<serde_json::Error> for LVError {
    fn from(err: serde_json::Error) -> Self {
        LVError::ParseError(err)
    }
}

#[derive(Debug, Clone, Setters)]
pub struct HttpConfig {
    pub url: String,
    pub results: usize,
    pub seed: Option<String>,
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            url: DEFAULT_API_URL.to_string(),
            results: 20,
            seed: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SourceConfig {
    Http(HttpConfig),
    File(PathBuf),
}

#[derive(Debug, Clone, Setters)]
pub struct LVConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub source: SourceConfig,
}

impl Default for LVConfig {
    fn default() -> Self {
        LVConfig {
            event_poll_time: 100,
            max_column_width: 40,
            source: SourceConfig::Http(HttpConfig::default()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    Filter,
}

#[derive(Debug)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    MoveToFirstColumn,
    MoveToLastColumn,
    SortColumn,
    Filter,
    Enter,
    Exit,
    Help,
    CopyCell,
    CopyRow,
    Click(u16, u16),
    Resize(usize, usize),
    RawKey(KeyEvent),
    DataLoaded(Result<Vec<RawRecord>, LVError>),
}
