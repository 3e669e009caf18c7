use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value as Json;
use tracing::{debug, info, instrument, warn};

use crate::domain::{HttpConfig, LVError, SourceConfig};
use crate::flatten::RawRecord;

/// Something that delivers the raw location records to display.
pub trait RecordSource: Send {
    fn fetch_records(&self) -> Result<Vec<RawRecord>, LVError>;

    /// Short name shown while loading.
    fn describe(&self) -> String;
}

#[derive(Deserialize)]
struct Person {
    #[serde(default)]
    location: Option<Json>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Api { results: Vec<Person> },
    Failure { error: String },
    People(Vec<Person>),
}

/// Extracts the `location` object of every person in the payload.
fn locations(payload: Payload) -> Result<Vec<RawRecord>, LVError> {
    let people = match payload {
        Payload::Api { results } => results,
        Payload::People(people) => people,
        Payload::Failure { error } => return Err(LVError::UnexpectedPayload(error)),
    };

    let total = people.len();
    let records: Vec<RawRecord> = people
        .into_iter()
        .filter_map(|person| match person.location {
            Some(Json::Object(location)) => Some(location),
            _ => None,
        })
        .collect();
    if records.len() < total {
        warn!(
            "Skipped {} of {} people without a location object",
            total - records.len(),
            total
        );
    }
    Ok(records)
}

pub fn parse_records(text: &str) -> Result<Vec<RawRecord>, LVError> {
    locations(serde_json::from_str(text)?)
}

pub struct HttpSource {
    client: Client,
    config: HttpConfig,
}

impl HttpSource {
    pub fn new(config: HttpConfig) -> Result<Self, LVError> {
        let client = Client::builder()
            .user_agent(concat!("lv/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("results", self.config.results.to_string())];
        if let Some(seed) = &self.config.seed {
            query.push(("seed", seed.clone()));
        }
        query
    }
}

impl RecordSource for HttpSource {
    #[instrument(skip(self), fields(url = %self.config.url))]
    fn fetch_records(&self) -> Result<Vec<RawRecord>, LVError> {
        let start_time = Instant::now();
        let payload: Payload = self
            .client
            .get(&self.config.url)
            .query(&self.query())
            .send()?
            .error_for_status()?
            .json()?;
        let records = locations(payload)?;
        info!(
            "Fetched {} records in {}ms",
            records.len(),
            start_time.elapsed().as_millis()
        );
        Ok(records)
    }

    fn describe(&self) -> String {
        self.config.url.clone()
    }
}

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: &Path) -> Result<Self, LVError> {
        let raw = path.to_string_lossy();
        let expanded = shellexpand::full(&raw)
            .map_err(|e| LVError::LoadingFailed(format!("Cannot expand {raw}: {e}")))?;
        Ok(Self {
            path: PathBuf::from(expanded.into_owned()),
        })
    }
}

impl RecordSource for FileSource {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn fetch_records(&self) -> Result<Vec<RawRecord>, LVError> {
        let text = fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LVError::FileNotFound,
            ErrorKind::PermissionDenied => LVError::PermissionDenied,
            _ => LVError::IoError(e),
        })?;
        debug!("Read {} bytes", text.len());
        parse_records(&text)
    }

    fn describe(&self) -> String {
        self.path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string()
    }
}

pub fn build_source(config: &SourceConfig) -> Result<Box<dyn RecordSource>, LVError> {
    match config {
        SourceConfig::Http(http) => Ok(Box::new(HttpSource::new(http.clone())?)),
        SourceConfig::File(path) => Ok(Box::new(FileSource::new(path)?)),
    }
}
