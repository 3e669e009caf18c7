use std::ffi::OsString;
use std::io::stdout;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::{self, Receiver};

use clap::Parser;
use ratatui::DefaultTerminal;
use ratatui::crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use ratatui::crossterm::execute;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod controller;
mod domain;
mod filter;
mod flatten;
mod inputter;
mod model;
mod sorting;
mod source;
mod ui;

use controller::Controller;
use domain::{DEFAULT_API_URL, HttpConfig, LVConfig, LVError, Message, SourceConfig};
use flatten::RawRecord;
use model::{Model, Status};
use source::{RecordSource, build_source};
use ui::TableUI;

/// A tui viewer for the locations of randomly generated people.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Read people from a json file instead of the api
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Api endpoint returning `{"results": [...]}`
    #[arg(long, default_value = DEFAULT_API_URL)]
    url: String,

    /// Number of people to request
    #[arg(short = 'n', long, default_value_t = 20)]
    results: usize,

    /// Seed for reproducible api results
    #[arg(long)]
    seed: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Event poll time in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_time: u64,

    /// Maximum width of a column
    #[arg(long, default_value_t = 40)]
    max_column_width: usize,

    /// Log file, the terminal belongs to the ui
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> LVConfig {
        let source = match &self.file {
            Some(path) => SourceConfig::File(path.clone()),
            None => SourceConfig::Http(
                HttpConfig::default()
                    .url(self.url.clone())
                    .results(self.results)
                    .seed(self.seed.clone())
                    .timeout_secs(self.timeout),
            ),
        };
        LVConfig::default()
            .event_poll_time(self.poll_time)
            .max_column_width(self.max_column_width)
            .source(source)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

/// Directory and file name the log is written to.
fn log_target(log_file: Option<PathBuf>) -> (PathBuf, OsString) {
    let path = log_file.unwrap_or_else(|| std::env::temp_dir().join("lv.log"));
    let name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("lv.log"));
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    (dir, name)
}

/// Logs go to a file through a background writer. The guard flushes it on drop.
fn init_logging(log_file: Option<PathBuf>) -> Result<WorkerGuard, LVError> {
    let (dir, name) = log_target(log_file);
    let file_appender = tracing_appender::rolling::never(&dir, &name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| LVError::LoadingFailed(format!("Cannot set up logging: {e}")))?;
    info!("Logging to {}", dir.join(&name).display());
    Ok(guard)
}

/// Fetches the records on a rayon worker. The result arrives on the receiver.
fn spawn_loader(source: Box<dyn RecordSource>) -> Receiver<Result<Vec<RawRecord>, LVError>> {
    let (sender, receiver) = mpsc::channel();
    rayon::spawn(move || {
        let result = source.fetch_records();
        if sender.send(result).is_err() {
            debug!("Viewer closed before loading finished");
        }
    });
    receiver
}

fn restore_terminal() {
    // Nothing left to do when this fails, the process is exiting
    let _ = execute!(stdout(), DisableMouseCapture);
    ratatui::restore();
}

fn run(args: &Args) -> Result<(), LVError> {
    let _guard = init_logging(args.log_file.clone())?;
    let cfg = args.config();
    info!("Starting lv with {:?}", cfg);

    let source = build_source(&cfg.source)?;

    let mut terminal = ratatui::init();
    let result = run_ui(&mut terminal, &cfg, source);
    restore_terminal();
    result
}

fn run_ui(
    terminal: &mut DefaultTerminal,
    cfg: &LVConfig,
    source: Box<dyn RecordSource>,
) -> Result<(), LVError> {
    execute!(stdout(), EnableMouseCapture)?;
    let size = terminal.size()?;

    let mut model = Model::init(cfg, size.width as usize, size.height as usize);
    model.start_loading(&source.describe());
    let loader = spawn_loader(source);

    let mut ui = TableUI::new();
    let controller = Controller::new(cfg);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Deliver the load result once it is there
        if let Ok(result) = loader.try_recv() {
            model.update(Some(Message::DataLoaded(result)))?;
        }

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(&model)? {
            model.update(Some(message))?;
        };
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_the_api() {
        let args = Args::parse_from(["lv"]);
        let cfg = args.config();
        match cfg.source {
            SourceConfig::Http(http) => {
                assert_eq!(http.url, DEFAULT_API_URL);
                assert_eq!(http.results, 20);
                assert_eq!(http.seed, None);
            }
            SourceConfig::File(_) => panic!("expected the api source"),
        }
        assert_eq!(cfg.event_poll_time, 100);
    }

    #[test]
    fn file_argument_selects_file_source() {
        let args = Args::parse_from(["lv", "--file", "people.json", "--max-column-width", "12"]);
        let cfg = args.config();
        assert!(matches!(cfg.source, SourceConfig::File(ref p) if p == &PathBuf::from("people.json")));
        assert_eq!(cfg.max_column_width, 12);
    }

    #[test]
    fn http_options_are_passed_on() {
        let args = Args::parse_from(["lv", "-n", "5", "--seed", "abc", "--timeout", "3"]);
        match args.config().source {
            SourceConfig::Http(http) => {
                assert_eq!(http.results, 5);
                assert_eq!(http.seed.as_deref(), Some("abc"));
                assert_eq!(http.timeout_secs, 3);
            }
            SourceConfig::File(_) => panic!("expected the api source"),
        }
    }

    #[test]
    fn log_target_splits_directory_and_name() {
        let (dir, name) = log_target(Some(PathBuf::from("/var/tmp/viewer.log")));
        assert_eq!(dir, PathBuf::from("/var/tmp"));
        assert_eq!(name, OsString::from("viewer.log"));

        let (dir, name) = log_target(Some(PathBuf::from("viewer.log")));
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(name, OsString::from("viewer.log"));

        let (dir, name) = log_target(None);
        assert_eq!(dir, std::env::temp_dir());
        assert_eq!(name, OsString::from("lv.log"));
    }

    #[test]
    fn loader_delivers_file_records() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/people_01.json");
        let source = build_source(&SourceConfig::File(path)).unwrap();
        let receiver = spawn_loader(source);
        let records = receiver.recv().unwrap().unwrap();

        let mut model = Model::init(&LVConfig::default(), 100, 20);
        model.update(Some(Message::DataLoaded(Ok(records)))).unwrap();
        assert_eq!(
            model.headers(),
            &["city", "state", "country", "postcode", "number", "name", "latitude", "longitude"]
        );
        assert_eq!(model.rows().len(), 3);
    }
}
