use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use std::io::Error;
use tracing_subscriber::util::TryInitError;

#[derive(Debug, thiserror::Error)]
pub enum FolioError {
    #[error("io error: {0}")]
    IoError(#[from] Error),
    #[error("polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("invalid json: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("could not set up logging: {0}")]
    LoggingFailed(#[from] TryInitError),
    #[error("{message} (status {status})")]
    Api { status: u16, message: String },
    #[error("no access token; pass --token or --email/--password")]
    Unauthorized,
    #[error("{0} is a read-only snapshot")]
    ReadOnly(String),
    #[error("login failed: {0}")]
    LoginFailed(String),
    #[error("invalid access token: {0}")]
    InvalidToken(String),
    #[error("loading failed: {0}")]
    LoadingFailed(String),
    #[error("file not found")]
    FileNotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("unknown file type")]
    UnknownFileType,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    Search,
    Raw,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    NextPage,
    PreviousPage,
    CyclePageSize,
    ToggleColumn(usize),
    Search,
    EnterCommand,
    Enter,
    Exit,
    View,
    Edit,
    Create,
    Delete,
    Confirm,
    Refresh,
    SwitchCollection,
    CopyCell,
    CopyRow,
    Help,
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
 j/k ↑/↓        move selection
 h/l ←/→        previous / next page
 PgUp/PgDn      previous / next page
 s              cycle rows per page (5, 10, 20, 50)
 /              search titles
 Esc            clear search
 1-9            show / hide column N
 Enter, v       view record
 e              edit record
 n              new record
 d              delete record
 r              refresh
 Tab            switch blogs / projects
 y / Y          copy title / copy row as csv
 :              command (size <n>, col <name>, search <term>, refresh, quit)
 ?              this help
 q              quit";
