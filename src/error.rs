use std::fmt;

#[derive(Debug)]
pub enum KindredError {
    Config(String),
    DegenerateInput(String),
    Worker(String),
    Cache(String),
    Csv(csv::Error),
    Json(serde_json::Error),
    Io(std::io::Error),
}

impl fmt::Display for KindredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KindredError::Config(e) => write!(f, "Configuration error: {}", e),
            KindredError::DegenerateInput(e) => write!(f, "Degenerate input error: {}", e),
            KindredError::Worker(e) => write!(f, "Worker failure: {}", e),
            KindredError::Cache(e) => write!(f, "Spec cache error: {}", e),
            KindredError::Csv(e) => write!(f, "CSV error: {}", e),
            KindredError::Json(e) => write!(f, "JSON error: {}", e),
            KindredError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for KindredError {}

impl From<csv::Error> for KindredError {
    fn from(err: csv::Error) -> Self {
        KindredError::Csv(err)
    }
}

impl From<serde_json::Error> for KindredError {
    fn from(err: serde_json::Error) -> Self {
        KindredError::Json(err)
    }
}

impl From<std::io::Error> for KindredError {
    fn from(err: std::io::Error) -> Self {
        KindredError::Io(err)
    }
}
