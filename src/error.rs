use thiserror::Error;

pub type CarteraResult<T> = Result<T, CarteraError>;

#[derive(Error, Debug)]
pub enum CarteraError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to open workbook {path}: {message}")]
    Workbook { path: String, message: String },

    #[error("Workbook is missing required sheet '{0}'")]
    MissingSheet(String),

    #[error("Sheet '{sheet}' is missing required column '{column}'")]
    MissingColumn { sheet: String, column: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Chart rendering error: {0}")]
    Chart(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
