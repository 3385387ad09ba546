use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("Class not found: {0}")]
    ClassNotFound(String),

    #[error("Object not found: {class_name}/{id}")]
    ObjectNotFound { class_name: String, id: String },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Column is read-only: {0}")]
    ReadOnlyColumn(String),

    #[error("Row {0} is out of range")]
    RowOutOfRange(usize),

    #[error("Deleting {count} item(s) requires typing the class name '{class_name}' to confirm")]
    ConfirmationRequired { class_name: String, count: usize },

    #[error("Confirmation '{given}' does not match class name '{class_name}'")]
    ConfirmationMismatch { class_name: String, given: String },

    #[error("No class is open")]
    NoClassOpen,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("Api Error: {0}")]
    Api(String),
}

pub type Result<T> = std::result::Result<T, DeskError>;
