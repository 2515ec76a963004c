use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum FilterError {
    #[error("Malformed query parameter: {0}")]
    MalformedKey(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Field '{0}' cannot be filtered")]
    NotFilterable(String),

    #[error("Field '{0}' cannot be selected")]
    NotSelectable(String),

    #[error("Field '{0}' cannot be sorted")]
    NotSortable(String),

    #[error("Unsupported operator '{operator}' for field '{field}'")]
    UnsupportedOperator { field: String, operator: String },

    #[error("Invalid {field}: {value}")]
    InvalidValue { field: String, value: String },
}
