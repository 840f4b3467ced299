use thiserror::Error;

/// Validation failures raised while parsing user-supplied setting values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Invalid color '{0}': expected #RRGGBB, r,g,b or a color name")]
    InvalidColor(String),
    #[error("Invalid integer '{0}'")]
    InvalidInteger(String),
    #[error("Invalid number '{0}'")]
    InvalidNumber(String),
    #[error("Invalid boolean '{0}': expected true or false")]
    InvalidBoolean(String),
    #[error("Invalid orientation '{0}': expected direct or reverse")]
    InvalidOrientation(String),
    #[error("Invalid alignment '{0}': expected left, right, tss or none")]
    InvalidAlignment(String),
    #[error("Unknown graph type '{0}'")]
    UnknownGraphType(String),
    #[error("Unknown connector type '{0}'")]
    UnknownConnectorType(String),
    #[error("Unknown value type '{0}'")]
    UnknownValueType(String),
    #[error("Invalid region '{0}': expected chromosome:start-end")]
    InvalidRegion(String),
}
