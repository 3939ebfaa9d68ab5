use thiserror::Error;

/// A path string that can't be turned into selectors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    #[error("Path is empty")]
    Empty,

    #[error("Path '{path}' must start with '$', '@' or '^'")]
    MissingRoot { path: String },

    #[error("Invalid selector '{selector}' in path '{path}': {message}")]
    InvalidSelector {
        path: String,
        selector: String,
        message: String,
    },

    #[error("Unbalanced brackets or quotes in path '{0}'")]
    Unbalanced(String),
}

/// Failure raised while resolving a value or running a function.
///
/// Never fatal to a script: the owning command skips the affected target.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FunctionError {
    #[error("Function '{function}' error: {message}")]
    Failed { function: String, message: String },

    #[error("Function '{function}' expects {expected} argument(s), got {actual}")]
    Arity {
        function: String,
        expected: String,
        actual: usize,
    },

    #[error("Unknown function '{0}'")]
    Unknown(String),

    #[error(transparent)]
    Path(#[from] PathError),
}

impl FunctionError {
    pub fn failed(function: &str, message: impl Into<String>) -> Self {
        FunctionError::Failed {
            function: function.to_string(),
            message: message.into(),
        }
    }
}

/// Conditions that stop a run before any command executes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("No item fetcher supplied; paths cannot be resolved")]
    MissingFetcher,

    #[error("Script failed validation with {0} error(s)")]
    InvalidScript(usize),
}

/// Rejected function or command registration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("'{0}' is not a valid name")]
    InvalidName(String),

    #[error("'{0}' is already registered")]
    Duplicate(String),

    #[error("'{name}' declares at least {min} but at most {max} argument(s)")]
    InvalidArity { name: String, min: usize, max: usize },
}
