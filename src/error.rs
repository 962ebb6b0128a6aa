/// Broad category of an [`AppError`].
///
/// Callers match on the kind when they need to react differently, e.g. the
/// session reports unmapped pixels but still exits with a dedicated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Geometry unset/empty, bad run configuration, nothing selected.
    Configuration,
    /// An element index is not present in the bound geometry.
    UnmappedElement,
    /// The fit routine produced nothing usable.
    FitUnavailable,
    /// A value that must be a sequence was something else.
    TypeMismatch,
    /// Malformed input data (scan files, series).
    InvalidInput,
    /// Filesystem or archive access failed.
    Io,
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            kind,
            exit_code,
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, 2, message)
    }

    pub fn unmapped_element(index: Option<u32>) -> Self {
        let label = index.map(|i| i.to_string()).unwrap_or_else(|| "<unset>".to_string());
        Self::new(
            ErrorKind::UnmappedElement,
            3,
            format!("Couldn't fill map for element {label}. Maybe the geometry is not defined for this element?"),
        )
    }

    pub fn fit_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FitUnavailable, 4, message)
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch, 2, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, 2, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, 2, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
