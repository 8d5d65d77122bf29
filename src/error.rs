use thiserror::Error;

/// Coarse classification used by the front-end to pick how a failure is shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Nothing to submit; transient notice, no request was issued.
    Input,
    /// Collaborator unreachable, non-2xx, or reported failure.
    Network,
    /// Collaborator answered with something we could not read.
    Decode,
    /// Operation invoked without a live background layer.
    ResourceUnavailable,
    /// Another operation holds the gate.
    Busy,
    Io,
}

#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("no mask drawn")]
    NoMask,

    #[error("no selections made")]
    NoSelections,

    #[error("no image loaded")]
    NoBackground,

    #[error("another operation is in progress")]
    Busy,

    #[error("service unreachable: {0}")]
    Network(String),

    #[error("service returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("malformed service response: {0}")]
    Decode(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnnotateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnnotateError::NoMask | AnnotateError::NoSelections => ErrorKind::Input,
            AnnotateError::NoBackground => ErrorKind::ResourceUnavailable,
            AnnotateError::Busy => ErrorKind::Busy,
            AnnotateError::Network(_) | AnnotateError::Http { .. } => ErrorKind::Network,
            AnnotateError::Decode(_) => ErrorKind::Decode,
            // Only reading a bitmap can fail on its contents; encoding and
            // saving are local failures.
            AnnotateError::Image(image::ImageError::Decoding(_) | image::ImageError::Unsupported(_)) => {
                ErrorKind::Decode
            }
            AnnotateError::Image(_) | AnnotateError::Io(_) => ErrorKind::Io,
        }
    }

    /// Input errors are shown as a short-lived notice rather than an error box.
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Input
    }
}

impl From<reqwest::Error> for AnnotateError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AnnotateError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            AnnotateError::Http {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            AnnotateError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for AnnotateError {
    fn from(e: serde_json::Error) -> Self {
        AnnotateError::Decode(e.to_string())
    }
}

impl From<base64::DecodeError> for AnnotateError {
    fn from(e: base64::DecodeError) -> Self {
        AnnotateError::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnnotateError>;
