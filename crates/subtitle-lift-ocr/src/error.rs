use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("crop data length {provided} is smaller than stride * height ({required})")]
    InsufficientCropData { provided: usize, required: usize },
    #[error("unsupported language or model selection: {selection}")]
    UnsupportedModel { selection: String },
    #[error("model artifact not found: {path}")]
    ModelNotFound { path: std::path::PathBuf },
    #[error("backend error: {message}")]
    Backend { message: String },
}

impl OcrError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}
