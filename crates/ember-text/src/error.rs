/// Errors that can occur in the text system.
#[derive(Debug, Clone, PartialEq)]
pub enum FontError {
    /// Vertical metrics that cannot produce a valid layout scale.
    InvalidMetrics { ascender: f32, descender: f32 },
}

impl std::fmt::Display for FontError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FontError::InvalidMetrics {
                ascender,
                descender,
            } => write!(
                f,
                "Invalid font metrics: ascender {} must exceed descender {}",
                ascender, descender
            ),
        }
    }
}

impl std::error::Error for FontError {}
