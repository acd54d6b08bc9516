use thiserror::Error;

/// Failures of a single conversion.
///
/// `Display` yields only the human-readable message, because that text is
/// exactly what gets written back to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Standard input is not a JSON conversion request.
    #[error("{0}")]
    Parse(#[from] serde_json::Error),
    /// MathJax could not be loaded or initialized.
    #[error("{0}")]
    Engine(String),
    /// MathJax rejected the TeX source.
    #[error("{0}")]
    Conversion(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_bare_message() {
        let err = Error::Conversion("Missing argument for \\frac".into());
        assert_eq!(err.to_string(), "Missing argument for \\frac");

        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let expected = parse.to_string();
        assert_eq!(Error::from(parse).to_string(), expected);
    }
}
