use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;

/// One TeX conversion, as read from standard input.
///
/// `config` is handed to MathJax untouched; its keys are whatever the
/// `tex2svg` conversion options accept (`display`, `em`, `ex`, ...).
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct ConversionRequest {
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub config: Option<Value>,
}

impl ConversionRequest {
    pub fn from_slice(input: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(input)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::Error;

    #[test]
    fn parses_source_and_config() {
        let request =
            ConversionRequest::from_slice(br#"{"src":"x^2","config":{"display":false}}"#).unwrap();
        assert_eq!(request.src.as_deref(), Some("x^2"));
        assert_eq!(request.config, Some(json!({ "display": false })));
    }

    #[test]
    fn config_is_optional() {
        let request = ConversionRequest::from_slice(br#"{"src":"\\frac{1}{2}"}"#).unwrap();
        assert_eq!(request.src.as_deref(), Some(r"\frac{1}{2}"));
        assert_eq!(request.config, None);
    }

    #[test]
    fn missing_source_is_kept_absent() {
        let request = ConversionRequest::from_slice(br#"{"config":{}}"#).unwrap();
        assert_eq!(request.src, None);
        assert_eq!(request.config, Some(json!({})));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let request = ConversionRequest::from_slice(br#"{"src":"a","extra":[1,2]}"#).unwrap();
        assert_eq!(request.src.as_deref(), Some("a"));
    }

    #[test]
    fn truncated_json_is_a_parse_error() {
        let err = ConversionRequest::from_slice(br#"{"src":"x^2","con"#).unwrap_err();
        assert!(matches!(err, Error::Parse(_)), "{err:?}");
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let err = ConversionRequest::from_slice(b"{\"src\":\"\xff\"}").unwrap_err();
        assert!(matches!(err, Error::Parse(_)), "{err:?}");
    }
}
