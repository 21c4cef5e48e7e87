use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::error::AppError;

/// Parse a single "Name: Value" header
fn parse_header(header_str: &str) -> Result<(HeaderName, HeaderValue), AppError> {
    let Some((name, value)) = header_str.split_once(':') else {
        return Err(AppError::InvalidInput(format!(
            "Invalid header format: '{header_str}'. Expected 'Name: Value'"
        )));
    };
    let name = name.trim();

    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| AppError::InvalidInput(format!("Invalid header name: '{name}'")))?;
    // Values may carry credentials, keep them out of errors and logs.
    let header_value = HeaderValue::from_str(value.trim())
        .map_err(|_| AppError::InvalidInput(format!("Invalid value for header '{name}'")))?;

    Ok((header_name, header_value))
}

/// Parse a collection of header strings into a HeaderMap
pub fn parse_headers(header_strings: &[String]) -> Result<HeaderMap, AppError> {
    let mut headers = HeaderMap::new();

    for header_str in header_strings {
        let (name, value) = parse_header(header_str)?;
        debug!(header = %name, "Adding request header");
        headers.insert(name, value);
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_headers() {
        let headers = parse_headers(&[
            "Authorization: Bearer a:b".to_string(),
            "x-team:  web ".to_string(),
        ])
        .unwrap();

        assert_eq!(headers.get("authorization").unwrap(), "Bearer a:b");
        assert_eq!(headers.get("x-team").unwrap(), "web");
    }

    #[test]
    fn test_parse_headers_rejects_malformed() {
        assert!(parse_headers(&["no-colon".to_string()]).is_err());
        assert!(parse_headers(&["bad name: v".to_string()]).is_err());
    }
}
