use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::error::AppError;

/// Parse "Name: Value" strings into a HeaderMap. Any malformed entry is an error.
pub fn parse_headers(header_strings: &[String]) -> Result<HeaderMap, AppError> {
    let mut headers = HeaderMap::new();

    for header_str in header_strings {
        let Some((name, value)) = header_str.split_once(':') else {
            return Err(AppError::InvalidInput(format!(
                "Invalid header format: '{header_str}'. Expected 'Name: Value'"
            )));
        };
        let (name, value) = (name.trim(), value.trim());

        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| AppError::InvalidInput(format!("Invalid header name: '{name}'")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| AppError::InvalidInput(format!("Invalid header value for '{name}'")))?;

        // values may carry credentials
        debug!("Adding header: {}", name);
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}
