use crate::error::{Error, Result};
use crate::models::EvaluationResponse;

pub fn parse_evaluation_response(response: &str) -> Result<EvaluationResponse> {
    serde_json::from_str(extract_json(response)?)
        .map_err(|e| Error::ParseError(format!("Failed to parse evaluation response: {}", e)))
}

/// The provider requests JSON mode, so the body is normally the object itself. A reply that
/// wraps the object in prose is cut down to the span between the first `{` and the last `}`.
fn extract_json(text: &str) -> Result<&str> {
    let trimmed = text.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Ok(trimmed);
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&text[start..=end]),
        _ => Err(Error::ParseError("No JSON object found in response".to_string())),
    }
}
