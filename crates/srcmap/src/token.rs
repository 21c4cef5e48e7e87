//! # Tokens
//!
//! A token is an original-source position plus the surrounding source lines.
//! Resolvers hand back raw JSON in snake_case; [`parse_raw_token`] checks its shape
//! and converts it into the camelCase [`Token`] exposed to callers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{TokenError, TokenValidationError};

/// A single line of original source around a resolved position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceCodeLine {
    /// Line number in the original source
    pub line: u32,
    /// Whether this is the line the stack frame points at
    pub is_stack_line: bool,
    /// Raw text of the line
    pub raw: String,
}

/// Original-source location for a stack position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// Line number in the original source
    pub line: u32,
    /// Column number in the original source
    pub column: u32,
    /// Path of the original source file
    pub src: String,
    /// Context lines around the original position
    pub source_code: Vec<SourceCodeLine>,
}

/// Wire shape produced by token resolvers
#[derive(Debug, Clone, Serialize)]
pub struct RawToken {
    pub line: u32,
    pub column: u32,
    pub src: String,
    pub source_code: Vec<RawSourceCode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RawSourceCode {
    pub line: u32,
    pub is_stack_line: bool,
    pub raw: String,
}

/// Parse and validate the JSON text returned by a resolver.
pub fn parse_raw_token(raw: &str) -> Result<Token, TokenError> {
    let value: Value = serde_json::from_str(raw)?;
    Ok(validate_raw_token(&value)?)
}

/// Validate an already decoded resolver response.
///
/// Numbers must be non-negative integers; nothing is coerced. A missing or null
/// `source_code` is read as an empty list.
pub fn validate_raw_token(value: &Value) -> Result<Token, TokenValidationError> {
    let obj = value.as_object().ok_or(TokenValidationError::NotAnObject)?;

    let line = read_u32(obj, "line")?;
    let column = read_u32(obj, "column")?;
    let src = obj
        .get("src")
        .and_then(Value::as_str)
        .ok_or(TokenValidationError::NotAString("src"))?
        .to_string();

    let source_code = match obj.get("source_code") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                validate_source_code(item).map_err(|reason| TokenValidationError::Entry {
                    index,
                    reason: Box::new(reason),
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(TokenValidationError::NotAnArray("source_code")),
    };

    Ok(Token {
        line,
        column,
        src,
        source_code,
    })
}

fn validate_source_code(value: &Value) -> Result<SourceCodeLine, TokenValidationError> {
    let obj = value.as_object().ok_or(TokenValidationError::NotAnObject)?;
    Ok(SourceCodeLine {
        line: read_u32(obj, "line")?,
        is_stack_line: obj
            .get("is_stack_line")
            .and_then(Value::as_bool)
            .ok_or(TokenValidationError::NotABoolean("is_stack_line"))?,
        raw: obj
            .get("raw")
            .and_then(Value::as_str)
            .ok_or(TokenValidationError::NotAString("raw"))?
            .to_string(),
    })
}

fn read_u32(obj: &Map<String, Value>, field: &'static str) -> Result<u32, TokenValidationError> {
    obj.get(field)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or(TokenValidationError::NotNonNegativeInteger(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_token_is_converted() {
        let raw = json!({
            "line": 12,
            "column": 4,
            "src": "webpack:///src/app.ts",
            "source_code": [
                {"line": 11, "is_stack_line": false, "raw": "const a = 1;"},
                {"line": 12, "is_stack_line": true, "raw": "throw new Error(a);"}
            ]
        });

        let token = parse_raw_token(&raw.to_string()).unwrap();
        assert_eq!(token.line, 12);
        assert_eq!(token.column, 4);
        assert_eq!(token.src, "webpack:///src/app.ts");
        assert_eq!(token.source_code.len(), 2);
        assert!(token.source_code[1].is_stack_line);

        let out = serde_json::to_value(&token).unwrap();
        assert_eq!(out["sourceCode"][1]["isStackLine"], json!(true));
    }

    #[test]
    fn test_missing_source_code_is_empty() {
        let token = validate_raw_token(&json!({"line": 1, "column": 0, "src": "a.js"})).unwrap();
        assert!(token.source_code.is_empty());
    }

    #[test]
    fn test_negative_line_rejected() {
        let err = validate_raw_token(&json!({"line": -1, "column": 0, "src": "a.js"})).unwrap_err();
        assert_eq!(err, TokenValidationError::NotNonNegativeInteger("line"));
    }

    #[test]
    fn test_fractional_column_rejected() {
        let err =
            validate_raw_token(&json!({"line": 1, "column": 1.5, "src": "a.js"})).unwrap_err();
        assert_eq!(err, TokenValidationError::NotNonNegativeInteger("column"));
    }

    #[test]
    fn test_wrong_types_rejected() {
        assert_eq!(
            validate_raw_token(&json!("token")).unwrap_err(),
            TokenValidationError::NotAnObject
        );
        assert_eq!(
            validate_raw_token(&json!({"line": 1, "column": 1, "src": 3})).unwrap_err(),
            TokenValidationError::NotAString("src")
        );
        assert_eq!(
            validate_raw_token(&json!({"line": 1, "column": 1, "src": "a", "source_code": {}}))
                .unwrap_err(),
            TokenValidationError::NotAnArray("source_code")
        );
    }

    #[test]
    fn test_bad_source_code_entry_reports_index() {
        let err = validate_raw_token(&json!({
            "line": 1,
            "column": 1,
            "src": "a",
            "source_code": [
                {"line": 1, "is_stack_line": true, "raw": "ok"},
                {"line": 2, "is_stack_line": "yes", "raw": "bad"}
            ]
        }))
        .unwrap_err();

        assert_eq!(
            err,
            TokenValidationError::Entry {
                index: 1,
                reason: Box::new(TokenValidationError::NotABoolean("is_stack_line")),
            }
        );
    }

    #[test]
    fn test_unparseable_output_is_malformed() {
        assert!(matches!(
            parse_raw_token("not json"),
            Err(TokenError::Malformed(_))
        ));
    }
}
