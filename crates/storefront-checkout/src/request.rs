//! Checkout Request Parsing
//!
//! Requests arrive as raw JSON bytes so that malformed bodies are reported
//! through the same error taxonomy as invalid fields.

use serde::Deserialize;
use validator::{Validate, ValidationErrors};

use crate::error::{CheckoutError, Result};

/// A storefront visitor's purchase request. The rail is chosen by the
/// endpoint, never by a field in the body.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "productId is required"))]
    pub product_id: String,

    #[validate(email(message = "buyerEmail must be a valid email address"))]
    pub buyer_email: String,

    #[serde(default)]
    pub buyer_name: Option<String>,
}

impl CheckoutRequest {
    /// Parse and validate a raw request body
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let mut request: Self = serde_json::from_slice(raw)
            .map_err(|e| CheckoutError::Validation(format!("Invalid request body: {e}")))?;

        request.product_id = request.product_id.trim().to_string();
        request.buyer_email = request.buyer_email.trim().to_string();
        request.buyer_name = request
            .buyer_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        request
            .validate()
            .map_err(|e| CheckoutError::Validation(describe(&e)))?;

        Ok(request)
    }
}

fn describe(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map_or_else(|| format!("{field} is invalid"), ToString::to_string)
            })
        })
        .collect();

    messages.sort();
    messages.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<CheckoutRequest> {
        CheckoutRequest::parse(body.as_bytes())
    }

    #[test]
    fn test_valid_request() {
        let request = parse(r#"{"productId":"p1","buyerEmail":"a@b.com","buyerName":" Ana "}"#).unwrap();
        assert_eq!(request.product_id, "p1");
        assert_eq!(request.buyer_email, "a@b.com");
        assert_eq!(request.buyer_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn test_buyer_name_optional() {
        let request = parse(r#"{"productId":"p1","buyerEmail":"a@b.com"}"#).unwrap();
        assert!(request.buyer_name.is_none());

        let request = parse(r#"{"productId":"p1","buyerEmail":"a@b.com","buyerName":""}"#).unwrap();
        assert!(request.buyer_name.is_none());
    }

    #[test]
    fn test_invalid_email() {
        let err = parse(r#"{"productId":"p1","buyerEmail":"not-an-email"}"#).unwrap_err();
        match err {
            CheckoutError::Validation(msg) => assert!(msg.contains("buyerEmail")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_fields() {
        assert!(matches!(
            parse(r#"{"productId":"p1"}"#),
            Err(CheckoutError::Validation(_))
        ));
        assert!(matches!(
            parse(r#"{"buyerEmail":"a@b.com"}"#),
            Err(CheckoutError::Validation(_))
        ));
        assert!(matches!(
            parse(r#"{"productId":"   ","buyerEmail":"a@b.com"}"#),
            Err(CheckoutError::Validation(_))
        ));
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(parse("not json"), Err(CheckoutError::Validation(_))));
        assert!(matches!(parse(""), Err(CheckoutError::Validation(_))));
        assert!(matches!(
            parse(r#"{"productId":42,"buyerEmail":"a@b.com"}"#),
            Err(CheckoutError::Validation(_))
        ));
    }
}
