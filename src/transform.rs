//! Response transformation: wire bytes into the shape an operation expects.
//!
//! Shape validation only — an operation declares whether it expects an
//! object, an array, or nothing, and the payload fails closed with
//! [`Error::UnexpectedShape`] on a mismatch. Semantic conversion to typed
//! entities lives in [`crate::entity`].

use crate::error::{Error, Shape};
use http::StatusCode;
use serde_json::Value;

/// A successful wire response: status plus raw body bytes.
#[derive(Debug, Clone)]
pub struct ResponsePayload {
    status: StatusCode,
    body: Vec<u8>,
}

impl ResponsePayload {
    pub fn new(status: StatusCode, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The body as a JSON object.
    pub fn into_object(self) -> Result<Value, Error> {
        match self.parse(Shape::Object)? {
            value @ Value::Object(_) => Ok(value),
            other => Err(Error::UnexpectedShape { expected: Shape::Object, got: Shape::of(&other) }),
        }
    }

    /// The body as a JSON array. An empty array is a valid result.
    pub fn into_array(self) -> Result<Vec<Value>, Error> {
        match self.parse(Shape::Array)? {
            Value::Array(items) => Ok(items),
            other => Err(Error::UnexpectedShape { expected: Shape::Array, got: Shape::of(&other) }),
        }
    }

    /// Assert the body carries nothing (e.g. a 204 delete response).
    pub fn into_none(self) -> Result<(), Error> {
        if self.is_empty() {
            Ok(())
        } else {
            let got = match serde_json::from_slice::<Value>(&self.body) {
                Ok(value) => Shape::of(&value),
                Err(_) => Shape::Invalid,
            };
            Err(Error::UnexpectedShape { expected: Shape::Empty, got })
        }
    }

    fn is_empty(&self) -> bool {
        self.body.iter().all(|b| b.is_ascii_whitespace())
    }

    fn parse(&self, expected: Shape) -> Result<Value, Error> {
        if self.is_empty() {
            return Err(Error::UnexpectedShape { expected, got: Shape::Empty });
        }
        serde_json::from_slice(&self.body)
            .map_err(|_| Error::UnexpectedShape { expected, got: Shape::Invalid })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(body: &str) -> ResponsePayload {
        ResponsePayload::new(StatusCode::OK, body.as_bytes().to_vec())
    }

    #[test]
    fn object_body_transforms_to_object() {
        let value = payload(r#"{"id":"1"}"#).into_object().unwrap();
        assert_eq!(value["id"], "1");
    }

    #[test]
    fn array_body_transforms_to_array() {
        let items = payload(r#"[{"id":"1"},{"id":"2"}]"#).into_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["id"], "1");
    }

    #[test]
    fn empty_array_is_valid_not_an_error() {
        assert!(payload("[]").into_array().unwrap().is_empty());
    }

    #[test]
    fn array_where_object_expected_fails_closed() {
        let err = payload("[]").into_object().unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedShape { expected: Shape::Object, got: Shape::Array }
        ));
    }

    #[test]
    fn empty_body_satisfies_none() {
        payload("").into_none().unwrap();
        payload("  \n").into_none().unwrap();
    }

    #[test]
    fn non_empty_body_fails_none() {
        let err = payload(r#"{"id":"1"}"#).into_none().unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedShape { expected: Shape::Empty, got: Shape::Object }
        ));
    }

    #[test]
    fn empty_body_where_object_expected_reports_empty() {
        let err = payload("").into_object().unwrap_err();
        assert!(matches!(err, Error::UnexpectedShape { got: Shape::Empty, .. }));
    }

    #[test]
    fn malformed_bytes_report_invalid() {
        let err = payload("{not json").into_array().unwrap_err();
        assert!(matches!(err, Error::UnexpectedShape { got: Shape::Invalid, .. }));
    }
}
