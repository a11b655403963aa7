use super::model::{IncomingCommentRequest, ValidatedComment};
use crate::domain::comment::{CommentAmount, ReceivingId};
use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing amount parameter 'n'")]
    MissingAmount,
    #[error("missing receiving id parameter 'id'")]
    MissingReceivingId,
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingAmount => "missing_amount",
            ValidationError::MissingReceivingId => "missing_receiving_id",
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

pub struct RequestValidator;

impl RequestValidator {
    /// Checks presence only, amount first and receiving id second. The key is
    /// left to the authenticator.
    pub fn validate(request: &IncomingCommentRequest) -> Result<ValidatedComment, ValidationError> {
        let amount = request
            .amount
            .as_deref()
            .and_then(|value| CommentAmount::new(value).ok())
            .ok_or(ValidationError::MissingAmount)?;
        let receiving_id = request
            .receiving_id
            .as_deref()
            .and_then(|value| ReceivingId::new(value).ok())
            .ok_or(ValidationError::MissingReceivingId)?;
        Ok(ValidatedComment {
            amount,
            receiving_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn request(n: Option<&str>, id: Option<&str>, key: Option<&str>) -> IncomingCommentRequest {
        IncomingCommentRequest {
            amount: n.map(str::to_string),
            receiving_id: id.map(str::to_string),
            key: key.map(str::to_string),
            caller_ip: "127.0.0.1".to_string(),
        }
    }

    #[test]
    fn amount_is_checked_before_id() {
        let err = RequestValidator::validate(&request(None, None, None)).unwrap_err();
        assert_eq!(err, ValidationError::MissingAmount);
        let err = RequestValidator::validate(&request(Some(""), Some("7656"), None)).unwrap_err();
        assert_eq!(err, ValidationError::MissingAmount);
    }

    #[test]
    fn missing_id_is_reported() {
        let err = RequestValidator::validate(&request(Some("5"), None, Some("k"))).unwrap_err();
        assert_eq!(err, ValidationError::MissingReceivingId);
        assert_eq!(err.code(), "missing_receiving_id");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn valid_request_keeps_raw_values() {
        let comment =
            RequestValidator::validate(&request(Some("5"), Some("76561198000000000"), None))
                .unwrap();
        assert_eq!(comment.args(), vec!["5", "76561198000000000"]);
    }

    proptest! {
        #[test]
        fn missing_amount_wins_regardless_of_other_fields(
            id in proptest::option::of(".{0,20}"),
            key in proptest::option::of(".{0,20}"),
        ) {
            let req = request(None, id.as_deref(), key.as_deref());
            prop_assert_eq!(RequestValidator::validate(&req), Err(ValidationError::MissingAmount));
        }

        #[test]
        fn present_fields_pass_through_unchanged(n in ".{1,20}", id in ".{1,20}") {
            let comment = RequestValidator::validate(&request(Some(&n), Some(&id), None)).unwrap();
            prop_assert_eq!(comment.args(), vec![n, id]);
        }
    }
}
