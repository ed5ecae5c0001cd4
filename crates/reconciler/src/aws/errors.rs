//! Classification of AWS SDK errors into [`CallError`].

use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use common::CallError;

const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "Throttled",
    "ThrottledException",
    "KMSThrottling",
    "RequestLimitExceeded",
    "RequestThrottled",
    "RequestThrottledException",
    "TooManyRequestsException",
    "LimitExceededException",
];

const NOT_FOUND_CODES: &[&str] = &[
    "NotFound",
    "NotFoundException",
    "StackSetNotFoundException",
];

const ACCESS_DENIED_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "AuthorizationError",
    "UnauthorizedOperation",
];

const TOO_MANY_REQUESTS: u16 = 429;

/// Map an SDK error onto the retry/validation taxonomy.
///
/// Timeouts, dispatch failures and unparseable responses are transient;
/// modeled service errors are classified by error code and HTTP status.
pub fn classify<E>(err: SdkError<E, HttpResponse>) -> CallError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let message = DisplayErrorContext(&err).to_string();
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            CallError::Transient(message)
        }
        SdkError::ServiceError(ctx) => {
            classify_code(ctx.err().code(), ctx.raw().status().as_u16(), message)
        }
        _ => CallError::Other(message),
    }
}

fn classify_code(code: Option<&str>, status: u16, message: String) -> CallError {
    match code {
        Some(c) if THROTTLING_CODES.contains(&c) => CallError::Transient(message),
        Some(c) if NOT_FOUND_CODES.contains(&c) => CallError::NotFound(message),
        Some(c) if ACCESS_DENIED_CODES.contains(&c) => CallError::AccessDenied(message),
        _ if status == TOO_MANY_REQUESTS || status >= 500 => CallError::Transient(message),
        _ => CallError::Other(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_sns::operation::set_topic_attributes::SetTopicAttributesError;
    use aws_smithy_runtime_api::client::result::ConnectorError;
    use aws_smithy_runtime_api::http::StatusCode;
    use aws_smithy_types::body::SdkBody;
    use aws_smithy_types::error::ErrorMetadata;

    type SnsSdkError = SdkError<SetTopicAttributesError, HttpResponse>;

    fn msg() -> String {
        "boom".into()
    }

    fn service_error(code: &str, status: u16) -> SnsSdkError {
        let err = SetTopicAttributesError::generic(
            ErrorMetadata::builder().code(code).message("Rate exceeded").build(),
        );
        let raw = HttpResponse::new(StatusCode::try_from(status).unwrap(), SdkBody::empty());
        SdkError::service_error(err, raw)
    }

    #[test]
    fn throttling_is_transient() {
        assert!(classify_code(Some("Throttling"), 400, msg()).is_transient());
        assert!(classify_code(Some("ThrottledException"), 400, msg()).is_transient());
    }

    #[test]
    fn sns_throttling_codes_are_transient() {
        assert!(classify_code(Some("Throttled"), 400, msg()).is_transient());
        assert!(classify_code(Some("KMSThrottling"), 400, msg()).is_transient());
    }

    #[test]
    fn too_many_requests_is_transient_whatever_the_code() {
        assert!(classify_code(Some("SomethingNew"), 429, msg()).is_transient());
        assert!(classify_code(None, 429, msg()).is_transient());
    }

    #[test]
    fn server_errors_are_transient() {
        assert!(classify_code(Some("InternalError"), 500, msg()).is_transient());
        assert!(classify_code(None, 503, msg()).is_transient());
    }

    #[test]
    fn not_found_codes() {
        assert_eq!(
            classify_code(Some("NotFound"), 404, msg()),
            CallError::NotFound(msg())
        );
        assert_eq!(
            classify_code(Some("NotFoundException"), 400, msg()),
            CallError::NotFound(msg())
        );
    }

    #[test]
    fn access_denied_codes() {
        assert_eq!(
            classify_code(Some("AuthorizationError"), 403, msg()),
            CallError::AccessDenied(msg())
        );
        assert_eq!(
            classify_code(Some("AccessDeniedException"), 400, msg()),
            CallError::AccessDenied(msg())
        );
    }

    #[test]
    fn client_errors_are_permanent() {
        assert_eq!(
            classify_code(Some("InvalidParameter"), 400, msg()),
            CallError::Other(msg())
        );
    }

    #[test]
    fn timeouts_are_transient() {
        let err: SnsSdkError = SdkError::timeout_error("operation timed out");
        assert!(classify(err).is_transient());
    }

    #[test]
    fn dispatch_failures_are_transient() {
        let err: SnsSdkError = SdkError::dispatch_failure(ConnectorError::io("connection reset".into()));
        assert!(classify(err).is_transient());
    }

    #[test]
    fn service_errors_use_code_and_status() {
        assert!(classify(service_error("Throttled", 429)).is_transient());
        assert!(classify(service_error("KMSThrottling", 400)).is_transient());
        assert!(matches!(
            classify(service_error("NotFound", 404)),
            CallError::NotFound(_)
        ));
        assert!(matches!(
            classify(service_error("InvalidParameter", 400)),
            CallError::Other(_)
        ));
    }
}
