use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::env;
use std::fmt::{self, Debug, Display};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

impl Error {
    pub fn is_invalid_invocation_error(&self) -> bool {
        self.code == 100
    }

    pub fn is_invalid_input_error(&self) -> bool {
        self.code == 101
    }

    pub fn is_unauthorized_error(&self) -> bool {
        self.code == 102
    }

    pub fn is_not_found_error(&self) -> bool {
        self.code == 104
    }

    pub fn is_conflict_error(&self) -> bool {
        self.code == 105
    }

    pub fn is_authentication_error(&self) -> bool {
        matches!(self.code, 103 | 110..=113)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for Error {}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        env_var_error(err)
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        database_error(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        serialization_error(err)
    }
}

impl From<oso::OsoError> for Error {
    fn from(err: oso::OsoError) -> Self {
        policy_error(err)
    }
}

impl From<argon2::password_hash::Error> for Error {
    fn from(err: argon2::password_hash::Error) -> Self {
        password_hash_error(err)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match self.code {
            1..=99 => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
            102 => (StatusCode::FORBIDDEN, self.message.as_str()),
            103 | 110..=113 => (StatusCode::UNAUTHORIZED, self.message.as_str()),
            104 => (StatusCode::NOT_FOUND, self.message.as_str()),
            105 => (StatusCode::CONFLICT, self.message.as_str()),
            _ => (StatusCode::BAD_REQUEST, self.message.as_str()),
        };

        let body = Json(json!({
            "code": self.code,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub fn invalid_invocation_error() -> Error {
    Error {
        code: 100,
        message: "invalid invocation".into(),
    }
}

pub fn invalid_input_error() -> Error {
    Error {
        code: 101,
        message: "invalid input".into(),
    }
}

/// Same code as [`invalid_input_error`], with a hint for the caller.
pub fn invalid_field_error(field: &str) -> Error {
    Error {
        code: 101,
        message: format!("invalid input: {}", field),
    }
}

pub fn unauthorized_error() -> Error {
    Error {
        code: 102,
        message: "unauthorized".into(),
    }
}

pub fn unauthenticated_error() -> Error {
    Error {
        code: 103,
        message: "authentication required".into(),
    }
}

pub fn not_found_error() -> Error {
    Error {
        code: 104,
        message: "not found".into(),
    }
}

pub fn conflict_error() -> Error {
    Error {
        code: 105,
        message: "resource was modified concurrently".into(),
    }
}

pub fn invalid_credential_error() -> Error {
    Error {
        code: 110,
        message: "invalid credential".into(),
    }
}

pub fn wrong_password_error() -> Error {
    Error {
        code: 111,
        message: "wrong password".into(),
    }
}

pub fn user_not_found_error() -> Error {
    Error {
        code: 112,
        message: "user not found".into(),
    }
}

pub fn account_suspended_error() -> Error {
    Error {
        code: 113,
        message: "account suspended".into(),
    }
}

pub fn env_var_error(_: env::VarError) -> Error {
    Error {
        code: 1,
        message: "environment variable error".into(),
    }
}

pub fn database_error<T: Debug>(err: T) -> Error {
    tracing::error!("database error: {:?}", err);

    Error {
        code: 2,
        message: "database error".into(),
    }
}

pub fn serialization_error<T: Debug>(err: T) -> Error {
    tracing::error!("serialization error: {:?}", err);

    Error {
        code: 3,
        message: "serialization error".into(),
    }
}

pub fn policy_error<T: Debug>(err: T) -> Error {
    tracing::error!("policy error: {:?}", err);

    Error {
        code: 4,
        message: "policy error".into(),
    }
}

pub fn unexpected_error() -> Error {
    Error {
        code: 5,
        message: "unexpected error".into(),
    }
}

pub fn password_hash_error<T: Debug>(err: T) -> Error {
    tracing::error!("password hash error: {:?}", err);

    Error {
        code: 6,
        message: "password hash error".into(),
    }
}

pub fn config_error(name: &str) -> Error {
    Error {
        code: 7,
        message: format!("configuration error: {}", name),
    }
}

#[test]
fn internal_errors_do_not_leak_details() {
    let response = database_error("connection refused").into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = not_found_error().into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = wrong_password_error().into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = invalid_invocation_error().into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
