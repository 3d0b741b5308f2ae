use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::domain::cart::CartError;

const INTERNAL_ERROR_MESSAGE: &str = "Please ask your system administrator to check the logs.";

#[derive(Debug)]
pub enum ClientError {
    Domain(CartError),
    Payload(String),
    Internal(anyhow::Error),
}

impl ClientError {
    fn status_and_message(self) -> (StatusCode, String) {
        match self {
            ClientError::Domain(cart_error) => {
                let status = match &cart_error {
                    CartError::InvalidProductId(_)
                    | CartError::InvalidUserId(_)
                    | CartError::InvalidQuantity(_) => StatusCode::BAD_REQUEST,
                    CartError::ProductNotFound(_) | CartError::ItemNotInCart(_) => {
                        StatusCode::NOT_FOUND
                    }
                    CartError::NotAuthenticated => StatusCode::UNAUTHORIZED,
                    CartError::Conflict(_) => StatusCode::CONFLICT,
                    CartError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                    CartError::SessionUnavailable => {
                        error!("Cart request rejected: {cart_error}");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                    CartError::Store(store_error) => {
                        error!("Cart store failure: {store_error}");
                        return (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            INTERNAL_ERROR_MESSAGE.to_owned(),
                        );
                    }
                };
                (status, cart_error.to_string())
            }
            ClientError::Payload(message) => (StatusCode::BAD_REQUEST, message),
            ClientError::Internal(e) => {
                error!("Internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_ERROR_MESSAGE.to_owned(),
                )
            }
        }
    }
}

impl IntoResponse for ClientError {
    fn into_response(self) -> Response {
        #[derive(serde::Serialize)]
        struct ErrorResponse {
            success: bool,
            error: String,
        }

        let (status, error) = self.status_and_message();
        (
            status,
            Json(ErrorResponse {
                success: false,
                error,
            }),
        )
            .into_response()
    }
}

impl From<CartError> for ClientError {
    fn from(cart_error: CartError) -> Self {
        ClientError::Domain(cart_error)
    }
}

impl From<JsonRejection> for ClientError {
    fn from(rejection: JsonRejection) -> Self {
        ClientError::Payload(rejection.body_text())
    }
}

impl From<anyhow::Error> for ClientError {
    fn from(value: anyhow::Error) -> Self {
        ClientError::Internal(value)
    }
}
