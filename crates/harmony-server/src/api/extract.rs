//! Body, query, and path extractors that reject with [`ApiError`] instead of
//! axum's plain-text responses.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::middleware::request_id_of;

use super::ApiError;

/// JSON request body. Malformed JSON, a wrong content type, or a field of the
/// wrong type all become a 400 `validation_error`.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

/// Query string parameters; a value that fails to parse is a 400.
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

/// Path parameters; a malformed id is a 400 rather than a plain-text reply.
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let rid = request_id_of(req.extensions());
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rid, &rejection)),
        }
    }
}

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(query_rejection(
                request_id_of(&parts.extensions),
                &rejection,
            )),
        }
    }
}

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(path_rejection(
                request_id_of(&parts.extensions),
                &rejection,
            )),
        }
    }
}

fn json_rejection(request_id: String, rejection: &JsonRejection) -> ApiError {
    let message = match rejection {
        JsonRejection::JsonDataError(e) => e.body_text(),
        JsonRejection::JsonSyntaxError(_) => "request body is not valid JSON".to_string(),
        JsonRejection::MissingJsonContentType(_) => {
            "expected `Content-Type: application/json`".to_string()
        }
        other => other.body_text(),
    };
    ApiError::new(request_id, "validation_error", message)
}

fn query_rejection(request_id: String, rejection: &QueryRejection) -> ApiError {
    ApiError::new(request_id, "validation_error", rejection.body_text())
}

fn path_rejection(request_id: String, rejection: &PathRejection) -> ApiError {
    if rejection.status().is_server_error() {
        tracing::error!(error = %rejection.body_text(), "route is missing path parameters");
        return ApiError::new(request_id, "internal_error", "internal server error");
    }
    ApiError::new(request_id, "validation_error", rejection.body_text())
}

#[cfg(test)]
mod tests {
    use axum::http::header;

    use super::*;

    #[derive(Debug, serde::Deserialize)]
    struct Payload {
        name: String,
    }

    fn json_request(body: &'static str) -> Request {
        axum::http::Request::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(body))
            .expect("request")
    }

    #[tokio::test]
    async fn wrong_field_type_is_a_validation_error() {
        let err = ApiJson::<Payload>::from_request(json_request(r#"{"name":5}"#), &())
            .await
            .unwrap_err();
        assert_eq!(err.code, "validation_error");
        assert!(err.message.contains("name"));
    }

    #[tokio::test]
    async fn syntax_error_is_reported_as_invalid_json() {
        let err = ApiJson::<Payload>::from_request(json_request("{not json"), &())
            .await
            .unwrap_err();
        assert_eq!(err.code, "validation_error");
        assert_eq!(err.message, "request body is not valid JSON");
    }

    #[tokio::test]
    async fn valid_body_is_extracted() {
        let ApiJson(body) = ApiJson::<Payload>::from_request(json_request(r#"{"name":"Sari"}"#), &())
            .await
            .expect("valid body");
        assert_eq!(body.name, "Sari");
    }
}
