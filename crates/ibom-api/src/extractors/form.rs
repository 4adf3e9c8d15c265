//! `Multipart` extractor: buffers a `multipart/form-data` body and decodes it.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::{StatusCode, header};
use ibom_core::AppError;
use ibom_core::error::ErrorKind;

use crate::error::ApiError;
use crate::multipart::{FormData, is_form_data, parse_multipart};

/// Decoded multipart form.
///
/// The body size is capped by the router's `DefaultBodyLimit`.
#[derive(Debug, Clone)]
pub struct Multipart(pub FormData);

impl std::ops::Deref for Multipart {
    type Target = FormData;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequest<S> for Multipart
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .filter(|ct| is_form_data(ct))
            .ok_or_else(|| AppError::malformed("Invalid content type"))?;

        let body = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::new(ErrorKind::PayloadTooLarge, "Upload exceeds the size limit")
            } else {
                AppError::malformed(format!("Failed to read request body: {rejection}"))
            }
        })?;

        let form = parse_multipart(&body, &content_type).map_err(AppError::from)?;
        Ok(Self(form))
    }
}
