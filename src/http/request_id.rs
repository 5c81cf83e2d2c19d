//! Request ID handling.

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Ensure every request carries an `x-request-id`, generating a UUID v4 when
/// the client did not send one, and echo it back on the response. The header
/// is forwarded upstream along with the rest of the request headers.
pub async fn ensure_request_id(mut request: Request<Body>, next: Next) -> Response {
    let id = match request.headers().get(REQUEST_ID_HEADER) {
        Some(v) => v.clone(),
        None => {
            let v = HeaderValue::from_str(&Uuid::new_v4().to_string())
                .expect("uuid is a valid header value");
            request.headers_mut().insert(REQUEST_ID_HEADER, v.clone());
            v
        }
    };

    let mut response = next.run(request).await;
    response.headers_mut().insert(REQUEST_ID_HEADER, id);
    response
}
