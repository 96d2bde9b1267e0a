//! Defines routes for the image gateway.
//!
//! ## Structure
//! - **Image endpoints**
//!   - `POST /api/image`             — upload (multipart field `image` or `file`)
//!   - `GET  /api/image/id/{id}`     — download by hex identifier
//!   - `GET  /api/image/name/{name}` — download by filename (latest upload wins)
//!
//! - **Health**
//!   - `GET /healthz`, `GET /readyz`

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        image_handlers::{get_image_by_id, get_image_by_name, upload_image},
    },
    services::image_service::ImageService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Build the router for all image routes.
///
/// The router carries shared state (`ImageService`) to all handlers.
/// `max_upload_bytes` caps the request body accepted by the upload route.
pub fn routes(max_upload_bytes: usize) -> Router<ImageService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // image routes
        .route(
            "/api/image",
            post(upload_image).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/image/id/{id}", get(get_image_by_id))
        .route("/api/image/name/{name}", get(get_image_by_name))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::memory_pool;
    use axum::{
        body::Body,
        http::{Request, Response, StatusCode, header},
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "----image-store-test-boundary";
    const CHUNK: usize = 16;

    async fn build_app() -> Router {
        build_app_with_limit(1024 * 1024).await
    }

    async fn build_app_with_limit(max_upload_bytes: usize) -> Router {
        let service = ImageService::new(Arc::new(memory_pool().await), CHUNK);
        routes(max_upload_bytes).with_state(service)
    }

    fn multipart_body(field: &str, filename: Option<&str>, content: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/image")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_bytes(response: Response<Body>) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    async fn body_json(response: Response<Body>) -> serde_json::Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    fn header_str<'a>(response: &'a Response<Body>, name: header::HeaderName) -> &'a str {
        response.headers()[name].to_str().unwrap()
    }

    fn sample_image(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 256) as u8).collect()
    }

    async fn upload(app: &Router, filename: &str, content: &[u8]) -> serde_json::Value {
        let response = app
            .clone()
            .oneshot(upload_request(multipart_body("image", Some(filename), content)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }

    #[tokio::test]
    async fn healthz_returns_ok() {
        let app = build_app().await;
        let response = app.oneshot(get_request("/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn readyz_checks_database() {
        let app = build_app().await;
        let response = app.oneshot(get_request("/readyz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["checks"]["database"]["ok"], true);
    }

    #[tokio::test]
    async fn upload_reports_created_image() {
        let app = build_app().await;
        let content = sample_image(40);

        let json = upload(&app, "photo.png", &content).await;
        assert_eq!(json["error"], false);
        assert_eq!(json["msg"], "Image uploaded successfully");
        assert_eq!(json["image"]["name"], "photo.png");
        assert_eq!(json["image"]["size"], 40);
        assert_eq!(json["image"]["id"].as_str().unwrap().len(), 24);
    }

    #[tokio::test]
    async fn round_trip_by_id() {
        let app = build_app().await;
        let content = sample_image(10 * CHUNK + 3);

        let json = upload(&app, "big.jpg", &content).await;
        let id = json["image"]["id"].as_str().unwrap();

        let response = app
            .oneshot(get_request(&format!("/api/image/id/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, header::CONTENT_TYPE), "image/jpeg");
        assert_eq!(
            header_str(&response, header::CACHE_CONTROL),
            "public, max-age=31536000"
        );
        assert_eq!(
            header_str(&response, header::CONTENT_LENGTH),
            content.len().to_string()
        );
        assert_eq!(body_bytes(response).await, content);
    }

    #[tokio::test]
    async fn round_trip_by_name() {
        let app = build_app().await;
        let content = sample_image(CHUNK + 1);
        upload(&app, "avatar.png", &content).await;

        let response = app
            .oneshot(get_request("/api/image/name/avatar.png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, header::CONTENT_TYPE), "image/png");
        assert_eq!(body_bytes(response).await, content);
    }

    #[tokio::test]
    async fn file_field_is_accepted() {
        let app = build_app().await;
        let response = app
            .oneshot(upload_request(multipart_body("file", Some("alt.jpeg"), b"jpeg")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["image"]["name"], "alt.jpeg");
    }

    #[tokio::test]
    async fn repeated_reads_are_identical() {
        let app = build_app().await;
        let content = sample_image(3 * CHUNK);
        let json = upload(&app, "same.png", &content).await;
        let uri = format!("/api/image/id/{}", json["image"]["id"].as_str().unwrap());

        let mut seen = Vec::new();
        for _ in 0..3 {
            let response = app.clone().oneshot(get_request(&uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let headers = response.headers().clone();
            seen.push((headers, body_bytes(response).await));
        }
        assert!(seen.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(seen[0].1, content);
    }

    #[tokio::test]
    async fn rejects_disallowed_extension() {
        let app = build_app().await;
        let response = app
            .clone()
            .oneshot(upload_request(multipart_body("image", Some("doc.pdf"), b"%PDF")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], true);
        assert_eq!(json["msg"], "Invalid file type");

        let response = app
            .oneshot(get_request("/api/image/name/doc.pdf"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_file_is_bad_request() {
        let app = build_app().await;
        let response = app
            .oneshot(upload_request(multipart_body("caption", None, b"hello")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], true);
    }

    #[tokio::test]
    async fn non_multipart_upload_is_json_bad_request() {
        let app = build_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/image")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            header_str(&response, header::CONTENT_TYPE),
            "application/json"
        );
        let json = body_json(response).await;
        assert_eq!(json["error"], true);
        assert!(!json["msg"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let app = build_app_with_limit(64).await;
        let response = app
            .clone()
            .oneshot(upload_request(multipart_body(
                "image",
                Some("huge.png"),
                &sample_image(500),
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let json = body_json(response).await;
        assert_eq!(json["error"], true);
        assert_eq!(json["msg"], "Request payload is too large");

        let response = app
            .oneshot(get_request("/api/image/name/huge.png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn non_file_image_field_is_bad_request() {
        let app = build_app().await;
        let response = app
            .oneshot(upload_request(multipart_body("image", None, b"not a file")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let app = build_app().await;
        let response = app
            .oneshot(get_request("/api/image/id/65a1f0c2b3d4e5f60718293a"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["msg"], "Image not found");
    }

    #[tokio::test]
    async fn malformed_id_is_bad_request() {
        let app = build_app().await;
        let response = app
            .oneshot(get_request("/api/image/id/not-a-valid-hex"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], true);
    }

    #[tokio::test]
    async fn unknown_name_is_not_found() {
        let app = build_app().await;
        let response = app
            .oneshot(get_request("/api/image/name/missing.png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
