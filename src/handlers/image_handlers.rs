//! HTTP handlers for image upload and download.
//! Multipart parsing and response headers live here; storage concerns are
//! delegated to `ImageService`.

use crate::{
    errors::AppError,
    services::image_service::{ImageDownload, ImageService, StoredImage},
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State, multipart::MultipartRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::debug;

/// Multipart field names that may carry the image.
const FILE_FIELDS: [&str; 2] = ["image", "file"];

const IMMUTABLE_CACHE: &str = "public, max-age=31536000";

#[derive(Serialize)]
struct UploadResponse {
    error: bool,
    msg: &'static str,
    image: StoredImage,
}

/// `POST /api/image` — store the first file found under `image` or `file`.
pub async fn upload_image(
    State(service): State<ImageService>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let mut multipart = multipart?;
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default();
        if !FILE_FIELDS.contains(&name) {
            debug!("skipping multipart field {:?}", name);
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::bad_request("form field is not a file upload"))?;
        let content = field.bytes().await?;
        upload = Some((filename, content));
        break;
    }

    let (filename, content) = upload.ok_or_else(|| {
        AppError::bad_request("there is no uploaded file associated with the given key")
    })?;

    let image = service.upload(&filename, content).await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            error: false,
            msg: "Image uploaded successfully",
            image,
        }),
    ))
}

/// `GET /api/image/id/{id}` — raw image bytes by hex identifier.
pub async fn get_image_by_id(
    State(service): State<ImageService>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let image = service.download_by_id(&id).await?;
    Ok(image_response(image))
}

/// `GET /api/image/name/{name}` — raw image bytes of the latest upload with that name.
pub async fn get_image_by_name(
    State(service): State<ImageService>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let image = service.download_by_name(&name).await?;
    Ok(image_response(image))
}

fn image_response(image: ImageDownload) -> Response {
    let content_type = image.content_type();
    let length = image.body.len();

    let mut response = Response::new(Body::from(image.body));
    *response.status_mut() = StatusCode::OK;
    set_image_headers(response.headers_mut(), content_type, length);
    response
}

fn set_image_headers(headers: &mut HeaderMap, content_type: &'static str, length: usize) {
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(IMMUTABLE_CACHE),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
}
