use axum::{
    extract::multipart::{Field, Multipart, MultipartError},
    http::StatusCode,
};
use bytes::{Bytes, BytesMut};
use thiserror::Error;

pub const IMAGE_FIELD: &str = "image";
pub const ALLOWED_MEDIA_TYPES: [&str; 3] = ["image/png", "image/jpg", "image/jpeg"];

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },
    #[error("Invalid mime type: {0:?}")]
    InvalidMediaType(String),
    #[error("No `image` file in the request")]
    MissingInput,
    #[error("Unexpected file field: {0}")]
    UnexpectedField(String),
    #[error("Multipart stream failed: {0}")]
    Multipart(String),
}

impl UploadError {
    fn from_multipart(err: MultipartError, limit: usize) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            UploadError::PayloadTooLarge { limit }
        } else {
            UploadError::Multipart(err.body_text())
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Bytes,
}

pub fn is_allowed_media_type(content_type: &str) -> bool {
    ALLOWED_MEDIA_TYPES
        .iter()
        .any(|allowed| content_type.eq_ignore_ascii_case(allowed))
}

/// Buffers the single `image` file of a multipart form.
///
/// The size limit is enforced while streaming and is checked before the media
/// type, so an oversized upload is always reported as such. Text fields are
/// ignored; any second file is rejected.
pub async fn read_image_upload(
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<ImageUpload, UploadError> {
    let mut upload: Option<ImageUpload> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::from_multipart(e, max_bytes))?
    {
        let name = field.name().map(str::to_owned);
        let file_name = field.file_name().map(str::to_owned);

        match name.as_deref() {
            Some(IMAGE_FIELD) if upload.is_none() => {
                let content_type = field.content_type().unwrap_or_default().to_owned();
                let bytes = read_capped(&mut field, max_bytes).await?;
                if !is_allowed_media_type(&content_type) {
                    return Err(UploadError::InvalidMediaType(content_type));
                }
                upload = Some(ImageUpload {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            Some(IMAGE_FIELD) => {
                return Err(UploadError::UnexpectedField(IMAGE_FIELD.into()));
            }
            Some(other) if file_name.is_some() => {
                return Err(UploadError::UnexpectedField(other.to_owned()));
            }
            _ => continue,
        }
    }

    upload.ok_or(UploadError::MissingInput)
}

async fn read_capped(field: &mut Field<'_>, max_bytes: usize) -> Result<Bytes, UploadError> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| UploadError::from_multipart(e, max_bytes))?
    {
        if buffer.len() + chunk.len() > max_bytes {
            return Err(UploadError::PayloadTooLarge { limit: max_bytes });
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{multipart, Part};

    const LIMIT: usize = 1024 * 1024;

    #[tokio::test]
    async fn test_reads_image_field() {
        let mut form = multipart(&[
            Part {
                name: "note",
                file_name: None,
                content_type: None,
                data: b"hello".to_vec(),
            },
            Part::image("image/png", vec![1, 2, 3]),
        ])
        .await;

        let upload = read_image_upload(&mut form, LIMIT).await.unwrap();

        assert_eq!(upload.content_type, "image/png");
        assert_eq!(upload.file_name.as_deref(), Some("upload.bin"));
        assert_eq!(&upload.bytes[..], &[1, 2, 3]);
    }

    #[tokio::test]
    async fn test_accepts_all_image_types() {
        for content_type in ["image/png", "image/jpg", "image/jpeg", "IMAGE/JPEG"] {
            let mut form = multipart(&[Part::image(content_type, vec![0; 8])]).await;
            assert!(read_image_upload(&mut form, LIMIT).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_exactly_at_limit_is_accepted() {
        let mut form = multipart(&[Part::image("image/png", vec![7; LIMIT])]).await;

        let upload = read_image_upload(&mut form, LIMIT).await.unwrap();

        assert_eq!(upload.bytes.len(), LIMIT);
    }

    #[tokio::test]
    async fn test_oversized_upload_wins_over_media_type() {
        for content_type in ["image/png", "application/pdf"] {
            let mut form = multipart(&[Part::image(content_type, vec![0; LIMIT + 1])]).await;

            let result = read_image_upload(&mut form, LIMIT).await;

            assert!(matches!(
                result,
                Err(UploadError::PayloadTooLarge { limit: LIMIT })
            ));
        }
    }

    #[tokio::test]
    async fn test_rejects_other_media_types() {
        for content_type in ["image/gif", "text/plain", "application/octet-stream"] {
            let mut form = multipart(&[Part::image(content_type, vec![0; 16])]).await;

            let result = read_image_upload(&mut form, LIMIT).await;

            assert!(matches!(result, Err(UploadError::InvalidMediaType(_))));
        }
    }

    #[tokio::test]
    async fn test_missing_content_type_is_invalid() {
        let mut form = multipart(&[Part {
            name: "image",
            file_name: Some("a.png"),
            content_type: None,
            data: vec![0; 4],
        }])
        .await;

        let result = read_image_upload(&mut form, LIMIT).await;

        assert!(matches!(result, Err(UploadError::InvalidMediaType(_))));
    }

    #[tokio::test]
    async fn test_missing_image_field() {
        let mut form = multipart(&[Part {
            name: "note",
            file_name: None,
            content_type: None,
            data: b"no file here".to_vec(),
        }])
        .await;

        let result = read_image_upload(&mut form, LIMIT).await;

        assert!(matches!(result, Err(UploadError::MissingInput)));
    }

    #[tokio::test]
    async fn test_second_file_is_rejected() {
        let mut form = multipart(&[
            Part::image("image/png", vec![1]),
            Part::image("image/png", vec![2]),
        ])
        .await;

        let result = read_image_upload(&mut form, LIMIT).await;

        assert!(matches!(result, Err(UploadError::UnexpectedField(_))));
    }

    #[tokio::test]
    async fn test_file_under_another_name_is_rejected() {
        let mut form = multipart(&[Part {
            name: "photo",
            file_name: Some("photo.png"),
            content_type: Some("image/png"),
            data: vec![1],
        }])
        .await;

        let result = read_image_upload(&mut form, LIMIT).await;

        assert!(matches!(result, Err(UploadError::UnexpectedField(name)) if name == "photo"));
    }
}
