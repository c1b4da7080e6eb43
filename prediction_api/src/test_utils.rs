use crate::{
    config::{PreprocessConfig, UploadConfig},
    model_service::{ModelError, ModelService, ModelState},
    prediction::PredictionService,
    preprocess::ImagePreprocessor,
    record::PredictionRecord,
    server::SharedState,
    store::{RecordStore, StoreError},
    telemetry::Metrics,
    threshold::ThresholdPolicy,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{FromRequest, Multipart},
    http::{header, Request},
    response::Response,
};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use ndarray::{Array, Ix4};
use std::{io::Cursor, sync::Arc};

pub fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut image_data: Vec<u8> = Vec::new();
    let mut cursor = Cursor::new(&mut image_data);
    img.write_to(&mut cursor, format).unwrap();
    image_data
}

pub fn png_bytes(width: u32, height: u32, color: Rgb<u8>) -> Vec<u8> {
    let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(width, height, color);
    encode(&DynamicImage::ImageRgb8(img), ImageFormat::Png)
}

pub fn jpeg_bytes(width: u32, height: u32, color: Rgb<u8>) -> Vec<u8> {
    let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(width, height, color);
    encode(&DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

const BOUNDARY: &str = "XBOUNDARYX";

pub struct Part<'a> {
    pub name: &'a str,
    pub file_name: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: Vec<u8>,
}

impl<'a> Part<'a> {
    pub fn image(content_type: &'a str, data: Vec<u8>) -> Self {
        Self {
            name: "image",
            file_name: Some("upload.bin"),
            content_type: Some(content_type),
            data,
        }
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(file_name) = part.file_name {
            disposition.push_str(&format!("; filename=\"{}\"", file_name));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub async fn multipart(parts: &[Part<'_>]) -> Multipart {
    Multipart::from_request(multipart_request(parts), &())
        .await
        .unwrap()
}

#[derive(Clone)]
pub struct MockModelService {
    pub score: f32,
}

#[async_trait]
impl ModelService for MockModelService {
    async fn predict(&self, input: Array<f32, Ix4>) -> Result<f32, ModelError> {
        assert_eq!(input.shape(), &[1, 224, 224, 3]);
        Ok(self.score)
    }
}

pub struct FailingModelService;

#[async_trait]
impl ModelService for FailingModelService {
    async fn predict(&self, _input: Array<f32, Ix4>) -> Result<f32, ModelError> {
        Err(ModelError::Inference("runtime exploded".into()))
    }
}

pub struct FailingStore;

#[async_trait]
impl RecordStore for FailingStore {
    async fn put(&self, _record: &PredictionRecord) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::other("quota exceeded")))
    }

    async fn list_all(&self) -> Result<Vec<PredictionRecord>, StoreError> {
        Err(StoreError::Io(std::io::Error::other("connection refused")))
    }
}

pub fn shared_state(model: ModelState, store: Arc<dyn RecordStore>) -> SharedState {
    let prediction_service = PredictionService::new(
        ImagePreprocessor::new(&PreprocessConfig::default()),
        model,
        ThresholdPolicy::default(),
        store,
    );

    SharedState {
        prediction_service: Arc::new(prediction_service),
        upload_config: UploadConfig::default(),
        metrics: Arc::new(Metrics::new().unwrap()),
    }
}

pub async fn read_json(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
