//! services/api/src/adapters/cloudinary.rs
//!
//! Implements the `ImageStorageService` port against Cloudinary's signed
//! upload endpoint.

use async_trait::async_trait;
use meal_builder_core::ports::{ImageStorageService, PortError, PortResult};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};

use crate::config::CloudinaryConfig;

const UPLOAD_FOLDER: &str = "mealbuilder/recipes";

/// An adapter that uploads recipe images to Cloudinary.
#[derive(Clone)]
pub struct CloudinaryAdapter {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryAdapter {
    pub fn new(client: reqwest::Client, config: CloudinaryConfig) -> Self {
        Self { client, config }
    }

    fn upload_url(&self) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            self.config.cloud_name
        )
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    error: Option<UploadError>,
}

#[derive(Deserialize)]
struct UploadError {
    message: String,
}

/// The `type/subtype` part of a content type, or `None` when it is not a
/// well-formed media type. Parameters are dropped.
fn media_type(content_type: &str) -> Option<&str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    let (kind, subtype) = essence.split_once('/')?;
    let is_token = |s: &str| {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c))
    };
    (is_token(kind) && is_token(subtype)).then_some(essence)
}

/// The parameters that go into the signature, already in key order.
fn signed_params(timestamp: i64) -> Vec<(&'static str, String)> {
    vec![
        ("folder", UPLOAD_FOLDER.to_string()),
        ("overwrite", "false".to_string()),
        ("timestamp", timestamp.to_string()),
        ("unique_filename", "true".to_string()),
        ("use_filename", "true".to_string()),
    ]
}

/// Hex SHA-256 of `k1=v1&k2=v2...` followed by the API secret.
fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let joined = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl ImageStorageService for CloudinaryAdapter {
    async fn upload(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        data: Vec<u8>,
    ) -> PortResult<String> {
        let params = signed_params(chrono::Utc::now().timestamp());
        let signature = sign(&params, &self.config.api_secret);

        let mut file = Part::bytes(data).file_name(file_name.to_string());
        match content_type.map(|raw| (raw, media_type(raw))) {
            Some((_, Some(mime))) => {
                file = file
                    .mime_str(mime)
                    .map_err(|e| PortError::Unexpected(format!("Invalid content type: {e}")))?;
            }
            Some((raw, None)) => {
                warn!("Uploading {} without its malformed content type {:?}", file_name, raw);
            }
            None => {}
        }

        let mut form = Form::new()
            .part("file", file)
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (key, value) in params {
            form = form.text(key, value);
        }

        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Image upload failed: {e}")))?;

        let status = response.status();
        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Unreadable upload response: {e}")))?;

        match (body.secure_url, body.error) {
            (Some(url), None) if status.is_success() => {
                info!("Uploaded image {} to {}", file_name, url);
                Ok(url)
            }
            (_, Some(err)) => {
                error!("Cloudinary rejected upload of {}: {}", file_name, err.message);
                Err(PortError::Unexpected(format!(
                    "Cloudinary upload failed: {}",
                    err.message
                )))
            }
            _ => Err(PortError::Unexpected(format!(
                "Cloudinary upload failed with status {status}"
            ))),
        }
    }
}
