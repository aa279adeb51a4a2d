//! Object uploads and signed URLs.

use crate::client::BaasClient;
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use trauma_core::{ObjectStorage, TraumaResult};

pub struct BaasStorage {
    client: BaasClient,
}

impl BaasStorage {
    pub fn new(client: BaasClient) -> Self {
        Self { client }
    }
}

#[derive(Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL", alias = "signedUrl")]
    signed_url: String,
}

/// Makes a signed URL absolute. The storage service returns it relative to its own root.
fn absolute_signed_url(base_url: &str, signed: &str) -> String {
    if signed.starts_with("http://") || signed.starts_with("https://") {
        signed.to_string()
    } else if signed.starts_with("/storage/v1/") {
        format!("{base_url}{signed}")
    } else {
        format!("{base_url}/storage/v1{signed}")
    }
}

#[async_trait]
impl ObjectStorage for BaasStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> TraumaResult<String> {
        let request = self
            .client
            .request(Method::POST, &format!("/storage/v1/object/{bucket}/{path}"))
            .header("x-upsert", "true")
            .header("content-type", content_type)
            .body(bytes);
        self.client.send(request).await?;
        tracing::debug!(bucket, path, "object uploaded");
        Ok(path.to_string())
    }

    async fn signed_url(&self, bucket: &str, path: &str, ttl: Duration) -> TraumaResult<String> {
        let request = self
            .client
            .request(
                Method::POST,
                &format!("/storage/v1/object/sign/{bucket}/{path}"),
            )
            .json(&json!({ "expiresIn": ttl.as_secs() }));
        let signed: SignedUrlResponse = self.client.send_json(request).await?;
        Ok(absolute_signed_url(self.client.base_url(), &signed.signed_url))
    }
}
