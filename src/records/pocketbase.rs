use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::{
    Client, RequestBuilder, Response,
    multipart::{Form, Part},
};
use serde::Deserialize;
use tracing::debug;

use crate::{camera::image::CapturedImage, config::AppConfig};

use super::{NewTree, NewTreeImage, RecordStore, TREE_IMAGES, TREES};

/// Record store backed by the PocketBase REST API.
#[derive(Clone)]
pub struct PocketBaseStore {
    base_url: String,
    token: Option<String>,
    client: Client,
}

#[derive(Deserialize)]
struct CreatedRecord {
    #[serde(default)]
    id: String,
}

impl PocketBaseStore {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            base_url,
            token,
            client: Client::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.pocketbase_url.clone(), config.pocketbase_token.clone())
    }

    fn records_url(&self, collection: &str) -> String {
        format!("{}/api/collections/{collection}/records", self.base_url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header(reqwest::header::AUTHORIZATION, token),
            None => request,
        }
    }

    async fn created_id(response: Response, collection: &str) -> Result<String> {
        let response = Self::ensure_success(response, collection).await?;
        let record: CreatedRecord = response
            .json()
            .await
            .with_context(|| format!("{collection} create response is not a record"))?;
        if record.id.is_empty() {
            bail!("{collection} create response carried no id");
        }
        Ok(record.id)
    }

    fn picture_part(picture: &CapturedImage) -> Result<Part> {
        Part::bytes(picture.data().to_vec())
            .file_name(picture.file_name())
            .mime_str(picture.mime())
            .with_context(|| format!("captured image has an invalid mime type {:?}", picture.mime()))
    }

    async fn ensure_success(response: Response, collection: &str) -> Result<Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("pocketbase {collection} error status={status} body={body}");
        }
        Ok(response)
    }
}

#[async_trait]
impl RecordStore for PocketBaseStore {
    fn check_picture(&self, picture: &CapturedImage) -> Result<()> {
        Self::picture_part(picture).map(|_| ())
    }

    async fn create_tree(&self, tree: &NewTree) -> Result<String> {
        let response = self
            .authorize(self.client.post(self.records_url(TREES)))
            .json(tree)
            .send()
            .await
            .context("failed to send trees create request")?;

        let id = Self::created_id(response, TREES).await?;
        debug!("created {TREES} record {id}");
        Ok(id)
    }

    async fn create_tree_image(&self, image: &NewTreeImage) -> Result<String> {
        let picture = Self::picture_part(&image.picture)?;
        let form = Form::new()
            .part("picUrl", picture)
            .text("tree_id", image.tree_id.clone())
            .text("user_id", image.user_id.clone())
            .text("upvotes", image.upvotes.to_string());

        let response = self
            .authorize(self.client.post(self.records_url(TREE_IMAGES)))
            .multipart(form)
            .send()
            .await
            .context("failed to send tree_images create request")?;

        let id = Self::created_id(response, TREE_IMAGES).await?;
        debug!("created {TREE_IMAGES} record {id}");
        Ok(id)
    }

    async fn delete_tree(&self, tree_id: &str) -> Result<()> {
        let url = format!("{}/{tree_id}", self.records_url(TREES));
        let response = self
            .authorize(self.client.delete(url))
            .send()
            .await
            .context("failed to send trees delete request")?;

        Self::ensure_success(response, TREES).await?;
        Ok(())
    }
}
