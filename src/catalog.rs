//! HTTP client for the remote image/source catalog and the token verifier.

use crate::model::{CatalogImage, CatalogSource, ImageRegistration, Settings, SourceSubmission};
use anyhow::{bail, Context, Result};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

const IMAGES_PATH: &str = "/api/hub/remote-images/";
const SOURCES_PATH: &str = "/api/hub/remote-sources/";
const VERIFY_PATH: &str = "/auth/token/verify";

pub struct CatalogClient {
    http: reqwest::Client,
    api_url: String,
    auth_url: String,
}

impl CatalogClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            api_url: trim_base(&settings.api_url),
            auth_url: trim_base(&settings.auth_url),
        })
    }

    /// Shared HTTP client, also used for notebook downloads.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn api(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    pub async fn list_images(&self) -> Result<Vec<CatalogImage>> {
        self.get_json(&self.api(IMAGES_PATH)).await
    }

    pub async fn list_sources(&self) -> Result<Vec<CatalogSource>> {
        self.get_json(&self.api(SOURCES_PATH)).await
    }

    pub async fn publish_source(&self, body: &SourceSubmission, bearer: &str) -> Result<()> {
        let req = self
            .http
            .post(self.api(SOURCES_PATH))
            .bearer_auth(bearer)
            .json(body);
        send_checked(req, &[StatusCode::OK, StatusCode::CREATED]).await?;
        info!(name = %body.remote_name, "published source");
        Ok(())
    }

    pub async fn register_image(&self, body: &ImageRegistration, bearer: &str) -> Result<()> {
        let req = self
            .http
            .post(self.api(IMAGES_PATH))
            .bearer_auth(bearer)
            .json(body);
        send_checked(req, &[StatusCode::OK, StatusCode::CREATED]).await?;
        info!(image = %body.image_name, "registered image");
        Ok(())
    }

    pub async fn delete_image(&self, id: &str, bearer: &str) -> Result<()> {
        self.delete(&item_url(&self.api(IMAGES_PATH), id), bearer).await
    }

    pub async fn delete_source(&self, id: &str, bearer: &str) -> Result<()> {
        self.delete(&item_url(&self.api(SOURCES_PATH), id), bearer).await
    }

    /// True when the auth service accepts the token.
    pub async fn verify_token(&self, token: &str) -> Result<bool> {
        let url = format!("{}{}", self.auth_url, VERIFY_PATH);
        let res = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await
            .with_context(|| format!("POST {url}"))?;
        debug!(status = %res.status(), "token verification");
        Ok(res.status() == StatusCode::OK)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let res = send_checked(self.http.get(url), &[StatusCode::OK]).await?;
        res.json::<T>()
            .await
            .with_context(|| format!("decode response from {url}"))
    }

    async fn delete(&self, url: &str, bearer: &str) -> Result<()> {
        send_checked(self.http.delete(url).bearer_auth(bearer), &[StatusCode::NO_CONTENT]).await?;
        info!(url, "deleted catalog entry");
        Ok(())
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn item_url(collection: &str, id: &str) -> String {
    format!("{collection}{}/", id.trim_matches('/'))
}

async fn send_checked(builder: RequestBuilder, ok: &[StatusCode]) -> Result<Response> {
    let res = builder.send().await.context("catalog request failed")?;
    let status = res.status();
    if ok.contains(&status) {
        return Ok(res);
    }
    let url = res.url().to_string();
    let body = res.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            bail!("{url} rejected the token ({status}); run `runes token verify`")
        }
        StatusCode::NOT_FOUND => bail!("{url} not found"),
        _ => bail!("{url} returned {status}: {}", body.trim()),
    }
}
