//! Client for the DALL-E style image generation endpoint.

use futures_util::{stream, Stream, StreamExt};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::types::ParagraphImages;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Error generating images: {0}")]
    Upstream(String),
    #[error("image request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    prompt: &'a str,
    model: &'static str,
    n: u32,
    quality: &'static str,
    response_format: &'static str,
    size: &'static str,
    style: &'static str,
    user: &'static str,
}

impl<'a> GenerationRequest<'a> {
    fn new(prompt: &'a str) -> Self {
        Self {
            prompt,
            model: "dall-e-3",
            n: 1,
            quality: "standard",
            response_format: "url",
            size: "1024x1024",
            style: "vivid",
            user: "user-1234",
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerationResponse { data: Vec<GeneratedImage> }

#[derive(Debug, Deserialize)]
struct GeneratedImage { url: String }

#[derive(Clone)]
pub struct ImageClient {
    http: reqwest::Client,
    endpoint: Url,
    concurrency: usize,
}

impl ImageClient {
    pub fn new(endpoint: Url, timeout: Duration, concurrency: usize) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoint, concurrency: concurrency.max(1) })
    }

    /// One POST for one prompt. Anything but 200 is returned as the raw body.
    pub async fn generate(&self, prompt: &str, token: &str) -> Result<Vec<String>, ImageError> {
        let resp = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(token)
            .json(&GenerationRequest::new(prompt))
            .send()
            .await?;
        if resp.status() != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(ImageError::Upstream(body));
        }
        let parsed: GenerationResponse = resp.json().await?;
        Ok(parsed.data.into_iter().map(|img| img.url).collect())
    }

    async fn generate_paragraph(&self, paragraph: String, token: &str) -> ParagraphImages {
        match self.generate(&paragraph, token).await {
            Ok(urls) => {
                info!(count = urls.len(), "images generated");
                ParagraphImages { paragraph, urls, error: None }
            }
            Err(e) => {
                warn!(error = %e, "image generation failed for paragraph");
                ParagraphImages { paragraph, urls: Vec::new(), error: Some(e.to_string()) }
            }
        }
    }

    /// Runs every paragraph with bounded parallelism; items come out in input order.
    pub fn generate_stream<'a>(
        &'a self,
        paragraphs: Vec<String>,
        token: &'a str,
    ) -> impl Stream<Item = ParagraphImages> + 'a {
        stream::iter(paragraphs)
            .map(move |p| self.generate_paragraph(p, token))
            .buffered(self.concurrency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn generate_all(client: &ImageClient, paragraphs: Vec<String>) -> Vec<ParagraphImages> {
        client.generate_stream(paragraphs, "sk-test").collect().await
    }

    async fn serve(app: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        Url::parse(&format!("http://{addr}/v1/images/generations")).unwrap()
    }

    async fn fake_endpoint(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, String) {
        assert_eq!(headers["authorization"], "Bearer sk-test");
        assert_eq!(body["model"], "dall-e-3");
        assert_eq!(body["n"], 1);
        assert_eq!(body["size"], "1024x1024");
        assert_eq!(body["response_format"], "url");
        let prompt = body["prompt"].as_str().unwrap_or_default().to_string();
        if prompt.contains("fail") {
            return (StatusCode::INTERNAL_SERVER_ERROR, "quota exceeded".into());
        }
        let reply = json!({ "data": [{ "url": format!("https://img.test/{}.png", prompt.len()) }] });
        (StatusCode::OK, reply.to_string())
    }

    #[tokio::test]
    async fn server_error_yields_empty_list_and_body() {
        let url = serve(Router::new().route("/v1/images/generations", post(fake_endpoint))).await;
        let client = ImageClient::new(url, Duration::from_secs(5), 2).unwrap();
        let err = client.generate("please fail", "sk-test").await.unwrap_err();
        assert!(matches!(&err, ImageError::Upstream(body) if body == "quota exceeded"));

        let results = generate_all(&client, vec!["please fail".into()]).await;
        assert!(results[0].urls.is_empty());
        assert_eq!(results[0].error.as_deref(), Some("Error generating images: quota exceeded"));
    }

    #[tokio::test]
    async fn failures_do_not_stop_siblings_and_order_holds() {
        let url = serve(Router::new().route("/v1/images/generations", post(fake_endpoint))).await;
        let client = ImageClient::new(url, Duration::from_secs(5), 3).unwrap();
        let paragraphs = vec!["first one.".to_string(), "fail here.".to_string(), "third.".to_string()];
        let results = generate_all(&client, paragraphs).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].urls, vec!["https://img.test/10.png"]);
        assert!(results[1].urls.is_empty() && results[1].error.is_some());
        assert_eq!(results[2].paragraph, "third.");
        assert_eq!(results[2].urls, vec!["https://img.test/6.png"]);
    }

    #[tokio::test]
    async fn unreachable_endpoint_degrades_to_error() {
        let client = ImageClient::new(Url::parse("http://127.0.0.1:9/none").unwrap(), Duration::from_secs(2), 1).unwrap();
        let results = generate_all(&client, vec!["x".into()]).await;
        assert!(results[0].urls.is_empty());
        assert!(results[0].error.is_some());
    }
}
