// SPDX-License-Identifier: MPL-2.0

use crate::api::types::{AlgorithmPatch, JobStatus, SocialGraph, TrendingTopic, UploadResponse};
use crate::api::{ApiError, create_auth_header};
use crate::protocol::Algorithm;
use crate::protocol::events;
use nostr_sdk::prelude::Keys;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Client for the feed backend (algorithms, social graph, trending, uploads,
/// batch jobs). Failed requests are not retried.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    keys: Option<Keys>,
}

impl ApiClient {
    pub fn new(base_url: &str, keys: Option<Keys>) -> Result<Self, ApiError> {
        // join() drops the last segment unless the base ends with a slash
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("nostrfeed/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: Url::parse(&base)?,
            keys,
        })
    }

    pub fn set_keys(&mut self, keys: Option<Keys>) {
        self.keys = keys;
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    /// Build a request carrying the signed auth header.
    fn authorized(&self, method: Method, url: Url) -> Result<RequestBuilder, ApiError> {
        let keys = self.keys.as_ref().ok_or(ApiError::NotAuthenticated)?;
        let header = create_auth_header(keys, method.as_str(), url.path(), events::now());
        Ok(self.http.request(method, url).header(AUTHORIZATION, header))
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("API request failed with {}: {}", status, body);
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }

    pub async fn list_algorithms(&self) -> Result<Vec<Algorithm>, ApiError> {
        let url = self.endpoint("byo-algo")?;
        Self::send_json(self.authorized(Method::GET, url)?).await
    }

    pub async fn create_algorithm(&self, algo: &Algorithm) -> Result<Algorithm, ApiError> {
        let url = self.endpoint("byo-algo")?;
        Self::send_json(self.authorized(Method::POST, url)?.json(algo)).await
    }

    pub async fn update_algorithm(
        &self,
        id: &str,
        patch: &AlgorithmPatch,
    ) -> Result<Algorithm, ApiError> {
        let url = self.endpoint(&format!("byo-algo/{}", id))?;
        Self::send_json(self.authorized(Method::PATCH, url)?.json(patch)).await
    }

    /// Follow-graph expansion around `pubkey`.
    pub async fn social_graph(&self, pubkey: &str, degrees: u32) -> Result<SocialGraph, ApiError> {
        let mut url = self.endpoint("social-graph")?;
        url.query_pairs_mut()
            .append_pair("pubkey", pubkey)
            .append_pair("degrees", &degrees.to_string());
        Self::send_json(self.authorized(Method::GET, url)?).await
    }

    pub async fn trending_topics(&self) -> Result<Vec<TrendingTopic>, ApiError> {
        let url = self.endpoint("trending")?;
        Self::send_json(self.authorized(Method::GET, url)?).await
    }

    pub async fn job_status(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        let url = self.endpoint(&format!("batch/{}", job_id))?;
        Self::send_json(self.authorized(Method::GET, url)?).await
    }

    /// Poll a batch job until it completes or fails, at most `max_polls` times.
    pub async fn wait_for_job(
        &self,
        job_id: &str,
        interval: Duration,
        max_polls: u32,
    ) -> Result<JobStatus, ApiError> {
        for poll in 0..max_polls {
            if poll > 0 {
                tokio::time::sleep(interval).await;
            }
            let status = self.job_status(job_id).await?;
            tracing::debug!("job {} is {:?}", job_id, status.status);
            if status.is_terminal() {
                return Ok(status);
            }
        }
        Err(ApiError::JobTimeout {
            job_id: job_id.to_string(),
            polls: max_polls,
        })
    }

    /// Upload a file and return its public URL.
    pub async fn upload_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        mime: &str,
    ) -> Result<String, ApiError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = self.endpoint("upload")?;
        let response: UploadResponse =
            Self::send_json(self.authorized(Method::POST, url)?.multipart(form)).await?;
        tracing::info!("uploaded {} to {}", file_name, response.url);
        Ok(response.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::thread::JoinHandle;

    struct Recorded {
        method: String,
        url: String,
        auth: Option<String>,
        content_type: Option<String>,
        body: String,
    }

    /// Serve one canned response per request, then stop.
    fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<Recorded>>) {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();

        let handle = std::thread::spawn(move || {
            let mut seen = Vec::new();
            for (status, body) in responses {
                let mut request = server.recv().unwrap();
                let header = |name: &'static str| {
                    request
                        .headers()
                        .iter()
                        .find(|h| h.field.equiv(name))
                        .map(|h| h.value.as_str().to_string())
                };
                let auth = header("Authorization");
                let content_type = header("Content-Type");
                let mut received = String::new();
                request.as_reader().read_to_string(&mut received).unwrap();

                seen.push(Recorded {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    auth,
                    content_type,
                    body: received,
                });

                let response = tiny_http::Response::from_string(body)
                    .with_status_code(status)
                    .with_header(
                        tiny_http::Header::from_bytes("Content-Type", "application/json").unwrap(),
                    );
                request.respond(response).unwrap();
            }
            seen
        });

        (format!("http://127.0.0.1:{}/", port), handle)
    }

    fn client(base: &str) -> ApiClient {
        ApiClient::new(base, Some(Keys::generate())).unwrap()
    }

    #[tokio::test]
    async fn test_list_algorithms() {
        let (base, server) = serve(vec![(
            200,
            r#"[{"id":"a1","name":"Replies","byoReplies":true,"byoDegrees":2}]"#,
        )]);

        let algos = client(&base).list_algorithms().await.unwrap();
        assert_eq!(algos.len(), 1);
        assert!(algos[0].byo_replies);
        assert_eq!(algos[0].byo_degrees, 2);

        let seen = server.join().unwrap();
        assert_eq!(seen[0].method, "GET");
        assert_eq!(seen[0].url, "/byo-algo");
        assert!(seen[0].auth.as_deref().unwrap().starts_with("Bearer "));
    }

    #[tokio::test]
    async fn test_update_algorithm_sends_patch() {
        let (base, server) = serve(vec![(200, r#"{"id":"a1","name":"Renamed"}"#)]);
        let patch = AlgorithmPatch {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };

        let algo = client(&base).update_algorithm("a1", &patch).await.unwrap();
        assert_eq!(algo.name, "Renamed");

        let seen = server.join().unwrap();
        assert_eq!(seen[0].method, "PATCH");
        assert_eq!(seen[0].url, "/byo-algo/a1");
        assert_eq!(seen[0].body, r#"{"name":"Renamed"}"#);
    }

    #[tokio::test]
    async fn test_social_graph_query() {
        let (base, server) = serve(vec![(200, r#"{"pubkey":"pk","degrees":2,"pubkeys":["x","y"]}"#)]);

        let graph = client(&base).social_graph("pk", 2).await.unwrap();
        assert_eq!(graph.pubkeys, vec!["x", "y"]);

        let seen = server.join().unwrap();
        assert_eq!(seen[0].url, "/social-graph?pubkey=pk&degrees=2");
    }

    #[tokio::test]
    async fn test_error_status() {
        let (base, server) = serve(vec![(401, r#"{"error":"bad token"}"#)]);

        let err = client(&base).trending_topics().await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 401, .. }));
        server.join().unwrap();
    }

    #[tokio::test]
    async fn test_requires_keys() {
        let api = ApiClient::new("http://127.0.0.1:9/", None).unwrap();
        assert!(matches!(
            api.list_algorithms().await,
            Err(ApiError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_wait_for_job() {
        let (base, server) = serve(vec![
            (200, r#"{"id":"j1","status":"pending"}"#),
            (200, r#"{"id":"j1","status":"running","progress":0.5}"#),
            (200, r#"{"id":"j1","status":"completed"}"#),
        ]);

        let status = client(&base)
            .wait_for_job("j1", Duration::from_millis(1), 5)
            .await
            .unwrap();
        assert!(status.is_terminal());

        let seen = server.join().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|r| r.url == "/batch/j1"));
    }

    #[tokio::test]
    async fn test_wait_for_job_gives_up() {
        let (base, server) = serve(vec![
            (200, r#"{"status":"running"}"#),
            (200, r#"{"status":"running"}"#),
        ]);

        let err = client(&base)
            .wait_for_job("j2", Duration::from_millis(1), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::JobTimeout { polls: 2, .. }));
        server.join().unwrap();
    }

    #[tokio::test]
    async fn test_upload_file() {
        let (base, server) = serve(vec![(200, r#"{"url":"https://cdn.example/a.png"}"#)]);

        let url = client(&base)
            .upload_file("a.png", vec![1, 2, 3], "image/png")
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.example/a.png");

        let seen = server.join().unwrap();
        assert_eq!(seen[0].method, "POST");
        assert!(
            seen[0]
                .content_type
                .as_deref()
                .unwrap()
                .starts_with("multipart/form-data")
        );
    }
}
