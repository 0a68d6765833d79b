//! TTL-bounded public-key memoization with URL-change invalidation
//! (component K).

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;

use crate::codec;
use crate::error::{Error, Result};

const DEFAULT_TTL: Duration = Duration::from_millis(86_400_000);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_RETRIES: u32 = 3;

#[derive(Deserialize)]
struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    public_key: String,
}

struct Entry {
    url: String,
    public_key: Vec<u8>,
    cached_at: Instant,
    ttl: Duration,
}

/// A single-entry, client-side public-key cache. Fetching a different URL
/// invalidates whatever was cached; fetching the same URL within its TTL
/// returns the cached bytes without a network request.
pub struct ClientKeyCache {
    http: reqwest::Client,
    ttl: Duration,
    timeout: Duration,
    retries: u32,
    entry: Mutex<Option<Entry>>,
}

impl Default for ClientKeyCache {
    fn default() -> Self {
        ClientKeyCache::new(DEFAULT_TTL, DEFAULT_TIMEOUT, DEFAULT_RETRIES)
    }
}

impl ClientKeyCache {
    pub fn new(ttl: Duration, timeout: Duration, retries: u32) -> Self {
        ClientKeyCache {
            http: reqwest::Client::new(),
            ttl,
            timeout,
            retries,
            entry: Mutex::new(None),
        }
    }

    /// Returns the public key bytes for `base_url`, fetching `GET
    /// {base_url}/public-key` on a cache miss or TTL expiry.
    pub async fn get_key(&self, base_url: &str) -> Result<Vec<u8>> {
        {
            let guard = self.entry.lock().await;
            if let Some(entry) = guard.as_ref() {
                if entry.url == base_url && entry.cached_at.elapsed() < entry.ttl {
                    tracing::debug!(url = base_url, "client key cache hit");
                    return Ok(entry.public_key.clone());
                }
            }
        }

        tracing::debug!(url = base_url, "client key cache miss, fetching");
        let bytes = self.fetch_with_retry(base_url).await?;

        let mut guard = self.entry.lock().await;
        *guard = Some(Entry {
            url: base_url.to_string(),
            public_key: bytes.clone(),
            cached_at: Instant::now(),
            ttl: self.ttl,
        });
        Ok(bytes)
    }

    async fn fetch_with_retry(&self, base_url: &str) -> Result<Vec<u8>> {
        let mut last_err = None;
        for attempt in 0..=self.retries {
            match self.fetch_once(base_url).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    tracing::warn!(url = base_url, attempt, error = %e, "public key fetch attempt failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| Error::PublicKeyFetch {
            url: base_url.to_string(),
            message: "exhausted retries".into(),
        }))
    }

    async fn fetch_once(&self, base_url: &str) -> Result<Vec<u8>> {
        let url = format!("{}/public-key", base_url.trim_end_matches('/'));
        let response = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::PublicKeyFetch {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let body: PublicKeyResponse = response.json().await.map_err(|e| Error::PublicKeyFetch {
            url: url.clone(),
            message: format!("malformed response body: {e}"),
        })?;

        codec::decode_base64(&body.public_key).map_err(|e| Error::PublicKeyFetch {
            url,
            message: format!("public key was not valid base64: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cache_hit_avoids_second_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/public-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"publicKey":"aGVsbG8="}"#)
            .expect(1)
            .create_async()
            .await;

        let cache = ClientKeyCache::default();
        let first = cache.get_key(&server.url()).await.unwrap();
        let second = cache.get_key(&server.url()).await.unwrap();
        assert_eq!(first, b"hello");
        assert_eq!(second, b"hello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn switching_url_forces_refetch() {
        let mut server_a = mockito::Server::new_async().await;
        let mut server_b = mockito::Server::new_async().await;
        server_a
            .mock("GET", "/public-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"publicKey":"YQ=="}"#)
            .create_async()
            .await;
        server_b
            .mock("GET", "/public-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"publicKey":"Yg=="}"#)
            .create_async()
            .await;

        let cache = ClientKeyCache::default();
        let a = cache.get_key(&server_a.url()).await.unwrap();
        let b = cache.get_key(&server_b.url()).await.unwrap();
        assert_eq!(a, b"a");
        assert_eq!(b, b"b");
    }

    #[tokio::test]
    async fn expired_ttl_triggers_refetch() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/public-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"publicKey":"aGVsbG8="}"#)
            .expect(2)
            .create_async()
            .await;

        let cache = ClientKeyCache::new(Duration::from_millis(1), Duration::from_secs(5), 0);
        cache.get_key(&server.url()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.get_key(&server.url()).await.unwrap();
    }

    #[tokio::test]
    async fn fetch_failure_surfaces_public_key_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/public-key")
            .with_status(500)
            .create_async()
            .await;

        let cache = ClientKeyCache::new(DEFAULT_TTL, Duration::from_secs(1), 0);
        let err = cache.get_key(&server.url()).await.unwrap_err();
        assert!(matches!(err, Error::PublicKeyFetch { .. }));
    }
}
