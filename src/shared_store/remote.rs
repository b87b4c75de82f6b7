//! HTTP client for the remote shared key-value store.
//!
//! The store itself is an external collaborator (§4.5 treats it as a
//! narrow, four-operation interface); this client speaks a small REST
//! convention against it: `POST {base}/incr/{key}`, `POST {base}/set/{key}`,
//! `GET {base}/get/{key}`, and `POST {base}/setex/{key}?ttl_secs=N`, all with
//! plain-text bodies and a bounded timeout per call.

use std::time::Duration;

use crate::error::{Error, Result};

const CALL_TIMEOUT: Duration = Duration::from_millis(800);

#[derive(Debug, serde::Deserialize)]
struct IncrResponse {
    value: i64,
}

#[derive(Debug, serde::Deserialize)]
struct GetResponse {
    value: Option<String>,
}

pub struct RemoteStore {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(CALL_TIMEOUT)
            .build()
            .map_err(|e| Error::ConfigFault(format!("building shared-store client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub async fn incr(&self, key: &str) -> Result<i64> {
        let url = format!("{}/incr/{key}", self.base_url);
        let resp = self
            .client
            .post(url)
            .send()
            .await
            .map_err(|e| Error::StoreFault(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::StoreFault(e.to_string()))?
            .json::<IncrResponse>()
            .await
            .map_err(|e| Error::StoreFault(e.to_string()))?;
        Ok(resp.value)
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        let url = format!("{}/set/{key}", self.base_url);
        self.client
            .post(url)
            .body(value.to_string())
            .send()
            .await
            .map_err(|e| Error::StoreFault(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::StoreFault(e.to_string()))?;
        Ok(())
    }

    pub async fn setex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let url = format!("{}/setex/{key}?ttl_secs={}", self.base_url, ttl.as_secs());
        self.client
            .post(url)
            .body(value.to_string())
            .send()
            .await
            .map_err(|e| Error::StoreFault(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::StoreFault(e.to_string()))?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let url = format!("{}/get/{key}", self.base_url);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::StoreFault(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::StoreFault(e.to_string()))?
            .json::<GetResponse>()
            .await
            .map_err(|e| Error::StoreFault(e.to_string()))?;
        Ok(resp.value)
    }
}
