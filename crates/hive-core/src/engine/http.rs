use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, header};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use hive_model::{
    ClusterObject, ImageSummary, NetworkCreate, NetworkSummary, Service, ServiceCreated, ServiceSpec,
    SwarmInitRequest, SwarmSpec,
};

use crate::engine::{Engine, EngineError, EngineResult};

const BUILD_TIMEOUT: Duration = Duration::from_secs(600);

/// Engine client over the engine's HTTP API.
///
/// Expects a TCP endpoint (`http://host:2375`); unix sockets are not supported.
#[derive(Clone, Debug)]
pub struct HttpEngine {
    base: String,
    client: Client,
}

impl HttpEngine {
    pub fn new(base: impl Into<String>, timeout: Duration) -> EngineResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Unreachable(e.to_string()))?;
        Ok(Self {
            base: base.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn send(&self, req: RequestBuilder) -> EngineResult<Response> {
        let resp = req.send().await?;
        let status = resp.status();
        trace!(status = status.as_u16(), url = %resp.url(), "engine response");
        if status.is_success() {
            return Ok(resp);
        }
        let text = resp.text().await.unwrap_or_default();
        let body = serde_json::from_str::<Value>(&text)
            .unwrap_or_else(|_| serde_json::json!({ "message": text }));
        Err(EngineError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn json<T: DeserializeOwned>(&self, req: RequestBuilder) -> EngineResult<T> {
        let resp = self.send(req).await?;
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| EngineError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Engine for HttpEngine {
    async fn ping(&self) -> bool {
        match self.client.get(self.url("/_ping")).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(error = %e, "engine ping failed");
                false
            }
        }
    }

    async fn inspect_swarm(&self) -> EngineResult<ClusterObject> {
        self.json(self.client.get(self.url("/swarm"))).await
    }

    async fn update_swarm(&self, spec: &SwarmSpec, version: u64) -> EngineResult<()> {
        let url = self.url(&format!("/swarm/update?version={version}"));
        self.send(self.client.post(url).json(spec)).await?;
        Ok(())
    }

    async fn init_swarm(&self, req: &SwarmInitRequest) -> EngineResult<String> {
        self.json(self.client.post(self.url("/swarm/init")).json(req))
            .await
    }

    async fn list_networks(&self) -> EngineResult<Vec<NetworkSummary>> {
        self.json(self.client.get(self.url("/networks"))).await
    }

    async fn create_network(&self, req: &NetworkCreate) -> EngineResult<()> {
        self.send(self.client.post(self.url("/networks/create")).json(req))
            .await?;
        Ok(())
    }

    async fn list_services(&self) -> EngineResult<Vec<Service>> {
        self.json(self.client.get(self.url("/services"))).await
    }

    async fn inspect_service(&self, id: &str) -> EngineResult<Option<Service>> {
        match self.json(self.client.get(self.url(&format!("/services/{id}")))).await {
            Ok(svc) => Ok(Some(svc)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_service(&self, spec: &ServiceSpec) -> EngineResult<ServiceCreated> {
        self.json(self.client.post(self.url("/services/create")).json(spec))
            .await
    }

    async fn update_service(
        &self,
        id: &str,
        version: u64,
        spec: &ServiceSpec,
    ) -> EngineResult<()> {
        let url = self.url(&format!("/services/{id}/update?version={version}"));
        self.send(self.client.post(url).json(spec)).await?;
        Ok(())
    }

    async fn delete_service(&self, id: &str) -> EngineResult<()> {
        self.send(self.client.delete(self.url(&format!("/services/{id}"))))
            .await?;
        Ok(())
    }

    async fn build_image(&self, tag: &str, context: Vec<u8>) -> EngineResult<()> {
        let url = self.url(&format!("/build?t={tag}&dockerfile=Dockerfile&rm=1"));
        let req = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/x-tar")
            .timeout(BUILD_TIMEOUT)
            .body(context);
        let text = self.send(req).await?.text().await?;
        build_error(&text).map_or(Ok(()), |e| Err(EngineError::Build(e)))
    }

    async fn list_images(&self) -> EngineResult<Vec<ImageSummary>> {
        self.json(self.client.get(self.url("/images/json"))).await
    }

    async fn delete_image(&self, id: &str) -> EngineResult<()> {
        self.send(self.client.delete(self.url(&format!("/images/{id}"))))
            .await?;
        Ok(())
    }
}

/// The build endpoint answers 200 and reports failures inside its JSON progress stream.
fn build_error(stream: &str) -> Option<String> {
    stream
        .lines()
        .filter_map(|line| serde_json::from_str::<Value>(line.trim()).ok())
        .find_map(|msg| msg.get("error").and_then(Value::as_str).map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_stream_errors_are_found() {
        let ok = "{\"stream\":\"Step 1/2 : FROM alpine\\n\"}\n{\"stream\":\"Successfully built 1\"}\n";
        assert_eq!(build_error(ok), None);

        let failed = "{\"stream\":\"Step 1/2 : FROM nope\\n\"}\n\
                      {\"errorDetail\":{\"message\":\"pull access denied\"},\"error\":\"pull access denied\"}\n";
        assert_eq!(build_error(failed).as_deref(), Some("pull access denied"));
    }

    #[test]
    fn base_url_is_normalized() {
        let e = HttpEngine::new("http://localhost:2375/", Duration::from_secs(1)).unwrap();
        assert_eq!(e.url("/swarm"), "http://localhost:2375/swarm");
    }
}
