use std::time::{Duration, Instant};

use crate::error::{Result, SwitchError};
use crate::models::ConnectionStatus;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// 基于 reqwest 的端点探测
#[derive(Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new() -> Result<Self> {
        Self::with_timeout(PROBE_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// GET `{base}/models` 作为轻量探测；非 2xx 返回失败记录，传输错误的延迟记为 0
    pub async fn check_connection(&self, url: &str, api_key: &str) -> Result<ConnectionStatus> {
        if url.trim().is_empty() {
            return Err(SwitchError::Validation("endpoint url is empty".to_string()));
        }

        let mut request = self.client.get(models_url(url.trim()));
        if !api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let start = Instant::now();
        match request.send().await {
            Ok(response) => {
                let latency = start.elapsed().as_millis() as u64;
                if response.status().is_success() {
                    Ok(ConnectionStatus::ok(latency))
                } else {
                    Ok(ConnectionStatus {
                        success: false,
                        latency_ms: latency,
                        message: Some(format!("HTTP {}", response.status())),
                    })
                }
            }
            Err(e) => Ok(ConnectionStatus {
                success: false,
                latency_ms: 0,
                message: Some(e.to_string()),
            }),
        }
    }

    /// HEAD 请求测延迟，部分站点拒绝 HEAD 时退回 GET
    pub async fn site_latency(&self, url: &str) -> Result<u64> {
        if url.trim().is_empty() {
            return Err(SwitchError::Validation("site url is empty".to_string()));
        }

        let start = Instant::now();
        if self.client.head(url).send().await.is_err() {
            self.client
                .get(url)
                .send()
                .await
                .map_err(|e| SwitchError::Probe(format!("failed to connect: {}", e)))?;
        }
        Ok(start.elapsed().as_millis() as u64)
    }

    /// GET 返回纯文本 IP 的服务，去掉首尾空白
    pub async fn public_ip(&self, url: &str) -> Result<String> {
        if url.trim().is_empty() {
            return Err(SwitchError::Validation("ip service url is empty".to_string()));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SwitchError::Probe(format!("failed to request public ip: {}", e)))?;
        if !response.status().is_success() {
            return Err(SwitchError::Probe(format!(
                "request failed with status: {}",
                response.status()
            )));
        }

        let ip = response.text().await?.trim().to_string();
        if ip.is_empty() {
            return Err(SwitchError::Probe("empty response from ip service".to_string()));
        }
        Ok(ip)
    }
}

/// OpenAI 兼容端点的 models 地址
fn models_url(url: &str) -> String {
    if url.ends_with('/') {
        format!("{}models", url)
    } else {
        format!("{}/models", url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_models_url() {
        assert_eq!(models_url("https://api.x.io/v1"), "https://api.x.io/v1/models");
        assert_eq!(models_url("https://api.x.io/v1/"), "https://api.x.io/v1/models");
        assert_eq!(models_url("https://api.x.io"), "https://api.x.io/models");
    }

    #[tokio::test]
    async fn test_empty_url_is_invalid() {
        let probe = HttpProbe::new().unwrap();
        let err = probe.check_connection("  ", "key").await.unwrap_err();
        assert!(matches!(err, SwitchError::Validation(_)));

        let err = probe.site_latency("").await.unwrap_err();
        assert!(matches!(err, SwitchError::Validation(_)));

        let err = probe.public_ip(" ").await.unwrap_err();
        assert!(matches!(err, SwitchError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_failure_record() {
        let probe = HttpProbe::with_timeout(Duration::from_millis(500)).unwrap();
        // 端口 9 上通常没有服务，连接被拒绝
        let status = probe.check_connection("http://127.0.0.1:9/v1", "").await.unwrap();
        assert!(!status.success);
        assert_eq!(status.latency_ms, 0);
        assert!(status.message.is_some());
    }
}
