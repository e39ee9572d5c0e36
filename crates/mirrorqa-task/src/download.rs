//! The retrying download algorithm (spec §4.7).

use chrono::Utc;
use futures::StreamExt;
use mirrorqa_core::models::{TaskMetrics, TaskStatus};
use std::time::{Duration, Instant};

pub struct DownloadConfig {
    pub url: String,
    pub timeout: Duration,
    pub chunk_size: usize,
    pub retries: u32,
    pub interval: Duration,
    pub user_agent: String,
}

/// Runs up to `retries + 1` attempts, returning the metrics of the first
/// successful one or an errored record carrying the last failure.
pub async fn run(config: &DownloadConfig) -> TaskMetrics {
    let started_on = Utc::now();
    let client = match reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(&config.user_agent)
        .build()
    {
        Ok(c) => c,
        Err(e) => return errored(started_on, e.to_string()),
    };

    let total_attempts = config.retries + 1;
    let mut last_error = String::new();

    for attempt in 1..=total_attempts {
        match attempt_once(&client, config).await {
            Ok(metrics) => return metrics,
            Err(e) => {
                last_error = e;
                tracing::warn!(attempt, error = %last_error, "measurement attempt failed");
                if attempt < total_attempts {
                    tokio::time::sleep(config.interval * attempt).await;
                }
            }
        }
    }

    errored(started_on, last_error)
}

async fn attempt_once(client: &reqwest::Client, config: &DownloadConfig) -> Result<TaskMetrics, String> {
    let started_on = Utc::now();
    let attempt_start = Instant::now();

    let response = client
        .get(&config.url)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let latency_s = attempt_start.elapsed().as_secs_f64();

    let response = response.error_for_status().map_err(|e| e.to_string())?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| e.to_string())?;
        let mut remaining = chunk.as_ref();
        while !remaining.is_empty() {
            let take = remaining.len().min(config.chunk_size);
            downloaded += take as u64;
            remaining = &remaining[take..];
        }
    }

    let duration_s = attempt_start.elapsed().as_secs_f64();
    let speed_bps = if duration_s > 0.0 {
        downloaded as f64 / duration_s
    } else {
        0.0
    };

    Ok(TaskMetrics {
        started_on,
        status: TaskStatus::Succeeded,
        error: None,
        latency_s,
        download_size_bytes: downloaded,
        duration_s,
        speed_bps,
    })
}

fn errored(started_on: chrono::DateTime<Utc>, error: String) -> TaskMetrics {
    TaskMetrics {
        started_on,
        status: TaskStatus::Errored,
        error: Some(error),
        latency_s: 0.0,
        download_size_bytes: 0,
        duration_s: 0.0,
        speed_bps: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(url: String) -> DownloadConfig {
        DownloadConfig {
            url,
            timeout: Duration::from_secs(5),
            chunk_size: 1024,
            retries: 1,
            interval: Duration::from_millis(1),
            user_agent: "mirrorqa-task/test".to_string(),
        }
    }

    #[tokio::test]
    async fn succeeds_and_reports_actual_bytes_drained() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/object"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 2048]))
            .mount(&server)
            .await;

        let metrics = run(&config(format!("{}/object", server.uri()))).await;

        assert_eq!(metrics.status, TaskStatus::Succeeded);
        assert_eq!(metrics.download_size_bytes, 2048);
        assert!(metrics.error.is_none());
    }

    #[tokio::test]
    async fn retries_then_reports_errored_with_last_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let metrics = run(&config(format!("{}/missing", server.uri()))).await;

        assert_eq!(metrics.status, TaskStatus::Errored);
        assert_eq!(metrics.download_size_bytes, 0);
        assert!(metrics.error.is_some());
    }

    #[tokio::test]
    async fn missing_content_length_does_not_fail_the_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stream"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![1u8; 512])
                    .insert_header("transfer-encoding", "chunked"),
            )
            .mount(&server)
            .await;

        let metrics = run(&config(format!("{}/stream", server.uri()))).await;

        assert_eq!(metrics.status, TaskStatus::Succeeded);
        assert_eq!(metrics.download_size_bytes, 512);
    }
}
