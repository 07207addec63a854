use async_trait::async_trait;
use reqwest::{Request, Response};

/// Outbound transport used by the fetcher.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
