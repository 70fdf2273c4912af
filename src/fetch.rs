use anyhow::{Context, Result};
use reqwest::Client;
use tokio::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; EventBot/1.0; +https://example.com/contact)";

pub fn client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(15))
        .build()
        .context("failed to build HTTP client")
}

pub async fn fetch_html(client: &Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("request to {url} failed"))?
        .error_for_status()
        .with_context(|| format!("{url} answered with an error status"))?;

    response
        .text()
        .await
        .with_context(|| format!("failed to read body of {url}"))
}
