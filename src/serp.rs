use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::env;
use std::time::Duration;

const SERPAPI_URL: &str = "https://serpapi.com/search.json";
const SEARCH_TIMEOUT: Duration = Duration::from_secs(20);

/// One result from the google_jobs engine.
#[derive(Debug, Clone, Deserialize)]
pub struct JobResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company_name: String,
    pub location: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub apply_options: Vec<ApplyOption>,
    pub share_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplyOption {
    #[allow(dead_code)]
    pub title: Option<String>,
    pub link: Option<String>,
}

/// One organic result from the plain google engine.
#[derive(Debug, Clone, Deserialize)]
pub struct OrganicResult {
    pub title: Option<String>,
    pub link: Option<String>,
    pub snippet: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    jobs_results: Vec<JobResult>,
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

/// Blocking client for the SerpApi REST surface. Shared by the source
/// adapters and the contact finder; one instance per run.
#[derive(Debug, Clone)]
pub struct SerpClient {
    api_key: String,
    client: reqwest::blocking::Client,
}

impl SerpClient {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("SERPAPI_KEY").context(
            "SERPAPI_KEY environment variable not set. Set it with: export SERPAPI_KEY=your-key-here",
        )?;
        Ok(Self::new(api_key))
    }

    pub fn new(api_key: String) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(SEARCH_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self { api_key, client }
    }

    /// Query the google_jobs engine. `q` is "keywords location" combined.
    pub fn search_jobs(&self, q: &str) -> Result<Vec<JobResult>> {
        let response = self.get(&[("engine", "google_jobs"), ("q", q), ("hl", "en")])?;
        Ok(response.jobs_results)
    }

    /// Query the plain google engine and return organic results.
    pub fn search_web(&self, q: &str) -> Result<Vec<OrganicResult>> {
        let response = self.get(&[("engine", "google"), ("q", q)])?;
        Ok(response.organic_results)
    }

    fn get(&self, params: &[(&str, &str)]) -> Result<SerpResponse> {
        let mut query: Vec<(&str, &str)> = params.to_vec();
        query.push(("api_key", self.api_key.as_str()));

        let response = self
            .client
            .get(SERPAPI_URL)
            .query(&query)
            .send()
            .context("Failed to send request to SerpApi")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "SerpApi request failed with status {}: {}",
                status,
                error_text
            ));
        }

        response.json().context("Failed to parse SerpApi response")
    }
}
