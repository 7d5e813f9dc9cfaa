//! HTTP client for the results service.

use crate::error::{Result, ServiceError};
use crate::model::{
    AggregateSummary, ClassLevel, FilterSuggestion, RankingSnapshot, SchoolRecord, SchoolYear,
    StudyOption, YearId,
};
use crate::service::{ResultsService, SnapshotQuery};
use crate::wire::SuggestionEnvelope;
use log::{info, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Connection settings for [`HttpService`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Attempts per GET before giving up.
    pub max_tries: u32,
    /// Wait before the second attempt; doubled after each failure.
    pub initial_backoff: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_tries: 3,
            initial_backoff: Duration::from_millis(1000),
        }
    }
}

/// Results service reached over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpService {
    client: Client,
    config: ClientConfig,
}

impl HttpService {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// GET a JSON document, retrying with exponential backoff.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let max_tries = self.config.max_tries.max(1);
        let mut backoff = self.config.initial_backoff;
        let url = self.url(path);
        let mut last_error = ServiceError::Unavailable(path.to_string());

        for attempt in 1..=max_tries {
            match self.client.get(&url).query(params).send().await {
                Ok(response) if response.status().is_success() => match response.text().await {
                    Ok(body) => return Ok(serde_json::from_str(&body)?),
                    Err(e) => {
                        warn!(
                            "Attempt {}/{}: Failed to read response body for {}: {}",
                            attempt, max_tries, path, e
                        );
                        last_error = e.into();
                    }
                },
                Ok(response) => {
                    warn!(
                        "Attempt {}/{}: Bad response status for {}: {}",
                        attempt,
                        max_tries,
                        path,
                        response.status()
                    );
                    last_error = ServiceError::Status {
                        status: response.status().as_u16(),
                        path: path.to_string(),
                    };
                }
                Err(e) => {
                    warn!(
                        "Attempt {}/{}: Request failed for {}: {}",
                        attempt, max_tries, path, e
                    );
                    last_error = e.into();
                }
            }

            if attempt < max_tries {
                info!(
                    "Sleeping for {} milliseconds before retry for {}",
                    backoff.as_millis(),
                    path
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }

        warn!("All attempts failed for {}", path);
        Err(last_error)
    }
}

fn ranking_params(query: &SnapshotQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![("anneeId", query.year.to_string())];
    if let Some(city) = &query.city {
        params.push(("ville", city.clone()));
    }
    if let Some(class) = query.class {
        params.push(("classeId", class.to_string()));
    }
    if let Some(option) = query.option {
        params.push(("optionId", option.to_string()));
    }
    if let Some(gender) = query.gender {
        params.push(("genre", gender.code().to_string()));
    }
    params
}

impl ResultsService for HttpService {
    async fn school_rankings(&self, query: SnapshotQuery) -> Result<Vec<RankingSnapshot>> {
        let params = ranking_params(&query);
        self.get_json("/calculations/school-rankings", &params).await
    }

    async fn global_stats(&self, year: YearId) -> Result<AggregateSummary> {
        let params = [("anneeId", year.to_string())];
        self.get_json("/calculations/stats-globales", &params).await
    }

    async fn years(&self) -> Result<Vec<SchoolYear>> {
        self.get_json("/annees-scolaires", &[]).await
    }

    async fn classes(&self) -> Result<Vec<ClassLevel>> {
        self.get_json("/classes", &[]).await
    }

    async fn options(&self) -> Result<Vec<StudyOption>> {
        self.get_json("/options", &[]).await
    }

    async fn schools(&self) -> Result<Vec<SchoolRecord>> {
        self.get_json("/ecoles", &[]).await
    }

    /// Single attempt; suggestions are best-effort.
    async fn suggest_filters(&self, prompt: String) -> Result<FilterSuggestion> {
        let path = "/gemini/filters";
        let response = self
            .client
            .post(self.url(path))
            .json(&serde_json::json!({ "prompt": prompt }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ServiceError::Status {
                status: response.status().as_u16(),
                path: path.to_string(),
            });
        }
        let body = response.text().await?;
        let envelope: SuggestionEnvelope = serde_json::from_str(&body)?;
        envelope.into_suggestion()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Gender;

    #[test]
    fn ranking_params_skip_unset_filters() {
        let params = ranking_params(&SnapshotQuery::for_year(4));
        assert_eq!(params, vec![("anneeId", "4".to_string())]);
    }

    #[test]
    fn ranking_params_full_filter() {
        let query = SnapshotQuery {
            year: 4,
            city: Some("Kolwezi".into()),
            class: Some(6),
            option: Some(2),
            gender: Some(Gender::Female),
        };
        let params = ranking_params(&query);
        assert_eq!(
            params,
            vec![
                ("anneeId", "4".to_string()),
                ("ville", "Kolwezi".to_string()),
                ("classeId", "6".to_string()),
                ("optionId", "2".to_string()),
                ("genre", "F".to_string()),
            ]
        );
    }

    #[test]
    fn url_joins_without_double_slash() {
        let service = HttpService::new(ClientConfig {
            base_url: "http://results.local/".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            service.url("/classes"),
            "http://results.local/classes"
        );
    }
}
