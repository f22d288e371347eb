use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::config::NcbiSettings;
use crate::domain::AccessionId;
use crate::error::{FetchError, SeqvaultError};

const EFETCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi";

/// Retrieves one raw FASTA record per call.
///
/// Retries and throttling belong to implementations; callers only see the
/// final outcome.
pub trait SequenceFetcher: Send + Sync {
    fn fetch(&self, id: &AccessionId) -> Result<String, FetchError>;
}

#[derive(Debug)]
pub struct EntrezHttpClient {
    client: Client,
    email: String,
    tool: String,
    api_key: Option<String>,
    max_retries: usize,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl EntrezHttpClient {
    pub fn new(settings: &NcbiSettings) -> Result<Self, SeqvaultError> {
        let email = settings
            .email
            .clone()
            .filter(|value| !value.trim().is_empty())
            .ok_or(SeqvaultError::MissingContactEmail)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("seqvault/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SeqvaultError::NcbiClient(err.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|err| SeqvaultError::NcbiClient(err.to_string()))?;

        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string);

        Ok(Self {
            client,
            email: email.trim().to_string(),
            tool: settings.tool.clone(),
            min_interval: min_request_interval(api_key.is_some()),
            api_key,
            max_retries: settings.max_retries,
            last_request: Mutex::new(None),
        })
    }

    fn throttle(&self) {
        let mut last = match self.last_request.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                thread::sleep(self.min_interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, FetchError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            self.throttle();
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < self.max_retries && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::debug!(status, attempt, "retrying NCBI request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < self.max_retries && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::debug!(error = %err, attempt, "retrying NCBI request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(FetchError::Transient(err.to_string()));
                }
            }
        }
    }
}

impl SequenceFetcher for EntrezHttpClient {
    fn fetch(&self, id: &AccessionId) -> Result<String, FetchError> {
        let response = self.send_with_retries(|| {
            let mut request = self.client.get(EFETCH_URL).query(&[
                ("db", "protein"),
                ("id", id.as_str()),
                ("rettype", "fasta"),
                ("retmode", "text"),
                ("tool", self.tool.as_str()),
                ("email", self.email.as_str()),
            ]);
            if let Some(key) = &self.api_key {
                request = request.query(&[("api_key", key.as_str())]);
            }
            request
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|err| FetchError::Transient(err.to_string()))?;
        classify_response(status, body)
    }
}

/// Maps an E-utilities reply onto the fetch outcome.
pub fn classify_response(status: u16, body: String) -> Result<String, FetchError> {
    let success = (200..300).contains(&status);
    let rejected_key = !success && body.to_lowercase().contains("api key");
    if rejected_key || matches!(status, 401 | 403) {
        return Err(FetchError::AuthFailure(format!(
            "status {status}: {}",
            body.trim()
        )));
    }
    match status {
        200..=299 if body.trim().is_empty() => {
            Err(FetchError::NotFound("empty response".to_string()))
        }
        200..=299 => Ok(body),
        400 | 404 => Err(FetchError::NotFound(format!(
            "status {status}: {}",
            body.trim()
        ))),
        _ => Err(FetchError::Transient(format!(
            "status {status}: {}",
            body.trim()
        ))),
    }
}

fn min_request_interval(has_api_key: bool) -> Duration {
    if has_api_key {
        Duration::from_millis(100)
    } else {
        Duration::from_millis(334)
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn classify_success() {
        let body = ">P1 desc\nMKT\n".to_string();
        assert_eq!(classify_response(200, body.clone()).unwrap(), body);
    }

    #[test]
    fn classify_missing_records() {
        assert_matches!(
            classify_response(200, "\n\n".to_string()),
            Err(FetchError::NotFound(_))
        );
        assert_matches!(
            classify_response(400, "Failed to retrieve sequence".to_string()),
            Err(FetchError::NotFound(_))
        );
    }

    #[test]
    fn classify_auth_and_transient() {
        assert_matches!(
            classify_response(400, "{\"error\":\"API key invalid\"}".to_string()),
            Err(FetchError::AuthFailure(_))
        );
        assert_matches!(
            classify_response(403, String::new()),
            Err(FetchError::AuthFailure(_))
        );
        assert_matches!(
            classify_response(503, "busy".to_string()),
            Err(FetchError::Transient(_))
        );
    }

    #[test]
    fn api_key_shortens_interval() {
        assert!(min_request_interval(true) < min_request_interval(false));
    }

    #[test]
    fn client_requires_contact_email() {
        let settings = NcbiSettings {
            email: None,
            ..NcbiSettings::default()
        };
        assert_matches!(
            EntrezHttpClient::new(&settings),
            Err(SeqvaultError::MissingContactEmail)
        );
    }
}
