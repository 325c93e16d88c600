//! GrDF API client
//!
//! Authenticates against the GrDF identity provider and queries the
//! "e-conso" API with a bounded retry policy. Web data sources reach it
//! through the [`GrdfApi`] trait.

use crate::parsers::{ConsumptionPayload, WeatherPayload};
use crate::types::{Frequency, GazparError, Result};
use chrono::NaiveDate;
use regex::Regex;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Identity provider endpoint issuing a session token
const SESSION_TOKEN_URL: &str = "https://connexion.grdf.fr/api/v1/authn";

/// Endpoint exchanging the session token for the API session cookie
const AUTH_TOKEN_URL: &str = "https://connexion.grdf.fr/login/sessionCookieRedirect";

/// Page the identity provider redirects to once logged in
const AUTH_REDIRECT_URL: &str = "https://monespace.grdf.fr";

/// Base URL of the consumption API
const API_BASE_URL: &str = "https://monespace.grdf.fr/api";

/// Date format of API query parameters
const API_DATE_FORMAT: &str = "%Y-%m-%d";

/// Default number of attempts per request
pub const DEFAULT_RETRY_COUNT: u32 = 10;

/// Default pause between attempts
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(3);

/// HTTP request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Consumption series published by GrDF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumptionType {
    Informative,
    Published,
}

impl ConsumptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumptionType::Informative => "informatives",
            ConsumptionType::Published => "publiees",
        }
    }
}

/// Value of the `frequence` query parameter for a frequency
pub fn api_frequency(frequency: Frequency) -> &'static str {
    match frequency {
        Frequency::Hourly => "Horaire",
        Frequency::Daily => "Journalier",
        Frequency::Weekly => "Hebdomadaire",
        Frequency::Monthly => "Mensuel",
        Frequency::Yearly => "Annuel",
    }
}

/// Spreadsheet downloaded from the API
#[derive(Debug, Clone)]
pub struct ExcelSheet {
    pub filename: String,
    pub content: Vec<u8>,
}

/// URLs the client talks to
#[derive(Debug, Clone)]
pub struct ApiEndpoints {
    pub session_token_url: String,
    pub auth_token_url: String,
    pub auth_redirect_url: String,
    pub api_base_url: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            session_token_url: SESSION_TOKEN_URL.to_string(),
            auth_token_url: AUTH_TOKEN_URL.to_string(),
            auth_redirect_url: AUTH_REDIRECT_URL.to_string(),
            api_base_url: API_BASE_URL.to_string(),
        }
    }
}

/// Operations of the GrDF API used by web data sources
pub trait GrdfApi {
    /// Open a session; no-op when one is already open
    fn login(&mut self) -> Result<()>;

    fn logout(&mut self);

    fn is_logged_in(&self) -> bool;

    /// Identifiers of the metering points of the account
    fn get_pce_list(&mut self) -> Result<Vec<String>>;

    fn get_pce_consumption(
        &mut self,
        consumption_type: ConsumptionType,
        start_date: NaiveDate,
        end_date: NaiveDate,
        pce_list: &[&str],
    ) -> Result<ConsumptionPayload>;

    fn get_pce_consumption_excelsheet(
        &mut self,
        consumption_type: ConsumptionType,
        start_date: NaiveDate,
        end_date: NaiveDate,
        frequency: Frequency,
        pce_list: &[&str],
    ) -> Result<ExcelSheet>;

    /// Daily temperatures for the `days` days ending at `end_date`
    fn get_pce_meteo(&mut self, end_date: NaiveDate, days: i64, pce: &str)
        -> Result<WeatherPayload>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionTokenResponse {
    session_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PceEntry {
    id_object: String,
}

/// Blocking HTTP client for the GrDF API
pub struct ApiClient {
    username: String,
    password: String,
    endpoints: ApiEndpoints,
    retry_count: u32,
    retry_backoff: Duration,
    session: Option<Client>,
}

impl ApiClient {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            endpoints: ApiEndpoints::default(),
            retry_count: DEFAULT_RETRY_COUNT,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            session: None,
        }
    }

    /// Override the number of attempts per request and the pause between them
    pub fn with_retry(mut self, count: u32, backoff: Duration) -> Self {
        self.retry_count = count.max(1);
        self.retry_backoff = backoff;
        self
    }

    /// Talk to other hosts than GrDF production (tests, proxies)
    pub fn with_endpoints(mut self, endpoints: ApiEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    fn build_client(cookies: bool) -> Result<Client> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));

        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(headers)
            .cookie_store(cookies)
            .build()
            .map_err(|e| GazparError::Http(format!("HTTP client error: {}", e)))
    }

    /// GET `endpoint` under the API base URL, retrying failed attempts
    pub fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Response> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| GazparError::Auth("you must login first".into()))?;

        let url = format!("{}{}", self.endpoints.api_base_url, endpoint);
        let mut attempt = 1;
        loop {
            match Self::try_get(session, &url, endpoint, params) {
                Ok(response) => return Ok(response),
                Err(msg) if attempt >= self.retry_count => {
                    error!(endpoint, attempts = attempt, "{}. Retry limit reached", msg);
                    return Err(GazparError::Http(msg));
                }
                Err(msg) => {
                    warn!(
                        endpoint,
                        retries_left = self.retry_count - attempt,
                        "{}. Retrying in {:?}",
                        msg,
                        self.retry_backoff
                    );
                    attempt += 1;
                    std::thread::sleep(self.retry_backoff);
                }
            }
        }
    }

    fn try_get(
        session: &Client,
        url: &str,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> std::result::Result<Response, String> {
        let response = session
            .get(url)
            .query(params)
            .send()
            .map_err(|e| format!("HTTP request to '{}' failed: {}", endpoint, e))?;

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("text/html"));
        if is_html {
            return Err(format!(
                "unknown error on endpoint '{}', check the query parameters {:?}",
                endpoint, params
            ));
        }

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().unwrap_or_default();
            return Err(format!(
                "HTTP error on endpoint '{}': status {} - {}",
                endpoint, status, body
            ));
        }

        Ok(response)
    }

    /// Decode a JSON object body, treating `[]` as an empty object
    fn json_object<T>(response: Response, what: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        let value: serde_json::Value = response
            .json()
            .map_err(|e| GazparError::Parse(format!("invalid {} JSON: {}", what, e)))?;

        match value {
            serde_json::Value::Array(items) if items.is_empty() => Ok(T::default()),
            serde_json::Value::Object(_) => serde_json::from_value(value)
                .map_err(|e| GazparError::Parse(format!("invalid {} payload: {}", what, e))),
            other => Err(GazparError::Parse(format!(
                "invalid {} response type: object expected, got {}",
                what, other
            ))),
        }
    }
}

/// Attachment name of a `Content-Disposition` header
pub fn attachment_filename(header: &str) -> Option<String> {
    let re = Regex::new(r#"filename\*?=(?:UTF-8'')?"?([^";]+)"?"#).ok()?;
    re.captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}

impl GrdfApi for ApiClient {
    fn login(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Ok(());
        }

        let client = Self::build_client(false)?;
        let payload = serde_json::json!({
            "username": self.username,
            "password": self.password,
            "options": {
                "multiOptionalFactorEnroll": "false",
                "warnBeforePasswordExpired": "false",
            },
        });

        let response = client
            .post(&self.endpoints.session_token_url)
            .header("domain", "grdf.fr")
            .json(&payload)
            .send()
            .map_err(|e| GazparError::Auth(format!("login request failed: {}", e)))?;

        if response.status() != StatusCode::OK {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(GazparError::Auth(format!(
                "login rejected: status {} - {}",
                status, body
            )));
        }

        let token = response
            .json::<SessionTokenResponse>()
            .map_err(|e| GazparError::Auth(format!("invalid login response: {}", e)))?
            .session_token
            .ok_or_else(|| GazparError::Auth("login response without session token".into()))?;

        let session = Self::build_client(true)?;
        let response = session
            .get(&self.endpoints.auth_token_url)
            .query(&[
                ("checkAccountSetupComplete", "true"),
                ("token", token.as_str()),
                ("redirectUrl", self.endpoints.auth_redirect_url.as_str()),
            ])
            .send()
            .map_err(|e| GazparError::Auth(format!("auth token request failed: {}", e)))?;

        if response.status() != StatusCode::OK {
            return Err(GazparError::Auth(format!(
                "auth token not granted: status {}",
                response.status()
            )));
        }

        debug!("logged in to GrDF");
        self.session = Some(session);
        Ok(())
    }

    fn logout(&mut self) {
        if self.session.take().is_some() {
            debug!("logged out from GrDF");
        }
    }

    fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }

    fn get_pce_list(&mut self) -> Result<Vec<String>> {
        let response = self.get("/e-conso/pce", &[("details", "false".to_string())])?;
        let entries: Vec<PceEntry> = response
            .json()
            .map_err(|e| GazparError::Parse(format!("invalid PCE list: {}", e)))?;
        Ok(entries.into_iter().map(|e| e.id_object).collect())
    }

    fn get_pce_consumption(
        &mut self,
        consumption_type: ConsumptionType,
        start_date: NaiveDate,
        end_date: NaiveDate,
        pce_list: &[&str],
    ) -> Result<ConsumptionPayload> {
        let endpoint = format!("/e-conso/pce/consommation/{}", consumption_type.as_str());
        let response = self.get(
            &endpoint,
            &[
                ("dateDebut", start_date.format(API_DATE_FORMAT).to_string()),
                ("dateFin", end_date.format(API_DATE_FORMAT).to_string()),
                ("pceList[]", pce_list.join(",")),
            ],
        )?;
        Self::json_object(response, "consumption")
    }

    fn get_pce_consumption_excelsheet(
        &mut self,
        consumption_type: ConsumptionType,
        start_date: NaiveDate,
        end_date: NaiveDate,
        frequency: Frequency,
        pce_list: &[&str],
    ) -> Result<ExcelSheet> {
        let endpoint = format!(
            "/e-conso/pce/consommation/{}/telecharger",
            consumption_type.as_str()
        );
        let response = self.get(
            &endpoint,
            &[
                ("dateDebut", start_date.format(API_DATE_FORMAT).to_string()),
                ("dateFin", end_date.format(API_DATE_FORMAT).to_string()),
                ("frequence", api_frequency(frequency).to_string()),
                ("pceList[]", pce_list.join(",")),
            ],
        )?;

        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(attachment_filename)
            .ok_or_else(|| GazparError::Parse("spreadsheet response without filename".into()))?;

        let content = response
            .bytes()
            .map_err(|e| GazparError::Http(format!("spreadsheet download failed: {}", e)))?
            .to_vec();

        Ok(ExcelSheet { filename, content })
    }

    fn get_pce_meteo(
        &mut self,
        end_date: NaiveDate,
        days: i64,
        pce: &str,
    ) -> Result<WeatherPayload> {
        let endpoint = format!("/e-conso/pce/{}/meteo", pce);
        let response = self.get(
            &endpoint,
            &[
                ("dateFinPeriode", end_date.format(API_DATE_FORMAT).to_string()),
                ("nbJours", days.to_string()),
            ],
        )?;
        Self::json_object(response, "weather")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Endpoints pointing at a closed local port
    fn unreachable_endpoints() -> ApiEndpoints {
        ApiEndpoints {
            session_token_url: "http://127.0.0.1:9/api/v1/authn".into(),
            auth_token_url: "http://127.0.0.1:9/login".into(),
            auth_redirect_url: "http://127.0.0.1:9".into(),
            api_base_url: "http://127.0.0.1:9/api".into(),
        }
    }

    #[test]
    fn test_consumption_type_values() {
        assert_eq!(ConsumptionType::Informative.as_str(), "informatives");
        assert_eq!(ConsumptionType::Published.as_str(), "publiees");
    }

    #[test]
    fn test_api_frequency_values() {
        assert_eq!(api_frequency(Frequency::Daily), "Journalier");
        assert_eq!(api_frequency(Frequency::Weekly), "Hebdomadaire");
        assert_eq!(api_frequency(Frequency::Monthly), "Mensuel");
    }

    #[test]
    fn test_attachment_filename_quoted() {
        assert_eq!(
            attachment_filename(r#"attachment; filename="Donnees_informatives_0123456789.xlsx""#),
            Some("Donnees_informatives_0123456789.xlsx".to_string())
        );
    }

    #[test]
    fn test_attachment_filename_bare() {
        assert_eq!(
            attachment_filename("attachment; filename=Donnees_informatives_1.xlsx"),
            Some("Donnees_informatives_1.xlsx".to_string())
        );
    }

    #[test]
    fn test_attachment_filename_missing() {
        assert_eq!(attachment_filename("attachment"), None);
    }

    #[test]
    fn test_get_requires_login() {
        let client = ApiClient::new("user", "secret");
        let result = client.get("/e-conso/pce", &[]);
        assert!(matches!(result, Err(GazparError::Auth(_))));
    }

    #[test]
    fn test_login_unreachable_is_auth_error() {
        let mut client = ApiClient::new("user", "secret")
            .with_endpoints(unreachable_endpoints())
            .with_retry(1, Duration::ZERO);

        let result = client.login();

        assert!(matches!(result, Err(GazparError::Auth(_))));
        assert!(!client.is_logged_in());
    }

    #[test]
    fn test_logout_without_session() {
        let mut client = ApiClient::new("user", "secret");
        client.logout();
        assert!(!client.is_logged_in());
    }

    #[test]
    fn test_with_retry_keeps_one_attempt() {
        let client = ApiClient::new("user", "secret").with_retry(0, Duration::ZERO);
        assert_eq!(client.retry_count, 1);
    }
}
