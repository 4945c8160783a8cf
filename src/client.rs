//! Prism Central REST clients.

use crate::error::{ApiError, ConfigError};
use crate::resources::PrismCentralAccount;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::time::Duration;
use tracing::debug;

pub const CLUSTER_API_BASE: &str = "/api/clustermgmt/v4.0";
pub const VMM_API_BASE: &str = "/api/vmm/v4.0";

const ACCEPT_ENCODING_VALUE: &str = "gzip, deflate, br";
const CONTENT_TYPE_VALUE: &str = "application/json";

// Prism sends optional fields as explicit nulls as often as it omits them.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMetadata {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_available_results: u64,
}

/// Envelope shared by all v4 list endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ListResponse<T> {
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: ListMetadata,
    // Omitted or null when nothing matched.
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        ListResponse {
            metadata: ListMetadata {
                total_available_results: data.len() as u64,
            },
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRecord {
    pub ext_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterReference {
    pub ext_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmRecord {
    pub ext_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    pub power_state: Option<String>,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
    pub cluster: Option<ClusterReference>,
}

pub trait ClusterManagement {
    fn list_clusters(&self) -> Result<ListResponse<ClusterRecord>, ApiError>;
}

pub trait VmManagement {
    /// List VMs matching an OData filter expression.
    fn list_vms(&self, filter: &str) -> Result<ListResponse<VmRecord>, ApiError>;
}

#[derive(Clone, PartialEq)]
pub struct ClientConfig {
    /// `https` for every real Prism Central.
    pub scheme: &'static str,
    pub host: String,
    pub port: u16,
    pub verify_ssl: bool,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn from_account(account: &PrismCentralAccount, timeout: Duration) -> Self {
        ClientConfig {
            scheme: "https",
            host: account.endpoint.clone(),
            port: account.port,
            verify_ssl: !account.insecure,
            username: account.username.clone(),
            password: account.password.clone(),
            timeout,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("verify_ssl", &self.verify_ssl)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

pub struct PrismClient {
    config: ClientConfig,
    base_path: &'static str,
    headers: HeaderMap,
    http: reqwest::blocking::Client,
}

impl PrismClient {
    pub fn new(config: ClientConfig, base_path: &'static str) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(ACCEPT_ENCODING_VALUE));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_VALUE));

        let http = reqwest::blocking::Client::builder()
            .default_headers(headers.clone())
            .danger_accept_invalid_certs(!config.verify_ssl)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::Client {
                host: config.host.clone(),
                message: e.to_string(),
            })?;

        Ok(PrismClient {
            config,
            base_path,
            headers,
            http,
        })
    }

    pub fn default_headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn base_url(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.config.scheme, self.config.host, self.config.port, self.base_path
        )
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url(), path);
        debug!("GET {} {:?}", url, query);

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .query(query)
            .send()
            .map_err(|e| ApiError::from_reqwest(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ApiError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }

        response.json().map_err(|e| ApiError::from_reqwest(&url, e))
    }
}

impl ClusterManagement for PrismClient {
    fn list_clusters(&self) -> Result<ListResponse<ClusterRecord>, ApiError> {
        self.get("/config/clusters", &[])
    }
}

impl VmManagement for PrismClient {
    fn list_vms(&self, filter: &str) -> Result<ListResponse<VmRecord>, ApiError> {
        self.get("/ahv/config/vms", &[("$filter", filter)])
    }
}

pub fn cluster_client(
    account: &PrismCentralAccount,
    timeout: Duration,
) -> Result<PrismClient, ConfigError> {
    PrismClient::new(ClientConfig::from_account(account, timeout), CLUSTER_API_BASE)
}

pub fn vmm_client(
    account: &PrismCentralAccount,
    timeout: Duration,
) -> Result<PrismClient, ConfigError> {
    PrismClient::new(ClientConfig::from_account(account, timeout), VMM_API_BASE)
}

/// Builds the API handles for one account.
pub trait ClientFactory {
    fn cluster_client(
        &self,
        account: &PrismCentralAccount,
    ) -> Result<Box<dyn ClusterManagement>, ConfigError>;

    fn vmm_client(&self, account: &PrismCentralAccount)
        -> Result<Box<dyn VmManagement>, ConfigError>;
}

#[derive(Debug, Clone)]
pub struct PrismClientFactory {
    pub timeout: Duration,
}

impl ClientFactory for PrismClientFactory {
    fn cluster_client(
        &self,
        account: &PrismCentralAccount,
    ) -> Result<Box<dyn ClusterManagement>, ConfigError> {
        Ok(Box::new(cluster_client(account, self.timeout)?))
    }

    fn vmm_client(
        &self,
        account: &PrismCentralAccount,
    ) -> Result<Box<dyn VmManagement>, ConfigError> {
        Ok(Box::new(vmm_client(account, self.timeout)?))
    }
}
