use tracing::{debug, instrument};

use crate::adaptive::connector::config::Config;
use crate::adaptive::connector::error::{ConnectorError, Result};
use crate::adaptive::connector::io::request::{
    ApiMethod, XmlElement, build_request, export_configurable_model_data_params,
    export_data_params,
};

/// Status and body of an HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Moves request documents to the API and brings the responses back.
pub trait ApiTransport {
    fn post(&self, url: &str, body: Vec<u8>) -> Result<HttpResponse>;
}

impl<T: ApiTransport + ?Sized> ApiTransport for &T {
    fn post(&self, url: &str, body: Vec<u8>) -> Result<HttpResponse> {
        (**self).post(url, body)
    }
}

/// Blocking HTTP transport backed by `reqwest`.
///
/// No timeout is configured: a hung call blocks the run.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ApiTransport for HttpTransport {
    fn post(&self, url: &str, body: Vec<u8>) -> Result<HttpResponse> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=UTF-8")
            .body(body)
            .send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(HttpResponse { status, body })
    }
}

/// Issues the export calls the connector needs.
pub struct AdaptiveClient<'a, T: ApiTransport> {
    transport: T,
    config: &'a Config,
}

impl<'a, T: ApiTransport> AdaptiveClient<'a, T> {
    pub fn new(transport: T, config: &'a Config) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    /// Calls `exportData` for the configured version and returns the raw XML.
    pub fn export_data(&self) -> Result<String> {
        let params = export_data_params(&self.config.version);
        self.call(ApiMethod::ExportData, &params)
    }

    /// Calls `exportConfigurableModelData` for a single level.
    pub fn export_configurable_model_data(&self, level_name: &str) -> Result<String> {
        let params = export_configurable_model_data_params(
            &self.config.version,
            (
                self.config.personnel_start.as_str(),
                self.config.personnel_end.as_str(),
            ),
            level_name,
        );
        self.call(ApiMethod::ExportConfigurableModelData, &params)
    }

    #[instrument(level = "debug", skip_all, fields(%method))]
    fn call(&self, method: ApiMethod, params: &[XmlElement]) -> Result<String> {
        let document = build_request(
            method,
            &self.config.credentials,
            &self.config.caller_name,
            params,
        )?;
        debug!("sent POST request {method} to Adaptive API");
        let response = self.transport.post(&self.config.api_url, document)?;
        if response.status != 200 {
            return Err(ConnectorError::Transport {
                method: method.to_string(),
                status: response.status,
            });
        }
        debug!("{method} request successful");
        Ok(response.body)
    }
}
