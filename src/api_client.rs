use crate::args::Args;
use crate::graphql::{GraphqlRequest, GraphqlResponse};
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{blocking::Client, header};
use serde_json::Value;

/// Executes one GraphQL operation per call. The command core is generic over
/// this trait so tests can substitute a canned transport.
pub trait GraphqlTransport {
    fn execute(&self, request: &GraphqlRequest) -> Result<Value>;
}

#[derive(Debug)]
pub struct ApiClient {
    client: Client,
    endpoint: String,
}

impl ApiClient {
    pub fn new(args: &Args) -> Result<Self> {
        Ok(Self {
            client: ApiClient::build_client(args)?,
            endpoint: format!("{}/Manager/graphql", args.url),
        })
    }

    fn build_client(args: &Args) -> Result<Client> {
        let credentials = format!("{}:{}", args.username, Args::parse_secret(&args.api_key)?);

        let mut headers = header::HeaderMap::new();
        let mut auth_value =
            header::HeaderValue::from_str(&format!("Basic {}", STANDARD.encode(credentials)))?;
        auth_value.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth_value);
        headers.insert(
            header::CACHE_CONTROL,
            header::HeaderValue::from_static("no-cache"),
        );

        Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(args.insecure_tls)
            .build()
            .map_err(Into::into)
    }
}

impl GraphqlTransport for ApiClient {
    fn execute(&self, request: &GraphqlRequest) -> Result<Value> {
        log::debug!("POST {}", self.endpoint);

        self.client
            .post(&self.endpoint)
            .json(request)
            .send()?
            .error_for_status()?
            .json::<GraphqlResponse>()
            .context("response is not valid JSON")?
            .into_data()
    }
}
