use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single GraphQL operation: the document text plus its bound variables,
/// serialized as the standard `{"query": ..., "variables": {...}}` POST body.
#[derive(Debug, Clone, Serialize)]
pub struct GraphqlRequest {
    pub query: String,
    pub variables: Map<String, Value>,
}

impl GraphqlRequest {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            variables: Map::new(),
        }
    }

    pub fn var(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.variables.insert(name.to_string(), value.into());
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct GraphqlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphqlError {
    message: String,
}

impl GraphqlResponse {
    /// A non-empty top-level error list is fatal, even when the server also
    /// returned partial data.
    pub fn into_data(self) -> Result<Value> {
        if !self.errors.is_empty() {
            let messages = self
                .errors
                .iter()
                .map(|error| error.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            bail!("graphql: {messages}");
        }

        self.data.context("graphql: response contained no data")
    }
}
