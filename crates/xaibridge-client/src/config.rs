use std::time::Duration;

use serde::{Deserialize, Serialize};
use xaibridge_core::{DType, Error, ModelEndpoint, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Grpc,
    Rest,
}

/// Everything needed to reach one served model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub protocol: Protocol,
    /// `host:port`, with or without an `http://` scheme.
    pub target: String,
    pub model_name: String,
    pub model_version: Option<String>,
    pub input_name: String,
    /// Wire precision for the input tensor; `None` keeps the input's own.
    pub datatype: Option<DType>,
    /// Per-call deadline. No deadline when unset.
    pub timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::Grpc,
            target: "0.0.0.0:8081".to_string(),
            model_name: String::new(),
            model_version: None,
            input_name: "input".to_string(),
            datatype: None,
            timeout_ms: None,
        }
    }
}

impl ClientConfig {
    pub fn new(protocol: Protocol, target: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            protocol,
            target: target.into(),
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.endpoint()?;
        if self.input_name.trim().is_empty() {
            return Err(Error::Configuration("input_name cannot be empty".to_string()));
        }
        if matches!(self.datatype, Some(d) if !d.is_float()) {
            return Err(Error::Configuration(
                "datatype must be FP32 or FP64 when set".to_string(),
            ));
        }
        if self.timeout_ms == Some(0) {
            return Err(Error::Configuration(
                "timeout_ms must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn endpoint(&self) -> Result<ModelEndpoint> {
        ModelEndpoint::new(
            self.target.clone(),
            self.model_name.clone(),
            self.model_version.clone(),
        )
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
