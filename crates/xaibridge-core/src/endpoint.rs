use crate::{Error, Result};

/// Network address plus model identity a transport is bound to.
///
/// Fixed for the lifetime of a client; every predict call targets the same
/// model name and version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelEndpoint {
    target: String,
    model_name: String,
    model_version: Option<String>,
}

impl ModelEndpoint {
    pub fn new(
        target: impl Into<String>,
        model_name: impl Into<String>,
        model_version: Option<String>,
    ) -> Result<Self> {
        let target = target.into();
        let model_name = model_name.into();
        if target.trim().is_empty() {
            return Err(Error::Configuration("endpoint target cannot be empty".to_string()));
        }
        if let Some((scheme, _)) = target.split_once("://") {
            if scheme != "http" {
                return Err(Error::Configuration(format!(
                    "unsupported scheme `{scheme}` in `{target}`: only plain http is available"
                )));
            }
        }
        if model_name.trim().is_empty() {
            return Err(Error::Configuration("model name cannot be empty".to_string()));
        }
        if matches!(model_version.as_deref(), Some(v) if v.trim().is_empty()) {
            return Err(Error::Configuration(
                "model version must be omitted rather than empty".to_string(),
            ));
        }
        Ok(Self {
            target,
            model_name,
            model_version,
        })
    }

    /// `host:port`, possibly already carrying an `http://` scheme.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn model_version(&self) -> Option<&str> {
        self.model_version.as_deref()
    }

    /// Base URL with a scheme, defaulting to plain `http`.
    pub fn base_url(&self) -> String {
        if self.target.starts_with("http://") {
            self.target.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", self.target.trim_end_matches('/'))
        }
    }
}
