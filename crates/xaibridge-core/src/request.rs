use crate::InferTensor;

/// One inference call against a named (and optionally versioned) model.
#[derive(Clone, Debug, PartialEq)]
pub struct InferenceRequest {
    pub model_name: String,
    /// `None` means "not specified": the server picks its default version.
    pub model_version: Option<String>,
    pub id: String,
    pub inputs: Vec<InferTensor>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InferenceResponse {
    pub model_name: String,
    pub model_version: Option<String>,
    pub id: Option<String>,
    pub outputs: Vec<InferTensor>,
}

impl InferenceResponse {
    pub fn new(model_name: impl Into<String>, outputs: Vec<InferTensor>) -> Self {
        Self {
            model_name: model_name.into(),
            model_version: None,
            id: None,
            outputs,
        }
    }
}
