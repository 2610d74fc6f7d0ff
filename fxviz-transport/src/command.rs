//! Outbound commands for the effect engine
//!
//! The analysis side never interprets these; they are forwarded as-is.

use crate::error::TransportError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One effect in a processing chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSlot {
    /// Identifier used by later `update_param` commands (e.g. "delay1")
    pub id: String,
    /// Effect kind understood by the engine ("delay", "reverb", ...)
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl EffectSlot {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            params: Map::new(),
        }
    }

    /// Builder-style initial parameter
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

/// Commands understood by the effect engine, tagged by `"command"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EngineCommand {
    /// Start streaming from the capture device
    StartMic,
    /// Stop the live stream
    Stop,
    /// Replace the effect chain
    BuildChain { config: Vec<EffectSlot> },
    /// Change one parameter of one effect
    UpdateParam {
        effect_id: String,
        param: String,
        value: Value,
    },
    /// Run a whole file through the chain (base64 data URI)
    ProcessFile { contents: String },
}

impl EngineCommand {
    pub fn update_param(
        effect_id: impl Into<String>,
        param: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        EngineCommand::UpdateParam {
            effect_id: effect_id.into(),
            param: param.into(),
            value: value.into(),
        }
    }

    pub fn to_value(&self) -> Result<Value, TransportError> {
        Ok(serde_json::to_value(self)?)
    }
}
