use serde::Serialize;
use serde_json::{Map, Value};

pub const DEFAULT_MODEL_ID: &str = "tngtech/deepseek-r1t-chimera:free";

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModelInfo {
    #[serde(skip)]
    pub key: &'static str,
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        key: "deepseek-r1t-chimera",
        id: DEFAULT_MODEL_ID,
        name: "DeepSeek Chimera (Roleplay)",
        description: "Best for creative roleplay and personality chat",
    },
    ModelInfo {
        key: "mimo-v2-flash",
        id: "xiaomi/mimo-v2-flash:free",
        name: "Mimo V2 (Academia)",
        description: "Optimized for academic and educational content",
    },
    ModelInfo {
        key: "deepseek-r1-0528",
        id: "deepseek/deepseek-r1-0528:free",
        name: "DeepSeek R1 (Reasoning)",
        description: "Advanced reasoning and problem-solving",
    },
    ModelInfo {
        key: "qwen3-coder",
        id: "qwen/qwen3-coder:free",
        name: "Qwen 3 (Coding)",
        description: "Specialized for code generation and debugging",
    },
];

/// Looks a model up by its short key, e.g. `qwen3-coder`.
pub fn find_model(key: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.key == key)
}

/// Catalog keyed by short name, the shape `GET /api/models` returns.
pub fn catalog() -> Map<String, Value> {
    MODELS
        .iter()
        .map(|m| (m.key.to_string(), serde_json::to_value(m).unwrap_or(Value::Null)))
        .collect()
}
