#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct LogMessage {
    pub severity: String,
    pub message: String,
    pub time: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub span: Option<String>,
}
