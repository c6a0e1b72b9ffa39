//! Request body builder and response envelope view for the analysis backend.
//!
//! The dispatch core treats bodies as opaque JSON. These types exist for
//! callers (and the CLI) that want to build a well-formed request or pull the
//! summary text out of a response without hand-writing JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Kind of business data the backend should analyze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    Sales,
    Hr,
    Marketing,
    Inventory,
    Customer,
    Financial,
    Strategic,
    /// Image of a document; requires image data instead of rows.
    Document,
}

impl AnalysisType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Hr => "hr",
            Self::Marketing => "marketing",
            Self::Inventory => "inventory",
            Self::Customer => "customer",
            Self::Financial => "financial",
            Self::Strategic => "strategic",
            Self::Document => "document",
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of the summary the backend returns.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Json,
    Markdown,
    Text,
}

impl FromStr for ResponseFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            "text" | "txt" => Ok(Self::Text),
            other => Err(format!("unknown response format `{}`", other)),
        }
    }
}

/// Where the rows to analyze come from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataInput {
    Rows(Vec<Map<String, Value>>),
    Csv(String),
    Image { data: String, mime_type: String },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PayloadError {
    #[error("document analysis requires non-empty image data")]
    MissingImage,
    #[error("image data is only accepted for document analysis")]
    ImageWithoutDocumentType,
}

/// Typed analysis request; serializes to the backend's camelCase body.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisPayload {
    pub input: DataInput,
    pub analysis_type: Option<AnalysisType>,
    pub response_format: ResponseFormat,
    pub industry: String,
    pub instruction: Option<String>,
}

impl AnalysisPayload {
    pub fn rows(rows: Vec<Map<String, Value>>) -> Self {
        Self::with_input(DataInput::Rows(rows))
    }

    pub fn csv(text: impl Into<String>) -> Self {
        Self::with_input(DataInput::Csv(text.into()))
    }

    pub fn document(data: impl Into<String>, mime_type: Option<String>) -> Self {
        let mut payload = Self::with_input(DataInput::Image {
            data: data.into(),
            mime_type: mime_type.unwrap_or_else(|| "image/jpeg".to_string()),
        });
        payload.analysis_type = Some(AnalysisType::Document);
        payload
    }

    fn with_input(input: DataInput) -> Self {
        Self {
            input,
            analysis_type: None,
            response_format: ResponseFormat::default(),
            industry: "general".to_string(),
            instruction: None,
        }
    }

    pub fn analysis_type(mut self, analysis_type: AnalysisType) -> Self {
        self.analysis_type = Some(analysis_type);
        self
    }

    pub fn response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    pub fn industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = industry.into();
        self
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    /// Build the JSON body, rejecting combinations the backend refuses.
    pub fn to_json(&self) -> Result<Value, PayloadError> {
        let mut body = Map::new();

        match &self.input {
            DataInput::Rows(_) | DataInput::Csv(_)
                if self.analysis_type == Some(AnalysisType::Document) =>
            {
                return Err(PayloadError::MissingImage);
            }
            DataInput::Rows(rows) => {
                let rows = rows.iter().cloned().map(Value::Object).collect();
                body.insert("salesData".into(), Value::Array(rows));
            }
            DataInput::Csv(text) => {
                body.insert("csv".into(), Value::String(text.clone()));
            }
            DataInput::Image { data, mime_type } => {
                if self.analysis_type != Some(AnalysisType::Document) {
                    return Err(PayloadError::ImageWithoutDocumentType);
                }
                if data.trim().is_empty() {
                    return Err(PayloadError::MissingImage);
                }
                body.insert("fileType".into(), Value::String("image".into()));
                body.insert("imageData".into(), Value::String(data.clone()));
                body.insert("mimeType".into(), Value::String(mime_type.clone()));
            }
        }

        if let Some(kind) = self.analysis_type {
            body.insert("analysisType".into(), Value::String(kind.as_str().into()));
        }
        let format = match self.response_format {
            ResponseFormat::Json => "json",
            ResponseFormat::Markdown => "markdown",
            ResponseFormat::Text => "text",
        };
        body.insert("responseFormat".into(), Value::String(format.into()));
        body.insert("industry".into(), Value::String(self.industry.clone()));
        if let Some(instruction) = self.instruction.as_deref().map(str::trim) {
            if !instruction.is_empty() {
                body.insert("instruction".into(), Value::String(instruction.into()));
            }
        }

        Ok(Value::Object(body))
    }
}

/// Inner `response` object of the backend envelope.
///
/// Tabular analyses fill `summary_ai`; document analyses answer with
/// `summary`, `key_insights` and a `data_analysis.document_type`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvelopeBody {
    #[serde(default)]
    pub summary_ai: Option<String>,
    #[serde(default)]
    pub presentation_md: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub key_insights: Option<Vec<Value>>,
    #[serde(default)]
    pub recommendations: Option<Vec<Value>>,
    #[serde(default)]
    pub data_analysis: Option<Value>,
}

impl EnvelopeBody {
    fn document_type(&self) -> Option<&str> {
        self.data_analysis.as_ref()?.get("document_type")?.as_str()
    }
}

/// Top-level response envelope.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisEnvelope {
    #[serde(default)]
    pub response: Option<EnvelopeBody>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub engine: Option<String>,
}

impl AnalysisEnvelope {
    pub fn parse(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }

    /// Summary text: `summary_ai` for tabular analyses, `summary` for
    /// document analyses.
    pub fn summary(&self) -> Option<&str> {
        let body = self.response.as_ref()?;
        body.summary_ai.as_deref().or(body.summary.as_deref())
    }

    /// The shape the obsolete route produces: `summary` with `key_insights`,
    /// no `summary_ai`, and none of the markers the current backend always
    /// sets on a success (top-level `model` or `engine`, or a document
    /// analysis block).
    pub fn is_legacy(&self) -> bool {
        if self.model.is_some() || self.engine.is_some() {
            return false;
        }
        self.response.as_ref().is_some_and(|body| {
            body.summary_ai.is_none()
                && body.summary.is_some()
                && body.key_insights.is_some()
                && body.document_type().is_none()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_rows_payload_body() {
        let payload = AnalysisPayload::rows(vec![row(&[
            ("date", json!("2024-01-01")),
            ("amount", json!(50000)),
        ])])
        .analysis_type(AnalysisType::Sales)
        .instruction("  focus on trends ");

        assert_eq!(
            payload.to_json().unwrap(),
            json!({
                "salesData": [{"date": "2024-01-01", "amount": 50000}],
                "analysisType": "sales",
                "responseFormat": "json",
                "industry": "general",
                "instruction": "focus on trends",
            })
        );
    }

    #[test]
    fn test_csv_payload_omits_blank_instruction() {
        let body = AnalysisPayload::csv("a,b\n1,2")
            .response_format(ResponseFormat::Markdown)
            .instruction("   ")
            .to_json()
            .unwrap();
        assert_eq!(body["csv"], json!("a,b\n1,2"));
        assert_eq!(body["responseFormat"], json!("markdown"));
        assert!(body.get("instruction").is_none());
        assert!(body.get("analysisType").is_none());
    }

    #[test]
    fn test_document_payload() {
        let body = AnalysisPayload::document("aGVsbG8=", None).to_json().unwrap();
        assert_eq!(body["analysisType"], json!("document"));
        assert_eq!(body["mimeType"], json!("image/jpeg"));
        assert_eq!(body["fileType"], json!("image"));

        let empty = AnalysisPayload::document("", Some("image/png".into()));
        assert_eq!(empty.to_json(), Err(PayloadError::MissingImage));

        let retyped = AnalysisPayload::document("aGVsbG8=", None).analysis_type(AnalysisType::Sales);
        assert_eq!(retyped.to_json(), Err(PayloadError::ImageWithoutDocumentType));
    }

    #[test]
    fn test_document_type_without_image_is_rejected() {
        let csv = AnalysisPayload::csv("a,b\n1,2").analysis_type(AnalysisType::Document);
        assert_eq!(csv.to_json(), Err(PayloadError::MissingImage));

        let rows = AnalysisPayload::rows(vec![row(&[("a", json!(1))])])
            .analysis_type(AnalysisType::Document);
        assert_eq!(rows.to_json(), Err(PayloadError::MissingImage));
    }

    #[test]
    fn test_response_format_from_str() {
        assert_eq!("MD".parse::<ResponseFormat>(), Ok(ResponseFormat::Markdown));
        assert!("yaml".parse::<ResponseFormat>().is_err());
    }

    #[test]
    fn test_envelope_current_schema() {
        let body = br#"{"response":{"summary_ai":"ok","presentation_md":"p"},"format":"json","message":"OK","model":"m"}"#;
        let envelope = AnalysisEnvelope::parse(body).unwrap();
        assert_eq!(envelope.summary(), Some("ok"));
        assert!(!envelope.is_legacy());
    }

    #[test]
    fn test_envelope_legacy_schema() {
        let body = br#"{"response":{"summary":"old","key_insights":[],"recommendations":[]},"format":"json"}"#;
        let envelope = AnalysisEnvelope::parse(body).unwrap();
        assert!(envelope.is_legacy());
        assert_eq!(envelope.summary(), Some("old"));
    }

    #[test]
    fn test_document_reply_is_current_schema() {
        let body = json!({
            "response": {
                "summary": "Invoice total 12,000 JPY",
                "key_insights": ["text extracted", "analysis done"],
                "recommendations": ["verify extracted data"],
                "data_analysis": {"total_records": 1, "document_type": "image"}
            },
            "format": "json",
            "message": "Image analysis completed",
            "engine": "bedrock+textract",
            "model": "deepseek.r1-v1:0"
        });
        let envelope = AnalysisEnvelope::parse(body.to_string().as_bytes()).unwrap();
        assert!(!envelope.is_legacy());
        assert_eq!(envelope.summary(), Some("Invoice total 12,000 JPY"));

        // Each marker on its own is enough.
        let mut stripped = envelope.clone();
        stripped.model = None;
        stripped.engine = None;
        assert!(!stripped.is_legacy());
        if let Some(inner) = stripped.response.as_mut() {
            inner.data_analysis = None;
        }
        assert!(stripped.is_legacy());
    }
}
