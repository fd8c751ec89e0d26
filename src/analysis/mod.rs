//! Structured contract analysis: prompt, reply parsing and merging.
//!
//! Models are asked to answer with one JSON object. [`parse`] extracts and
//! decodes that object; when a reply cannot be decoded the caller takes the
//! explicit fallback branch, [`ContractAnalysis::from_raw_text`], which keeps
//! the prose as the summary. [`merge`] fuses several analyses for consensus.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ConsiliumError;
use crate::types::ProviderId;

/// Distinct entries kept per list field after a merge.
pub const MAX_LIST_ITEMS: usize = 10;

/// What the analysis should focus on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    #[default]
    General,
    Risk,
    Compliance,
    Summary,
}

impl AnalysisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::General => "general",
            AnalysisType::Risk => "risk",
            AnalysisType::Compliance => "compliance",
            AnalysisType::Summary => "summary",
        }
    }

    fn focus(&self) -> &'static str {
        match self {
            AnalysisType::General => "overall obligations, risks and notable terms",
            AnalysisType::Risk => "legal, financial and operational risk exposure",
            AnalysisType::Compliance => "regulatory and policy compliance gaps",
            AnalysisType::Summary => "a concise plain-language summary of the agreement",
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisType {
    type Err = ConsiliumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(AnalysisType::General),
            "risk" => Ok(AnalysisType::Risk),
            "compliance" => Ok(AnalysisType::Compliance),
            "summary" => Ok(AnalysisType::Summary),
            other => Err(ConsiliumError::InvalidInput(format!(
                "unknown analysis type: {other}"
            ))),
        }
    }
}

/// The structured reply a model is asked to produce.
///
/// Every field is optional on the wire; absent scores stay `None` so they
/// do not drag a consensus average towards zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContractAnalysis {
    pub summary: String,
    /// 0 to 100, higher is riskier.
    pub risk_score: Option<f64>,
    /// 0 to 100, higher is more compliant.
    pub compliance_score: Option<f64>,
    pub risk_areas: Vec<String>,
    pub recommendations: Vec<String>,
    pub key_clauses: Vec<String>,
    pub missing_provisions: Vec<String>,
}

impl ContractAnalysis {
    /// Fallback shape for a reply that is not a JSON analysis.
    pub fn from_raw_text(raw: &str) -> Self {
        Self {
            summary: raw.trim().to_string(),
            ..Self::default()
        }
    }
}

/// Why a model reply could not be read as a [`ContractAnalysis`].
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("reply contains no JSON object")]
    NoJsonObject,

    #[error("invalid analysis JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode the JSON object embedded in a model reply.
///
/// Models often wrap the object in prose or code fences, so the slice from
/// the first `{` to the last `}` is decoded.
pub fn parse(raw: &str) -> Result<ContractAnalysis, ParseError> {
    let start = raw.find('{').ok_or(ParseError::NoJsonObject)?;
    let end = raw.rfind('}').ok_or(ParseError::NoJsonObject)?;
    if end < start {
        return Err(ParseError::NoJsonObject);
    }
    Ok(serde_json::from_str(&raw[start..=end])?)
}

/// Read a model reply, falling back to the raw text when it is not valid
/// analysis JSON. The flag is `true` when the reply parsed.
pub fn read_reply(raw: &str) -> (ContractAnalysis, bool) {
    match parse(raw) {
        Ok(analysis) => (analysis, true),
        Err(e) => {
            warn!(error = %e, reply_len = raw.len(), "analysis reply not structured, keeping raw text");
            (ContractAnalysis::from_raw_text(raw), false)
        }
    }
}

/// Build the analysis prompt for `text`.
pub fn build_prompt(text: &str, kind: AnalysisType) -> String {
    format!(
        "You are a contract analyst. Focus on {focus}.\n\
         Reply with a single JSON object and nothing else, using these keys:\n\
         \"summary\" (string), \"riskScore\" (number 0-100), \"complianceScore\" (number 0-100), \
         \"riskAreas\", \"recommendations\", \"keyClauses\", \"missingProvisions\" \
         (arrays of short strings, at most {max} each).\n\n\
         Contract:\n{text}",
        focus = kind.focus(),
        max = MAX_LIST_ITEMS,
    )
}

/// Fuse several analyses into one.
///
/// Scores are averaged over the analyses that carry them and rounded to one
/// decimal. List fields are unioned in first-seen order, deduplicated and
/// capped at [`MAX_LIST_ITEMS`]. The summary is the first non-empty one.
pub fn merge(analyses: &[ContractAnalysis]) -> ContractAnalysis {
    ContractAnalysis {
        summary: analyses
            .iter()
            .map(|a| a.summary.trim())
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string(),
        risk_score: average(analyses.iter().filter_map(|a| a.risk_score)),
        compliance_score: average(analyses.iter().filter_map(|a| a.compliance_score)),
        risk_areas: union(analyses.iter().map(|a| a.risk_areas.as_slice())),
        recommendations: union(analyses.iter().map(|a| a.recommendations.as_slice())),
        key_clauses: union(analyses.iter().map(|a| a.key_clauses.as_slice())),
        missing_provisions: union(analyses.iter().map(|a| a.missing_provisions.as_slice())),
    }
}

/// Round to one decimal place.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0u32), |(sum, n), v| (sum + v, n + 1));
    (count > 0).then(|| round1(sum / f64::from(count)))
}

fn union<'a>(lists: impl Iterator<Item = &'a [String]>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in lists.flatten() {
        let item = item.trim();
        if item.is_empty() || !seen.insert(item) {
            continue;
        }
        out.push(item.to_string());
        if out.len() == MAX_LIST_ITEMS {
            break;
        }
    }
    out
}

/// Outcome of [`Orchestrator::analyze_contract`](crate::Orchestrator::analyze_contract).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractAnalysisResult {
    pub analysis_type: AnalysisType,
    pub analysis: ContractAnalysis,
    /// Providers whose replies contributed.
    pub providers: Vec<ProviderId>,
    /// Share of consensus members that answered; `None` for a single call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// False when at least one reply took the raw-text fallback.
    pub structured: bool,
}
