// All LLM prompt constants for the analysis pipeline.
// The JSON-only system prompt lives in llm_client::prompts.

/// Quick extraction prompt. Replace `{transcript}` before sending.
///
/// Only the fields needed to pick reference customers are requested, so the
/// call stays small.
pub const QUICK_EXTRACTION_TEMPLATE: &str = r#"Read the sales call transcript below and extract the prospect's basic profile.

Return a JSON object with this EXACT schema (no extra fields):
{
  "customerName": "Acme Heating & Air",
  "industry": "HVAC",
  "userCount": {"total": 100, "backOffice": 20, "field": 80},
  "services": {"types": ["Maintenance", "Installation"], "details": ""}
}

Use 0 for any count the transcript does not mention. Use "" for an unknown name or industry.

TRANSCRIPT:
{transcript}"#;

/// Full analysis prompt. Replace `{transcript}`, `{criteria_summary}`,
/// `{reference_customers}` and `{corpus_stats}` before sending.
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze the sales call transcript below and assess how well the prospect fits our ideal customer profile.

SCORING CRITERIA:
{criteria_summary}

HISTORICAL CORPUS SUMMARY:
{corpus_stats}

REFERENCE CUSTOMERS (past customers similar to this prospect, with their outcomes):
{reference_customers}

Return a JSON object with this EXACT schema (no extra fields):
{
  "customerName": "Acme Heating & Air",
  "industry": "HVAC",
  "userCount": {"total": 100, "backOffice": 20, "field": 80},
  "services": {"types": ["Maintenance"], "details": "Residential and light commercial"},
  "requirements": {"keyFeatures": ["Dispatch board"], "integrations": ["QuickBooks"]},
  "currentState": "Paper work orders and a shared calendar",
  "timeline": "Go live before peak season in May",
  "budget": "Approved, around $40k per year",
  "fitScore": 72,
  "strengths": ["Large field workforce"],
  "challenges": ["Tight rollout timeline"],
  "recommendations": ["Lead the demo with dispatch and mobile"]
}

Rules:
- fitScore is an integer from 0 to 100 reflecting overall fit BEFORE any criteria adjustment.
- Counts are integers. Use 0 when the transcript does not say.
- Only list requirements and integrations the prospect actually asked for.
- Ground strengths, challenges and recommendations in the transcript and the reference customers.

TRANSCRIPT:
{transcript}"#;

/// Max transcript characters sent with the quick extraction call.
pub const QUICK_TRANSCRIPT_CHARS: usize = 12_000;
