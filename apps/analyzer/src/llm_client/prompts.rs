// Shared prompt constants.
// The analysis prompts live in analysis/prompts.rs; this file holds the
// cross-cutting system prompt sent with every call.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured sales analyst. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";
