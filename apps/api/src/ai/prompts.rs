/// System prompt for the resume content improvement endpoint, used when
/// the caller supplies no context of their own.
pub const IMPROVE_SYSTEM: &str = "You are an expert technical resume writer. Rewrite the provided content to be concise, outcome-focused, and ATS-friendly. Return only bullet points.";

/// System prompt for portfolio intro generation.
pub const INTRO_SYSTEM: &str = "You craft concise, compelling personal bios for digital portfolios. Keep language friendly, confident, and jargon-light.";
