//! Prompts for the three comparison stages.
//!
//! All prompt text lives here so wording changes never touch the
//! orchestration code, and tests can inspect prompts without a live model.
//!
//! The comparison prompt names the three metrics with exactly the keys
//! [`crate::output::MatchResult`] serialises to, which is what makes the
//! reply parseable.

/// Stage 1: pull the job title and keywords out of the job description.
pub fn job_facts_prompt(job_description: &str) -> String {
    format!(
        r#"Extract the designation of the job from the job description.
Extract the key words from the job description.
Final output is the designation and keywords in json format.
job description:
{job_description}"#
    )
}

/// Stage 2: the same extraction, performed on the attached résumé image.
pub const RESUME_FACTS_PROMPT: &str = r#"Extract the designation from this resume.
Extract the key words from this resume.
Final output is the designation and keywords in json format."#;

/// Stage 3: compare both extractions and ask for the three metrics.
///
/// Both fact texts are embedded verbatim.
pub fn compare_prompt(job_facts: &str, resume_facts: &str) -> String {
    format!(
        r#"job:
{job_facts}
resume:
{resume_facts}
show output in json format:
Designation Match : Give me the semantic percentage match of designation of job and resume in number.
Semantic Keyword Match : Give the semantic percentage match of keywords in job and resume in number.
Final Match : Give me the final semantic match between job and resume in number."#
    )
}
