//! Prompt text for CV / job-fit analysis.
//!
//! Every string sent to the model lives here so wording changes touch one
//! file and tests can inspect the prompts without a live service. The
//! response format (`SCORE:` line, then `ANALYSE:`) is what
//! [`crate::pipeline::response`] parses; change both together.

/// System turn establishing the reviewer persona.
pub const SYSTEM_PROMPT: &str = "You are an HR expert specialised in CV analysis.";

/// Token the model is asked to prefix its score line with.
pub const SCORE_TOKEN: &str = "SCORE:";

/// Final instructions shared by the vision and text prompts.
pub const ANALYSIS_INSTRUCTIONS: &str = r#"Having analysed this CV against the job description and requirements, provide:
1. An overall assessment of how well the candidate's profile fits the position (out of 100)
2. The candidate's strengths relative to the position
3. Missing skills or skills to develop
4. A recommendation (invite to interview, ask for more information, or politely decline)

Expected response format:
SCORE: [numeric score out of 100]

ANALYSE:
[your detailed analysis]"#;

/// Text of the first user turn of a vision prompt.
pub fn vision_intro(job_description: &str, job_requirements: &str) -> String {
    format!(
        "You are an HR expert asked to assess how well a CV matches a job offer.\n\n\
         Job description:\n{job_description}\n\n\
         Job requirements:\n{job_requirements}\n\n\
         The candidate's CV follows as page images. Analyse it in detail."
    )
}

/// Text opening a continuation turn; `page_num` is 1-based.
pub fn continuation(page_num: usize) -> String {
    format!("CV continued (page {page_num})")
}

/// Single user turn of a text-only prompt.
pub fn text_prompt(job_description: &str, job_requirements: &str, cv_text: &str) -> String {
    format!(
        "You are a human-resources expert asked to assess how well a CV matches a job offer.\n\n\
         Job description:\n{job_description}\n\n\
         Job requirements:\n{job_requirements}\n\n\
         Candidate CV:\n{cv_text}\n\n\
         {ANALYSIS_INSTRUCTIONS}"
    )
}
