// Interview LLM prompt templates.
// Slots are filled in a single pass; substituted text is never rescanned.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;

static SLOT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{(json_only|schema|company|role|question|answer|resume)\}")
        .expect("prompt slot pattern")
});

fn fill<'a>(template: &str, value: impl Fn(&str) -> &'a str) -> String {
    SLOT.replace_all(template, |caps: &Captures| value(&caps[1]).to_string())
        .into_owned()
}

pub const QUESTION_SCHEMA: &str = r#"{"question":"<the question>"}"#;

pub const REVIEW_SCHEMA: &str = r#"{"score":0,"feedback":["..."]}"#;

const QUESTION_PROMPT: &str = r#"Generate exactly 1 behavioral interview question for a {role} role at {company}.

Requirements:
- The question should reflect {company}'s culture and values
- Tailor it to the candidate's experience
- 1-2 sentences, specific to this candidate, never a placeholder
- {json_only} Shape: {schema}

Resume excerpt:
{resume}"#;

const REVIEW_PROMPT: &str = r#"You are an experienced interviewer reviewing a candidate's written answer to a behavioral interview question.

Tasks:
1) Evaluate the answer for structure (STAR), clarity, impact, and company/role alignment.
2) Give a score from 0 to 100.
3) Give 3-5 specific, actionable improvements.

{json_only} Shape: {schema}

Question: {question}
Company: {company}
Role: {role}

Candidate answer:
{answer}

Candidate resume (excerpt):
{resume}"#;

pub fn question_prompt(company: &str, role: &str, resume_excerpt: &str) -> String {
    fill(QUESTION_PROMPT, |slot| match slot {
        "json_only" => JSON_ONLY_INSTRUCTION,
        "schema" => QUESTION_SCHEMA,
        "company" => company,
        "role" => role,
        "resume" => resume_excerpt,
        _ => "",
    })
}

pub struct ReviewPromptInput<'a> {
    pub question: &'a str,
    pub answer: &'a str,
    pub company: Option<&'a str>,
    pub role: Option<&'a str>,
    pub resume_excerpt: &'a str,
}

pub fn review_prompt(input: &ReviewPromptInput<'_>) -> String {
    fill(REVIEW_PROMPT, |slot| match slot {
        "json_only" => JSON_ONLY_INSTRUCTION,
        "schema" => REVIEW_SCHEMA,
        "company" => input.company.unwrap_or("Not specified"),
        "role" => input.role.unwrap_or("Not specified"),
        "question" => input.question,
        "answer" => input.answer,
        "resume" => input.resume_excerpt,
        _ => "",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_prompt_fills_every_placeholder() {
        let prompt = question_prompt("Acme", "Site Reliability Engineer", "Led on-call rotation");
        assert!(prompt.contains("Site Reliability Engineer role at Acme"));
        assert!(prompt.contains("Acme's culture"));
        assert!(prompt.contains(QUESTION_SCHEMA));
        assert!(prompt.ends_with("Led on-call rotation"));
        for placeholder in ["{company}", "{role}", "{resume}", "{schema}", "{json_only}"] {
            assert!(!prompt.contains(placeholder), "{placeholder} left in prompt");
        }
    }

    #[test]
    fn test_review_prompt_marks_missing_job_details() {
        let prompt = review_prompt(&ReviewPromptInput {
            question: "Tell me about a time you failed.",
            answer: "I shipped a bug and fixed it.",
            company: None,
            role: Some("Backend Engineer"),
            resume_excerpt: "Rust, Go",
        });
        assert!(prompt.contains("Company: Not specified"));
        assert!(prompt.contains("Role: Backend Engineer"));
        assert!(prompt.contains("I shipped a bug and fixed it."));
        assert!(!prompt.contains("{answer}"));
    }

    #[test]
    fn test_braces_in_user_input_are_kept_verbatim() {
        let prompt = question_prompt("{role} Corp", "SRE", "Resume text");
        assert!(prompt.contains("SRE role at {role} Corp."));

        let prompt = review_prompt(&ReviewPromptInput {
            question: "Tell me about {answer} please",
            answer: "My answer mentions {resume} literally.",
            company: Some("Acme"),
            role: Some("SRE"),
            resume_excerpt: "SECRET-RESUME-TEXT",
        });
        assert!(prompt.contains("Question: Tell me about {answer} please"));
        assert!(prompt.contains("Candidate answer:\nMy answer mentions {resume} literally."));
        assert_eq!(prompt.matches("SECRET-RESUME-TEXT").count(), 1);
    }
}
