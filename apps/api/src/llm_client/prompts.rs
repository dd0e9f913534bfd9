// Shared prompt fragments for the LLM client.
// Interview prompts live in interview/prompts.rs.

/// Appended to every prompt that expects structured output.
pub const JSON_ONLY_INSTRUCTION: &str = "Return JSON only: no markdown, no code fences, no explanations.";

const JSON_FIXER_PROMPT: &str = "Convert the following into valid JSON only \
(no markdown, no code blocks, no explanations) matching {schema}:\n\n{text}";

/// Prompt asking the model to rewrite its own output as JSON matching `schema`.
pub fn json_fixer_prompt(schema: &str, text: &str) -> String {
    JSON_FIXER_PROMPT
        .replace("{schema}", schema)
        .replace("{text}", text)
}
