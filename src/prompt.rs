// prompt.rs - instruction templates, the numbered-variations contract and the prompt builder
use regex::Regex;
use std::sync::OnceLock;

const OPTIMIZE_TEMPLATE: &str = "You are an expert in writing prompts for generative AI image models. \
Your task is to take a user's prompt and rewrite it to be more descriptive, detailed, and effective for \
generating high-quality images. The rewritten prompt should be a single, concise paragraph. Always mention \
that it is based on the provided images. Do not add any preamble or explanation, just provide the rewritten \
prompt.\n\nUser prompt: \"{prompt}\"\n\nRewritten prompt:";

const VARIATIONS_TEMPLATE: &str = "You are an expert in writing prompts for generative AI image models. \
Your task is to take a user's prompt and generate 3 new prompts with similar ideas, but with different \
creative directions. The new prompts should be a single, concise paragraph each, and returned as a numbered \
list.\n\nUser prompt: \"{prompt}\"\n\nNew prompts:";

pub fn optimize_instruction(prompt: &str) -> String {
    OPTIMIZE_TEMPLATE.replace("{prompt}", prompt)
}

pub fn variations_instruction(prompt: &str) -> String {
    VARIATIONS_TEMPLATE.replace("{prompt}", prompt)
}

/// Submission precondition shared by every prompt-driven action.
pub fn is_blank(prompt: &str) -> bool {
    prompt.trim().is_empty()
}

// ── Variations parsing ───────────────────────────────────────────────────

/// Output formats the variations split understands. Bump when the model's
/// list format changes so old and new parsing can coexist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VariationFormat {
    /// Items separated by `"\n<digits>. "`
    #[default]
    NumberedV1,
}

fn numbered_v1_delimiter() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n[0-9]+\. ").expect("static regex"))
}

/// Split the model's list into candidate prompts (trimmed, empties dropped).
pub fn parse_variations(text: &str, format: VariationFormat) -> Vec<String> {
    match format {
        VariationFormat::NumberedV1 => numbered_v1_delimiter()
            .split(text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

// ── Prompt builder ───────────────────────────────────────────────────────

/// Structured "figure" prompt template; every field is free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBuilder {
    pub scale:       String,
    pub subject:     String,
    pub style:       String,
    pub environment: String,
    pub base:        String,
    pub details:     String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            scale:       "1/7".into(),
            subject:     "commercialized figure of the character in the illustration".into(),
            style:       "realistic".into(),
            environment: "on a computer desk".into(),
            base:        "using a circular transparent acrylic base without any text".into(),
            details:     "On the computer screen, display the ZBrush modeling process of the figure. \
                          Next to the computer screen, place a BANDAI-style toy packaging box printed \
                          with the original artwork"
                .into(),
        }
    }
}

impl PromptBuilder {
    pub fn build(&self) -> String {
        format!(
            "Create a {} scale {}, in a {} style and environment. Place the figure {}, {}. {}",
            self.scale, self.subject, self.style, self.environment, self.base, self.details
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_three_variations() {
        let out = parse_variations(
            "\n1. A fluffy cat\n2. A cat in space\n3. A cartoon cat",
            VariationFormat::NumberedV1,
        );
        assert_eq!(out, vec!["A fluffy cat", "A cat in space", "A cartoon cat"]);
    }

    #[test]
    fn test_parse_multi_digit_numbers() {
        let text = "\n9. nine\n10. ten\n11. eleven";
        assert_eq!(parse_variations(text, VariationFormat::NumberedV1).len(), 3);
    }

    #[test]
    fn test_parse_keeps_inline_numbers() {
        // "2. " not preceded by a newline is part of the item, not a delimiter
        let out = parse_variations("\n1. A cat with 2. tails", VariationFormat::NumberedV1);
        assert_eq!(out, vec!["A cat with 2. tails"]);
    }

    #[test]
    fn test_parse_empty_text() {
        assert!(parse_variations("  \n ", VariationFormat::NumberedV1).is_empty());
    }

    #[test]
    fn test_templates_embed_prompt() {
        assert!(optimize_instruction("A cat").contains("User prompt: \"A cat\""));
        assert!(optimize_instruction("A cat").ends_with("Rewritten prompt:"));
        assert!(variations_instruction("A cat").contains("generate 3 new prompts"));
        assert!(variations_instruction("A cat").ends_with("New prompts:"));
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(""));
        assert!(is_blank(" \t\n"));
        assert!(!is_blank(" x "));
    }

    #[test]
    fn test_builder_default_sentence() {
        let p = PromptBuilder::default().build();
        assert!(p.starts_with("Create a 1/7 scale commercialized figure"));
        assert!(p.contains("in a realistic style and environment."));
        assert!(p.contains("Place the figure on a computer desk, using a circular"));
    }

    #[test]
    fn test_builder_custom_fields() {
        let b = PromptBuilder {
            scale:       "1/4".into(),
            subject:     "robot".into(),
            style:       "anime".into(),
            environment: "on a shelf".into(),
            base:        "on a wooden base".into(),
            details:     "Soft light.".into(),
        };
        assert_eq!(
            b.build(),
            "Create a 1/4 scale robot, in a anime style and environment. Place the figure on a shelf, on a wooden base. Soft light."
        );
    }
}
