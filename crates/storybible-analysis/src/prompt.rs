//! LLM prompt engineering for story entity extraction

use crate::schema::{CategorySchema, FieldShape, CATEGORIES};
use storybible_domain::traits::CompletionRequest;

/// Builds the extraction prompt for one manuscript
///
/// The output is deterministic for a given text.
pub struct PromptBuilder<'a> {
    text: &'a str,
}

impl<'a> PromptBuilder<'a> {
    /// Create a new prompt builder
    pub fn new(text: &'a str) -> Self {
        Self { text }
    }

    /// Build the complete extraction prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str(EXTRACTION_INSTRUCTIONS);
        prompt.push_str("\n\n");

        prompt.push_str("Text to analyze:\n");
        prompt.push_str("---\n");
        prompt.push_str(self.text);
        prompt.push_str("\n---\n\n");

        prompt.push_str("Respond with a JSON object of exactly this shape:\n");
        prompt.push_str(&response_example());
        prompt.push_str("\n\n");

        prompt.push_str(OUTPUT_FORMAT_REMINDER);
        prompt
    }

    /// Build the full provider request
    pub fn request(&self, temperature: f32, max_tokens: u32) -> CompletionRequest {
        CompletionRequest::new(SYSTEM_INSTRUCTION, self.build())
            .with_temperature(temperature)
            .with_max_tokens(max_tokens)
    }
}

/// The example response shape, generated from the candidate field table
pub fn response_example() -> String {
    let categories: Vec<String> = CATEGORIES.iter().map(category_example).collect();
    format!("{{\n{}\n}}", categories.join(",\n"))
}

fn category_example(category: &CategorySchema) -> String {
    let mut fields: Vec<String> = category
        .fields
        .iter()
        .map(|f| match f.shape {
            FieldShape::Text => format!("\"{}\": \"{}\"", f.name, f.example),
            FieldShape::List => format!("\"{}\": [\"{}\"]", f.name, f.example),
        })
        .collect();
    fields.push("\"confidence\": 0.0-1.0".to_string());
    format!("  \"{}\": [{{{}}}]", category.key(), fields.join(", "))
}

const SYSTEM_INSTRUCTION: &str = "You are a literary analyst who catalogues the elements of a story \
for the author's Story Bible. You answer with JSON only.";

const EXTRACTION_INSTRUCTIONS: &str = r#"Identify the story elements in the following manuscript excerpt.
Extract up to 12 categories: characters, locations, objects, organizations, events,
magic systems, timelines, themes, conflicts, lore, scenes and relationships.

Rules:
- Only include elements the text actually supports
- Use the exact spelling of names as they appear in the text
- Give each element a confidence between 0.0 and 1.0
  - Named and described explicitly: 0.8-1.0
  - Named but barely described: 0.5-0.8
  - Implied or inferred: 0.2-0.5
- Relationships name both entities exactly as they appear in the other categories
- Leave a field as an empty string when the text says nothing about it
- Use an empty array for categories with no elements"#;

const OUTPUT_FORMAT_REMINDER: &str =
    "Remember: Return ONLY the JSON object, no markdown code blocks, no explanations.";
