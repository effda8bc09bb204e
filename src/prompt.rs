use crate::models::{Filters, Mode};

/// Story-first selection: no art books, photo books, MVs or soundtracks.
pub const NARRATIVE_RULES: &str = r#"SELECTION RULES (NARRATIVE MODE):
- The user is looking for STORY: plot, structure, twists, character, endings.
- NEVER select art books, photo books, music videos, or soundtracks.
- Select only works with a clear narrative: novels, manga, films, TV dramas, narrative games.
- In "analysis", explain the story construction and the depth of its themes."#;

/// Atmosphere-first selection: visual media preferred.
pub const VISUAL_RULES: &str = r#"SELECTION RULES (VISUAL MODE):
- The user is looking for ATMOSPHERE: visual tone, color, composition, texture.
- PREFER art books, photo books, music videos, and films known for their imagery.
- Story-driven works are allowed only when their visual identity is the point.
- For art books, photo books and music videos NEVER invent a plot. In "analysis", describe the visual tone, palette, composition, mood, and why it feeds the imagination."#;

/// Applied regardless of mode.
pub const NEGATIVE_CONSTRAINT: &str =
    "Never propose sequels, prequels, spin-offs, or remakes of the input, nor works from the same series.";

pub const CARDINALITY_CONSTRAINT: &str = "Output exactly 5 items (no more, no less).";

const INPUT_RULES: &str = r#"INPUT HANDLING:
First decide whether the keyword is:
- Case A (a specific title: book, film, manga, album...): identify its series, medium and core theme. Exclude the same series and the same primary genre, then propose works from DIFFERENT genres and media that share its thematic DNA.
- Case B (an abstract concept, vibe or aesthetic such as "Cyberpunk", "solitude", "Noir"): identify what the concept stands for and propose masterpieces that embody it, across media (film, books, art/photo, history, design, music...). Reference material is welcome when relevant.

TONE MATCHING (highest priority):
- Judge whether the input is serious/dark/philosophical or pop/light/comedic/cute.
- Every recommendation MUST share a similar tone and lightness with the input."#;

const OUTPUT_SCHEMA: &str = r#"RESPONSE FORMAT (STRICT JSON, no prose, no code fences):
{
  "input_analysis_tags": ["tag1", "tag2", "tag3"],
  "results": [
    {
      "title_ja": "Title in the output language",
      "title_en": "English Title",
      "creator": "author/director/artist",
      "media_type": "precise medium (e.g. art book, SF novel, MV)",
      "analysis": "medium-appropriate appeal, about 100 characters",
      "structural_insight": "objective structural analysis",
      "match_tags": ["tag1", "tag2"],
      "imageUrl": null
    }
  ]
}"#;

/// Assembles the instruction text sent to the model.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    output_language: String,
}

impl PromptBuilder {
    pub fn new(output_language: impl Into<String>) -> Self {
        Self {
            output_language: output_language.into(),
        }
    }

    /// The query is interpolated verbatim. Filter lines appear only for
    /// values other than the "All" sentinel or blank.
    pub fn build(&self, query: &str, mode: Mode, filters: Option<&Filters>) -> String {
        let mut prompt = String::with_capacity(4096);

        prompt.push_str("You are a professional media curator.\n");
        prompt.push_str(&format!("User search keyword: \"{query}\"\n\n"));

        prompt.push_str(INPUT_RULES);
        prompt.push_str("\n\n");

        prompt.push_str(match mode {
            Mode::Narrative => NARRATIVE_RULES,
            Mode::Visual => VISUAL_RULES,
        });
        prompt.push('\n');

        let active = filters.map(Filters::active).unwrap_or_default();
        if !active.is_empty() {
            prompt.push_str("\nFILTER CONSTRAINTS (soft hints):\n");
            for (label, value) in active {
                prompt.push_str(&format!("- {label}: {value}\n"));
            }
            prompt.push_str(
                "Note: \"Book\" covers novels, art books and photo books; \"Film/Video\" covers films, dramas and music videos.\n",
            );
        }

        prompt.push_str("\nSTRICT REQUIREMENTS:\n");
        prompt.push_str(&format!("- {CARDINALITY_CONSTRAINT}\n"));
        prompt.push_str(&format!("- {NEGATIVE_CONSTRAINT}\n"));
        prompt.push_str(
            "- Include media_type, creator, title_ja, title_en, analysis, structural_insight, match_tags for every item.\n",
        );
        prompt.push_str(&format!(
            "- Write analysis, structural_insight and ALL tags (input_analysis_tags and match_tags) in {}.\n\n",
            self.output_language
        ));

        prompt.push_str(OUTPUT_SCHEMA);
        prompt.push('\n');
        prompt
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new("Japanese")
    }
}
