//! Voice-direction prompts for single-word pronunciations.
//!
//! [`PromptBuilder`] assembles one prompt per [`Variant`].  Both variants
//! share the role, target-word and rules sections; only the pacing line of
//! the director's notes differs.  The accent is chosen at construction time.

use crate::config::Variant;

// ---------------------------------------------------------------------------
// Prompt sections
// ---------------------------------------------------------------------------

const ROLE: &str = "\
You are a professional voice actor for preschool kids (age 2-5).
Your goal is to help a child map \"image = sound\" with maximum clarity and consistency.";

const RULES: &str = "\
PRONUNCIATION RULES:
- Speak ONLY the target word. No extra words.
- One clean pronunciation. No repetitions.
- Keep the same voice identity across all recordings (same timbre, mood, loudness).";

const STYLE: &str = "\
Style: Warm, cheerful, supportive. A gentle \"vocal smile\". Like praising a child during a fun game.";

const PACING_NORMAL: &str = "Pacing: Natural, clear, not rushed.";

const PACING_SLOW: &str = "\
Pacing: Slow, extra clear, with tiny natural pauses; not robotic; do not unnaturally stretch vowels.";

const DELIVERY: &str = "\
Articulation: Very clear consonants, clean vowels, natural stress. No mumbling.
Energy: Medium-high, positive, calm excitement.
Audio: Close-mic clarity, no background noise, no reverb.";

const OUTPUT: &str = "\
OUTPUT:
Return audio only.";

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Builds the text prompt sent to the TTS model.
///
/// ```rust
/// use word_tts::config::Variant;
/// use word_tts::tts::PromptBuilder;
///
/// let builder = PromptBuilder::new("General American English");
/// let prompt = builder.build("Cat", Variant::Slow);
/// assert!(prompt.contains("TARGET WORD:\nCat"));
/// assert!(prompt.contains("Pacing: Slow"));
/// ```
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    accent: String,
}

impl PromptBuilder {
    pub fn new(accent: &str) -> Self {
        Self {
            accent: accent.to_string(),
        }
    }

    /// Build the prompt for `word` spoken at `variant` pace.
    pub fn build(&self, word: &str, variant: Variant) -> String {
        let pacing = match variant {
            Variant::Normal => PACING_NORMAL,
            Variant::Slow => PACING_SLOW,
        };

        let mut prompt = String::with_capacity(1024);
        prompt.push_str(ROLE);
        prompt.push_str("\n\nTARGET WORD:\n");
        prompt.push_str(word);
        prompt.push_str("\n\n");
        prompt.push_str(RULES);
        prompt.push_str("\n\nDIRECTOR'S NOTES\n");
        prompt.push_str(STYLE);
        prompt.push_str(&format!("\nAccent: {}\n", self.accent));
        prompt.push_str(pacing);
        prompt.push('\n');
        prompt.push_str(DELIVERY);
        prompt.push_str("\n\n");
        prompt.push_str(OUTPUT);
        prompt
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
