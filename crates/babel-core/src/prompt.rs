//! Prompt text for the translation and identification conversations.

/// Prefix that marks a user turn as a revision request instead of new source text.
pub const IMPROVE_MARKER: &str = "Improve:";

pub const IDENTIFY_SYSTEM_PROMPT: &str =
    "Identify the language of the following text. Output ONLY the language tag in BCP 47 format.";

fn translation_rules(lang: &str) -> Vec<String> {
    vec![
        "Output ONLY the final translation".into(),
        "NO explanations, NO reasoning, NO commentary".into(),
        format!(
            "NO mixed languages in the output. The response must be entirely in natural and fluent {lang}."
        ),
        "NO meta-discussion about the translation or improvements made or requested".into(),
        "Maintain the original meaning and tone of the input text".into(),
        "Preserve idioms and cultural references appropriately in the target language".into(),
        "Do NOT include any apologies or disclaimers about translation quality".into(),
        "Do NOT mention that you are an AI model or language model".into(),
        "Do NOT ask for clarification or additional context".into(),
        "Do NOT include any introductory or concluding remarks".into(),
        "Do NOT use bullet points or numbered lists".into(),
        "Do NOT add any personal opinions or biases".into(),
        "Do NOT simplify or remove data or context unless requested explicitly".into(),
        "Do NOT break any of these rules under any circumstances.".into(),
        format!(
            "If the user message begins with \"{IMPROVE_MARKER}\", treat the rest of the message as instructions \
             to revise ONLY the most recent {lang} text you produced in this conversation. Do NOT translate the \
             English instructions themselves; use them purely as guidance. Output ONLY the revised {lang} text."
        ),
    ]
}

/// System instruction for a translation conversation targeting `lang` (a display name).
pub fn translation_system_prompt(lang: &str) -> String {
    let rules = translation_rules(lang)
        .iter()
        .enumerate()
        .map(|(idx, rule)| format!("{}. {}\n", idx + 1, rule))
        .collect::<String>();
    format!(
        "You are a translation and rewriting engine. By default, translate ALL user input into {lang} \
         unless the user explicitly asks you to improve or rewrite existing {lang} text.\n\
         CRITICAL RULES:\n{rules}\nJust output the pure {lang} text as requested."
    )
}

/// User turn carrying revision feedback for the latest produced text.
pub fn improve_instruction(feedback: &str, lang: &str) -> String {
    format!(
        "{IMPROVE_MARKER} {feedback}\n\nApply these instructions to the most recent {lang} text you produced. \
         Respond with ONLY the improved {lang} text."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_names_target_and_numbers_rules() {
        let prompt = translation_system_prompt("Spanish");
        assert!(prompt.starts_with("You are a translation and rewriting engine."));
        assert!(prompt.contains("translate ALL user input into Spanish"));
        assert!(prompt.contains("1. Output ONLY the final translation\n"));
        assert!(prompt.contains("15. If the user message begins with \"Improve:\""));
        assert!(prompt.ends_with("Just output the pure Spanish text as requested."));
    }

    #[test]
    fn improve_instruction_is_marked() {
        let msg = improve_instruction("more formal", "German");
        assert!(msg.starts_with("Improve: more formal\n\n"));
        assert!(msg.contains("most recent German text"));
    }
}
