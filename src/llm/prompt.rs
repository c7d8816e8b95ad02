//! Prompt builder for the identification dialogue.
//!
//! [`PromptBuilder`] produces `(system_msg, user_msg)` pairs for the five
//! gateway requests the dialogue makes:
//! * **question**: phrase the question for the current attribute.
//! * **clarification**: explain the options when the user is unsure.
//! * **validation**: judge a free-text answer (structured JSON reply).
//! * **justification**: explain why a ranked match fits the answers.
//! * **identification**: name the most likely species from all answers.
//!
//! English (`"en"`) and German (`"de"`) have dedicated texts; any other
//! language code falls back to English.

// ---------------------------------------------------------------------------
// System instructions
// ---------------------------------------------------------------------------

const ASSISTANT_EN: &str =
    "You are a helpful fish identification assistant for beginners. Keep answers short.";

const ASSISTANT_DE: &str =
    "Du bist ein hilfsbereiter Fischbestimmungs-Assistent für Laien. Antworte kurz.";

const EXPERT_EN: &str = "\
You are a patient fish expert who helps beginners understand fish features \
so they can classify the fish in front of them. Keep it short and remember \
that the fish and waters are ones found in Germany.";

const EXPERT_DE: &str = "\
Du bist ein geduldiger Fisch-Experte, der Anfängern hilft, Fischmerkmale zu \
verstehen, um eine Einordnung des Merkmals passend zu dem Fisch vorzunehmen. \
Halte dich kurz und beachte immer, dass es sich um Fische und Gewässer \
handelt, die in Deutschland vorkommen.";

const VALIDATOR_EN: &str = "\
You check answers in a fish identification dialogue. Reply ONLY with a JSON \
object of the form {\"accepted\": true|false, \"feedback\": \"...\"}.";

const VALIDATOR_DE: &str = "\
Du prüfst Antworten in einem Fischbestimmungs-Dialog. Antworte NUR mit einem \
JSON-Objekt der Form {\"accepted\": true|false, \"feedback\": \"...\"}.";

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Builds chat prompts for the dialogue in the configured language.
///
/// ```rust
/// use finfinder::llm::PromptBuilder;
///
/// let builder = PromptBuilder::new("en");
/// let (_, user) = builder.question("habitat", &["freshwater".to_string(), "saltwater".to_string()]);
/// assert!(user.contains("habitat"));
/// ```
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    language: String,
}

impl PromptBuilder {
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
        }
    }

    fn is_german(&self) -> bool {
        self.language == "de"
    }

    /// Ask for a simple, one-line question about `attribute`.
    pub fn question(&self, attribute: &str, options: &[String]) -> (String, String) {
        let options = format_options(options);
        let user = if self.is_german() {
            format!(
                "Stelle einem Laien eine einfache Frage zur Erkennung des Merkmals \
                 '{attribute}'. Mögliche Optionen: {options}. Gib die Frage in einer Zeile zurück."
            )
        } else {
            format!(
                "Ask a beginner one simple question to determine the feature \
                 '{attribute}'. Possible options: {options}. Return the question on a single line."
            )
        };
        (self.assistant().to_string(), user)
    }

    /// Ask for an explanation of the differences between the options.
    pub fn clarification(&self, attribute: &str, options: &[String]) -> (String, String) {
        let options = format_options(options);
        let user = if self.is_german() {
            format!(
                "Ein Nutzer ist unsicher beim Fisch-Merkmal '{attribute}'. Erkläre einfach mit \
                 Beispielen und Vergleichen die Unterschiede der Optionen: {options}. \
                 Antworte so, dass er danach entscheiden kann."
            )
        } else {
            format!(
                "A user is unsure about the fish feature '{attribute}'. Explain the differences \
                 between the options simply, with examples and comparisons: {options}. \
                 Answer so that they can decide afterwards."
            )
        };
        (self.expert().to_string(), user)
    }

    /// Ask whether a free-text answer is sufficient for `attribute`.
    pub fn validation(&self, attribute: &str, input: &str, options: &[String]) -> (String, String) {
        let options = format_options(options);
        let user = if self.is_german() {
            format!(
                "Schritt: \"{attribute}\". Bekannte Werte: {options}.\n\
                 Eingabe des Nutzers:\n\"\"\"{input}\"\"\"\n\
                 Ist diese Angabe ausreichend und präzise für diesen Schritt? \
                 Wenn nicht, gib in \"feedback\" eine konkrete Rückfrage."
            )
        } else {
            format!(
                "Step: \"{attribute}\". Known values: {options}.\n\
                 User input:\n\"\"\"{input}\"\"\"\n\
                 Is this answer sufficient and precise for this step? \
                 If not, put a concrete follow-up question in \"feedback\"."
            )
        };
        let system = if self.is_german() { VALIDATOR_DE } else { VALIDATOR_EN };
        (system.to_string(), user)
    }

    /// Ask why `candidate` fits the user's `composite` description.
    pub fn justification(&self, composite: &str, candidate: &str) -> (String, String) {
        let user = if self.is_german() {
            format!(
                "Ein Nutzer hat diese Beschreibung eines Fisches gegeben: {composite}\n\
                 Ein möglicher Treffer ist: {candidate}\n\
                 Warum passt dieser Fisch gut zur Nutzerbeschreibung?"
            )
        } else {
            format!(
                "A user described a fish like this: {composite}\n\
                 A possible match is: {candidate}\n\
                 Why does this fish fit the user's description?"
            )
        };
        (self.assistant().to_string(), user)
    }

    /// Ask for a final identification from the whole `composite` description.
    pub fn identification(&self, composite: &str) -> (String, String) {
        let user = if self.is_german() {
            format!(
                "Bestimme anhand folgender Merkmale die wahrscheinlichste Fischart: {composite}\n\
                 Nenne die Art und begründe kurz."
            )
        } else {
            format!(
                "Based on these features, name the most likely fish species: {composite}\n\
                 Give the species and a short reason."
            )
        };
        (self.expert().to_string(), user)
    }

    fn assistant(&self) -> &'static str {
        if self.is_german() {
            ASSISTANT_DE
        } else {
            ASSISTANT_EN
        }
    }

    fn expert(&self) -> &'static str {
        if self.is_german() {
            EXPERT_DE
        } else {
            EXPERT_EN
        }
    }
}

fn format_options(options: &[String]) -> String {
    options
        .iter()
        .map(|o| format!("\"{o}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> Vec<String> {
        vec!["freshwater".into(), "saltwater".into()]
    }

    #[test]
    fn question_lists_attribute_and_options() {
        let (system, user) = PromptBuilder::new("en").question("habitat", &opts());
        assert!(system.contains("fish identification"));
        assert!(user.contains("'habitat'"));
        assert!(user.contains("\"freshwater\", \"saltwater\""));
    }

    #[test]
    fn clarification_uses_expert_persona() {
        let (system, user) = PromptBuilder::new("en").clarification("fin shape", &opts());
        assert!(system.contains("patient fish expert"));
        assert!(user.contains("unsure"));
        assert!(user.contains("'fin shape'"));
    }

    #[test]
    fn validation_requests_json_verdict() {
        let (system, user) =
            PromptBuilder::new("en").validation("habitat", "a muddy pond", &opts());
        assert!(system.contains("\"accepted\""));
        assert!(system.contains("\"feedback\""));
        assert!(user.contains("a muddy pond"));
    }

    #[test]
    fn justification_embeds_both_descriptions() {
        let (_, user) = PromptBuilder::new("en")
            .justification("habitat: freshwater", "habitat: freshwater, form: slim");
        assert!(user.contains("described a fish like this: habitat: freshwater"));
        assert!(user.contains("possible match is: habitat: freshwater, form: slim"));
    }

    #[test]
    fn identification_asks_expert_for_a_species() {
        let (system, user) =
            PromptBuilder::new("en").identification("habitat: freshwater, form: a long snout");
        assert!(system.contains("patient fish expert"));
        assert!(user.starts_with("Based on these features"));
        assert!(user.contains("form: a long snout"));

        let (_, user) = PromptBuilder::new("de").identification("Lebensraum: Teich");
        assert!(user.contains("Fischart: Lebensraum: Teich"));
    }

    #[test]
    fn german_prompts() {
        let builder = PromptBuilder::new("de");
        let (system, user) = builder.clarification("Lebensraum", &opts());
        assert!(system.contains("Fisch-Experte"));
        assert!(user.contains("unsicher"));
        let (system, _) = builder.validation("Lebensraum", "Teich", &opts());
        assert!(system.contains("JSON"));
    }

    #[test]
    fn unknown_language_falls_back_to_english() {
        let (system, _) = PromptBuilder::new("th").question("habitat", &opts());
        assert!(system.contains("fish identification assistant"));
    }
}
