//! Prompt and canned-reply text for the recorder, in both languages.

use super::{DecisionDraft, Field};
use crate::language::Language;

const OPENING_EN: &str = "Hi! I'm here to help you record a decision. \
What decision are you facing or have you made recently? Describe it in your own words.";

const OPENING_HI: &str = "नमस्ते! मैं आपके निर्णय को दर्ज करने में मदद करूँगा। \
आप किस निर्णय के बारे में सोच रहे हैं या हाल ही में कौन सा निर्णय लिया है? अपने शब्दों में बताइए।";

pub const EXTRACTION_SYSTEM_PROMPT: &str = "You extract structured data from conversations. \
Reply with a single JSON object and nothing else.";

pub fn opening(language: Language) -> &'static str {
    match language {
        Language::English => OPENING_EN,
        Language::Hindi => OPENING_HI,
    }
}

/// Instructions for one conversational turn: language, what is known, what
/// is missing, and how to report field values.
pub fn system_prompt(language: Language, draft: &DecisionDraft) -> String {
    let reply_language = match language {
        Language::English => "English",
        Language::Hindi => "Hindi (Devanagari script)",
    };
    let collected = draft.summary();
    let collected = if collected.is_empty() { "(nothing yet)".to_string() } else { collected };
    let missing = draft
        .missing_fields()
        .iter()
        .map(|f| f.key())
        .collect::<Vec<_>>()
        .join(", ");
    let missing = if missing.is_empty() { "(none, the decision can be saved)".to_string() } else { missing };

    format!(
        "You are NeuroLinker, a warm and concise assistant helping the user record a decision.\n\
         Reply in {reply_language}. Ask about one missing item at a time and keep replies short.\n\
         \n\
         Fields: description, goal, constraints, alternatives, final_choice, reasoning, expected_outcome.\n\
         Collected so far:\n{collected}\n\
         Still missing: {missing}\n\
         \n\
         When the user's message states a value for any field, append a block at the very end of your reply:\n\
         [FIELDS]\n\
         field_name: value\n\
         [/FIELDS]\n\
         Use one line per field. Separate list items (constraints, alternatives) with semicolons. \
         Include only values the user actually stated. Omit the block when nothing new was stated.\n\
         When nothing is missing, tell the user they can type 'save' to store the decision."
    )
}

/// Request to pull every field out of a whole transcript.
pub fn extraction_prompt(transcript: &str) -> String {
    format!(
        "Read this conversation about a decision and extract what the user said.\n\
         Return a JSON object with these keys: description, goal, constraints (array), \
         alternatives (array), final_choice, reasoning, expected_outcome.\n\
         Use null for anything the user did not state. Do not invent values.\n\
         \n\
         Conversation:\n{transcript}"
    )
}

/// Question about the first missing field, or the ready-to-save notice.
pub fn next_question(language: Language, draft: &DecisionDraft) -> String {
    let Some(field) = draft.missing_fields().into_iter().next() else {
        return ready_to_save(language).to_string();
    };
    match language {
        Language::English => match field {
            Field::Description => "What decision are you facing?".to_string(),
            Field::Goal => "What are you hoping to achieve with this decision?".to_string(),
            Field::Constraints => "What constraints or limitations are you working with?".to_string(),
            Field::Alternatives => "Which alternatives did you consider?".to_string(),
            Field::FinalChoice => "What did you finally choose?".to_string(),
            Field::Reasoning => "Why did you choose that option?".to_string(),
            Field::ExpectedOutcome => "What outcome do you expect?".to_string(),
        },
        Language::Hindi => match field {
            Field::Description => "आप किस निर्णय के बारे में सोच रहे हैं?".to_string(),
            Field::Goal => "इस निर्णय से आप क्या हासिल करना चाहते हैं?".to_string(),
            Field::Constraints => "आपके सामने कौन सी बाधाएँ या सीमाएँ हैं?".to_string(),
            Field::Alternatives => "आपने कौन से विकल्पों पर विचार किया?".to_string(),
            Field::FinalChoice => "आपने अंत में क्या चुना?".to_string(),
            Field::Reasoning => "आपने यह विकल्प क्यों चुना?".to_string(),
            Field::ExpectedOutcome => "आप किस परिणाम की उम्मीद करते हैं?".to_string(),
        },
    }
}

fn ready_to_save(language: Language) -> &'static str {
    match language {
        Language::English => "I have everything I need. Type 'save' to store your decision.",
        Language::Hindi => "मेरे पास सारी जानकारी है। निर्णय सहेजने के लिए 'save करो' लिखें।",
    }
}

/// Reply used when the model cannot be reached. Keeps the conversation moving
/// by asking for the next missing field.
pub fn fallback_reply(language: Language, draft: &DecisionDraft) -> String {
    let apology = match language {
        Language::English => "I couldn't reach the assistant just now, but let's keep going.",
        Language::Hindi => "अभी सहायक से संपर्क नहीं हो पाया, लेकिन हम आगे बढ़ते हैं।",
    };
    format!("{apology} {}", next_question(language, draft))
}

/// Answer to a save command while required fields are missing.
pub fn missing_fields_message(language: Language, missing: &[Field]) -> String {
    let header = match language {
        Language::English => "I still need some more information before we can save. Please provide:",
        Language::Hindi => "सहेजने से पहले मुझे कुछ और जानकारी चाहिए। कृपया बताइए:",
    };
    let items = missing
        .iter()
        .map(|f| format!("• {}", f.label(language)))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{header}\n\n{items}")
}

pub fn saved_message(language: Language) -> &'static str {
    match language {
        Language::English => "Your decision has been saved successfully!",
        Language::Hindi => "आपका निर्णय सफलतापूर्वक सहेज लिया गया है!",
    }
}
