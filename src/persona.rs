//! Persona framing and page branding for the Frontend Master assistant
//!
//! Every outbound prompt is the fixed persona instructions followed by the
//! latest user message and the assistant's exchange label. Earlier turns of
//! the transcript are deliberately not replayed to the model.

use serde::Serialize;

/// Behavioral framing prepended to every request
pub const PERSONA_INSTRUCTIONS: &str =
    "You are a helpful frontend developer who helps people to create their own frontends.";

/// Label the model is asked to continue as
pub const EXCHANGE_LABEL: &str = "Frontend Master";

/// Seeded assistant turn at the start of every session
pub const GREETING: &str =
    "Hello! I am your Frontend Master. How can I help you create a frontend for your business today?";

/// Assistant turn appended when the completion request fails
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again.";

pub const PAGE_TITLE: &str = "White-box.AI";
pub const HEADLINE: &str = "White-box , The Ultimate Frontend Master Chatbot";
pub const INPUT_PLACEHOLDER: &str = "Type your message...";
pub const BUSY_LABEL: &str = "Thinking...";

const ABOUT_HEADER: &str = "About Whitebox";
const CREDIT: &str = "Developed by M Amaan";

/// Compose the request text for one user message.
pub fn build_prompt(user_text: &str) -> String {
    format!("{PERSONA_INSTRUCTIONS}\n\nUser: {user_text}\n{EXCHANGE_LABEL}:")
}

/// Operator-facing description of a failed completion
pub fn operator_error(detail: &str) -> String {
    format!("An error occurred: {detail}")
}

/// Branding shown around the chat (title bar, headline, sidebar)
#[derive(Debug, Clone, Serialize)]
pub struct About {
    pub page_title: &'static str,
    pub headline: &'static str,
    pub header: &'static str,
    pub description: String,
    pub credit: &'static str,
    pub input_placeholder: &'static str,
    pub busy_label: &'static str,
    pub model: String,
}

impl About {
    pub fn for_model(model_id: &str) -> Self {
        Self {
            page_title: PAGE_TITLE,
            headline: HEADLINE,
            header: ABOUT_HEADER,
            description: format!(
                "This is an AI-powered chatbot designed to assist you with frontend development \
                 queries. It uses the Gemini API ({model_id}) and is served by a Rust backend."
            ),
            credit: CREDIT,
            input_placeholder: INPUT_PLACEHOLDER,
            busy_label: BUSY_LABEL,
            model: model_id.to_string(),
        }
    }
}
