//! Chat prompt construction.

use serde::Serialize;

/// Longest document context passed to the model, in characters.
pub const MAX_CONTEXT_CHARS: usize = 24_000;

/// One message in a `chat/completions` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// System prompt grounding the assistant in the project's document text.
pub fn system_prompt(context: &str) -> String {
    let context = context.trim();
    if context.is_empty() {
        return "You are a helpful assistant for this website. Answer briefly and politely. \
                If you do not know the answer, say so."
            .to_string();
    }

    let clipped = match context.char_indices().nth(MAX_CONTEXT_CHARS) {
        Some((idx, _)) => &context[..idx],
        None => context,
    };
    format!(
        "You are a helpful assistant for this website. Answer using only the \
         document below. If the answer is not in the document, say you don't know.\n\n\
         Document:\n{clipped}"
    )
}

/// Build the message list for one user question.
pub fn build_messages(prompt: &str, context: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: "system",
            content: system_prompt(context),
        },
        ChatMessage {
            role: "user",
            content: prompt.to_string(),
        },
    ]
}
