use serde::{Deserialize, Serialize};
use session_store::ConversationTurn;

/// Request payload for /chat.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Absent or blank is rejected with 400.
    #[serde(default)]
    pub user_question: Option<String>,
    /// Seeds a conversation the server has no history for.
    #[serde(default)]
    pub history: Option<Vec<ConversationTurn>>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Response payload for /chat.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub history: Vec<ConversationTurn>,
    /// Echoed or freshly generated; send it back to continue the conversation.
    pub conversation_id: String,
}
