use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in the user/assistant exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Everything the prompt builder needs for one model call.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub transcript: String,
    /// Prior turns, not including `new_message`.
    pub history: Vec<ConversationTurn>,
    pub new_message: String,
}

/// True when turns alternate user, assistant, user, ... starting with the user.
pub fn is_alternating(turns: &[ConversationTurn]) -> bool {
    turns.iter().enumerate().all(|(i, turn)| {
        let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
        turn.role == expected
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternation_check() {
        assert!(is_alternating(&[]));
        assert!(is_alternating(&[
            ConversationTurn::user("hi"),
            ConversationTurn::assistant("hello"),
            ConversationTurn::user("titles?"),
        ]));
        assert!(!is_alternating(&[ConversationTurn::assistant("hello")]));
        assert!(!is_alternating(&[
            ConversationTurn::user("a"),
            ConversationTurn::user("b"),
        ]));
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&ConversationTurn::assistant("ok")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"ok"}"#);
    }
}
