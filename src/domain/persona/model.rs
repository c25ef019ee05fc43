use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A voice identity an operator can assign to a script speaker.
///
/// Created and edited through persona management elsewhere; the synthesis
/// pipeline only ever reads these rows.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Persona {
    pub persona_id: i32,
    pub name: String,
    pub voice_model_identifier: Option<String>,
    pub language_support: Vec<String>,
    pub is_active: bool,
}

impl Persona {
    /// A persona is usable for synthesis only when it carries a non-empty
    /// provider voice identifier.
    pub fn voice_id(&self) -> Option<&str> {
        self.voice_model_identifier
            .as_deref()
            .filter(|v| !v.is_empty())
    }

    pub fn supports_language(&self, language_code: &str) -> bool {
        self.language_support
            .iter()
            .any(|l| l.eq_ignore_ascii_case(language_code))
    }
}
