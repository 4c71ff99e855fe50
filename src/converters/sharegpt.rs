use tracing::{debug, warn};

use super::SheetConverter;
use crate::types::{ColumnPair, ConversationSource, Persona, Role, ShareGptConversation, Turn};

/// Suffix appended to the workbook name to form a conversation id.
const ID_SUFFIX: &str = "_chat_log";

/// Turns a whole sheet into one role-tagged transcript.
///
/// Blank speakers and speakers named like the persona become persona turns.
/// Every other speaker is written as `user`.
pub struct ShareGptConverter {
    persona: Persona,
}

impl ShareGptConverter {
    pub fn new(persona: &Persona) -> Self {
        Self {
            persona: persona.clone(),
        }
    }

    fn classify(&self, speaker: Option<&str>) -> Role {
        match speaker {
            None => Role::Persona,
            Some(name) if self.persona.is_named(name) => Role::Persona,
            Some(_) => Role::User,
        }
    }
}

impl SheetConverter for ShareGptConverter {
    type Record = ShareGptConversation;

    fn label(&self) -> &'static str {
        "sharegpt"
    }

    fn convert(&self, source: &ConversationSource, columns: ColumnPair) -> Vec<ShareGptConversation> {
        let mut turns = vec![Turn::new(
            Role::System,
            &self.persona,
            self.persona.system_prompt(),
        )];

        for row in source.rows_for(columns) {
            let Some(message) = row.message() else {
                continue;
            };
            let role = self.classify(row.speaker_name());
            turns.push(Turn::new(role, &self.persona, message));
        }

        if turns.len() == 1 {
            warn!(
                sheet = %source.sheet_id(),
                "[sharegpt] no messages after system prompt, skipping sheet"
            );
            return Vec::new();
        }

        debug!(
            sheet = %source.sheet_id(),
            turns = turns.len() - 1,
            "[sharegpt] converted sheet"
        );

        vec![ShareGptConversation {
            id: format!("{}{}", source.file_stem, ID_SUFFIX),
            conversations: turns,
        }]
    }
}
