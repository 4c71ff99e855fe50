use tracing::debug;

use super::SheetConverter;
use crate::types::{AlpacaRecord, ColumnPair, ConversationSource, Persona};

/// Pairs buffered user lines with the persona reply that follows them.
///
/// Every non-blank speaker counts as the user side here, including one that
/// spells out the persona name. Persona rows with nothing buffered before
/// them produce no record, and user lines left at the end of a sheet are
/// dropped.
pub struct AlpacaConverter {
    instruction: String,
}

impl AlpacaConverter {
    pub fn new(persona: &Persona) -> Self {
        Self {
            instruction: persona.instruction(),
        }
    }
}

impl SheetConverter for AlpacaConverter {
    type Record = AlpacaRecord;

    fn label(&self) -> &'static str {
        "alpaca"
    }

    fn convert(&self, source: &ConversationSource, columns: ColumnPair) -> Vec<AlpacaRecord> {
        let mut records = Vec::new();
        let mut pending: Vec<String> = Vec::new();
        let mut unanswered_replies = 0usize;

        for row in source.rows_for(columns) {
            let Some(message) = row.message() else {
                continue;
            };

            if row.speaker_name().is_some() {
                pending.push(message.to_string());
                continue;
            }

            if pending.is_empty() {
                unanswered_replies += 1;
                continue;
            }

            records.push(AlpacaRecord {
                instruction: self.instruction.clone(),
                input: pending.join("\n"),
                output: message.to_string(),
                system: String::new(),
                history: Vec::new(),
            });
            pending.clear();
        }

        debug!(
            sheet = %source.sheet_id(),
            records = records.len(),
            persona_lines_without_input = unanswered_replies,
            trailing_user_lines = pending.len(),
            "[alpaca] converted sheet"
        );

        records
    }
}
