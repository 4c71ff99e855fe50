use serde::{Deserialize, Serialize};

/// Persona name used when none is given on the command line.
pub const DEFAULT_PERSONA: &str = "ku";

/// Alpaca-format training record (instruction/input/output plus history)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlpacaRecord {
    pub instruction: String,
    pub input: String,
    pub output: String,
    pub system: String,
    /// Prior (input, output) exchanges. Always empty for records built here.
    pub history: Vec<[String; 2]>,
}

/// ShareGPT-format training conversation (multi-turn transcript)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareGptConversation {
    pub id: String,
    pub conversations: Vec<Turn>,
}

/// A single turn in a ShareGPT conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub from: String,
    pub value: String,
}

impl Turn {
    pub fn new(role: Role, persona: &Persona, value: impl Into<String>) -> Self {
        Self {
            from: role.tag(persona).to_string(),
            value: value.into(),
        }
    }
}

/// Speaker role of a turn. Non-persona identities all collapse into `User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Persona,
}

impl Role {
    /// The `from` tag written to ShareGPT output.
    pub fn tag<'a>(&self, persona: &'a Persona) -> &'a str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Persona => persona.name(),
        }
    }
}

/// The fine-tuned chatbot identity whose rows become assistant output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    name: String,
}

impl Persona {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fixed framing text used as the Alpaca `instruction` and as the chat
    /// system prompt.
    pub fn instruction(&self) -> String {
        format!(
            "你是{0}。请根据提供的对话上下文和用户最新的发言，以{0}的身份和风格进行回应。",
            self.name
        )
    }

    /// Leading system turn of every ShareGPT conversation.
    pub fn system_prompt(&self) -> String {
        format!("你是{}。请根据对话内容自然回应。", self.name)
    }

    /// Case-insensitive match of a speaker cell against the persona name.
    pub fn is_named(&self, speaker: &str) -> bool {
        speaker.trim().to_lowercase() == self.name.to_lowercase()
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self::new(DEFAULT_PERSONA)
    }
}

/// One sheet of one workbook, fully read into memory.
#[derive(Debug, Clone, Default)]
pub struct ConversationSource {
    /// Workbook file name without extension
    pub file_stem: String,
    pub sheet_name: String,
    pub headers: Vec<String>,
    /// Data rows (header excluded), padded to `headers.len()`
    pub rows: Vec<Vec<Option<String>>>,
}

impl ConversationSource {
    /// Human-readable `file/sheet` identifier for diagnostics.
    pub fn sheet_id(&self) -> String {
        format!("{}/{}", self.file_stem, self.sheet_name)
    }

    /// True when every data cell of the column is absent.
    pub fn column_is_empty(&self, index: usize) -> bool {
        self.rows
            .iter()
            .all(|row| row.get(index).map_or(true, |cell| cell.is_none()))
    }

    /// Project every data row onto the resolved speaker/content columns.
    pub fn rows_for(&self, columns: ColumnPair) -> impl Iterator<Item = Row> + '_ {
        self.rows.iter().map(move |cells| Row {
            speaker: cells.get(columns.speaker).cloned().flatten(),
            content: cells.get(columns.content).cloned().flatten(),
        })
    }
}

/// A data row reduced to the two columns the converters read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub speaker: Option<String>,
    pub content: Option<String>,
}

impl Row {
    /// Trimmed message text, or `None` when the cell is absent or blank.
    pub fn message(&self) -> Option<&str> {
        self.content
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    /// Trimmed speaker, or `None` when absent or blank (the persona speaking).
    pub fn speaker_name(&self) -> Option<&str> {
        self.speaker
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Column indices chosen for speaker and content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnPair {
    pub speaker: usize,
    pub content: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_message_trims_and_drops_blank() {
        let row = Row {
            speaker: Some("  ".into()),
            content: Some("  你好 \n".into()),
        };
        assert_eq!(row.message(), Some("你好"));
        assert_eq!(row.speaker_name(), None);

        let blank = Row {
            speaker: Some("小明".into()),
            content: Some(" \t ".into()),
        };
        assert_eq!(blank.message(), None);
        assert_eq!(blank.speaker_name(), Some("小明"));
    }

    #[test]
    fn test_column_is_empty() {
        let source = ConversationSource {
            headers: vec!["time".into(), "X".into(), "Y".into()],
            rows: vec![
                vec![Some("1".into()), None, Some("a".into())],
                vec![Some("2".into()), None, None],
            ],
            ..Default::default()
        };
        assert!(!source.column_is_empty(0));
        assert!(source.column_is_empty(1));
        assert!(!source.column_is_empty(2));
    }

    #[test]
    fn test_persona_texts() {
        let persona = Persona::default();
        assert!(persona.instruction().starts_with("你是ku。"));
        assert_eq!(persona.system_prompt(), "你是ku。请根据对话内容自然回应。");
        assert!(persona.is_named("KU"));
        assert!(!persona.is_named("kumo"));
        assert_eq!(Role::Persona.tag(&persona), "ku");
    }
}
