pub mod alpaca;
pub mod sharegpt;

use serde::Serialize;

use crate::types::{ColumnPair, ConversationSource};

/// Turns one resolved sheet into training records of a single schema.
pub trait SheetConverter {
    type Record: Serialize;

    /// Short name used as the log target prefix and in the run summary.
    fn label(&self) -> &'static str;

    fn convert(&self, source: &ConversationSource, columns: ColumnPair) -> Vec<Self::Record>;
}
