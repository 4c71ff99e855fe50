use thiserror::Error;
use tracing::warn;

use crate::types::{ColumnPair, ConversationSource};

/// Which rule picked the speaker/content columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// `发送人` + `内容`
    Primary,
    /// `Speaker` + `Content`
    English,
    /// `发言人` + `内容`, the header wording of older exports
    AlternateLocalized,
    /// Columns 1 and 2 by position
    Positional,
}

impl Tier {
    pub fn label(&self) -> &'static str {
        match self {
            Tier::Primary => "primary",
            Tier::English => "english",
            Tier::AlternateLocalized => "alternate-localized",
            Tier::Positional => "positional",
        }
    }
}

/// Named header pairs, tested in order. First match wins.
const NAMED_TIERS: &[(Tier, &str, &str)] = &[
    (Tier::Primary, "发送人", "内容"),
    (Tier::English, "Speaker", "Content"),
    (Tier::AlternateLocalized, "发言人", "内容"),
];

/// Positional fallback needs at least this many columns.
const POSITIONAL_MIN_COLUMNS: usize = 3;
const POSITIONAL_SPEAKER: usize = 1;
const POSITIONAL_CONTENT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub columns: ColumnPair,
    pub tier: Tier,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no speaker/content header pair matched and fewer than 3 columns exist; headers: {headers:?}")]
    NoMatch { headers: Vec<String> },

    #[error("positional columns 1 and 2 cannot be used because one is entirely empty; headers: {headers:?}")]
    PositionalEmpty { headers: Vec<String> },
}

/// Choose speaker and content columns from a header row.
///
/// `column_is_empty(i)` reports whether column `i` has no value in any data
/// row; it is only consulted for the positional fallback.
pub fn resolve<F>(headers: &[String], column_is_empty: F) -> Result<Resolution, ResolveError>
where
    F: Fn(usize) -> bool,
{
    for &(tier, speaker, content) in NAMED_TIERS {
        if let (Some(s), Some(c)) = (position(headers, speaker), position(headers, content)) {
            return Ok(Resolution {
                columns: ColumnPair {
                    speaker: s,
                    content: c,
                },
                tier,
            });
        }
    }

    if headers.len() < POSITIONAL_MIN_COLUMNS {
        return Err(ResolveError::NoMatch {
            headers: headers.to_vec(),
        });
    }

    if column_is_empty(POSITIONAL_SPEAKER) || column_is_empty(POSITIONAL_CONTENT) {
        return Err(ResolveError::PositionalEmpty {
            headers: headers.to_vec(),
        });
    }

    Ok(Resolution {
        columns: ColumnPair {
            speaker: POSITIONAL_SPEAKER,
            content: POSITIONAL_CONTENT,
        },
        tier: Tier::Positional,
    })
}

/// Resolve columns for a loaded sheet, warning whenever a fallback tier is used.
pub fn resolve_source(source: &ConversationSource) -> Result<ColumnPair, ResolveError> {
    let resolution = resolve(&source.headers, |i| source.column_is_empty(i))?;

    if resolution.tier != Tier::Primary {
        warn!(
            sheet = %source.sheet_id(),
            tier = resolution.tier.label(),
            headers = ?source.headers,
            "primary headers not found, using fallback columns"
        );
    }

    Ok(resolution.columns)
}

fn position(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}
