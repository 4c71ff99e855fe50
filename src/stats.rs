use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::types::{AlpacaRecord, ShareGptConversation};

/// Statistics for an Alpaca dataset
#[derive(Debug, Default, PartialEq)]
pub struct AlpacaStats {
    pub total_records: usize,
    pub avg_output_chars: f64,
    pub min_output_chars: usize,
    pub max_output_chars: usize,
}

/// Statistics for a ShareGPT dataset
#[derive(Debug, Default, PartialEq)]
pub struct ShareGptStats {
    pub total_conversations: usize,
    pub total_turns: usize,
    pub avg_turns: f64,
    pub role_counts: BTreeMap<String, usize>,
}

#[derive(Debug, PartialEq)]
pub enum DatasetStats {
    Alpaca(AlpacaStats),
    ShareGpt(ShareGptStats),
}

/// Load a produced dataset file and compute its statistics.
pub fn file_stats(path: &Path) -> Result<DatasetStats> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    dataset_stats(value).with_context(|| format!("inspecting {}", path.display()))
}

fn dataset_stats(value: Value) -> Result<DatasetStats> {
    let Value::Array(items) = &value else {
        bail!("dataset is not a JSON array");
    };

    let Some(first) = items.first() else {
        return Ok(DatasetStats::Alpaca(AlpacaStats::default()));
    };
    let is_sharegpt = first.get("conversations").is_some();
    let is_alpaca = first.get("output").is_some();

    if is_sharegpt {
        let convos: Vec<ShareGptConversation> =
            serde_json::from_value(value).context("parsing ShareGPT records")?;
        Ok(DatasetStats::ShareGpt(sharegpt_stats(&convos)))
    } else if is_alpaca {
        let records: Vec<AlpacaRecord> =
            serde_json::from_value(value).context("parsing Alpaca records")?;
        Ok(DatasetStats::Alpaca(alpaca_stats(&records)))
    } else {
        bail!("records match neither the Alpaca nor the ShareGPT schema");
    }
}

pub fn alpaca_stats(records: &[AlpacaRecord]) -> AlpacaStats {
    if records.is_empty() {
        return AlpacaStats::default();
    }

    let lengths: Vec<usize> = records.iter().map(|r| r.output.chars().count()).collect();
    let total: usize = lengths.iter().sum();

    AlpacaStats {
        total_records: records.len(),
        avg_output_chars: total as f64 / records.len() as f64,
        min_output_chars: lengths.iter().copied().min().unwrap_or(0),
        max_output_chars: lengths.iter().copied().max().unwrap_or(0),
    }
}

pub fn sharegpt_stats(convos: &[ShareGptConversation]) -> ShareGptStats {
    let mut stats = ShareGptStats {
        total_conversations: convos.len(),
        ..Default::default()
    };

    for turn in convos.iter().flat_map(|c| &c.conversations) {
        stats.total_turns += 1;
        *stats.role_counts.entry(turn.from.clone()).or_insert(0) += 1;
    }

    if !convos.is_empty() {
        stats.avg_turns = stats.total_turns as f64 / convos.len() as f64;
    }
    stats
}

/// Print statistics to stdout.
pub fn print_stats(stats: &DatasetStats) {
    println!("=== Dataset Statistics ===");
    match stats {
        DatasetStats::Alpaca(s) => {
            println!("Format: alpaca");
            println!("Total records: {}", s.total_records);
            println!("Avg output length: {:.0} chars", s.avg_output_chars);
            println!(
                "Output range: {} - {} chars",
                s.min_output_chars, s.max_output_chars
            );
        }
        DatasetStats::ShareGpt(s) => {
            println!("Format: sharegpt");
            println!("Total conversations: {}", s.total_conversations);
            println!("Total turns: {}", s.total_turns);
            println!("Avg turns per conversation: {:.1}", s.avg_turns);
            println!("\nPer-role counts:");
            for (role, count) in &s.role_counts {
                println!("  {}: {}", role, count);
            }
        }
    }
    println!("==========================");
}
