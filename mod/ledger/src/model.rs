//! Ledger buffer model.
//!
//! A buffer is a map from item index to a running signed quantity. Three
//! instances exist: the AX stock buffer (credited by closed cutting cards,
//! debited by reorder rows) and two reorder-demand buffers, one per closing
//! origin. Missing indexes read as 0 and values may go negative; display
//! layers filter to positive rows via [`snapshot_rows`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A ledger buffer document: item index → signed quantity.
pub type LedgerMap = BTreeMap<String, i64>;

/// The three ledger buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerName {
    /// Stock buffer.
    Ax,
    /// Reorder demand raised by operator closes.
    DozOperator,
    /// Reorder demand raised by kitting closes.
    DozKitting,
}

impl LedgerName {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerName::Ax => "ax",
            LedgerName::DozOperator => "doz-operator",
            LedgerName::DozKitting => "doz-kitting",
        }
    }

    /// The KV key the buffer document lives under.
    pub fn storage_key(&self) -> &'static str {
        match self {
            LedgerName::Ax => "AX_buffer",
            LedgerName::DozOperator => "DOZ_operator",
            LedgerName::DozKitting => "DOZ_kitting",
        }
    }

    pub fn from_str(s: &str) -> Option<LedgerName> {
        match s {
            "ax" => Some(LedgerName::Ax),
            "doz-operator" => Some(LedgerName::DozOperator),
            "doz-kitting" => Some(LedgerName::DozKitting),
            _ => None,
        }
    }
}

/// Which domain is closing an order. Decides which buffers the close
/// reconciliation touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOrigin {
    Operator,
    Kitting,
}

/// One caller-supplied reorder row: extra material needed beyond what the
/// order's plan covered. Free-text input, cleaned before use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderRow {
    pub index: String,
    pub qty: i64,
}

/// A positive buffer row as handed to the export collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotRow {
    pub index: String,
    pub qty: i64,
}

/// Positive-rows view of a buffer, plus the total.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub rows: Vec<SnapshotRow>,
    pub total: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClearRequest {
    pub actor: String,
}

/// Drop rows with a blank index or non-positive quantity; trims indexes.
pub fn clean_reorder_rows(rows: &[ReorderRow]) -> Vec<ReorderRow> {
    rows.iter()
        .map(|r| ReorderRow {
            index: r.index.trim().to_string(),
            qty: r.qty,
        })
        .filter(|r| !r.index.is_empty() && r.qty > 0)
        .collect()
}

/// Sum rows by index. Rows with a blank (trimmed) index are excluded.
pub fn sum_by_index(rows: &[ReorderRow]) -> LedgerMap {
    let mut map = LedgerMap::new();
    for row in rows {
        let index = row.index.trim();
        if index.is_empty() {
            continue;
        }
        *map.entry(index.to_string()).or_insert(0) += row.qty;
    }
    map
}

/// Add `sign × qty` for every delta entry into the buffer. Missing keys
/// start at 0.
pub fn merge_into(buf: &mut LedgerMap, deltas: &LedgerMap, sign: i64) {
    for (index, qty) in deltas {
        *buf.entry(index.clone()).or_insert(0) += sign * qty;
    }
}

/// Positive rows only, sorted by index ascending. Raw values (including
/// negatives) stay in the buffer untouched.
pub fn snapshot_rows(buf: &LedgerMap) -> Vec<SnapshotRow> {
    buf.iter()
        .filter(|(_, qty)| **qty > 0)
        .map(|(index, qty)| SnapshotRow {
            index: index.clone(),
            qty: *qty,
        })
        .collect()
}
