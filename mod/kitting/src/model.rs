use serde::{Deserialize, Serialize};

use shopfloor_ledger::ReorderRow;
use shopfloor_orders::model::lenient_i64;
use shopfloor_orders::{OrderStatus, TransferRecord};

/// Production locations kitting sub-orders are dispatched to.
pub const LOCATIONS: &[&str] = &["W", "P", "S", "A", "B"];

/// A kitting sub-order: one catalog model with a planned quantity, run
/// through the same pool → taken → in_progress → done lifecycle as cutting
/// cards. No per-plate item list and no print gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KittingOrder {
    pub id: String,

    /// Catalog model being kitted.
    pub sd_item: String,

    /// Planned quantity, clamped non-negative at publish.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub qty_plan: i64,

    pub location: String,

    pub status: OrderStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,

    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taken_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transfer_history: Vec<TransferRecord>,
}

// ---------------------------------------------------------------------------
// Bulk publishing
// ---------------------------------------------------------------------------

/// One aggregated row from a bulk publish request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRow {
    pub sd_item: String,
    pub qty_plan: i64,
}

/// Parse pasted `MODEL QTY` lines into publish rows.
///
/// Lines with a blank model are skipped and an unparsable quantity counts
/// as 0. Duplicate models are summed, the result is sorted by model, and
/// totals are clamped non-negative.
pub fn parse_bulk(text: &str) -> Vec<BulkRow> {
    let mut rows: Vec<BulkRow> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut tokens = line
            .split(|c: char| c.is_whitespace() || c == ',' || c == ';' || c == '|')
            .filter(|t| !t.is_empty());
        let Some(sd_item) = tokens.next() else { continue };
        let qty = tokens.next().map(parse_qty).unwrap_or(0);
        match rows.iter_mut().find(|r| r.sd_item == sd_item) {
            Some(existing) => existing.qty_plan += qty,
            None => rows.push(BulkRow { sd_item: sd_item.to_string(), qty_plan: qty }),
        }
    }
    rows.sort_by(|a, b| a.sd_item.cmp(&b.sd_item));
    for row in &mut rows {
        row.qty_plan = row.qty_plan.max(0);
    }
    rows
}

fn parse_qty(token: &str) -> i64 {
    if let Ok(n) = token.parse::<i64>() {
        return n;
    }
    if let Ok(f) = token.parse::<f64>() {
        if f.is_finite() {
            return f.trunc() as i64;
        }
    }
    0
}

// ---------------------------------------------------------------------------
// API request types
// ---------------------------------------------------------------------------

/// Body for `POST /orders`: publish a batch of sub-orders into the pool.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub actor: String,
    pub location: String,

    /// Free-text rows, one `MODEL QTY` pair per line.
    pub rows: String,

    /// Applied to every order in the batch.
    #[serde(default)]
    pub priority: Option<i64>,
}

/// Query parameters for `GET /orders`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KitListQuery {
    #[serde(default)]
    pub limit: Option<usize>,

    #[serde(default)]
    pub offset: Option<usize>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub assignee: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub q: Option<String>,
}

/// Body for `POST /orders/{id}/@close`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KitCloseRequest {
    pub assignee: String,

    /// Reorder rows for the constructor's kitting buffer.
    #[serde(default)]
    pub rows: Vec<ReorderRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_rows_aggregate_sort_and_clamp() {
        let rows = parse_bulk("SD-200 4\nSD-100 2\nSD-200 1\nSD-300 -5\n\nSD-400");
        let got: Vec<(&str, i64)> =
            rows.iter().map(|r| (r.sd_item.as_str(), r.qty_plan)).collect();
        assert_eq!(
            got,
            vec![("SD-100", 2), ("SD-200", 5), ("SD-300", 0), ("SD-400", 0)]
        );
    }

    #[test]
    fn bulk_accepts_mixed_separators() {
        let rows = parse_bulk("A,3\nB;2\nC|1\nD\t4");
        let got: Vec<(&str, i64)> =
            rows.iter().map(|r| (r.sd_item.as_str(), r.qty_plan)).collect();
        assert_eq!(got, vec![("A", 3), ("B", 2), ("C", 1), ("D", 4)]);
    }

    #[test]
    fn negative_sums_clamp_after_aggregation() {
        // -3 and +5 for the same model net out before the clamp.
        let rows = parse_bulk("X -3\nX 5");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].qty_plan, 2);
    }

    #[test]
    fn empty_bulk_text_yields_nothing() {
        assert!(parse_bulk("").is_empty());
        assert!(parse_bulk("  \n \n").is_empty());
    }

    #[test]
    fn kitting_order_json_shape() {
        let order = KittingOrder {
            id: "k1".into(),
            sd_item: "SD-118".into(),
            qty_plan: 12,
            location: "W".into(),
            status: OrderStatus::Pool,
            assignee: None,
            priority: Some(0),
            created_at: "2026-08-25T09:00:00Z".into(),
            taken_at: None,
            started_at: None,
            closed_at: None,
            transfer_history: vec![],
        };
        let json = serde_json::to_string(&order).unwrap();
        let back: KittingOrder = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sd_item, "SD-118");
        assert_eq!(back.status, OrderStatus::Pool);
        assert!(json.contains("\"sdItem\""));
        assert!(json.contains("\"qtyPlan\""));
        assert!(!json.contains("\"assignee\""));
        assert!(!json.contains("\"transferHistory\""));
    }

    #[test]
    fn legacy_kitting_document_is_accepted() {
        let json = r#"{"id":"K_1738000000_zz99","sdItem":"SD-204","qtyPlan":6.5,
            "location":"P","status":"taken","assignee":"kitt-01",
            "createdAt":"2026-02-12T10:00:00.000Z","takenAt":"2026-02-12T10:05:00.000Z"}"#;
        let order: KittingOrder = serde_json::from_str(json).unwrap();
        assert_eq!(order.qty_plan, 6);
        assert_eq!(order.status, OrderStatus::Taken);
        assert_eq!(order.assignee.as_deref(), Some("kitt-01"));
    }
}
