//! Pure aggregation over order-collection snapshots.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use shopfloor_core::ServiceError;
use shopfloor_directory::BoardFormat;
use shopfloor_kitting::KittingOrder;
use shopfloor_ledger::LedgerMap;
use shopfloor_orders::{Order, OrderStatus};

/// Bucket id for closed cards that never picked a board format.
pub const NO_BOARD_ID: &str = "__none__";
pub const NO_BOARD_NAME: &str = "(not set)";

/// Inclusive closed-at filter. Either bound may be absent, which leaves
/// that side unbounded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl ReportRange {
    /// Parse optional bounds. Each accepts RFC 3339 or a bare `YYYY-MM-DD`
    /// date, which is taken as midnight UTC. Blank strings count as absent.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self, ServiceError> {
        Ok(Self { from: parse_bound(from)?, to: parse_bound(to)? })
    }

    /// Whether a closed-at timestamp falls inside the range. Orders without
    /// a usable timestamp only pass when the range is fully unbounded.
    pub fn contains(&self, at: Option<&str>) -> bool {
        if self.from.is_none() && self.to.is_none() {
            return at.is_some_and(|s| !s.is_empty());
        }
        let Some(t) = at.and_then(|s| DateTime::parse_from_rfc3339(s).ok()) else {
            return false;
        };
        let t = t.with_timezone(&Utc);
        if self.from.is_some_and(|from| t < from) {
            return false;
        }
        if self.to.is_some_and(|to| t > to) {
            return false;
        }
        true
    }
}

fn parse_bound(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, ServiceError> {
    let Some(s) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| ServiceError::Validation(format!("unparsable date bound '{}'", s)))?;
    Ok(Some(date.and_time(NaiveTime::MIN).and_utc()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub ops_in_work: usize,
    pub ops_done: usize,
    pub kit_in_work: usize,
    pub kit_done: usize,
    /// AX stock minus outstanding kitting demand, summed over every index.
    pub stock_balance: i64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct OperatorRow {
    pub assignee: String,
    pub cards: usize,
    pub pieces: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorsReport {
    pub rows: Vec<OperatorRow>,
    pub total_cards: usize,
    pub total_pieces: i64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct KittingRow {
    pub assignee: String,
    pub orders: usize,
    pub qty: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KittingReport {
    pub rows: Vec<KittingRow>,
    pub total_orders: usize,
    pub total_qty: i64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct BoardRow {
    pub id: String,
    pub name: String,
    pub plates: i64,
}

#[derive(Debug, Serialize)]
pub struct BoardReport {
    pub rows: Vec<BoardRow>,
    pub total: i64,
}

pub fn overview(
    orders: &[Order],
    kits: &[KittingOrder],
    ax: &LedgerMap,
    doz_kitting: &LedgerMap,
) -> Overview {
    let in_work = |s: &OrderStatus| s.is_in_work();
    let keys: BTreeSet<&String> = ax.keys().chain(doz_kitting.keys()).collect();
    let stock_balance = keys
        .into_iter()
        .map(|k| ax.get(k).copied().unwrap_or(0) - doz_kitting.get(k).copied().unwrap_or(0))
        .sum();
    Overview {
        ops_in_work: orders.iter().filter(|o| in_work(&o.status)).count(),
        ops_done: orders.iter().filter(|o| o.status == OrderStatus::Done).count(),
        kit_in_work: kits.iter().filter(|o| in_work(&o.status)).count(),
        kit_done: kits.iter().filter(|o| o.status == OrderStatus::Done).count(),
        stock_balance,
    }
}

/// Closed cutting cards grouped by assignee.
pub fn operators_report(orders: &[Order], range: &ReportRange) -> OperatorsReport {
    let closed: Vec<&Order> = orders
        .iter()
        .filter(|o| o.status == OrderStatus::Done && range.contains(o.closed_at.as_deref()))
        .collect();

    let mut groups: BTreeMap<String, (usize, i64)> = BTreeMap::new();
    for order in &closed {
        let name = order.assignee.clone().unwrap_or_else(|| "—".to_string());
        let entry = groups.entry(name).or_default();
        entry.0 += 1;
        entry.1 += order.pieces_total();
    }

    let mut rows: Vec<OperatorRow> = groups
        .into_iter()
        .map(|(assignee, (cards, pieces))| OperatorRow { assignee, cards, pieces })
        .collect();
    rows.sort_by(|a, b| {
        b.pieces
            .cmp(&a.pieces)
            .then(b.cards.cmp(&a.cards))
            .then(a.assignee.cmp(&b.assignee))
    });
    let total_pieces = rows.iter().map(|r| r.pieces).sum();
    OperatorsReport { rows, total_cards: closed.len(), total_pieces }
}

/// Closed kitting sub-orders grouped by assignee.
pub fn kitting_report(kits: &[KittingOrder], range: &ReportRange) -> KittingReport {
    let closed: Vec<&KittingOrder> = kits
        .iter()
        .filter(|o| o.status == OrderStatus::Done && range.contains(o.closed_at.as_deref()))
        .collect();

    let mut groups: BTreeMap<String, (usize, i64)> = BTreeMap::new();
    for order in &closed {
        let name = order.assignee.clone().unwrap_or_else(|| "—".to_string());
        let entry = groups.entry(name).or_default();
        entry.0 += 1;
        entry.1 += order.qty_plan.max(0);
    }

    let mut rows: Vec<KittingRow> = groups
        .into_iter()
        .map(|(assignee, (orders, qty))| KittingRow { assignee, orders, qty })
        .collect();
    rows.sort_by(|a, b| {
        b.qty
            .cmp(&a.qty)
            .then(b.orders.cmp(&a.orders))
            .then(a.assignee.cmp(&b.assignee))
    });
    let total_qty = rows.iter().map(|r| r.qty).sum();
    KittingReport { rows, total_orders: closed.len(), total_qty }
}

/// Plates consumed per board format over closed cutting cards. Cards with
/// no board reference land in the sentinel bucket; ids missing from the
/// catalog keep the raw id as their display name.
pub fn board_report(orders: &[Order], boards: &[BoardFormat], range: &ReportRange) -> BoardReport {
    let mut agg: BTreeMap<String, i64> = BTreeMap::new();
    for order in orders
        .iter()
        .filter(|o| o.status == OrderStatus::Done && range.contains(o.closed_at.as_deref()))
    {
        let key = order
            .board_format_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| NO_BOARD_ID.to_string());
        *agg.entry(key).or_default() += order.plates.max(0);
    }

    let name_of = |id: &str| -> String {
        if id == NO_BOARD_ID {
            return NO_BOARD_NAME.to_string();
        }
        boards
            .iter()
            .find(|b| b.id == id)
            .map(|b| b.name.clone())
            .unwrap_or_else(|| id.to_string())
    };

    let mut rows: Vec<BoardRow> = agg
        .into_iter()
        .map(|(id, plates)| BoardRow { name: name_of(&id), id, plates })
        .collect();
    rows.sort_by(|a, b| b.plates.cmp(&a.plates).then(a.name.cmp(&b.name)));
    let total = rows.iter().map(|r| r.plates).sum();
    BoardReport { rows, total }
}
