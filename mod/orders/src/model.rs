use serde::{Deserialize, Serialize};

use shopfloor_ledger::{LedgerMap, ReorderRow};

// ---------------------------------------------------------------------------
// OrderStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a work order.
///
/// ```text
/// pool → taken → in_progress → done
/// ```
///
/// `done` is terminal: no transition leaves it, and nothing ever returns an
/// order to `pool`. Claiming moves pool → taken; starting moves
/// taken → in_progress (re-entry allowed); closing moves
/// taken|in_progress → done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pool,
    Taken,
    InProgress,
    Done,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pool => "pool",
            Self::Taken => "taken",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pool" => Some(Self::Pool),
            "taken" => Some(Self::Taken),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            _ => None,
        }
    }

    /// Whether the order has reached its terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Claimed but not yet closed.
    pub fn is_in_work(&self) -> bool {
        matches!(self, Self::Taken | Self::InProgress)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Order: a cutting card
// ---------------------------------------------------------------------------

/// One item row on a cutting card: the quantity is per plate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub index: String,
    #[serde(deserialize_with = "lenient_i64")]
    pub qty_per_card: i64,
}

/// Accept integer or fractional JSON numbers, truncating toward zero.
/// Legacy documents carry whatever the old free-text parser produced.
pub fn lenient_i64<'de, D>(de: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let f = f64::deserialize(de)?;
    Ok(f.trunc() as i64)
}

/// One transfer record: the order moved to `to` at `at`, handed over by `by`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub to: String,
    pub at: String,
    pub by: String,
}

/// A cutting card tracked through the operator pool.
///
/// Timestamps are RFC 3339, each set exactly once at its transition and
/// never cleared. `plates` keeps the literal entered value; arithmetic
/// floors it to 1 (see [`item_total`]). `board_format_id` is freely mutable
/// at any time regardless of status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,

    /// Generated card name (see `name::card_name`). Legacy documents call
    /// this field `fileName`.
    #[serde(default, alias = "fileName")]
    pub name: String,

    #[serde(default, deserialize_with = "lenient_i64")]
    pub plates: i64,

    #[serde(default)]
    pub items: Vec<OrderItem>,

    pub status: OrderStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    /// Display emphasis only: never affects scheduling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_format_id: Option<String>,

    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taken_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<String>,

    /// One-shot gate for the label collaborator: set together with
    /// `started_at` on the first start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub printed_at: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transfer_history: Vec<TransferRecord>,
}

/// Pieces produced by one item row: plates floored to 1, quantity clamped
/// to 0.
pub fn item_total(plates: i64, qty_per_card: i64) -> i64 {
    plates.max(1) * qty_per_card.max(0)
}

impl Order {
    /// Total pieces across all items.
    pub fn pieces_total(&self) -> i64 {
        self.items
            .iter()
            .map(|it| item_total(self.plates, it.qty_per_card))
            .sum()
    }

    /// AX credits raised when this card closes:
    /// `qty_per_card × max(1, plates)` per item, aggregated by index.
    pub fn ax_credits(&self) -> LedgerMap {
        let mult = self.plates.max(1);
        let mut map = LedgerMap::new();
        for it in &self.items {
            *map.entry(it.index.clone()).or_insert(0) += it.qty_per_card * mult;
        }
        map
    }
}

// ---------------------------------------------------------------------------
// API request / response types
// ---------------------------------------------------------------------------

/// Body for `POST /cards`: publish a new cutting card into the pool.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardRequest {
    /// Acting identity (constructor).
    pub actor: String,

    pub program: i64,
    pub location: String,
    pub plates: i64,

    /// Free-text item rows, one `INDEX QTY` pair per line.
    pub rows: String,

    #[serde(default)]
    pub priority: Option<i64>,

    #[serde(default)]
    pub board_format_id: Option<String>,
}

/// Query parameters for `GET /cards`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardListQuery {
    #[serde(default)]
    pub limit: Option<usize>,

    #[serde(default)]
    pub offset: Option<usize>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub assignee: Option<String>,

    #[serde(default)]
    pub q: Option<String>,
}

/// Body for `POST /cards/{id}/@claim`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    /// Identity of the operator claiming this card.
    pub assignee: String,
}

/// Body for `POST /cards/{id}/@start`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub assignee: String,
}

/// Body for `POST /cards/{id}/@close`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseRequest {
    pub assignee: String,

    /// Reorder rows raised at close time. Rows with a blank index or
    /// non-positive quantity are dropped, never rejected.
    #[serde(default)]
    pub rows: Vec<ReorderRow>,
}

/// Body for `POST /cards/{id}/@transfer`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Current holder handing the card over.
    pub assignee: String,
    /// New assignee.
    pub to: String,
}

/// Body for `PATCH /cards/{id}`. Absent fields stay unchanged; an empty
/// `boardFormatId` clears the reference.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCardRequest {
    pub actor: String,

    #[serde(default)]
    pub board_format_id: Option<String>,

    #[serde(default)]
    pub priority: Option<i64>,
}

/// Response for `POST /cards/{id}/@start`. `print_now` is true exactly once
/// per card: the caller should invoke the label collaborator when set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOutcome {
    #[serde(flatten)]
    pub order: Order,
    pub print_now: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
