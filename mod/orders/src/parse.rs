use crate::model::OrderItem;

/// Parse pasted `INDEX QTY` rows into aggregated order items.
///
/// One row per line; the index and quantity may be separated by whitespace,
/// commas, semicolons or pipes. Trailing tokens are ignored. A missing or
/// unparsable quantity counts as 0. Duplicate indexes are summed, keeping
/// first-seen order, and rows that end up with a non-positive quantity are
/// dropped.
pub fn parse_rows(text: &str) -> Vec<OrderItem> {
    let mut items: Vec<OrderItem> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut tokens = line
            .split(|c: char| c.is_whitespace() || c == ',' || c == ';' || c == '|')
            .filter(|t| !t.is_empty());
        let Some(index) = tokens.next() else { continue };
        let qty = tokens.next().map(parse_qty).unwrap_or(0);
        match items.iter_mut().find(|it| it.index == index) {
            Some(existing) => existing.qty_per_card += qty,
            None => items.push(OrderItem { index: index.to_string(), qty_per_card: qty }),
        }
    }
    items.retain(|it| it.qty_per_card > 0);
    items
}

/// Best-effort integer parse: plain integers first, then truncated decimals,
/// anything else is 0.
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
