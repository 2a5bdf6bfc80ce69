use crate::model::Record;

/// Case-insensitive substring match on `producto`.
///
/// Always pass the full snapshot: the result is a view, and narrowing an
/// already-filtered view would make query edits destructive.
pub fn search<'a>(records: &'a [Record], query: &str) -> Vec<&'a Record> {
    if query.is_empty() {
        return records.iter().collect();
    }
    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|r| matches_product(&r.product, &needle))
        .collect()
}

fn matches_product(product: &str, lowered_query: &str) -> bool {
    product.to_lowercase().contains(lowered_query)
}
