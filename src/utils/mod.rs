use chrono::NaiveDate;

pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}', expected YYYY-MM-DD", value.trim()))
}

pub fn parse_quantity(value: &str) -> Result<i64, String> {
    let n: i64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid quantity '{}', expected an integer", value.trim()))?;
    if n < 0 {
        return Err(format!("invalid quantity {n}, expected a non-negative integer"));
    }
    Ok(n)
}

/// Generation date stamped on exports, in UTC like the file names.
pub fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}
