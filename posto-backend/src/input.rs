/// Parse a user-entered price
///
/// Accepts either `.` or `,` as the decimal separator. Returns `None` for
/// blank or non-numeric text. Sign is not checked here.
pub fn parse_price(text: &str) -> Option<f64> {
    let normalized = text.trim().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }

    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
