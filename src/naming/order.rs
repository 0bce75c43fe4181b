//! Order identifier simplification.

/// Length kept from the short-id half of a `"<date>-<short-id>"` order id.
const SHORT_SEGMENT_LEN: usize = 6;

/// Maximum length of any other order id.
const MAX_ORDER_LEN: usize = 8;

/// Reduce an order identifier to a short token for use in filenames.
///
/// - `"<date>-<token>"` with a token of at least 6 characters keeps the first
///   6 characters of the token (`"20250609-fca939e7"` → `"fca939"`).
///   The token is the segment between the first and second hyphen.
/// - Anything longer than 8 characters is truncated to 8.
/// - Everything else is returned unchanged.
///
/// Lengths are counted in characters, never bytes.
pub fn simplify_order_id(order_id: &str) -> String {
    if let Some(segment) = order_id.split('-').nth(1) {
        if segment.chars().count() >= SHORT_SEGMENT_LEN {
            return segment.chars().take(SHORT_SEGMENT_LEN).collect();
        }
    }

    if order_id.chars().count() > MAX_ORDER_LEN {
        return order_id.chars().take(MAX_ORDER_LEN).collect();
    }

    order_id.to_string()
}
