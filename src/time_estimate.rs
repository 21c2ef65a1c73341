use log::warn;

/// Minutes used when the model's estimate cannot be read.
pub const FALLBACK_MINUTES: u64 = 10;

/// Pull a minute count out of a free-text model reply.
///
/// Every ASCII digit in the reply is concatenated in order and the result is
/// read as one integer. Separate numbers are NOT told apart: "Step 1: 5
/// minutes, step 2: 10 minutes" reads as 15210. Returns `None` when the reply
/// has no digits or the digit string does not fit in a `u64`.
pub fn extract_minutes(reply: &str) -> Option<u64> {
    let digits: String = reply.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Minutes from the outcome of the time-estimate call, or `fallback` when the
/// call failed or the reply is unreadable. Never an error.
pub fn minutes_or_fallback(reply: anyhow::Result<String>, fallback: u64) -> u64 {
    match reply {
        Ok(text) => extract_minutes(&text).unwrap_or_else(|| {
            warn!(
                "Could not read a cooking time from {:?}, using {} minutes",
                text, fallback
            );
            fallback
        }),
        Err(e) => {
            warn!("Cooking time estimate failed ({}), using {} minutes", e, fallback);
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_concatenates_digits_in_order() {
        assert_eq!(extract_minutes("45"), Some(45));
        assert_eq!(extract_minutes("About 25 minutes."), Some(25));
        assert_eq!(
            extract_minutes("Step 1: 5 minutes, step 2: 10 minutes"),
            Some(15210)
        );
        assert_eq!(extract_minutes("1 hour 30 min"), Some(130));
    }

    #[test]
    fn test_no_digits_is_none() {
        assert_eq!(extract_minutes(""), None);
        assert_eq!(extract_minutes("about half an hour"), None);
    }

    #[test]
    fn test_overflow_is_none() {
        assert_eq!(extract_minutes(&"9".repeat(40)), None);
    }

    #[test]
    fn test_fallback_on_failure_or_garbage() {
        assert_eq!(minutes_or_fallback(Ok("20 minutes".into()), 10), 20);
        assert_eq!(minutes_or_fallback(Ok("a while".into()), 10), 10);
        assert_eq!(
            minutes_or_fallback(Err(anyhow!("quota exceeded")), FALLBACK_MINUTES),
            10
        );
    }
}
