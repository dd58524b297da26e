//! Display classification for stream-level error messages

/// Prefix marking errors caused by usage limits
pub const QUOTA_BANNER: &str = "⚠️ Usage limit reached: ";

const QUOTA_TERMS: [&str; 4] = ["credit", "limit", "quota", "rate limit"];

/// Check if an error message talks about credits, quotas or rate limits
pub fn is_quota_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    QUOTA_TERMS.iter().any(|term| lower.contains(term))
}

/// Content shown in the transcript and stored as the sticky error
pub fn classify_stream_error(message: &str) -> String {
    if is_quota_error(message) {
        format!("{}{}", QUOTA_BANNER, message)
    } else {
        message.to_string()
    }
}
