// src/utils/html.rs

/// Sanitizes problem descriptions before they are stored.
///
/// Descriptions are rendered as rich text by the dashboard, so formatting tags
/// (<p>, <code>, <b>, lists) survive while scripts, frames and event-handler
/// attributes are stripped.
pub fn sanitize_description(input: &str) -> String {
    ammonia::clean(input)
}
