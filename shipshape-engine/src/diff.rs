use similar::TextDiff;

/// Renders a unified line diff from on-disk content to desired content,
/// for diagnostics only
pub(crate) fn unified(actual: &str, desired: &str) -> String {
    TextDiff::from_lines(actual, desired)
        .unified_diff()
        .header("on disk", "desired")
        .to_string()
}
