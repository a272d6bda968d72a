use crate::extractor::ExtractedRecord;
use crate::sanitize::sanitize_component;

pub const UNKNOWN_WORK_ORDER: &str = "Unknown";
pub const UNTITLED_DESCRIPTION: &str = "Untitled";

/// Builds `{work_order}_{description}_{assignee}.pdf` for a record.
///
/// Missing fields fall back to fixed tokens, then each field is sanitized
/// on its own so the `_` separators are never touched.
pub fn document_filename(record: &ExtractedRecord) -> String {
    let work_order = sanitize_component(record.work_order.as_deref().unwrap_or(UNKNOWN_WORK_ORDER));
    let description =
        sanitize_component(record.description.as_deref().unwrap_or(UNTITLED_DESCRIPTION));
    let assignee = sanitize_component(record.assignee.as_str());

    format!("{}_{}_{}.pdf", work_order, description, assignee)
}

/// Filename used by the rename utility: `{work_order}.pdf`.
pub fn work_order_filename(work_order: &str) -> String {
    format!("{}.pdf", sanitize_component(work_order))
}
