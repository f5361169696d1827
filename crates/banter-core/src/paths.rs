//! Mutation path classification.
//!
//! Category checks are deliberately loose, keyed on marker segments, so the
//! dispatcher can route an op before committing to a shape. Extraction is
//! strict: every captured segment must be a numeric ID, and a path that
//! matches a category but fails extraction is a parse error, not a skip.

use crate::error::ClientError;

pub fn is_id(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

pub fn is_admin_path(path: &str) -> bool {
    segments(path).contains(&"admin_user_ids")
}

pub fn extract_admin_path(path: &str) -> Result<(String, String), ClientError> {
    match segments(path).as_slice() {
        ["direct_v2", "threads", thread, "admin_user_ids", user]
            if is_id(thread) && is_id(user) =>
        {
            Ok((thread.to_string(), user.to_string()))
        }
        _ => Err(ClientError::Parse(format!("admin path {path}"))),
    }
}

pub fn is_message_path(path: &str) -> bool {
    let segs = segments(path);
    segs.contains(&"threads") && segs.contains(&"items")
}

pub fn extract_message_path(path: &str) -> Result<(String, String), ClientError> {
    match segments(path).as_slice() {
        ["direct_v2", "threads", thread, "items", item] if is_id(thread) && is_id(item) => {
            Ok((thread.to_string(), item.to_string()))
        }
        _ => Err(ClientError::Parse(format!("item path {path}"))),
    }
}

pub fn is_inbox_thread_path(path: &str) -> bool {
    let segs = segments(path);
    segs.contains(&"inbox") && segs.contains(&"threads")
}

pub fn extract_inbox_thread_path(path: &str) -> Result<String, ClientError> {
    match segments(path).as_slice() {
        ["direct_v2", "inbox", "threads", thread, ..] if is_id(thread) => Ok(thread.to_string()),
        _ => Err(ClientError::Parse(format!("inbox path {path}"))),
    }
}

/// Thread ID for item add and remove ops. These arrive on item paths but
/// are indexed positionally since the trailing item segment is not always
/// present.
pub fn extract_thread_from_item_path(path: &str) -> Result<String, ClientError> {
    let parts: Vec<&str> = path.split('/').collect();
    match (parts.get(1), parts.get(2), parts.get(3)) {
        (Some(&"direct_v2"), Some(&"threads"), Some(thread)) if is_id(thread) => {
            Ok(thread.to_string())
        }
        _ => Err(ClientError::Parse(format!("thread path {path}"))),
    }
}
