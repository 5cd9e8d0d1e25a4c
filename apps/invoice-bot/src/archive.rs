//! # Invoice Archive
//!
//! Every issued document is kept on disk under
//! `{output_dir}/{user_id}/{invoice_number}_{customer_name}.txt`.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;

use crate::error::BotResult;
use invoice_core::UserId;

/// Where the document for `number` is archived.
pub fn archive_path(output_dir: &Path, user_id: &UserId, number: &str, customer_name: &str) -> PathBuf {
    output_dir
        .join(sanitize(user_id.as_str()))
        .join(format!("{}_{}.txt", sanitize(number), sanitize(customer_name)))
}

/// Writes `contents` to its archive path, creating directories as needed.
pub async fn write_document(path: &Path, contents: &str) -> BotResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, contents).await?;

    info!(path = %path.display(), bytes = contents.len(), "Invoice archived");
    Ok(())
}

/// Keeps a path component inside its directory.
fn sanitize(component: &str) -> String {
    let cleaned: String = component
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
