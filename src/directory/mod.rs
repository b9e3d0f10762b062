pub mod postgrest;

use crate::core::{RecipientDirectory, RecipientSet};
use crate::error::NotifyError;
use tracing::{debug, info, instrument};

pub use postgrest::PostgrestDirectory;

/// Queries the directory and keeps every usable address.
///
/// Zero usable addresses is not an error; the caller decides what an empty
/// set means. Query failures propagate as `DirectoryUnavailable`.
#[instrument(skip_all)]
pub async fn resolve_recipients(
    directory: &dyn RecipientDirectory,
) -> Result<RecipientSet, NotifyError> {
    let records = directory.fetch_records().await?;
    let total = records.len();
    let recipients = RecipientSet::from_records(records);

    let dropped = total - recipients.len();
    if dropped > 0 {
        debug!(dropped, "Skipped directory records without a usable address");
    }
    if recipients.is_empty() {
        info!("No user profiles found to notify.");
    } else {
        info!("Found {} emails to notify", recipients.len());
    }
    Ok(recipients)
}
