//! Reference collection command.
//!
//! # Usage
//!
//! ```bash
//! vip-cli references channels
//! ```

use std::io::Write;

use vip_admin_core::ReferenceKind;

use super::{CommandError, load_state};

/// Print every entry of a reference collection as `id, key, label`.
pub async fn print(kind: ReferenceKind) -> Result<(), CommandError> {
    let state = load_state()?;
    let client = state.commercetools()?;
    let locale = state.display().locale.clone();

    tracing::info!(%kind, cap = kind.page_cap(), "Loading reference collection...");
    let page = client.load_references(kind).await?;

    let mut out = std::io::stdout().lock();
    for entity in &page.results {
        writeln!(
            out,
            "{}\t{}\t{}",
            entity.id,
            entity.key.as_deref().unwrap_or("-"),
            entity.label(&locale)
        )?;
    }
    if page.is_truncated() {
        tracing::warn!(
            %kind,
            loaded = page.results.len(),
            total = page.total,
            "Collection exceeds the page cap; labels beyond it are not resolved"
        );
    }
    Ok(())
}
