//! Conversation transcript (`dialogue_log.txt`).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::core::conversation::Conversation;

/// Write one `<role>: <content>` line per message, replacing any previous transcript.
pub fn write_transcript(path: &Path, conversation: &Conversation) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create transcript dir {}", parent.display()))?;
    }
    fs::write(path, conversation.render_transcript())
        .with_context(|| format!("write transcript {}", path.display()))?;
    info!(path = %path.display(), messages = conversation.len(), "transcript written");
    Ok(())
}
