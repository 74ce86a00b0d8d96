//! Note saves combined with version checkpoints

use crate::db::{Note, Store};
use crate::error::Result;

/// Save a note, then take a periodic snapshot of the saved content.
///
/// The snapshot is best effort: a failure is logged and the save stands.
pub fn save_note_with_checkpoint(
    store: &Store,
    id: &str,
    title: &str,
    path: &str,
    content: &str,
) -> Result<Note> {
    let note = store.save_note(id, title, path, content)?;
    match store.save_version(&note.id, content, false) {
        Ok(Some(v)) => tracing::debug!(note_id = %note.id, version_id = %v.id, "Checkpoint taken"),
        Ok(None) => {}
        Err(e) => tracing::warn!(note_id = %note.id, error = %e, "Checkpoint failed, note saved without it"),
    }
    Ok(note)
}

/// Write an old version back into its note.
///
/// The current content is checkpointed first with a forced snapshot, so the
/// restore itself can be undone. If that checkpoint fails nothing is changed.
pub fn restore_version(store: &Store, version_id: &str) -> Result<Note> {
    let version = store.get_version(version_id)?;
    let current = store.get_note_by_id(&version.note_id)?;

    store.save_version(&current.id, &current.content, true)?;
    let restored = store.save_note(&current.id, "", &current.path, &version.content)?;

    tracing::info!(note_id = %restored.id, version_id, "Restored version");
    Ok(restored)
}
