//! Writing a checkpoint's rollback payload back to the activity store.

use stride_core::errors::StrideResult;
use stride_core::models::Checkpoint;
use stride_core::traits::IActivityLoadStore;

/// Restore every record of `checkpoint` to its pre-batch fields. Returns the
/// number of records written.
pub(crate) fn restore_payload(
    activity: &dyn IActivityLoadStore,
    checkpoint: &Checkpoint,
) -> StrideResult<usize> {
    for entry in &checkpoint.rollback_payload {
        activity.write_enhanced_fields(checkpoint.user_id, entry.date, entry.fields.as_ref())?;
    }
    Ok(checkpoint.rollback_payload.len())
}
