//! Maps raw activities to normalized change records.

use crate::harvest::traits::InvariantViolation;
use crate::model::{Activity, ActivityType, ChangeRecord, UpdatedResource};

/// Whether an activity of this type means the resource is gone.
fn is_deletion(kind: ActivityType) -> Result<bool, InvariantViolation> {
    match kind {
        ActivityType::Add | ActivityType::Create | ActivityType::Update | ActivityType::Move => {
            Ok(false)
        }
        ActivityType::Delete | ActivityType::Remove => Ok(true),
        ActivityType::Refresh => Err(InvariantViolation::UnresolvedRefresh),
    }
}

/// Identifier of the resource that changed. A move changes the resource at
/// its new location, so the target wins over the object.
fn changed_identifier(activity: &Activity) -> Result<String, InvariantViolation> {
    let identifier = if activity.kind == ActivityType::Move {
        let target = activity.target.clone().ok_or_else(|| {
            InvariantViolation::Unvalidated("Move activity without target".to_string())
        })?;
        serde_json::from_value::<UpdatedResource>(target)
            .map_err(|e| InvariantViolation::Unvalidated(format!("unreadable target: {e}")))?
            .id
    } else {
        activity
            .object
            .as_ref()
            .map(|object| object.id.clone())
            .ok_or_else(|| {
                InvariantViolation::Unvalidated(format!(
                    "{:?} activity without object",
                    activity.kind
                ))
            })?
    };

    if identifier.is_empty() {
        return Err(InvariantViolation::Unvalidated(format!(
            "{:?} activity with empty identifier",
            activity.kind
        )));
    }
    Ok(identifier)
}

/// Classifies one activity.
///
/// # Errors
///
/// Returns [`InvariantViolation`] for `Refresh` activities and for
/// activities lacking the identifier their type requires. Both mean the
/// crawler skipped its own resolution or validation step.
pub fn classify(activity: &Activity) -> Result<ChangeRecord, InvariantViolation> {
    let deleted = is_deletion(activity.kind)?;
    let identifier = changed_identifier(activity)?;
    Ok(ChangeRecord::new(identifier, activity.end_time, deleted))
}
