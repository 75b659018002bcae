//! Owner-based authorization.
//!
//! A resource is readable and mutable only by the subject recorded as its
//! owner. There is no admin override and no sharing.

use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Denied,
}

/// Anything carrying a recorded owner.
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

pub fn authorize(subject: Uuid, owner_id: Uuid) -> Access {
    if subject == owner_id {
        Access::Allowed
    } else {
        Access::Denied
    }
}

/// Resolves a lookup result into the resource, keeping "missing" and
/// "someone else's" apart.
pub fn ensure_owner<R: Owned>(
    subject: Uuid,
    resource: Option<R>,
    kind: &'static str,
) -> Result<R, AppError> {
    let resource = resource.ok_or(AppError::NotFound(kind))?;
    match authorize(subject, resource.owner_id()) {
        Access::Allowed => Ok(resource),
        Access::Denied => {
            warn!(%subject, owner_id = %resource.owner_id(), kind, "access denied");
            Err(AppError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Thing(Uuid);

    impl Owned for Thing {
        fn owner_id(&self) -> Uuid {
            self.0
        }
    }

    #[test]
    fn allowed_only_for_owner() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(authorize(a, a), Access::Allowed);
        assert_eq!(authorize(a, b), Access::Denied);
        assert_eq!(authorize(b, a), Access::Denied);
    }

    #[test]
    fn nil_subject_gets_no_special_treatment() {
        assert_eq!(authorize(Uuid::nil(), Uuid::new_v4()), Access::Denied);
    }

    #[test]
    fn ensure_owner_distinguishes_missing_from_foreign() {
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        assert!(ensure_owner(owner, Some(Thing(owner)), "thing").is_ok());
        assert!(matches!(
            ensure_owner(stranger, Some(Thing(owner)), "thing"),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            ensure_owner::<Thing>(owner, None, "thing"),
            Err(AppError::NotFound("thing"))
        ));
    }
}
