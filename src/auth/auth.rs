use crate::error::{AppError, AppResult};
use crate::model::role::Role;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};
use serde::Serialize;
use utoipa::ToSchema;

/// Caller identity, resolved once per request by the auth middleware.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Tenant scope; `None` only for system admins
    pub school_id: Option<u64>,
    /// Present only if this user is linked to a teacher record
    pub teacher_id: Option<u64>,
    /// Present only if this user is linked to a student record
    pub student_id: Option<u64>,
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| AppError::Unauthorized("Not authenticated".into())),
        )
    }
}

impl AuthUser {
    pub fn require_system_admin(&self) -> AppResult<()> {
        if self.role == Role::SystemAdmin {
            Ok(())
        } else {
            Err(AppError::forbidden("System admin only"))
        }
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Admin only"))
        }
    }

    /// Returns the caller's teacher id, or 403 for anyone without a teacher profile.
    pub fn require_teacher(&self) -> AppResult<u64> {
        match (self.role, self.teacher_id) {
            (Role::Teacher, Some(id)) => Ok(id),
            _ => Err(AppError::forbidden("No teacher profile")),
        }
    }

    pub fn can_access_school(&self, school_id: u64) -> bool {
        match self.role {
            Role::SystemAdmin => true,
            _ => self.school_id == Some(school_id),
        }
    }

    pub fn require_school_access(&self, school_id: u64) -> AppResult<()> {
        if self.can_access_school(school_id) {
            Ok(())
        } else {
            Err(AppError::forbidden("No access to this school"))
        }
    }

    /// School filter for list endpoints. System admins may list across
    /// schools; everyone else is pinned to their own school.
    pub fn scoped_school(&self, requested: Option<u64>) -> AppResult<Option<u64>> {
        if self.role == Role::SystemAdmin {
            return Ok(requested);
        }
        let own = self
            .school_id
            .ok_or_else(|| AppError::forbidden("Account has no school"))?;
        match requested {
            Some(id) if id != own => Err(AppError::forbidden("No access to this school")),
            _ => Ok(Some(own)),
        }
    }

    /// School a new row is written to. System admins must name one.
    pub fn school_for_write(&self, requested: Option<u64>) -> AppResult<u64> {
        self.scoped_school(requested)?
            .ok_or_else(|| AppError::bad_request("school_id is required"))
    }

    pub fn is_admin_of(&self, school_id: u64) -> bool {
        self.role.is_admin() && self.can_access_school(school_id)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn user(role: Role, school_id: Option<u64>) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "tester".into(),
            role,
            school_id,
            teacher_id: (role == Role::Teacher).then_some(7),
            student_id: (role == Role::Student).then_some(9),
        }
    }

    #[test]
    fn system_admin_reaches_every_school() {
        let admin = user(Role::SystemAdmin, None);
        assert!(admin.can_access_school(1));
        assert!(admin.can_access_school(99));
        assert_eq!(admin.scoped_school(None).unwrap(), None);
        assert_eq!(admin.scoped_school(Some(4)).unwrap(), Some(4));
    }

    #[test]
    fn tenant_users_are_pinned_to_their_school() {
        let teacher = user(Role::Teacher, Some(1));
        assert!(teacher.can_access_school(1));
        assert!(!teacher.can_access_school(2));
        assert_eq!(teacher.scoped_school(None).unwrap(), Some(1));
        assert!(teacher.scoped_school(Some(2)).is_err());
    }

    #[test]
    fn system_admin_writes_need_explicit_school() {
        let admin = user(Role::SystemAdmin, None);
        assert!(matches!(
            admin.school_for_write(None),
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(admin.school_for_write(Some(3)).unwrap(), 3);
    }

    #[test]
    fn require_teacher_needs_profile() {
        assert_eq!(user(Role::Teacher, Some(1)).require_teacher().unwrap(), 7);
        assert!(user(Role::SchoolAdmin, Some(1)).require_teacher().is_err());
        assert!(user(Role::Student, Some(1)).require_teacher().is_err());
    }

    #[test]
    fn school_admin_is_admin_only_of_own_school() {
        let admin = user(Role::SchoolAdmin, Some(1));
        assert!(admin.require_admin().is_ok());
        assert!(admin.require_system_admin().is_err());
        assert!(admin.is_admin_of(1));
        assert!(!admin.is_admin_of(2));
    }
}
