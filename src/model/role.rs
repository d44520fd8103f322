use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, AsRefStr, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    SystemAdmin = 1,
    SchoolAdmin = 2,
    Teacher = 3,
    Student = 4,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::SystemAdmin),
            2 => Some(Role::SchoolAdmin),
            3 => Some(Role::Teacher),
            4 => Some(Role::Student),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Role::SystemAdmin | Role::SchoolAdmin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for role in [Role::SystemAdmin, Role::SchoolAdmin, Role::Teacher, Role::Student] {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(5), None);
    }

    #[test]
    fn display_is_snake_case() {
        assert_eq!(Role::SchoolAdmin.to_string(), "school_admin");
        assert_eq!(Role::Teacher.as_ref(), "teacher");
    }
}
