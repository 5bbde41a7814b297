use serde::{Deserialize, Serialize};

use crate::types::ActorType;

/// Roles recognized by the authorization policy. SYSTEM is distinct from all
/// human roles and is the only principal allowed to perform automatic
/// transitions (scheduler escalation, timeout close, auto-start).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Citizen,
    Staff,
    DeptHead,
    MunicipalCommissioner,
    Admin,
    SuperAdmin,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Citizen => "CITIZEN",
            Role::Staff => "STAFF",
            Role::DeptHead => "DEPT_HEAD",
            Role::MunicipalCommissioner => "MUNICIPAL_COMMISSIONER",
            Role::Admin => "ADMIN",
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::System => "SYSTEM",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CITIZEN" => Ok(Role::Citizen),
            "STAFF" => Ok(Role::Staff),
            "DEPT_HEAD" => Ok(Role::DeptHead),
            "MUNICIPAL_COMMISSIONER" => Ok(Role::MunicipalCommissioner),
            "ADMIN" => Ok(Role::Admin),
            "SUPER_ADMIN" => Ok(Role::SuperAdmin),
            "SYSTEM" => Ok(Role::System),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Verified identity carried per operation. Produced by the authentication
/// layer and passed explicitly; never stored in process-wide state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActorContext {
    pub actor_type: ActorType,
    pub user_id: Option<String>,
    pub role: Role,
    pub department_id: Option<String>,
}

impl ActorContext {
    /// The scheduler / auto-transition principal.
    pub fn system() -> Self {
        Self {
            actor_type: ActorType::System,
            user_id: None,
            role: Role::System,
            department_id: None,
        }
    }

    pub fn citizen(user_id: impl Into<String>) -> Self {
        Self {
            actor_type: ActorType::User,
            user_id: Some(user_id.into()),
            role: Role::Citizen,
            department_id: None,
        }
    }

    pub fn staff(user_id: impl Into<String>, department_id: impl Into<String>) -> Self {
        Self {
            actor_type: ActorType::User,
            user_id: Some(user_id.into()),
            role: Role::Staff,
            department_id: Some(department_id.into()),
        }
    }

    pub fn dept_head(user_id: impl Into<String>, department_id: impl Into<String>) -> Self {
        Self {
            actor_type: ActorType::User,
            user_id: Some(user_id.into()),
            role: Role::DeptHead,
            department_id: Some(department_id.into()),
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            actor_type: ActorType::User,
            user_id: Some(user_id.into()),
            role: Role::Admin,
            department_id: None,
        }
    }

    pub fn is_system(&self) -> bool {
        self.actor_type == ActorType::System
    }

    /// ADMIN and SUPER_ADMIN share administrative powers.
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin | Role::SuperAdmin)
    }

    /// True if this actor is the owning citizen of `citizen_id`.
    pub fn owns(&self, citizen_id: &str) -> bool {
        self.user_id.as_deref() == Some(citizen_id)
    }

    pub fn in_department(&self, department_id: &str) -> bool {
        self.department_id.as_deref() == Some(department_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_actor_has_no_user() {
        let sys = ActorContext::system();
        assert!(sys.is_system());
        assert!(sys.user_id.is_none());
        assert_eq!(sys.role, Role::System);
    }

    #[test]
    fn ownership_check() {
        let c = ActorContext::citizen("c-42");
        assert!(c.owns("c-42"));
        assert!(!c.owns("c-99"));
        assert!(!ActorContext::system().owns("c-42"));
    }

    #[test]
    fn admin_covers_super_admin() {
        let mut a = ActorContext::admin("a-1");
        assert!(a.is_admin());
        a.role = Role::SuperAdmin;
        assert!(a.is_admin());
        a.role = Role::DeptHead;
        assert!(!a.is_admin());
    }
}
