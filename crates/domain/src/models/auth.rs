//! Authorization context passed explicitly into every service operation.

use uuid::Uuid;

pub use shared::jwt::Role;

use super::restaurant::Restaurant;

/// Verified identity of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthContext {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins manage every restaurant; owners only their own.
    pub fn can_manage(&self, restaurant: &Restaurant) -> bool {
        self.is_admin() || (self.role == Role::Owner && restaurant.owner_id == self.user_id)
    }
}
