//! Access policy for templates

use serde::{Deserialize, Serialize};

use crate::template::{DepartmentId, Template, UserId};
use crate::tier::TierClaim;

/// Caller identity as supplied by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    pub user_id: UserId,

    #[serde(default)]
    pub department_id: Option<DepartmentId>,

    pub subscription_tier: TierClaim,
}

impl UserContext {
    pub fn new(
        user_id: impl Into<UserId>,
        department_id: Option<DepartmentId>,
        subscription_tier: impl Into<TierClaim>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            department_id,
            subscription_tier: subscription_tier.into(),
        }
    }

    /// Check if the user belongs to a department
    pub fn is_member_of(&self, department_id: &DepartmentId) -> bool {
        self.department_id.as_ref() == Some(department_id)
    }
}

/// Whether a user tier meets a required tier.
///
/// An unrecognized tier on either side never satisfies the comparison.
pub fn tier_satisfies(user: &TierClaim, required: &TierClaim) -> bool {
    match (user.rank(), required.rank()) {
        (Some(have), Some(need)) => have >= need,
        _ => false,
    }
}

/// Whether a user may use a template.
///
/// Public templates are open to everyone. Otherwise the user must belong to
/// the owning department and hold at least the required tier.
pub fn can_access(template: &Template, user: &UserContext) -> bool {
    if template.is_public() {
        return true;
    }
    user.is_member_of(template.department_id())
        && tier_satisfies(
            &user.subscription_tier,
            &TierClaim::Known(template.required_tier()),
        )
}

/// Whether a user may publish new versions of a template
pub fn can_edit(template: &Template, user: &UserContext) -> bool {
    user.is_member_of(template.department_id())
}
