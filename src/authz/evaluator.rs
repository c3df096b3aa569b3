use super::principal::Principal;
use crate::models::{User, Verb};

/// Capability evaluator trait for pluggable client-side gating
pub trait CapabilityEvaluator: Send + Sync {
    /// Check if the principal may perform `verb` on `path`
    fn can(&self, principal: Option<&Principal>, path: &str, verb: &str) -> bool;
}

/// Default capability evaluator
///
/// Evaluation order:
/// 1. no principal -> deny
/// 2. principal without any permission -> deny
/// 3. exact (path, verb) grant -> allow
/// 4. deny
#[derive(Debug, Clone, Default)]
pub struct DefaultCapabilityEvaluator;

impl DefaultCapabilityEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl CapabilityEvaluator for DefaultCapabilityEvaluator {
    fn can(&self, principal: Option<&Principal>, path: &str, verb: &str) -> bool {
        // 1. Unauthenticated
        let Some(principal) = principal else {
            tracing::debug!(path = %path, verb = %verb, "no session user");
            return false;
        };

        // 2. Roles that carry nothing grant nothing
        if principal.is_powerless() {
            tracing::debug!(
                user_id = %principal.user_id,
                path = %path,
                verb = %verb,
                "user holds no permissions"
            );
            return false;
        }

        // 3. Exact grant
        if principal.has_capability(path, verb) {
            tracing::debug!(
                user_id = %principal.user_id,
                path = %path,
                verb = %verb,
                "capability granted"
            );
            return true;
        }

        // 4. Deny
        tracing::debug!(
            user_id = %principal.user_id,
            path = %path,
            verb = %verb,
            "capability denied"
        );
        false
    }
}

/// Decides whether `user` may perform `verb` on `path`. A missing verb means `GET`.
///
/// Pass the verb explicitly for anything that is not a read; the default would
/// otherwise let a GET grant unlock a write control.
pub fn can_perform(user: Option<&User>, path: &str, verb: Option<&str>) -> bool {
    let principal = user.map(Principal::from_user);
    DefaultCapabilityEvaluator.can(
        principal.as_ref(),
        path,
        verb.unwrap_or(Verb::Get.as_str()),
    )
}

pub fn can_view(user: Option<&User>, path: &str) -> bool {
    can_perform(user, path, None)
}
