//! Pure role-gating decision.
//!
//! The scheduler evaluates this single predicate instead of branching on
//! roles anywhere else; mismatches become permission errors at the call
//! site with no state change.

use custodia_core::types::Role;

/// Whether a principal with `actual` may decide a step requiring
/// `required`. Label comparison is exact.
#[must_use]
pub fn role_permits(actual: &Role, required: &Role) -> bool {
    actual == required
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_permits() {
        assert!(role_permits(&Role::from("store_manager"), &Role::from("store_manager")));
    }

    #[test]
    fn test_mismatch_denied() {
        assert!(!role_permits(&Role::from("operator"), &Role::from("store_manager")));
    }

    #[test]
    fn test_comparison_is_case_sensitive() {
        assert!(!role_permits(&Role::from("Operator"), &Role::from("operator")));
    }
}
