//! Authentication state trait and macro.

use crate::jwt::JwtConfig;

/// Trait for router state types that can verify tokens.
pub trait HasAuthState {
    fn jwt(&self) -> &JwtConfig;
}

/// Implement `HasAuthState` for a state struct with a `jwt: Arc<JwtConfig>`
/// field.
#[macro_export]
macro_rules! impl_has_auth_state {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthState for $state_type {
            fn jwt(&self) -> &$crate::jwt::JwtConfig {
                &self.jwt
            }
        }
    };
}
