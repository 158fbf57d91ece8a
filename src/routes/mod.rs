/// Router Module Index
///
/// Routes are split by who may reach them. The authentication layer is applied
/// per module in `create_router`, so a protected endpoint cannot be exposed by
/// registering it in the wrong place by accident.

/// Routes reachable without a token.
pub mod public;

/// Routes protected by the `AuthUser` middleware.
pub mod authenticated;

/// Account management, ADMIN only.
pub mod admin;
