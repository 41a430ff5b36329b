/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules,
/// enforcing a Defense-in-Depth strategy. This structure ensures that
/// access control is applied explicitly at the module level (via Axum layers),
/// preventing accidental exposure of protected endpoints.
///
/// The modules map directly to the defined access tiers.

/// Routes accessible to all clients (health, login, camps, upload).
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
/// Requires a validated session token.
pub mod authenticated;

/// Routes restricted exclusively to users with the admin role.
/// Handlers perform the mandatory role check after authentication.
pub mod admin;
