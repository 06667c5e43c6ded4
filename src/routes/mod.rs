/// Router Module Index
///
/// Routing is split by access tier so authentication is applied per module
/// through Axum layers rather than per handler.

/// Routes accessible without authentication (health only).
pub mod public;

/// Routes protected by the `AuthUser` middleware: profile, tree lookups,
/// reader feed and content creation.
pub mod authenticated;

/// Manager-side routes. Every handler resolves the caller's authority itself;
/// callers without grants get empty results rather than 403.
pub mod admin;
