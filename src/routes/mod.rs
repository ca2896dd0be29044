/// Router Module Index
///
/// Routing split by access level. Authentication is applied as a layer on whole
/// routers, so a protected endpoint cannot be exposed by forgetting an extractor.

/// Routes open to anonymous clients: the public news API and login.
pub mod public;

/// Routes that need a valid session but no particular role.
pub mod authenticated;

/// The admin surface, nested under `/admin`. Handlers apply the role policies.
pub mod admin;
