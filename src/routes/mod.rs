/// Router Module Index
///
/// Routes are grouped by the access they require. A route's module *is* its access
/// declaration: `lib::create_router` wraps the whole `authenticated` router in the Access
/// Guard, and nothing in `public` touches per-user data.

/// Routes reachable without a session: liveness, session issue/clear, public browsing.
pub mod public;

/// Routes behind the Access Guard. Every mutation and every per-user view lives here.
pub mod authenticated;
