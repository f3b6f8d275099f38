/// Middleware module
///
/// Access token authentication, as scope middleware or as a handler extractor.

mod identity;
mod jwt_middleware;

pub use identity::AuthenticatedUser;
pub use jwt_middleware::JwtMiddleware;
