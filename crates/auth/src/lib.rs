pub mod errors;
pub mod jwt;
pub mod middleware;

// Re-export commonly used items
pub use errors::AuthError;

pub use middleware::{
    authenticate,
    extract_bearer,
    protect,
    require_roles,
    restrict_to,
    AuthState,
    AuthUser,
    ADMINS,
    BLOG_AUTHORS,
};

pub use jwt::{
    parse_expires_in,
    MAX_EXPIRES_IN,
    Claims,
    JwtConfig,
    JwtConfigError,
    TokenService,
    VerifiedToken,
};
