mod limiter;
mod validator;

pub use limiter::{RateLimitDecision, RateLimiter, RateLimiterConfig};
pub use validator::{validate_envelope, ValidationError};
