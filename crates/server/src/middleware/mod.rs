pub mod rate_limit;
pub mod request_id;

pub use rate_limit::{
    CallerId, FixedWindowLimiter, RateLimitConfig, RateLimitDecision, RateLimitExceeded,
};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
