//! Access validation and the interceptor chain run before every data operation.

pub mod errors;
pub mod interceptor;
pub mod validator;

pub use errors::{AccessError, UnauthenticatedReason};
pub use interceptor::{
    AccessInterceptor, AccessScope, InterceptorChain, OperationKind, OperationRequest,
    TenantAccessInterceptor,
};
pub use validator::{AccessGrant, DEFAULT_SESSION_TIMEOUT, TenantValidator};
