//! Access to the GitHub GraphQL endpoint.
//!
//! A [`Transport`] moves one request and its raw response. The [`Gateway`] on top of it
//! classifies every response (see [`classify`]), retries the transient ones under a
//! [`RetryPolicy`] and decodes successful responses into typed records from [`queries`].

mod failure;
#[expect(clippy::module_inception, reason = "the gateway type lives in the gateway module")]
mod gateway;
pub mod queries;
mod retry_policy;
#[cfg(test)]
pub(crate) mod scripted;
mod transport;

pub use failure::{Classification, FailureKind, GatewayError, classify};
pub use gateway::Gateway;
pub use retry_policy::RetryPolicy;
pub use transport::{GraphQlRequest, HttpTransport, RawResponse, Transport};
