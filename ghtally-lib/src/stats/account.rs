use super::gateway::queries::{USER_QUERY, UserData};
use super::{Gateway, GraphQlRequest, Transport};
use crate::Result;
use chrono::{DateTime, Utc};
use ohno::{IntoAppError, bail};

/// The account whose contributions are measured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub login: String,

    /// Opaque node id, compared against commit authors for attribution.
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub followers: u64,
}

/// Look up `login`; an unknown login is fatal.
pub async fn fetch_account<T: Transport>(gateway: &Gateway<T>, login: &str) -> Result<Account> {
    let request = GraphQlRequest::new(USER_QUERY, serde_json::json!({ "login": login }), format!("user '{login}'"));
    let data: UserData = gateway.execute(&request).await.into_app_err_with(|| format!("looking up user '{login}'"))?;

    let Some(user) = data.user else {
        bail!("user '{login}' not found");
    };

    Ok(Account {
        login: login.to_string(),
        id: user.id,
        created_at: user.created_at,
        followers: user.followers.total_count,
    })
}
