use serde::{Deserialize, Serialize};

use crate::game::UserId;


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: UserId,
    pub username: String,
}

// Reply of the authentication endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: Option<String>,
    pub username: String,
    pub user_id: UserId,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    LoggedOut,
    LoggedIn { user_info: UserInfo, token: Option<String> },
}

impl Session {
    pub fn user_info(&self) -> Option<&UserInfo> {
        match self {
            Session::LoggedOut => None,
            Session::LoggedIn { user_info, .. } => Some(user_info),
        }
    }
    pub fn user_id(&self) -> Option<UserId> { self.user_info().map(|info| info.id) }
    pub fn username(&self) -> Option<&str> { self.user_info().map(|info| info.username.as_str()) }
    pub fn token(&self) -> Option<&str> {
        match self {
            Session::LoggedOut => None,
            Session::LoggedIn { token, .. } => token.as_deref(),
        }
    }
    pub fn logout(&mut self) { *self = Session::LoggedOut; }
}

impl From<AuthResponse> for Session {
    fn from(response: AuthResponse) -> Self {
        Session::LoggedIn {
            user_info: UserInfo { id: response.user_id, username: response.username },
            token: response.token,
        }
    }
}
