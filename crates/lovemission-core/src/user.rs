use serde::{Deserialize, Serialize};

/// A member of a couple. The partner link is one pointer per row; the
/// partner's own record is fetched separately by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default, alias = "loveId")]
    pub partner_id: Option<i64>,
    #[serde(default, rename = "fcmToken")]
    pub push_token: Option<String>,
    #[serde(default)]
    pub coin: i64,
}

impl User {
    pub fn has_partner(&self) -> bool {
        self.partner_id.is_some()
    }
}

/// Name to show for a user, falling back to a placeholder when the lookup
/// failed or the user never set a nickname.
pub fn display_name<'a>(user: Option<&'a User>, fallback: &'a str) -> &'a str {
    user.and_then(|u| u.nickname.as_deref())
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(fallback)
}
