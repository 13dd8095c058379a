use std::fmt;

use crate::user::User;

/// Local storage key holding the email of the last signed-in user.
pub const LOGIN_MARKER_KEY: &str = "isLoggedInLoveMission";

/// Where the app lands after resolving the current user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    SignIn,
    ConnectPartner,
    Main,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::SignIn => "sign_in",
            Destination::ConnectPartner => "connect_partner",
            Destination::Main => "main",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed or missing lookup is treated the same as "not logged in".
pub fn route_for(user: Option<&User>) -> Destination {
    match user {
        None => Destination::SignIn,
        Some(u) if u.has_partner() => Destination::Main,
        Some(_) => Destination::ConnectPartner,
    }
}
