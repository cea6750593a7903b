use serde::{Deserialize, Serialize};

use crate::users::Role;

/// JWT payload carried by session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,   // user ID
    pub name: String,  // display name
    pub email: String, // user email
    pub role: Role,    // user or admin
    pub iat: usize,    // issued at (unix timestamp)
    pub exp: usize,    // expires at (unix timestamp)
    pub iss: String,   // issuer
    pub aud: String,   // audience
}

/// Same payload with every identity claim optional; read by the development provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LooseClaims {
    pub sub: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}
