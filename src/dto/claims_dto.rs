use serde::{Deserialize, Serialize};

/// Bearer token claims. `sub` is the account that owns a fantasy team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}
