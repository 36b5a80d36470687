use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

/// Gate on the edit capability: servers started with a token require
/// `Authorization: Bearer <token>`; servers without one allow everything.
#[derive(Clone, Default)]
pub struct EditToken {
    token: Option<String>,
}

impl EditToken {
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    #[must_use]
    pub fn allows(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = &self.token else {
            return true;
        };
        let Some(value) = headers.get(AUTHORIZATION) else {
            return false;
        };
        let Ok(value) = value.to_str() else {
            return false;
        };
        value
            .strip_prefix("Bearer ")
            .is_some_and(|presented| presented == expected)
    }
}
