use serde::Serialize;

/// The authenticated identity attached to a single request.
///
/// Produced by [`crate::AuthGate`] after a token passes the revocation check,
/// signature verification, and the credential store lookup. It lives in the
/// request's extensions and is dropped with the request.
///
/// ## 繁體中文
///
/// 附加在單一請求上的已驗證身分。
///
/// 由 [`crate::AuthGate`] 在 token 通過註銷檢查、簽章驗證與帳號查詢後產生，
/// 只存在於該請求的 extensions 中，請求結束即釋放。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    /// The token subject (account email).
    pub subject: String,

    /// Authorities granted to the subject, e.g. `ROLE_USER`.
    pub authorities: Vec<String>,
}

impl Principal {
    pub fn new(subject: impl Into<String>, authorities: Vec<String>) -> Self {
        Self {
            subject: subject.into(),
            authorities,
        }
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }
}
