use serde::{Deserialize, Serialize};

pub const PERM_SUPERADMIN: &str = "system:superadmin";
pub const PERM_IMPORTS_EXECUTE: &str = "imports:execute";
pub const PERM_IMPORTS_ROLLBACK: &str = "imports:rollback";
pub const PERM_IMPORTS_HISTORY: &str = "imports:history";

/// JWT claims. Токены выпускает внешний сервис авторизации, здесь только проверка.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String, // user_id
    pub username: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub perms: Vec<String>,
    pub exp: usize, // expiration timestamp
    pub iat: usize, // issued at
}

impl TokenClaims {
    pub fn is_superadmin(&self) -> bool {
        self.role.eq_ignore_ascii_case("superadmin")
            || self.perms.iter().any(|p| p == PERM_SUPERADMIN)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.is_superadmin() || self.perms.iter().any(|p| p == permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: &str, perms: &[&str]) -> TokenClaims {
        TokenClaims {
            sub: "u1".into(),
            username: "tester".into(),
            role: role.into(),
            perms: perms.iter().map(|p| p.to_string()).collect(),
            exp: 0,
            iat: 0,
        }
    }

    #[test]
    fn test_superadmin_implies_everything() {
        assert!(claims("superadmin", &[]).has_permission(PERM_IMPORTS_ROLLBACK));
        assert!(claims("admin", &[PERM_SUPERADMIN]).has_permission(PERM_IMPORTS_HISTORY));
    }

    #[test]
    fn test_plain_permissions() {
        let c = claims("admin", &[PERM_IMPORTS_EXECUTE]);
        assert!(c.has_permission(PERM_IMPORTS_EXECUTE));
        assert!(!c.has_permission(PERM_IMPORTS_ROLLBACK));
        assert!(!c.is_superadmin());
    }
}
