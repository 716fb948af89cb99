use serde::{Deserialize, Serialize};

/// Статус контракта. В API и БД хранится в нижнем регистре.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    #[default]
    Active,
    Late1,
    Late2,
    Late3,
    Defaulted,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Active => "active",
            ContractStatus::Late1 => "late1",
            ContractStatus::Late2 => "late2",
            ContractStatus::Late3 => "late3",
            ContractStatus::Defaulted => "defaulted",
        }
    }

    /// Normalizes a status string coming from an external file.
    ///
    /// Vendor exports use Portuguese collection-status labels ("NCONT 1 AT",
    /// "SUJ. A CANCELAMENTO", ...); legacy imports used `delinquent`/`paid_off`.
    /// Returns `None` for anything not in the alias table.
    pub fn from_alias(value: &str) -> Option<Self> {
        let key = value.trim().to_uppercase();
        let status = match key.as_str() {
            "ACTIVE" | "NORMAL" => ContractStatus::Active,
            "LATE1" | "NCONT 1 AT" => ContractStatus::Late1,
            "LATE2" | "NCONT 2 AT" => ContractStatus::Late2,
            "LATE3" | "NCONT 3 AT" | "SUJ. A CANCELAMENTO" | "SUJ. A  CANCELAMENTO"
            | "DELINQUENT" => ContractStatus::Late3,
            "DEFAULTED" | "DESISTENTE" | "EXCLUIDO" | "PAID_OFF" => ContractStatus::Defaulted,
            _ => return None,
        };
        Some(status)
    }

    /// Parse of the stored lowercase value
    pub fn from_db(value: &str) -> Self {
        Self::from_alias(value).unwrap_or_default()
    }
}

/// Тип контракта (числовой код хранится в БД)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractType {
    Lar = 0,
    Motores = 1,
}

impl ContractType {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ContractType::Lar),
            1 => Some(ContractType::Motores),
            _ => None,
        }
    }

    /// Accepts `lar` / `motores` in any case, or the numeric code
    pub fn parse(value: &str) -> Option<Self> {
        let v = value.trim().to_lowercase();
        match v.as_str() {
            "lar" => Some(ContractType::Lar),
            "motores" => Some(ContractType::Motores),
            other => other.parse::<i32>().ok().and_then(Self::from_code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_aliases() {
        assert_eq!(ContractStatus::from_alias("Normal"), Some(ContractStatus::Active));
        assert_eq!(ContractStatus::from_alias(" ncont 1 at "), Some(ContractStatus::Late1));
        assert_eq!(ContractStatus::from_alias("NCONT 2 AT"), Some(ContractStatus::Late2));
        assert_eq!(
            ContractStatus::from_alias("SUJ. A  CANCELAMENTO"),
            Some(ContractStatus::Late3)
        );
        assert_eq!(ContractStatus::from_alias("suj. a cancelamento"), Some(ContractStatus::Late3));
        assert_eq!(ContractStatus::from_alias("Desistente"), Some(ContractStatus::Defaulted));
        assert_eq!(ContractStatus::from_alias("EXCLUIDO"), Some(ContractStatus::Defaulted));
    }

    #[test]
    fn test_legacy_statuses() {
        assert_eq!(ContractStatus::from_alias("delinquent"), Some(ContractStatus::Late3));
        assert_eq!(ContractStatus::from_alias("paid_off"), Some(ContractStatus::Defaulted));
        assert_eq!(ContractStatus::from_alias("late1").map(|s| s.as_str()), Some("late1"));
    }

    #[test]
    fn test_unknown_status() {
        assert_eq!(ContractStatus::from_alias("cancelled"), None);
        assert_eq!(ContractStatus::from_alias(""), None);
        assert_eq!(ContractStatus::from_db("garbage"), ContractStatus::Active);
    }

    #[test]
    fn test_contract_type() {
        assert_eq!(ContractType::parse("LAR"), Some(ContractType::Lar));
        assert_eq!(ContractType::parse("motores"), Some(ContractType::Motores));
        assert_eq!(ContractType::parse("1"), Some(ContractType::Motores));
        assert_eq!(ContractType::parse("2"), None);
        assert_eq!(ContractType::Motores.code(), 1);
    }
}
