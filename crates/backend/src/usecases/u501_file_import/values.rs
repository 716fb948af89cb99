use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Сумма в формате BR или US: `R$ 1.500,50`, `1,500.50`, `150050`
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .replace("R$", "")
        .replace('$', "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if cleaned.is_empty() || cleaned.starts_with('-') || cleaned.starts_with('(') {
        return None;
    }

    let commas = cleaned.matches(',').count();
    let dots = cleaned.matches('.').count();

    let normalized = match (commas, dots) {
        (0, 0) => cleaned,
        (_, 0) => {
            let decimals = cleaned.rsplit(',').next().map_or(0, str::len);
            if commas == 1 && (1..=2).contains(&decimals) {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (0, _) => {
            let (int_part, decimals) = cleaned.split_once('.').unwrap_or((cleaned.as_str(), ""));
            let thousands = dots > 1 || (decimals.len() == 3 && int_part != "0");
            if thousands {
                cleaned.replace('.', "")
            } else {
                cleaned
            }
        }
        _ => {
            let last_comma = cleaned.rfind(',').unwrap_or(0);
            let last_dot = cleaned.rfind('.').unwrap_or(0);
            if last_comma > last_dot {
                cleaned.replace('.', "").replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
    };

    if normalized.is_empty()
        || normalized.matches('.').count() > 1
        || !normalized.chars().all(|c| c.is_ascii_digit() || c == '.')
    {
        return None;
    }
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Порядок дня и месяца в датах через слэш
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    MonthFirst,
    DayFirst,
}

impl DateOrder {
    /// `DD/MM/YYYY` -> DayFirst, everything else is month-first
    pub fn from_format(format: &str) -> Self {
        if format.trim().to_uppercase().starts_with("DD") {
            DateOrder::DayFirst
        } else {
            DateOrder::MonthFirst
        }
    }

    fn other(self) -> Self {
        match self {
            DateOrder::MonthFirst => DateOrder::DayFirst,
            DateOrder::DayFirst => DateOrder::MonthFirst,
        }
    }

    fn date_pattern(self) -> &'static str {
        match self {
            DateOrder::MonthFirst => "%m/%d/%Y",
            DateOrder::DayFirst => "%d/%m/%Y",
        }
    }
}

fn at_midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt))
}

fn parse_iso(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, pattern) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(at_midnight)
}

fn parse_slashed(value: &str, order: DateOrder) -> Option<DateTime<Utc>> {
    let date = order.date_pattern();
    for suffix in [" %H:%M:%S", " %H:%M"] {
        let pattern = format!("{date}{suffix}");
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, &pattern) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    NaiveDate::parse_from_str(value, date)
        .ok()
        .and_then(at_midnight)
}

pub fn parse_date(raw: &str, order: DateOrder) -> Option<DateTime<Utc>> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    parse_iso(value).or_else(|| parse_slashed(value, order))
}

/// Сначала предпочтительный порядок день/месяц, затем другой
pub fn parse_date_any(raw: &str, preferred: DateOrder) -> Option<DateTime<Utc>> {
    parse_date(raw, preferred).or_else(|| parse_date(raw, preferred.other()))
}

pub fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "true" | "yes" | "1" | "sim" | "y" | "x"
    )
}
