use anyhow::bail;

const CANDIDATES: [u8; 2] = [b',', b';'];

/// Текст файла без BOM
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Delimiters an Excel `sep=` line may name; tab is honoured only through the hint
const HINTED: [u8; 3] = [b',', b';', b'\t'];

/// Excel-подсказка `sep=;` в первой строке
pub fn sep_hint(line: &str) -> Option<u8> {
    let line = line.trim_start_matches(' ').trim_end_matches(['\r', '\n']);
    let prefix = line.get(..4)?;
    if !prefix.eq_ignore_ascii_case("sep=") {
        return None;
    }
    match line.as_bytes().get(4) {
        Some(&b) if HINTED.contains(&b) => Some(b),
        _ => None,
    }
}

/// Count of delimiter occurrences outside double-quoted sections
fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for b in line.bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if b == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

fn field_count(line: &str, delimiter: u8) -> usize {
    count_unquoted(line, delimiter) + 1
}

/// Method 1: the delimiter that occurs more often in the header
fn by_frequency(header: &str) -> Option<u8> {
    let commas = count_unquoted(header, b',');
    let semicolons = count_unquoted(header, b';');
    match commas.cmp(&semicolons) {
        std::cmp::Ordering::Greater => Some(b','),
        std::cmp::Ordering::Less => Some(b';'),
        std::cmp::Ordering::Equal => None,
    }
}

/// Method 2: the delimiter that splits header and first data row into the same number of fields
fn by_consistency(header: &str, data: Option<&str>) -> Option<u8> {
    let splitting: Vec<u8> = CANDIDATES
        .iter()
        .copied()
        .filter(|&d| field_count(header, d) > 1)
        .collect();

    let matching: Vec<u8> = match data {
        Some(row) => splitting
            .into_iter()
            .filter(|&d| field_count(header, d) == field_count(row, d))
            .collect(),
        None => splitting,
    };

    match matching.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

/// Определяет разделитель CSV (',' или ';') по первым двум непустым строкам.
///
/// Оба метода должны согласоваться; если уверен только один, берётся его ответ.
pub fn detect_delimiter(text: &str) -> anyhow::Result<u8> {
    let text = strip_bom(text);
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let Some(mut header) = lines.next() else {
        bail!("File is empty");
    };
    if header.trim().to_lowercase().starts_with("sep=") {
        if let Some(d) = sep_hint(header) {
            return Ok(d);
        }
        header = match lines.next() {
            Some(next) => next,
            None => bail!("File is empty"),
        };
    }
    let data = lines.next();

    let frequency = by_frequency(header);
    let consistency = by_consistency(header, data);

    match (frequency, consistency) {
        (Some(a), Some(b)) if a == b => Ok(a),
        (Some(a), Some(b)) => bail!(
            "Could not determine CSV delimiter: header suggests '{}' but row structure suggests '{}'",
            a as char,
            b as char
        ),
        (Some(d), None) | (None, Some(d)) => Ok(d),
        (None, None) => bail!("Could not determine CSV delimiter. Use ',' or ';' between columns"),
    }
}
