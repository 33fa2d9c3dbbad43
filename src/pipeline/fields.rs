//! Field parsers: RUT, date, name and status from cleaned OCR text.
//!
//! Every parser is a pure `&str → Option<String>` function returning the
//! value in canonical form, so the same document always yields the same row:
//!
//! | Field  | Canonical form        |
//! |--------|-----------------------|
//! | rut    | `12.345.678-K`        |
//! | fecha  | `dd/mm/yyyy`          |
//! | nombre | `JUAN PEREZ SOTO`     |
//! | estado | `APROBADO`, `EN TRAMITE` |

use once_cell::sync::Lazy;
use regex::Regex;

// ── RUT ──────────────────────────────────────────────────────────────────────

static RE_RUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2}[.,]\d{3}[.,]\d{3}|\d{7,8})\s*-\s*([0-9K])\b").unwrap()
});

/// Find a Chilean RUT in `text`.
///
/// The first RUT whose check digit verifies wins; if none verifies (OCR may
/// have garbled a digit) the first syntactic match is returned instead.
pub fn find_rut(text: &str) -> Option<String> {
    let mut first_match: Option<String> = None;

    for caps in RE_RUT.captures_iter(text) {
        let digits: String = caps[1].chars().filter(char::is_ascii_digit).collect();
        let Ok(body) = digits.parse::<u32>() else {
            continue;
        };
        let dv = caps[2].chars().next().map(|c| c.to_ascii_uppercase())?;

        let formatted = format_rut(body, dv);
        if rut_check_digit(body) == dv {
            return Some(formatted);
        }
        first_match.get_or_insert(formatted);
    }

    first_match
}

/// Modulo-11 check digit for a RUT body.
pub fn rut_check_digit(body: u32) -> char {
    let mut sum = 0u32;
    let mut factor = 2u32;
    let mut n = body;
    while n > 0 {
        sum += (n % 10) * factor;
        n /= 10;
        factor = if factor == 7 { 2 } else { factor + 1 };
    }
    match 11 - (sum % 11) {
        11 => '0',
        10 => 'K',
        d => char::from_digit(d, 10).unwrap_or('0'),
    }
}

/// `12345678`, `'5'` → `12.345.678-5`.
pub fn format_rut(body: u32, dv: char) -> String {
    let digits = body.to_string();
    let mut grouped = String::with_capacity(digits.len() + 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    format!("{grouped}-{dv}")
}

// ── Fecha ────────────────────────────────────────────────────────────────────

static RE_DATE_NUMERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})\s?[/.\-]\s?(\d{1,2})\s?[/.\-]\s?(\d{4})\b").unwrap()
});

static RE_DATE_ISO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})(?:T|\b)").unwrap());

static RE_DATE_LONG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})\s+de\s+(enero|febrero|marzo|abril|mayo|junio|julio|agosto|septiembre|setiembre|octubre|noviembre|diciembre)\s+(?:de(?:l)?\s+)?(\d{4})\b",
    )
    .unwrap()
});

/// Find the first valid date in `text`, formatted `dd/mm/yyyy`.
///
/// Accepts `dd/mm/yyyy`, `dd-mm-yyyy`, `dd.mm.yyyy`, ISO `yyyy-mm-dd` and
/// the Spanish long form `12 de marzo de 2023`. Impossible dates (31/02)
/// are skipped.
pub fn find_fecha(text: &str) -> Option<String> {
    let numeric = RE_DATE_NUMERIC.captures_iter(text).map(|c| {
        let pos = c.get(0).map_or(0, |m| m.start());
        (pos, c[1].parse::<u32>().ok(), c[2].parse::<u32>().ok(), c[3].parse::<u32>().ok())
    });
    let iso = RE_DATE_ISO.captures_iter(text).map(|c| {
        let pos = c.get(0).map_or(0, |m| m.start());
        (pos, c[3].parse::<u32>().ok(), c[2].parse::<u32>().ok(), c[1].parse::<u32>().ok())
    });
    let long = RE_DATE_LONG.captures_iter(text).map(|c| {
        let pos = c.get(0).map_or(0, |m| m.start());
        (pos, c[1].parse::<u32>().ok(), month_number(&c[2]), c[3].parse::<u32>().ok())
    });

    numeric
        .chain(iso)
        .chain(long)
        .filter_map(|(pos, d, m, y)| match (d, m, y) {
            (Some(d), Some(m), Some(y)) if is_valid_date(d, m, y) => Some((pos, d, m, y)),
            _ => None,
        })
        .min_by_key(|(pos, ..)| *pos)
        .map(|(_, d, m, y)| format!("{d:02}/{m:02}/{y:04}"))
}

fn month_number(name: &str) -> Option<u32> {
    let m = match name.to_lowercase().as_str() {
        "enero" => 1,
        "febrero" => 2,
        "marzo" => 3,
        "abril" => 4,
        "mayo" => 5,
        "junio" => 6,
        "julio" => 7,
        "agosto" => 8,
        "septiembre" | "setiembre" => 9,
        "octubre" => 10,
        "noviembre" => 11,
        "diciembre" => 12,
        _ => return None,
    };
    Some(m)
}

fn is_valid_date(day: u32, month: u32, year: u32) -> bool {
    if !(1900..=2100).contains(&year) || !(1..=12).contains(&month) {
        return false;
    }
    let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
    let days = match month {
        2 if leap => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    };
    (1..=days).contains(&day)
}

// ── Nombre ───────────────────────────────────────────────────────────────────

static RE_NAME_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)\b(?:nombre(?:\s+(?:del|de\s+la)\s+\p{L}+)?|nombres?\s+y\s+apellidos|raz[oó]n\s+social)[ \t]*:[ \t]*(.+)$",
    )
    .unwrap()
});

/// Words that mark a line as a form label or letterhead rather than a name.
const NAME_STOP_WORDS: &[&str] = &[
    "FOLIO", "RUT", "R.U.T", "RUN", "FECHA", "ESTADO", "NOMBRE", "NOMBRES", "APELLIDOS",
    "CERTIFICADO", "CERTIFICA", "REPUBLICA", "CHILE", "MINISTERIO", "SERVICIO", "GOBIERNO",
    "DOCUMENTO", "REGISTRO", "RESOLUCION", "DIRECCION", "DOMICILIO", "COMUNA", "REGION", "FIRMA",
    "SOLICITUD", "PAGINA", "TELEFONO", "CORREO", "EMAIL", "PRESENTE", "MEDIO", "CONSTAR",
    "SUSCRITO",
];

/// Find the holder's name.
///
/// A `Nombre:` label wins; its value is cut at the first token holding a
/// digit or another field label. Without a label, the name is derived by
/// exclusion: the first line made of 2–6 purely alphabetic words that
/// contains no stop word.
pub fn find_nombre(text: &str) -> Option<String> {
    if let Some(caps) = RE_NAME_LABEL.captures(text) {
        let name = name_tokens(&caps[1]);
        if !name.is_empty() {
            return Some(name.join(" "));
        }
    }

    text.lines()
        .find(|l| is_name_line(l))
        .map(|l| name_tokens(l).join(" "))
}

fn name_tokens(value: &str) -> Vec<String> {
    let mut out = Vec::new();
    for token in value.split_whitespace() {
        if token.chars().any(|c| c.is_ascii_digit()) || is_stop_word(token) {
            break;
        }
        let word: String = token
            .chars()
            .filter(|c| c.is_alphabetic())
            .flat_map(char::to_uppercase)
            .collect();
        if !word.is_empty() {
            out.push(word);
        }
    }
    out
}

fn is_stop_word(token: &str) -> bool {
    let upper = fold_accents(&token.to_uppercase());
    let bare = upper.trim_matches(|c: char| !c.is_alphanumeric() && c != '.');
    let bare = bare.trim_end_matches('.');
    NAME_STOP_WORDS.contains(&bare)
}

fn is_name_line(line: &str) -> bool {
    let words: Vec<&str> = line.split_whitespace().collect();
    if !(2..=6).contains(&words.len()) {
        return false;
    }
    if words.iter().any(|w| is_stop_word(w)) {
        return false;
    }
    if RE_STATUS.is_match(&fold_accents(&line.to_uppercase())) {
        return false;
    }
    let long_words = words
        .iter()
        .filter(|w| w.chars().filter(|c| c.is_alphabetic()).count() >= 2)
        .count();
    long_words >= 2
        && words
            .iter()
            .all(|w| w.chars().all(|c| c.is_alphabetic() || c == '\'' || c == '-'))
}

// ── Estado ───────────────────────────────────────────────────────────────────

static RE_STATUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(EN[ \t]+TRAMITE|APROBAD[OA]|RECHAZAD[OA]|PENDIENTE|VIGENTE|ANULAD[OA]|CADUCAD[OA]|VENCID[OA]|EMITID[OA]|TRAMITAD[OA]|OBSERVAD[OA])\b",
    )
    .unwrap()
});

static RE_STATUS_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bESTADO[ \t]*:[ \t]*(\p{L}+(?:[ \t]+\p{L}+)?)").unwrap());

/// Labels of neighbouring fields; never a status value.
const FIELD_LABELS: &[&str] = &["NOMBRE", "NOMBRES", "RUT", "RUN", "FECHA", "FOLIO", "ESTADO"];

/// Find the document status, uppercase and without accents.
///
/// An `Estado:` label with a value on the same line wins; otherwise the
/// earliest known status keyword on the page is used.
pub fn find_estado(text: &str) -> Option<String> {
    let folded = fold_accents(&text.to_uppercase());

    if let Some(caps) = RE_STATUS_LABEL.captures(&folded) {
        let value = &caps[1];
        if let Some(m) = RE_STATUS.find(value) {
            return Some(collapse_ws(m.as_str()));
        }
        let first = value.split_whitespace().next().unwrap_or("");
        if first.chars().count() >= 3
            && !matches!(first, "DEL" | "LAS" | "LOS")
            && !FIELD_LABELS.contains(&first)
        {
            return Some(first.to_string());
        }
    }

    RE_STATUS.find(&folded).map(|m| collapse_ws(m.as_str()))
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip Spanish acute accents and diaeresis; `Ñ` is kept.
pub fn fold_accents(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'Á' => 'A',
            'É' => 'E',
            'Í' => 'I',
            'Ó' => 'O',
            'Ú' | 'Ü' => 'U',
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' | 'ü' => 'u',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_digit_known_values() {
        assert_eq!(rut_check_digit(12_345_678), '5');
        assert_eq!(rut_check_digit(11_111_111), '1');
        assert_eq!(rut_check_digit(10_000_013), 'K');
    }

    #[test]
    fn format_groups_thousands() {
        assert_eq!(format_rut(12_345_678, '5'), "12.345.678-5");
        assert_eq!(format_rut(1_234_567, 'K'), "1.234.567-K");
    }

    #[test]
    fn rut_dotted_and_plain() {
        assert_eq!(find_rut("RUT: 12.345.678-5").as_deref(), Some("12.345.678-5"));
        assert_eq!(find_rut("run 12345678 - 5 otro").as_deref(), Some("12.345.678-5"));
        assert_eq!(find_rut("RUT 10.000.013-k").as_deref(), Some("10.000.013-K"));
    }

    #[test]
    fn rut_prefers_valid_check_digit() {
        let text = "Folio 12.345.678-9 y titular 11.111.111-1";
        assert_eq!(find_rut(text).as_deref(), Some("11.111.111-1"));
    }

    #[test]
    fn rut_falls_back_to_first_match() {
        assert_eq!(find_rut("RUT 12.345.678-9").as_deref(), Some("12.345.678-9"));
        assert_eq!(find_rut("sin identificador"), None);
    }

    #[test]
    fn fecha_numeric_variants() {
        assert_eq!(find_fecha("Fecha: 5/3/2023").as_deref(), Some("05/03/2023"));
        assert_eq!(find_fecha("emitido 15-11-2021").as_deref(), Some("15/11/2021"));
        assert_eq!(find_fecha("el 01.02.2020").as_deref(), Some("01/02/2020"));
        assert_eq!(find_fecha("2022-07-09T10:00").as_deref(), Some("09/07/2022"));
    }

    #[test]
    fn fecha_long_form() {
        assert_eq!(
            find_fecha("Santiago, 12 de Marzo de 2023").as_deref(),
            Some("12/03/2023")
        );
        assert_eq!(
            find_fecha("1 de setiembre del 2019").as_deref(),
            Some("01/09/2019")
        );
    }

    #[test]
    fn fecha_earliest_valid_wins_and_invalid_skipped() {
        assert_eq!(
            find_fecha("vence 31/02/2023, emitido 3 de enero de 2023 y 10/10/2024").as_deref(),
            Some("03/01/2023")
        );
        assert_eq!(find_fecha("29/02/2023"), None);
        assert_eq!(find_fecha("29/02/2024").as_deref(), Some("29/02/2024"));
    }

    #[test]
    fn fecha_ignores_rut() {
        assert_eq!(find_fecha("RUT 12.345.678-5"), None);
    }

    #[test]
    fn nombre_from_label() {
        assert_eq!(
            find_nombre("Nombre: Juan Pérez Soto RUT: 12.345.678-5").as_deref(),
            Some("JUAN PÉREZ SOTO")
        );
        assert_eq!(
            find_nombre("Nombre del titular: MARÍA JOSÉ NÚÑEZ").as_deref(),
            Some("MARÍA JOSÉ NÚÑEZ")
        );
    }

    #[test]
    fn nombre_by_exclusion() {
        let text = "REPUBLICA DE CHILE\nFOLIO 123456\nPor medio del presente\nJUAN ANDRES PEREZ SOTO\n12.345.678-5";
        assert_eq!(find_nombre(text).as_deref(), Some("JUAN ANDRES PEREZ SOTO"));
    }

    #[test]
    fn nombre_skips_status_lines() {
        let text = "ESTADO APROBADO\nJuan Perez";
        assert_eq!(find_nombre(text).as_deref(), Some("JUAN PEREZ"));
        assert_eq!(find_nombre("12345\nFOLIO"), None);
    }

    #[test]
    fn nombre_takes_first_surviving_line_regardless_of_case() {
        let text = "Juan Perez Soto\nPOR MEDIO DEL PRESENTE";
        assert_eq!(find_nombre(text).as_deref(), Some("JUAN PEREZ SOTO"));
        let text = "Ana Maria Rojas\nCARLOS MUNOZ";
        assert_eq!(find_nombre(text).as_deref(), Some("ANA MARIA ROJAS"));
    }

    #[test]
    fn nombre_label_value_must_be_on_same_line() {
        let text = "Nombre:\nRUT: 12.345.678-5\nPedro Soto";
        assert_eq!(find_nombre(text).as_deref(), Some("PEDRO SOTO"));
    }

    #[test]
    fn estado_from_label_and_keyword() {
        assert_eq!(find_estado("Estado: Aprobado").as_deref(), Some("APROBADO"));
        assert_eq!(find_estado("ESTADO: EN  TRÁMITE").as_deref(), Some("EN TRAMITE"));
        assert_eq!(find_estado("Estado: Suspendido").as_deref(), Some("SUSPENDIDO"));
        assert_eq!(
            find_estado("La solicitud se encuentra rechazada por el servicio").as_deref(),
            Some("RECHAZADA")
        );
        assert_eq!(find_estado("nada relevante"), None);
    }

    #[test]
    fn estado_label_ignores_next_line_and_field_labels() {
        assert_eq!(find_estado("Estado:\nNombre: JUAN PEREZ"), None);
        assert_eq!(find_estado("Estado: Nombre JUAN PEREZ"), None);
        assert_eq!(
            find_estado("Estado:\nNombre: JUAN PEREZ\nVIGENTE").as_deref(),
            Some("VIGENTE")
        );
    }

    #[test]
    fn accents_folded() {
        assert_eq!(fold_accents("TRÁMITE Ñuñoa"), "TRAMITE Ñuñoa");
    }
}
