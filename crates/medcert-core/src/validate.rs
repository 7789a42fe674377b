//! Field validators and normalisers for Brazilian clinic paperwork.
//!
//! All functions are pure; they never log and never allocate more than the
//! normalised output.

use std::sync::LazyLock;

use jiff::civil::{Date, DateTime};
use regex::Regex;

use crate::fields::{
    CPF_LENGTH, MAX_NAME_LENGTH, MIN_NAME_LENGTH, NAME_PARTICLES, RG_MAX_LENGTH, RG_MIN_LENGTH, UFS,
};

static CID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]\d{2}(\.\d+)?$").expect("CID pattern compiles"));

static HONORIFIC_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:dr\(a\)|dra|dr|profa|prof|sra|sr|med)(?:\.|\s)\s*")
        .expect("honorific pattern compiles")
});

/// Date formats accepted on input, tried in order after `DD/MM/YYYY`.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

pub fn only_digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Validate a CPF (taxpayer number): 11 digits, not all equal, both
/// mod-11 check digits correct. Punctuation is ignored.
pub fn is_valid_cpf(cpf: &str) -> bool {
    let digits: Vec<u32> = cpf.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != CPF_LENGTH || digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    let check_digit = |len: usize| {
        let sum: u32 = digits[..len]
            .iter()
            .enumerate()
            .map(|(i, d)| d * (len as u32 + 1 - i as u32))
            .sum();
        match sum % 11 {
            r if r < 2 => 0,
            r => 11 - r,
        }
    };

    digits[9] == check_digit(9) && digits[10] == check_digit(10)
}

/// Format a CPF as `XXX.XXX.XXX-XX`; anything that is not 11 digits is
/// returned unchanged.
pub fn format_cpf(cpf: &str) -> String {
    let digits = only_digits(cpf);
    if digits.len() != CPF_LENGTH {
        return cpf.to_string();
    }
    format!(
        "{}.{}.{}-{}",
        &digits[..3],
        &digits[3..6],
        &digits[6..9],
        &digits[9..]
    )
}

/// RG numbers vary by state; only the digit count is checked.
pub fn is_valid_rg(rg: &str) -> bool {
    let digits = only_digits(rg);
    if !(RG_MIN_LENGTH..=RG_MAX_LENGTH).contains(&digits.len()) {
        return false;
    }
    let first = digits.as_bytes()[0];
    !digits.bytes().all(|b| b == first)
}

/// ICD-10 code as written on Brazilian certificates: letter, two digits,
/// optional dotted subcategory (`A00`, `F32.9`, `Z76.5`).
pub fn is_valid_cid(cid: &str) -> bool {
    CID_PATTERN.is_match(&cid.trim().to_uppercase())
}

pub fn is_valid_uf(uf: &str) -> bool {
    let uf = uf.trim().to_ascii_uppercase();
    UFS.contains(&uf.as_str())
}

/// A person's full name: at least two words, letters (accented included)
/// and spaces only.
pub fn is_valid_person_name(name: &str) -> bool {
    let name = name.trim();
    let len = name.chars().count();
    if !(MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&len) {
        return false;
    }
    name.chars().all(|c| c.is_alphabetic() || c == ' ') && name.split_whitespace().count() >= 2
}

/// Capitalise each word of a name, keeping Portuguese particles
/// (`da`, `de`, `do`, `das`, `dos`, `e`) lowercase unless they open the name.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .enumerate()
        .map(|(i, word)| {
            let lower = word.to_lowercase();
            if i > 0 && NAME_PARTICLES.contains(&lower.as_str()) {
                return lower;
            }
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Certificates outside this range are typing mistakes.
const YEAR_RANGE: std::ops::RangeInclusive<i16> = 1900..=2100;

/// Parse a strict Brazilian date `DD/MM/YYYY` between 1900 and 2100.
pub fn parse_br_date(value: &str) -> Option<Date> {
    let date = Date::strptime("%d/%m/%Y", value.trim()).ok()?;
    in_range(date)
}

/// Parse a date written in any of the accepted input formats, between 1900
/// and 2100.
pub fn parse_date(value: &str) -> Option<Date> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Some(date) = parse_br_date(value) {
        return Some(date);
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| Date::strptime(fmt, value).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| DateTime::strptime(fmt, value).ok().map(|dt| dt.date()))
        })
        .and_then(in_range)
}

fn in_range(date: Date) -> Option<Date> {
    YEAR_RANGE.contains(&date.year()).then_some(date)
}

pub fn format_date_br(date: Date) -> String {
    date.strftime("%d/%m/%Y").to_string()
}

/// Normalise a date string to `DD/MM/YYYY`; unparseable input passes through
/// trimmed.
pub fn normalize_date_br(value: &str) -> String {
    match parse_date(value) {
        Some(date) => format_date_br(date),
        None => value.trim().to_string(),
    }
}

/// Remove one leading honorific (`Dr.`, `Dra.`, `Dr(a)`, `Prof.`, `Profa.`,
/// `Sr.`, `Sra.`, `Med.`) so templates that already print `Dr. (a)` do not
/// repeat it.
pub fn strip_honorifics(name: &str) -> String {
    HONORIFIC_PREFIX.replace(name, "").trim().to_string()
}

/// Drop control characters other than newline, carriage return and tab,
/// then trim.
pub fn sanitize_input(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect::<String>()
        .trim()
        .to_string()
}
