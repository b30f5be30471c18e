//! Name Matcher: a prioritized catalogue of `(predicate on lowercased
//! column name, generator call)` pairs. "full name" patterns are tested
//! after first/last-name patterns so `first_name` never false-matches
//! `full_name`'s looser pattern.

use std::sync::LazyLock;

use fake::faker::address::en::{
    CityName, CountryCode as FakeCountryCode, CountryName, Latitude, Longitude, StateName,
    StreetName, ZipCode,
};
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::{SafeEmail, UserAgent as FakeUserAgent, Username as FakeUsername};
use fake::faker::lorem::en::Sentences;
use fake::faker::name::en::{FirstName as FakeFirstName, LastName as FakeLastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rand::Rng;
use regex::Regex;

use crate::generate::value::{borrowed, owned, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Email,
    Username,
    FirstName,
    LastName,
    FullName,
    Phone,
    StreetAddress,
    City,
    State,
    CountryCode,
    Country,
    ZipPostal,
    Url,
    IpAddress,
    Company,
    JobTitle,
    Description,
    Color,
    Domain,
    Currency,
    Language,
    Latitude,
    Longitude,
    UserAgent,
    CreditCardNumber,
}

struct Rule {
    pattern: &'static str,
    family: Family,
}

/// Order matters: full-name patterns sit after first/last name so
/// `first_name` is never swallowed by a looser "name" match.
static RULES: &[Rule] = &[
    Rule { pattern: r"^(email|e_mail|mail|email_address)$", family: Family::Email },
    Rule { pattern: r"^(username|user_name|login|handle)$", family: Family::Username },
    Rule { pattern: r"^(first_?name|given_?name|fname)$", family: Family::FirstName },
    Rule { pattern: r"^(last_?name|family_?name|surname|lname)$", family: Family::LastName },
    Rule { pattern: r"^(full_?name|display_?name|name)$", family: Family::FullName },
    Rule { pattern: r"(phone|mobile|telephone|cell)", family: Family::Phone },
    Rule { pattern: r"^(street|street_address|address(_line_?1?)?|addr)$", family: Family::StreetAddress },
    Rule { pattern: r"^(city|town)$", family: Family::City },
    Rule { pattern: r"^(state|province|region)$", family: Family::State },
    Rule { pattern: r"^(country_code|country_iso|iso_country)$", family: Family::CountryCode },
    Rule { pattern: r"^country$", family: Family::Country },
    Rule { pattern: r"^(zip|zip_code|postal_code|postcode)$", family: Family::ZipPostal },
    Rule { pattern: r"^(url|website|link|homepage)$", family: Family::Url },
    Rule { pattern: r"^(ip|ip_address|ipv4|ipv6)$", family: Family::IpAddress },
    Rule { pattern: r"^(company|organization|org|employer|business)(_name)?$", family: Family::Company },
    Rule { pattern: r"^(job_title|title|position|occupation)$", family: Family::JobTitle },
    Rule { pattern: r"^(description|desc|bio|about|summary)$", family: Family::Description },
    Rule { pattern: r"^(color|colour)$", family: Family::Color },
    Rule { pattern: r"^(domain|domain_name)$", family: Family::Domain },
    Rule { pattern: r"^(currency|currency_code)$", family: Family::Currency },
    Rule { pattern: r"^(language|locale|lang)$", family: Family::Language },
    Rule { pattern: r"^(lat|latitude)$", family: Family::Latitude },
    Rule { pattern: r"^(lng|lon|long|longitude)$", family: Family::Longitude },
    Rule { pattern: r"^(user_agent|useragent|ua)$", family: Family::UserAgent },
    Rule { pattern: r"^(credit_card|credit_card_number|card_number|cc_number)$", family: Family::CreditCardNumber },
];

static COMPILED_RULES: LazyLock<Vec<(Regex, Family)>> = LazyLock::new(|| {
    RULES
        .iter()
        .map(|r| (Regex::new(r.pattern).unwrap(), r.family))
        .collect()
});

/// Attempt to match a column name against the catalogue and produce a
/// plausible value. Returns `None` when no family recognizes the name.
/// `max_len` truncates text results when `Some(n)` with `n > 0`.
pub fn match_column_name(column_name: &str, max_len: Option<usize>, rng: &mut impl Rng) -> Option<Value> {
    let normalized = normalize_column_name(column_name);

    let family = COMPILED_RULES
        .iter()
        .find(|(re, _)| re.is_match(&normalized))
        .map(|(_, f)| *f)?;

    let value = generate_for_family(family, rng);
    Some(truncate_if_text(value, max_len))
}

fn generate_for_family(family: Family, rng: &mut impl Rng) -> Value {
    match family {
        Family::Email => owned(SafeEmail().fake_with_rng(rng)),
        Family::Username => owned(FakeUsername().fake_with_rng(rng)),
        Family::FirstName => owned(FakeFirstName().fake_with_rng(rng)),
        Family::LastName => owned(FakeLastName().fake_with_rng(rng)),
        Family::FullName => owned(Name().fake_with_rng(rng)),
        Family::Phone => owned(PhoneNumber().fake_with_rng(rng)),
        Family::StreetAddress => owned(StreetName().fake_with_rng(rng)),
        Family::City => owned(CityName().fake_with_rng(rng)),
        Family::State => owned(StateName().fake_with_rng(rng)),
        Family::CountryCode => owned(FakeCountryCode().fake_with_rng(rng)),
        Family::Country => owned(CountryName().fake_with_rng(rng)),
        Family::ZipPostal => owned(ZipCode().fake_with_rng(rng)),
        Family::Url => {
            let domain: String = fake::faker::internet::en::DomainSuffix().fake_with_rng(rng);
            owned(format!("https://{}.{}", FakeUsername().fake_with_rng::<String, _>(rng), domain))
        }
        Family::IpAddress => owned(fake::faker::internet::en::IPv4().fake_with_rng(rng)),
        Family::Company => owned(CompanyName().fake_with_rng(rng)),
        Family::JobTitle => owned(fake::faker::company::en::Profession().fake_with_rng(rng)),
        Family::Description => {
            let sentences: Vec<String> = Sentences(1..3).fake_with_rng(rng);
            owned(sentences.join(" "))
        }
        Family::Color => {
            const COLORS: &[&str] = &[
                "red", "blue", "green", "yellow", "purple", "orange", "pink", "black", "white",
                "gray", "brown", "cyan", "magenta", "teal",
            ];
            borrowed(COLORS[rng.random_range(0..COLORS.len())])
        }
        Family::Domain => owned(fake::faker::internet::en::DomainSuffix().fake_with_rng::<String, _>(rng)),
        Family::Currency => {
            const CURRENCIES: &[&str] = &["USD", "EUR", "GBP", "JPY", "CAD", "AUD", "CHF"];
            borrowed(CURRENCIES[rng.random_range(0..CURRENCIES.len())])
        }
        Family::Language => {
            const LANGS: &[&str] = &["en", "es", "fr", "de", "ja", "zh", "pt", "ru"];
            borrowed(LANGS[rng.random_range(0..LANGS.len())])
        }
        Family::Latitude => Value::Float(Latitude().fake_with_rng(rng)),
        Family::Longitude => Value::Float(Longitude().fake_with_rng(rng)),
        Family::UserAgent => owned(FakeUserAgent().fake_with_rng(rng)),
        Family::CreditCardNumber => owned(generate_credit_card_number(rng)),
    }
}

fn truncate_if_text(value: Value, max_len: Option<usize>) -> Value {
    match (value, max_len) {
        (Value::String(s), Some(n)) if n > 0 && s.chars().count() > n => {
            owned(s.chars().take(n).collect())
        }
        (v, _) => v,
    }
}

/// Luhn-valid 16-digit credit card number; `fake` has no built-in provider
/// for this family so it is generated directly.
fn generate_credit_card_number(rng: &mut impl Rng) -> String {
    let mut digits: Vec<u8> = (0..15).map(|_| rng.random_range(0..10)).collect();
    let check = luhn_check_digit(&digits);
    digits.push(check);
    digits.iter().map(|d| d.to_string()).collect()
}

fn luhn_check_digit(digits: &[u8]) -> u8 {
    let mut sum = 0u32;
    for (i, &d) in digits.iter().rev().enumerate() {
        let mut d = d as u32;
        if i % 2 == 0 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    ((10 - (sum % 10)) % 10) as u8
}

/// CamelCase -> snake_case, lowercase, hyphens to underscores.
fn normalize_column_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    let mut prev_char: Option<char> = None;

    for ch in name.chars() {
        if ch.is_uppercase() {
            if let Some(p) = prev_char {
                if p.is_lowercase() {
                    result.push('_');
                }
            }
        }
        for lower_ch in ch.to_lowercase() {
            result.push(lower_ch);
        }
        prev_char = Some(ch);
    }
    result.replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn first_name_does_not_match_full_name_rule() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let v = match_column_name("first_name", None, &mut rng).unwrap();
        assert!(matches!(v, Value::String(_)));
        // Make sure it routed through FirstName, not FullName, by checking
        // the normalized name matches the FirstName pattern first.
        let normalized = normalize_column_name("first_name");
        assert!(Regex::new(r"^(first_?name|given_?name|fname)$").unwrap().is_match(&normalized));
    }

    #[test]
    fn camel_case_is_normalized() {
        assert_eq!(normalize_column_name("firstName"), "first_name");
        assert_eq!(normalize_column_name("IPAddress"), "i_p_address");
    }

    #[test]
    fn latitude_and_longitude_are_bounded_floats() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..20 {
            if let Some(Value::Float(f)) = match_column_name("latitude", None, &mut rng) {
                assert!((-90.0..=90.0).contains(&f));
            }
            if let Some(Value::Float(f)) = match_column_name("longitude", None, &mut rng) {
                assert!((-180.0..=180.0).contains(&f));
            }
        }
    }

    #[test]
    fn unmatched_column_returns_none() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        assert!(match_column_name("totally_unrecognized_xyz", None, &mut rng).is_none());
    }

    #[test]
    fn truncation_honors_max_len() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        if let Some(Value::String(s)) = match_column_name("description", Some(5), &mut rng) {
            assert!(s.chars().count() <= 5);
        }
    }

    #[test]
    fn credit_card_number_passes_luhn_check() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(9);
        let v = match_column_name("credit_card_number", None, &mut rng).unwrap();
        if let Value::String(s) = v {
            let digits: Vec<u8> = s.chars().map(|c| c.to_digit(10).unwrap() as u8).collect();
            assert_eq!(digits.len(), 16);
            let (body, check) = digits.split_at(15);
            assert_eq!(luhn_check_digit(body), check[0]);
        }
    }
}
