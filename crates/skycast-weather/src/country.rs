//! Country names, synonyms and the free-text country hint.
//!
//! The table is deliberately finite: a trailing word is only treated as a
//! country hint when it is listed here. Two-letter ISO codes are never
//! accepted as hints ("de", "es" and friends are too common inside place
//! names), only as stored country values.

use crate::fold::fold_key;

#[derive(Debug, PartialEq, Eq)]
pub struct Country {
    /// ISO 3166-1 alpha-2
    pub code: &'static str,
    /// English name first, then local and Portuguese/Spanish synonyms.
    pub names: &'static [&'static str],
}

impl Country {
    pub fn name(&self) -> &'static str {
        self.names[0]
    }
}

pub static COUNTRIES: &[Country] = &[
    Country { code: "AR", names: &["Argentina"] },
    Country { code: "AU", names: &["Australia", "Austrália"] },
    Country { code: "AT", names: &["Austria", "Áustria", "Österreich"] },
    Country { code: "BE", names: &["Belgium", "Bélgica", "België", "Belgique"] },
    Country { code: "BO", names: &["Bolivia", "Bolívia"] },
    Country { code: "BR", names: &["Brazil", "Brasil"] },
    Country { code: "CA", names: &["Canada", "Canadá"] },
    Country { code: "CL", names: &["Chile"] },
    Country { code: "CN", names: &["China"] },
    Country { code: "CO", names: &["Colombia", "Colômbia"] },
    Country { code: "CR", names: &["Costa Rica"] },
    Country { code: "CU", names: &["Cuba"] },
    Country { code: "DK", names: &["Denmark", "Dinamarca", "Danmark"] },
    Country { code: "DO", names: &["Dominican Republic", "República Dominicana"] },
    Country { code: "EC", names: &["Ecuador", "Equador"] },
    Country { code: "EG", names: &["Egypt", "Egito", "Egipto"] },
    Country { code: "SV", names: &["El Salvador"] },
    Country { code: "FI", names: &["Finland", "Finlândia", "Finlandia", "Suomi"] },
    Country { code: "FR", names: &["France", "França", "Francia"] },
    Country { code: "DE", names: &["Germany", "Alemanha", "Alemania", "Deutschland"] },
    Country { code: "GR", names: &["Greece", "Grécia", "Grecia"] },
    Country { code: "GT", names: &["Guatemala"] },
    Country { code: "HN", names: &["Honduras"] },
    Country { code: "IN", names: &["India", "Índia"] },
    Country { code: "IE", names: &["Ireland", "Irlanda"] },
    Country { code: "IT", names: &["Italy", "Itália", "Italia"] },
    Country { code: "JP", names: &["Japan", "Japão", "Japón"] },
    Country { code: "MX", names: &["Mexico", "México"] },
    Country { code: "NL", names: &["Netherlands", "Holanda", "Países Baixos", "Nederland"] },
    Country { code: "NZ", names: &["New Zealand", "Nova Zelândia", "Nueva Zelanda"] },
    Country { code: "NI", names: &["Nicaragua", "Nicarágua"] },
    Country { code: "NO", names: &["Norway", "Noruega", "Norge"] },
    Country { code: "PA", names: &["Panama", "Panamá"] },
    Country { code: "PY", names: &["Paraguay", "Paraguai"] },
    Country { code: "PE", names: &["Peru", "Perú"] },
    Country { code: "PL", names: &["Poland", "Polônia", "Polonia", "Polska"] },
    Country { code: "PT", names: &["Portugal"] },
    Country { code: "RU", names: &["Russia", "Rússia", "Rusia"] },
    Country { code: "ZA", names: &["South Africa", "África do Sul", "Sudáfrica"] },
    Country { code: "KR", names: &["South Korea", "Coreia do Sul", "Corea del Sur"] },
    Country { code: "ES", names: &["Spain", "Espanha", "España"] },
    Country { code: "SE", names: &["Sweden", "Suécia", "Suecia", "Sverige"] },
    Country { code: "CH", names: &["Switzerland", "Suíça", "Suiza", "Schweiz", "Suisse"] },
    Country { code: "GB", names: &["United Kingdom", "Reino Unido", "England", "Inglaterra", "UK"] },
    Country { code: "US", names: &["United States", "Estados Unidos", "USA", "EUA", "EEUU"] },
    Country { code: "UY", names: &["Uruguay", "Uruguai"] },
    Country { code: "VE", names: &["Venezuela"] },
];

/// Words that glue a country onto a place name ("Santiago do Chile").
const CONNECTORS: &[&str] = &["de", "do", "da", "dos", "das", "del", "of", "di", "du"];

/// Look a country up by any of its names (accent/case-insensitive).
pub fn find_by_name(text: &str) -> Option<&'static Country> {
    let key = fold_key(text);
    if key.is_empty() {
        return None;
    }
    COUNTRIES
        .iter()
        .find(|country| country.names.iter().any(|name| fold_key(name) == key))
}

pub fn find_by_code(code: &str) -> Option<&'static Country> {
    let code = code.trim();
    COUNTRIES
        .iter()
        .find(|country| country.code.eq_ignore_ascii_case(code))
}

/// Resolve a stored country value (code or name) to an upper-case ISO code.
///
/// Listed names and synonyms ("UK") resolve through the table first; any
/// other two-letter ASCII value is taken as a code, listed or not.
pub fn country_code(text: &str) -> Option<String> {
    let text = text.trim();
    if let Some(country) = find_by_name(text) {
        return Some(country.code.to_string());
    }
    if text.len() == 2 && text.chars().all(|c| c.is_ascii_alphabetic()) {
        return Some(text.to_ascii_uppercase());
    }
    None
}

/// A country recognised at the end of a search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryHint {
    pub country: &'static Country,
    /// Text sent upstream: the query with the hint removed, or the whole
    /// query when the country is part of the place name.
    pub base_query: String,
    /// The country was attached with a connector ("Cidade do México"), so
    /// it belongs to the name; result names keep their country words.
    pub name_embedded: bool,
}

impl CountryHint {
    /// Does a candidate's country (name or code) match the hint?
    pub fn matches(&self, country_name: &str, country_code: &str) -> bool {
        if !country_code.trim().is_empty() {
            return self.country.code.eq_ignore_ascii_case(country_code.trim());
        }
        find_by_name(country_name).is_some_and(|found| found.code == self.country.code)
    }
}

fn tokens(text: &str) -> Vec<&str> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect()
}

fn is_connector(word: &str) -> bool {
    let word = fold_key(word);
    CONNECTORS.contains(&word.as_str())
}

fn drop_trailing_connectors(words: &mut Vec<&str>) {
    while words.len() > 1 && words.last().is_some_and(|w| is_connector(w)) {
        words.pop();
    }
}

/// Split `"santiago chile"` into base `"santiago"` and hint Chile.
///
/// Longer country names win over shorter ones ("nova zelândia" before
/// any one-word match). A connector before the country ("Ciudad de
/// Panamá", "Santiago de Chile") marks it as part of the name: the hint
/// still filters, but the full query goes upstream. No hint is produced
/// when the remaining base would be shorter than `min_base_chars`.
pub fn parse_country_hint(query: &str, min_base_chars: usize) -> Option<CountryHint> {
    let words = tokens(query);

    for n in (1..=3).rev() {
        if words.len() <= n {
            continue;
        }
        let split = words.len() - n;
        let tail = words[split..].join(" ");
        let Some(country) = find_by_name(&tail) else {
            continue;
        };

        let head = &words[..split];
        let name_embedded = head.len() > 1 && head.last().is_some_and(|w| is_connector(w));
        let base_query = if name_embedded {
            words.join(" ")
        } else {
            head.join(" ")
        };
        if base_query.chars().count() < min_base_chars {
            return None;
        }
        return Some(CountryHint {
            country,
            base_query,
            name_embedded,
        });
    }

    None
}

/// Remove a trailing country (and its connector) from a display name.
///
/// `"Santiago do Chile"` with Chile → `Some("Santiago")`. Returns `None`
/// when the name doesn't end with that country or nothing would be left.
pub fn strip_country_suffix(name: &str, country: &Country) -> Option<String> {
    let words: Vec<&str> = name.split_whitespace().collect();

    for n in (1..=3).rev() {
        if words.len() <= n {
            continue;
        }
        let split = words.len() - n;
        let tail = words[split..].join(" ");
        let tail = tail.trim_matches(|c: char| matches!(c, '(' | ')' | ',' | '-'));
        if !find_by_name(tail).is_some_and(|found| found.code == country.code) {
            continue;
        }

        let mut head = words[..split].to_vec();
        drop_trailing_connectors(&mut head);
        let short = head
            .join(" ")
            .trim_end_matches(|c: char| matches!(c, ',' | '-' | '(' | ' '))
            .to_string();
        return (!short.is_empty()).then_some(short);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_code_accepts_codes_and_names() {
        assert_eq!(country_code("BR").as_deref(), Some("BR"));
        assert_eq!(country_code("br").as_deref(), Some("BR"));
        assert_eq!(country_code("Brazil").as_deref(), Some("BR"));
        assert_eq!(country_code("Brasil").as_deref(), Some("BR"));
        assert_eq!(country_code("Japão").as_deref(), Some("JP"));
        assert_eq!(country_code("Atlantis"), None);
        assert_eq!(country_code("UK").as_deref(), Some("GB"));
        assert_eq!(country_code("zz").as_deref(), Some("ZZ"));
        assert_eq!(country_code(""), None);
    }

    #[test]
    fn hint_is_split_from_trailing_country() {
        let hint = parse_country_hint("santiago chile", 3).unwrap();
        assert_eq!(hint.base_query, "santiago");
        assert_eq!(hint.country.code, "CL");
    }

    #[test]
    fn hint_handles_commas() {
        let hint = parse_country_hint("Porto, Portugal", 3).unwrap();
        assert_eq!(hint.base_query, "Porto");
        assert_eq!(hint.country.code, "PT");
        assert!(!hint.name_embedded);
    }

    #[test]
    fn connector_keeps_country_inside_the_name() {
        for (query, code) in [
            ("Cidade do México", "MX"),
            ("Ciudad de Panamá", "PA"),
            ("Ciudad de Guatemala", "GT"),
            ("Santiago de Chile", "CL"),
        ] {
            let hint = parse_country_hint(query, 3).unwrap();
            assert_eq!(hint.base_query, query);
            assert_eq!(hint.country.code, code);
            assert!(hint.name_embedded);
        }
    }

    #[test]
    fn lone_connector_is_not_a_base() {
        assert!(parse_country_hint("de chile", 3).is_none());
    }

    #[test]
    fn multi_word_country_beats_single_word() {
        let hint = parse_country_hint("wellington nova zelândia", 3).unwrap();
        assert_eq!(hint.base_query, "wellington");
        assert_eq!(hint.country.code, "NZ");

        // "do" belongs to the country name here, not a connector.
        let hint = parse_country_hint("Busan Coreia do Sul", 3).unwrap();
        assert_eq!(hint.base_query, "Busan");
        assert_eq!(hint.country.code, "KR");
    }

    #[test]
    fn no_hint_without_country_or_base() {
        assert!(parse_country_hint("santiago", 3).is_none());
        assert!(parse_country_hint("chile", 3).is_none());
        assert!(parse_country_hint("rio de janeiro", 3).is_none());
        // Base would fall under the floor.
        assert!(parse_country_hint("xi china", 3).is_none());
    }

    #[test]
    fn iso_codes_are_not_hints() {
        assert!(parse_country_hint("frankfurt de", 3).is_none());
    }

    #[test]
    fn hint_matches_by_code_or_name() {
        let hint = parse_country_hint("santiago chile", 3).unwrap();
        assert!(hint.matches("Chile", "CL"));
        assert!(hint.matches("", "cl"));
        assert!(hint.matches("Chile", ""));
        assert!(!hint.matches("Spain", "ES"));
        assert!(!hint.matches("Dominican Republic", ""));
    }

    #[test]
    fn strips_redundant_country_suffix() {
        let chile = find_by_code("CL").unwrap();
        assert_eq!(
            strip_country_suffix("Santiago do Chile", chile).as_deref(),
            Some("Santiago")
        );
        assert_eq!(
            strip_country_suffix("Santiago, Chile", chile).as_deref(),
            Some("Santiago")
        );
        assert_eq!(
            strip_country_suffix("Santiago (Chile)", chile).as_deref(),
            Some("Santiago")
        );
    }

    #[test]
    fn keeps_names_without_matching_suffix() {
        let chile = find_by_code("CL").unwrap();
        let spain = find_by_code("ES").unwrap();
        assert_eq!(strip_country_suffix("Santiago", chile), None);
        assert_eq!(strip_country_suffix("Chile", chile), None);
        assert_eq!(strip_country_suffix("Santiago do Chile", spain), None);
        assert_eq!(strip_country_suffix("Chile Chico", chile), None);
    }

    #[test]
    fn table_codes_are_unique() {
        for (i, a) in COUNTRIES.iter().enumerate() {
            for b in &COUNTRIES[i + 1..] {
                assert_ne!(a.code, b.code);
            }
        }
    }
}
