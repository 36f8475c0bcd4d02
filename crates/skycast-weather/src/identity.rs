//! Deciding when two place references denote the same real-world place.
//!
//! Name equality alone is not enough: many countries have several towns
//! with one name in different regions. Region is part of the identity key
//! unless the coordinates already put the two places next to each other.

use crate::country::country_code;
use crate::fold::fold_key;
use crate::types::Place;

/// Coordinate delta (degrees, per axis) under which two places coincide.
pub const PROXIMITY_DEGREES: f64 = 0.1;

/// Semantic identity between two places.
pub fn is_same_location(a: &Place, b: &Place) -> bool {
    if same_labels(a, b) {
        return true;
    }
    is_near(a, b)
}

/// Name, region and country agree once normalized.
fn same_labels(a: &Place, b: &Place) -> bool {
    fold_key(&a.name) == fold_key(&b.name)
        && normalized_region(a) == normalized_region(b)
        && countries_compatible(&a.country, &b.country)
}

fn normalized_region(place: &Place) -> String {
    place.region.as_deref().map(fold_key).unwrap_or_default()
}

/// Both places carry coordinates and they lie within the proximity box.
pub fn is_near(a: &Place, b: &Place) -> bool {
    a.has_coordinates()
        && b.has_coordinates()
        && (a.lat - b.lat).abs() < PROXIMITY_DEGREES
        && (a.lon - b.lon).abs() < PROXIMITY_DEGREES
}

/// Country values agree, tolerating code vs. name ("BR" vs "Brazil").
///
/// An unknown (empty) country on either side does not contradict.
pub fn countries_compatible(a: &str, b: &str) -> bool {
    let (fa, fb) = (fold_key(a), fold_key(b));
    if fa.is_empty() || fb.is_empty() || fa == fb {
        return true;
    }
    match (country_code(a), country_code(b)) {
        (Some(ca), Some(cb)) => ca == cb,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(name: &str, region: Option<&str>, country: &str, lat: f64, lon: f64) -> Place {
        let place = Place::new(lat, lon, name, country);
        match region {
            Some(r) => place.with_region(r),
            None => place,
        }
    }

    #[test]
    fn code_and_full_country_name_are_the_same_place() {
        let a = place("Urupema", Some("Santa Catarina"), "BR", -27.95, -49.87);
        let b = place("urupema ", Some("santa catarina"), "Brazil", 10.0, 10.0);
        assert!(is_same_location(&a, &b));
        assert!(is_same_location(&b, &a));
    }

    #[test]
    fn portuguese_country_name_matches_code() {
        let a = place("Curitiba", Some("Paraná"), "Brasil", -25.4, -49.2);
        let b = place("Curitiba", Some("Parana"), "BR", -20.0, -40.0);
        assert!(is_same_location(&a, &b));
    }

    #[test]
    fn homonyms_in_different_regions_are_distinct() {
        let a = place("Urupema", Some("Santa Catarina"), "BR", -27.95, -49.87);
        let b = place("Urupema", Some("Alagoas"), "BR", -9.5, -36.5);
        assert!(!is_same_location(&a, &b));
    }

    #[test]
    fn far_apart_when_only_one_axis_is_close() {
        let a = place("Bonito", Some("Mato Grosso do Sul"), "BR", -21.12, -56.48);
        let b = place("Bonito", Some("Pernambuco"), "BR", -21.15, -35.72);
        assert!(!is_same_location(&a, &b));
    }

    #[test]
    fn nearby_coordinates_win_over_spelling() {
        let a = place("São Paulo", Some("São Paulo"), "BR", -23.5475, -46.6361);
        let b = place("Sampa", None, "Brazil", -23.55, -46.63);
        assert!(is_same_location(&a, &b));
    }

    #[test]
    fn proximity_threshold_is_exclusive() {
        let a = place("A", None, "BR", 0.0, 0.0);
        let b = place("B", None, "BR", 0.1, 0.0);
        assert!(!is_same_location(&a, &b));
        let c = place("C", None, "BR", 0.099, -0.099);
        assert!(is_same_location(&a, &c));
    }

    #[test]
    fn missing_region_on_one_side_needs_coordinates() {
        let a = place("Urupema", Some("Santa Catarina"), "BR", -27.95, -49.87);
        let b = place("Urupema", None, "BR", -9.5, -36.5);
        assert!(!is_same_location(&a, &b));
        let c = place("Urupema", None, "BR", -27.9, -49.9);
        assert!(is_same_location(&a, &c));
    }

    #[test]
    fn both_regions_unset_compare_by_name_and_country() {
        let a = place("Lisbon", None, "PT", 38.7, -9.1);
        let b = place("Lisbon", None, "Portugal", 0.0, 0.0);
        assert!(is_same_location(&a, &b));
    }

    #[test]
    fn different_countries_do_not_match_by_name() {
        let a = place("Santiago", None, "CL", -33.45, -70.66);
        let b = place("Santiago", None, "ES", 42.88, -8.54);
        assert!(!is_same_location(&a, &b));
    }

    #[test]
    fn non_finite_coordinates_never_match_by_proximity() {
        let a = place("A", None, "BR", f64::NAN, 0.0);
        let b = place("B", None, "BR", 0.0, 0.0);
        assert!(!is_same_location(&a, &b));
    }

    #[test]
    fn countries_compatible_cases() {
        assert!(countries_compatible("BR", "Brazil"));
        assert!(countries_compatible("Japão", "jp"));
        assert!(countries_compatible("", "Chile"));
        assert!(!countries_compatible("BR", "PT"));
        assert!(!countries_compatible("Atlantis", "Brazil"));
        assert!(countries_compatible("UK", "GB"));
        assert!(countries_compatible("uk", "United Kingdom"));
    }

    #[test]
    fn vietnamese_spelling_without_diacritics_is_same_place() {
        let a = place("Đà Nẵng", None, "VN", 16.05, 108.20);
        let b = place("Da Nang", None, "VN", 16.20, 108.40);
        assert!(is_same_location(&a, &b));
    }
}
