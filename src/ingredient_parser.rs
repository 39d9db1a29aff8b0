//! # Ingredient Parser
//!
//! Turns free text typed into the "add ingredient" prompt into a
//! `{quantity, unit, name}` triple, and normalizes ingredient names so the
//! pantry and the matcher agree on spelling.
//!
//! ## Features
//!
//! - Whole numbers, decimals (`1.5`, `1,5`), fractions (`1/2`, `1 1/2`) and
//!   unicode fractions (`½`)
//! - English, Spanish and French unit labels (`g`, `cups`, `cucharadas`,
//!   `cuillères à soupe`, ...)
//! - Quantity-only lines (`6 huevos`) and bare names (`sal`)
//! - Leading `de`/`of` connectors are dropped from the name
//!
//! ## Usage
//!
//! ```rust
//! use recetas::ingredient_parser::parse_ingredient_line;
//!
//! let parsed = parse_ingredient_line("500 g de Harina").unwrap();
//! assert_eq!(parsed.quantity, "500");
//! assert_eq!(parsed.unit, "g");
//! assert_eq!(parsed.name, "harina");
//! ```

use lazy_static::lazy_static;
use log::trace;
use regex::Regex;

/// A free text ingredient line split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedIngredient {
    /// Amount as typed (e.g., "500", "1 1/2", "½"), empty when absent
    pub quantity: String,
    /// Unit label in lowercase, empty when absent
    pub unit: String,
    /// Normalized ingredient name
    pub name: String,
}

// Leading quantity: mixed fraction, fraction, decimal/integer, or unicode fraction
const LINE_PATTERN: &str =
    r"^\s*(?P<qty>\d+\s+\d+/\d+|\d+/\d+|\d+(?:[.,]\d+)?|[½⅓⅔¼¾⅕⅛⅜⅝⅞])?\s*(?P<rest>.*?)\s*$";

lazy_static! {
    static ref LINE_REGEX: Regex =
        Regex::new(LINE_PATTERN).expect("Ingredient line pattern should be valid");
    static ref WHITESPACE_REGEX: Regex =
        Regex::new(r"\s+").expect("Whitespace pattern should be valid");

    /// Known unit labels, longest first so multi-word units win
    static ref UNIT_LABELS: Vec<&'static str> = {
        let mut units = vec![
            // Weight
            "g", "gr", "gramo", "gramos", "gram", "grams", "gramme", "grammes",
            "kg", "kilo", "kilos", "kilogram", "kilograms", "kilogramo", "kilogramos",
            "mg", "oz", "ounce", "ounces", "onza", "onzas", "lb", "lbs", "pound", "pounds",
            "libra", "libras",
            // Volume
            "ml", "cl", "dl", "l", "liter", "liters", "litre", "litres", "litro", "litros",
            "cup", "cups", "taza", "tazas", "tasse", "tasses",
            "tsp", "teaspoon", "teaspoons", "tbsp", "tablespoon", "tablespoons",
            "cucharada", "cucharadas", "cucharadita", "cucharaditas",
            "cuillère à soupe", "cuillères à soupe", "cuillère à café", "cuillères à café",
            // Count
            "pinch", "pinches", "pizca", "pizcas", "pincée", "pincées",
            "clove", "cloves", "diente", "dientes", "gousse", "gousses",
            "can", "cans", "lata", "latas", "boîte", "boîtes",
            "slice", "slices", "rebanada", "rebanadas", "tranche", "tranches",
            "piece", "pieces", "pieza", "piezas", "unidad", "unidades",
            "bunch", "manojo", "manojos",
        ];
        units.sort_by_key(|unit| std::cmp::Reverse(unit.chars().count()));
        units
    };
}

// Connectors between a unit and the ingredient ("500 g de harina", "1 cup of milk")
const NAME_CONNECTORS: &[&str] = &["de ", "del ", "d'", "of "];

/// Normalize an ingredient name: trim, lowercase, collapse inner whitespace
///
/// ```rust
/// use recetas::ingredient_parser::normalize_name;
///
/// assert_eq!(normalize_name("  Aceite   de  Oliva "), "aceite de oliva");
/// ```
pub fn normalize_name(name: &str) -> String {
    WHITESPACE_REGEX
        .replace_all(name.trim(), " ")
        .to_lowercase()
}

/// Parse a free text ingredient line
///
/// Returns `None` when the line has no ingredient name (empty line, or a
/// quantity and unit with nothing after them).
pub fn parse_ingredient_line(line: &str) -> Option<ParsedIngredient> {
    let captures = LINE_REGEX.captures(line)?;
    let quantity = captures
        .name("qty")
        .map(|m| WHITESPACE_REGEX.replace_all(m.as_str(), " ").into_owned())
        .unwrap_or_default();
    let rest = normalize_name(captures.name("rest").map_or("", |m| m.as_str()));

    // Units are only recognized after a quantity, so "sal" or "lata" alone stay names
    let (unit, remainder) = if quantity.is_empty() {
        (String::new(), rest.as_str())
    } else {
        split_unit(&rest)
    };

    let name = strip_connector(remainder).trim().to_string();
    if name.is_empty() {
        trace!("No ingredient name in line: {:?}", line);
        return None;
    }

    Some(ParsedIngredient {
        quantity,
        unit,
        name,
    })
}

/// Split a known unit label off the front of `text`
fn split_unit(text: &str) -> (String, &str) {
    for unit in UNIT_LABELS.iter() {
        if let Some(after) = text.strip_prefix(unit) {
            // The unit must be a whole word: "g harina" yes, "garbanzos" no
            if after.is_empty() || after.starts_with(' ') {
                return (unit.to_string(), after.trim_start());
            }
        }
    }
    (String::new(), text)
}

/// Drop a leading "de"/"of"-style connector; a lone connector leaves nothing
fn strip_connector(text: &str) -> &str {
    if NAME_CONNECTORS
        .iter()
        .any(|connector| text == connector.trim_end_matches(' '))
    {
        return "";
    }
    NAME_CONNECTORS
        .iter()
        .find_map(|connector| text.strip_prefix(connector))
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_unit_requires_word_boundary() {
        assert_eq!(split_unit("garbanzos"), (String::new(), "garbanzos"));
        assert_eq!(split_unit("g garbanzos"), ("g".to_string(), "garbanzos"));
    }

    #[test]
    fn test_multi_word_unit_wins() {
        let (unit, rest) = split_unit("cuillères à soupe de sucre");
        assert_eq!(unit, "cuillères à soupe");
        assert_eq!(rest, "de sucre");
    }

    #[test]
    fn test_strip_connector() {
        assert_eq!(strip_connector("de harina"), "harina");
        assert_eq!(strip_connector("of milk"), "milk");
        assert_eq!(strip_connector("d'huile"), "huile");
        assert_eq!(strip_connector("dátiles"), "dátiles");
        assert_eq!(strip_connector("de"), "");
        assert_eq!(strip_connector("del"), "");
        assert_eq!(strip_connector("delicias"), "delicias");
    }
}
