//! Division ordering.

use std::cmp::Ordering;

use crate::config::ABSENT_SORT_KEY;
use crate::schema::StructureSchema;
use crate::types::Division;

/// Split a value into its leading ASCII digits and the rest.
fn split_numeric(value: &str) -> (&str, &str) {
    let end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    value.split_at(end)
}

/// Compare two digit strings by numeric value without parsing them.
fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Natural ordering of citation values: `2 < 10 < 10a < 11`, and values
/// without a numeric prefix after all numbered ones.
///
/// # Examples
/// ```
/// use std::cmp::Ordering;
/// use textus_segmenter::segmentation::natural_cmp;
///
/// assert_eq!(natural_cmp("2", "10"), Ordering::Less);
/// assert_eq!(natural_cmp("10a", "10"), Ordering::Greater);
/// assert_eq!(natural_cmp("pr", "1"), Ordering::Greater);
/// ```
#[must_use]
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (a_num, a_rest) = split_numeric(a);
    let (b_num, b_rest) = split_numeric(b);

    match (a_num.is_empty(), b_num.is_empty()) {
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (true, true) => a.cmp(b),
        (false, false) => cmp_digits(a_num, b_num)
            .then_with(|| a_rest.cmp(b_rest))
            .then_with(|| a.cmp(b)),
    }
}

/// Sort divisions by the schema's ordering fields.
///
/// Missing values sort as [`ABSENT_SORT_KEY`]. The sort is stable, so
/// divisions with equal keys keep source order. Schemas without a principal
/// ordering field leave the divisions untouched.
pub fn order_divisions(divisions: &mut [Division], schema: &StructureSchema) {
    let fields = schema.ordering_fields();
    if fields.is_empty() {
        tracing::debug!("schema has no ordering field, keeping source order");
        return;
    }

    divisions.sort_by(|a, b| {
        fields.iter().fold(Ordering::Equal, |ordering, field| {
            ordering.then_with(|| {
                natural_cmp(
                    a.fields.get(*field).unwrap_or(ABSENT_SORT_KEY),
                    b.fields.get(*field).unwrap_or(ABSENT_SORT_KEY),
                )
            })
        })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DivisionField, DivisionFields};
    use pretty_assertions::assert_eq;

    fn division(citation: &str, values: &[(DivisionField, &str)]) -> Division {
        let mut fields = DivisionFields::default();
        for (field, value) in values {
            fields.set(*field, *value);
        }
        Division::new("0059", "030", fields, citation)
    }

    fn citations(divisions: &[Division]) -> Vec<&str> {
        divisions.iter().map(|d| d.citation.as_str()).collect()
    }

    #[test]
    fn test_natural_cmp() {
        assert_eq!(natural_cmp("2", "10"), Ordering::Less);
        assert_eq!(natural_cmp("10", "10a"), Ordering::Less);
        assert_eq!(natural_cmp("10b", "11"), Ordering::Less);
        assert_eq!(natural_cmp("007", "7"), Ordering::Less);
        assert_eq!(natural_cmp("7", "7"), Ordering::Equal);
        assert_eq!(natural_cmp("a", "b"), Ordering::Less);
        assert_eq!(natural_cmp("99999999999999999999999", "1"), Ordering::Greater);
    }

    #[test]
    fn test_order_by_principal_field() {
        let schema = StructureSchema::new(
            "0059",
            "030",
            vec!["book".to_string(), "section".to_string()],
        )
        .unwrap();

        let mut divisions = vec![
            division("s10", &[(DivisionField::Section, "10")]),
            division("s2", &[(DivisionField::Section, "2")]),
            division("s10a", &[(DivisionField::Section, "10a")]),
        ];
        order_divisions(&mut divisions, &schema);
        assert_eq!(citations(&divisions), vec!["s2", "s10", "s10a"]);
    }

    #[test]
    fn test_order_ties_by_chapter_then_first_level() {
        let schema = StructureSchema::new(
            "0059",
            "030",
            vec!["volume".to_string(), "chapter".to_string(), "section".to_string()],
        )
        .unwrap();

        let mut divisions = vec![
            division(
                "v2c1s1",
                &[
                    (DivisionField::Volume, "2"),
                    (DivisionField::Chapter, "1"),
                    (DivisionField::Section, "1"),
                ],
            ),
            division(
                "v1c2s1",
                &[
                    (DivisionField::Volume, "1"),
                    (DivisionField::Chapter, "2"),
                    (DivisionField::Section, "1"),
                ],
            ),
            division(
                "v1c1s1",
                &[
                    (DivisionField::Volume, "1"),
                    (DivisionField::Chapter, "1"),
                    (DivisionField::Section, "1"),
                ],
            ),
        ];
        order_divisions(&mut divisions, &schema);
        assert_eq!(citations(&divisions), vec!["v1c1s1", "v2c1s1", "v1c2s1"]);
    }

    #[test]
    fn test_absent_key_sorts_as_one_and_is_stable() {
        let schema = StructureSchema::fallback();
        let mut divisions = vec![
            division("c2", &[(DivisionField::Chapter, "2")]),
            division("none", &[]),
            division("c1", &[(DivisionField::Chapter, "1")]),
        ];
        order_divisions(&mut divisions, &schema);
        assert_eq!(citations(&divisions), vec!["none", "c1", "c2"]);
    }

    #[test]
    fn test_line_first_schema_keeps_source_order() {
        let schema =
            StructureSchema::new("0059", "030", vec!["line".to_string(), "chapter".to_string()])
                .unwrap();
        let mut divisions = vec![
            division("b", &[(DivisionField::Chapter, "2")]),
            division("a", &[(DivisionField::Chapter, "1")]),
        ];
        order_divisions(&mut divisions, &schema);
        assert_eq!(citations(&divisions), vec!["b", "a"]);
    }
}
