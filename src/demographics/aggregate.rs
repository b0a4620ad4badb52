use std::collections::BTreeMap;
use std::fmt;

use super::ExtractionError;
use super::extract::{Demographics, RecordId, record_id};
use crate::fhir::BundleEntry;

/// Rendered in place of a missing birth date
pub const BIRTH_DATE_NOT_FOUND: &str = "not found";

/// Demographics keyed by record identity
pub type AggregateMap = BTreeMap<RecordId, Demographics>;

/// Records ordered by first name
pub type SortedView = Vec<(RecordId, Demographics)>;

/// Extract demographics from every entry, keyed by record identity
///
/// Duplicate records collapse to one entry, the last one seen winning. The
/// first malformed entry aborts aggregation.
pub fn aggregate<'a, I>(entries: I) -> Result<AggregateMap, ExtractionError>
where
    I: IntoIterator<Item = &'a BundleEntry>,
{
    let mut map = AggregateMap::new();
    for entry in entries {
        let id = record_id(entry)?;
        let demographics = Demographics::from_entry(entry)?;
        map.insert(id, demographics);
    }
    Ok(map)
}

/// Stable ascending sort on first name
///
/// Records sharing a first name keep their relative order.
pub fn sort_by_first_name(mut pairs: SortedView) -> SortedView {
    pairs.sort_by(|(_, a), (_, b)| a.first_name.cmp(&b.first_name));
    pairs
}

/// Aggregate map as a view sorted by first name
pub fn sorted_view(map: AggregateMap) -> SortedView {
    sort_by_first_name(map.into_iter().collect())
}

impl Demographics {
    pub fn birth_date_or_not_found(&self) -> &str {
        self.birth_date.as_deref().unwrap_or(BIRTH_DATE_NOT_FOUND)
    }
}

/// One person of a report, numbered from 1
pub struct PersonReport<'a> {
    pub position: usize,
    pub demographics: &'a Demographics,
}

impl fmt::Display for PersonReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Person {} :", self.position)?;
        writeln!(f, "The first name is {}", self.demographics.first_name)?;
        writeln!(f, "The last name is {}", self.demographics.last_name)?;
        match &self.demographics.birth_date {
            Some(date) => write!(f, "The birth date is {date}"),
            None => write!(f, "No birth date is found"),
        }
    }
}

/// Render every person of `view` in order
pub fn render_report(view: &SortedView) -> String {
    view.iter()
        .enumerate()
        .map(|(index, (_, demographics))| {
            PersonReport {
                position: index + 1,
                demographics,
            }
            .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fhir::{HumanName, Resource};

    fn patient(id: &str, given: &str, family: &str, birth_date: Option<&str>) -> BundleEntry {
        BundleEntry {
            full_url: None,
            resource: Resource {
                resource_type: "Patient".to_string(),
                id: Some(id.to_string()),
                name: vec![HumanName {
                    use_: None,
                    family: Some(family.to_string()),
                    given: vec![given.to_string()],
                }],
                birth_date: birth_date.map(str::to_string),
            },
        }
    }

    fn pair(id: &str, first: &str) -> (RecordId, Demographics) {
        let entry = patient(id, first, "Smith", None);
        (record_id(&entry).unwrap(), Demographics::from_entry(&entry).unwrap())
    }

    fn first_names(view: &SortedView) -> Vec<&str> {
        view.iter().map(|(_, d)| d.first_name.as_str()).collect()
    }

    #[test]
    fn test_aggregate_keys_by_record_id() {
        let entries = vec![
            patient("1", "Jane", "Smith", Some("1980-05-01")),
            patient("2", "Adam", "Smith", None),
            patient("1", "Jane", "Smith", Some("1980-05-01")),
        ];

        let map = aggregate(&entries).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.values().map(|d| d.first_name.as_str()).collect::<Vec<_>>(), vec!["Jane", "Adam"]);
    }

    #[test]
    fn test_aggregate_propagates_malformed_record() {
        let mut broken = patient("3", "x", "Smith", None);
        broken.resource.name[0].given.clear();
        let entries = vec![patient("1", "Jane", "Smith", None), broken];

        assert_eq!(
            aggregate(&entries),
            Err(ExtractionError::MissingGivenName {
                record: "3".to_string()
            })
        );
    }

    #[test]
    fn test_sort_is_non_decreasing_permutation() {
        let input = vec![
            pair("a", "Mary"),
            pair("b", "adam"),
            pair("c", "Zoe"),
            pair("d", "Adam"),
            pair("e", "Mary"),
        ];
        let sorted = sort_by_first_name(input.clone());

        assert!(sorted.windows(2).all(|w| w[0].1.first_name <= w[1].1.first_name));

        let mut expected_ids: Vec<_> = input.iter().map(|(id, _)| id.clone()).collect();
        let mut sorted_ids: Vec<_> = sorted.iter().map(|(id, _)| id.clone()).collect();
        expected_ids.sort();
        sorted_ids.sort();
        assert_eq!(expected_ids, sorted_ids);

        // Byte order: uppercase sorts before lowercase
        assert_eq!(first_names(&sorted), vec!["Adam", "Mary", "Mary", "Zoe", "adam"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_first_names() {
        let sorted = sort_by_first_name(vec![pair("z", "Mary"), pair("a", "Beth"), pair("m", "Mary")]);
        let ids: Vec<_> = sorted.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["a", "z", "m"]);
    }

    #[test]
    fn test_sort_is_idempotent() {
        let once = sort_by_first_name(vec![pair("1", "Carl"), pair("2", "Anna"), pair("3", "Carl")]);
        let twice = sort_by_first_name(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_report_renders_missing_birth_date() {
        let entries = vec![
            patient("1", "Zed", "Smith", Some("1975-01-31")),
            patient("2", "Amy", "Smith", None),
        ];
        let view = sorted_view(aggregate(&entries).unwrap());

        assert_eq!(view[0].1.birth_date_or_not_found(), BIRTH_DATE_NOT_FOUND);
        assert_eq!(view[1].1.birth_date_or_not_found(), "1975-01-31");
        assert_eq!(
            render_report(&view),
            "Person 1 :\n\
             The first name is Amy\n\
             The last name is Smith\n\
             No birth date is found\n\
             Person 2 :\n\
             The first name is Zed\n\
             The last name is Smith\n\
             The birth date is 1975-01-31"
        );
    }
}
