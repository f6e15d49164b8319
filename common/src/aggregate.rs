//! Tally of detections per label.
//!
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{labels::LabelMap, protocol::Detection, LookupError};

/// Number of detections sharing one label.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CountRow {
    pub label: String,
    pub count: usize,
}

/// Per-label counts of one inference, sorted by label.
///
/// Every label appears in at most one row and every count is positive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct CountTable {
    rows: Vec<CountRow>,
}

impl CountTable {
    pub fn rows(&self) -> &[CountRow] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CountRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum of all counts, i.e. the number of detections the table was built from.
    pub fn total(&self) -> usize {
        self.rows.iter().map(|row| row.count).sum()
    }
}

impl<'a> IntoIterator for &'a CountTable {
    type Item = &'a CountRow;
    type IntoIter = std::slice::Iter<'a, CountRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Count category ids by their label.
///
/// Ids that share a label are merged into a single row. Fails on the first id, in input
/// order, without a label, in which case no table is returned at all.
pub fn count_by_label<I>(category_ids: I, labels: &LabelMap) -> Result<CountTable, LookupError>
where
    I: IntoIterator<Item = u32>,
{
    let mut per_label: BTreeMap<&str, usize> = BTreeMap::new();
    for category_id in category_ids {
        *per_label.entry(labels.get(category_id)?).or_default() += 1;
    }

    let rows = per_label
        .into_iter()
        .map(|(label, count)| CountRow {
            label: label.to_owned(),
            count,
        })
        .collect();

    Ok(CountTable { rows })
}

pub fn count_detections(
    detections: &[Detection],
    labels: &LabelMap,
) -> Result<CountTable, LookupError> {
    count_by_label(detections.iter().map(|d| d.category_id), labels)
}

#[cfg(test)]
mod test {
    use super::*;

    fn row(label: &str, count: usize) -> CountRow {
        CountRow {
            label: label.into(),
            count,
        }
    }

    #[test]
    fn empty_input_gives_empty_table() {
        let table = count_by_label([], &LabelMap::coco()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.total(), 0);
    }

    #[test]
    fn shared_label_is_summed() {
        let labels: LabelMap = [(0, "person"), (1, "person")].into_iter().collect();
        let table = count_by_label([0, 0, 1], &labels).unwrap();
        assert_eq!(table.rows(), &[row("person", 3)]);
    }

    #[test]
    fn rows_sorted_by_label() {
        let labels: LabelMap = [(0, "car"), (1, "bus"), (2, "person")]
            .into_iter()
            .collect();
        let table = count_by_label([2, 0, 2, 1], &labels).unwrap();
        assert_eq!(
            table.rows(),
            &[row("bus", 1), row("car", 1), row("person", 2)]
        );
    }

    #[test]
    fn missing_label_fails_whole_table() {
        let labels: LabelMap = [(0, "car")].into_iter().collect();
        assert_eq!(count_by_label([0, 0, 7, 0], &labels), Err(LookupError(7)));
    }

    #[test]
    fn first_missing_label_in_input_order_is_reported() {
        let labels: LabelMap = [(0, "car")].into_iter().collect();
        for _ in 0..50 {
            assert_eq!(count_by_label([5, 0, 6, 7, 8], &labels), Err(LookupError(5)));
        }
        assert_eq!(count_by_label([0, 8, 6, 5], &labels), Err(LookupError(8)));
    }

    #[test]
    fn counts_add_up_and_labels_unique() {
        let labels: LabelMap = (0..12).map(|id| (id, format!("label-{}", id % 5))).collect();
        let ids: Vec<u32> = (0..200).map(|i| (i * 7 + i / 3) % 12).collect();

        let table = count_by_label(ids.iter().copied(), &labels).unwrap();
        assert_eq!(table.total(), ids.len());
        assert_eq!(table.len(), 5);
        assert!(table.rows().windows(2).all(|w| w[0].label < w[1].label));
        assert!(table.iter().all(|row| row.count > 0));
    }

    #[test]
    fn count_detection_categories() {
        let detections = [
            Detection::new([0.0, 0.0, 10.0, 10.0], 0.9, 16),
            Detection::new([5.0, 5.0, 20.0, 20.0], 0.8, 0),
            Detection::new([30.0, 5.0, 40.0, 20.0], 0.7, 16),
        ];
        let table = count_detections(&detections, &LabelMap::coco()).unwrap();
        assert_eq!(table.rows(), &[row("dog", 2), row("person", 1)]);
    }
}
