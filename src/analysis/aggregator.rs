//! Record aggregation and chart data.
//!
//! This module derives the frequency tables behind the sector and region
//! charts. Everything here is recomputed from the current result set on
//! each render and never stored.

use crate::models::Record;
use serde::Serialize;

/// Colours cycled across pie slices.
pub const PIE_PALETTE: [&str; 7] = [
    "#6366f1", "#a855f7", "#ec4899", "#f43f5e", "#f59e0b", "#10b981", "#06b6d4",
];

/// Fill colour of the bar chart.
pub const BAR_COLOR: &str = "rgba(99, 102, 241, 0.6)";

/// Count of records sharing one category value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

/// Category counts in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FrequencyTable {
    entries: Vec<CategoryCount>,
}

impl FrequencyTable {
    /// Counts one occurrence of `category`.
    pub fn increment(&mut self, category: &str) {
        match self.entries.iter_mut().find(|e| e.category == category) {
            Some(entry) => entry.count += 1,
            None => self.entries.push(CategoryCount {
                category: category.to_string(),
                count: 1,
            }),
        }
    }

    #[cfg(test)]
    pub fn get(&self, category: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.category == category)
            .map(|e| e.count)
    }

    pub fn entries(&self) -> &[CategoryCount] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }

    /// Largest single count, zero when empty.
    pub fn max_count(&self) -> usize {
        self.entries.iter().map(|e| e.count).max().unwrap_or(0)
    }
}

/// Frequency tables derived from a result set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Aggregates {
    pub by_sector: FrequencyTable,
    pub by_region: FrequencyTable,
}

/// Count records by sector and by region.
///
/// Records without a value for a field are left out of that table.
pub fn aggregate(records: &[Record]) -> Aggregates {
    let mut aggregates = Aggregates::default();

    for record in records {
        if let Some(sector) = record.sector() {
            aggregates.by_sector.increment(&sector);
        }
        if let Some(region) = record.region() {
            aggregates.by_region.increment(&region);
        }
    }

    aggregates
}

/// Single-dataset chart input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartData {
    pub label: String,
    pub labels: Vec<String>,
    pub data: Vec<usize>,
    /// One colour per label.
    pub colors: Vec<String>,
}

/// Bar chart keyed by sector.
pub fn bar_chart(by_sector: &FrequencyTable) -> ChartData {
    ChartData {
        label: "Records by Sector".to_string(),
        labels: by_sector.entries().iter().map(|e| e.category.clone()).collect(),
        data: by_sector.entries().iter().map(|e| e.count).collect(),
        colors: vec![BAR_COLOR.to_string(); by_sector.len()],
    }
}

/// Pie chart keyed by region, palette reused past seven slices.
pub fn pie_chart(by_region: &FrequencyTable) -> ChartData {
    ChartData {
        label: "Records by Region".to_string(),
        labels: by_region.entries().iter().map(|e| e.category.clone()).collect(),
        data: by_region.entries().iter().map(|e| e.count).collect(),
        colors: (0..by_region.len())
            .map(|i| palette_color(i).to_string())
            .collect(),
    }
}

pub fn palette_color(index: usize) -> &'static str {
    PIE_PALETTE[index % PIE_PALETTE.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_record(id: i64, sector: Option<&str>, region: Option<&str>) -> Record {
        let mut pairs = vec![("id", json!(id))];
        if let Some(sector) = sector {
            pairs.push(("sector", json!(sector)));
        }
        if let Some(region) = region {
            pairs.push(("region", json!(region)));
        }
        Record::from_pairs(pairs)
    }

    #[test]
    fn test_aggregate_energy_scenario() {
        let records = vec![
            create_test_record(1, Some("Energy"), Some("EU")),
            create_test_record(2, Some("Energy"), Some("EU")),
        ];

        let aggregates = aggregate(&records);

        assert_eq!(aggregates.by_sector.len(), 1);
        assert_eq!(aggregates.by_sector.get("Energy"), Some(2));
        assert_eq!(aggregates.by_region.len(), 1);
        assert_eq!(aggregates.by_region.get("EU"), Some(2));
    }

    #[test]
    fn test_missing_and_empty_fields_are_excluded() {
        let records = vec![
            create_test_record(1, Some("Energy"), None),
            create_test_record(2, Some(""), Some("Asia")),
            create_test_record(3, None, Some("Asia")),
        ];

        let aggregates = aggregate(&records);

        assert_eq!(aggregates.by_sector.entries().len(), 1);
        assert_eq!(aggregates.by_sector.total(), 1);
        assert_eq!(aggregates.by_region.get("Asia"), Some(2));
        assert_eq!(aggregates.by_sector.get(""), None);
    }

    #[test]
    fn test_counts_match_records_per_key() {
        let sectors = ["Energy", "Retail", "Energy", "Aerospace", "Retail", "Energy"];
        let records: Vec<_> = sectors
            .iter()
            .enumerate()
            .map(|(i, s)| create_test_record(i as i64, Some(*s), None))
            .collect();

        let table = aggregate(&records).by_sector;

        for entry in table.entries() {
            let expected = sectors.iter().filter(|s| **s == entry.category).count();
            assert_eq!(entry.count, expected);
        }
        assert_eq!(table.len(), 3);
        assert_eq!(table.total(), sectors.len());
    }

    #[test]
    fn test_first_seen_order() {
        let records = vec![
            create_test_record(1, Some("Retail"), None),
            create_test_record(2, Some("Energy"), None),
            create_test_record(3, Some("Retail"), None),
        ];

        let labels = bar_chart(&aggregate(&records).by_sector).labels;
        assert_eq!(labels, vec!["Retail", "Energy"]);
    }

    #[test]
    fn test_pie_palette_cycles() {
        let mut table = FrequencyTable::default();
        for i in 0..9 {
            table.increment(&format!("Region {}", i));
        }

        let chart = pie_chart(&table);

        assert_eq!(chart.colors.len(), 9);
        assert_eq!(chart.colors[7], chart.colors[0]);
        assert_eq!(chart.colors[8], "#a855f7");
        assert_eq!(chart.label, "Records by Region");
    }

    #[test]
    fn test_empty_result_set() {
        let aggregates = aggregate(&[]);
        assert!(aggregates.by_sector.is_empty());
        assert!(aggregates.by_region.is_empty());
        assert_eq!(aggregates.by_sector.max_count(), 0);
    }
}
