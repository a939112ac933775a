//! QC event annotations: date-range widening, stacking, and legend entries.
//!
//! Annotations mark instrument events (column change, recalibration, …) on
//! the x-axis. They widen the plotted date range and contribute legend
//! entries; they never feed any statistic. Markers landing on the same date
//! stack vertically via `y_step_index`.

use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::dates::{format_axis_key, optional_datetime};
use crate::payload::AnnotationRow;
use crate::plot_type::{LegendEntry, LegendShape};

#[derive(Debug, Clone, Serialize)]
pub struct Annotation {
    #[serde(rename = "Date", with = "optional_datetime")]
    pub date: Option<NaiveDateTime>,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Created", with = "optional_datetime", skip_serializing_if = "Option::is_none")]
    pub created: Option<NaiveDateTime>,
    #[serde(rename = "CreatedBy", skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Color", skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Stacking slot among annotations sharing this date, 0-based.
    #[serde(rename = "yStepIndex")]
    pub y_step_index: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnnotationSet {
    pub annotations: Vec<Annotation>,
    /// One legend entry per distinct annotation type name.
    pub legend: Vec<LegendEntry>,
    /// Largest number of annotations stacked on a single date, for top-margin
    /// layout.
    #[serde(rename = "maxStacked")]
    pub max_stacked: usize,
}

/// Assign stacking slots and collect the unique (name, color) legend entries.
pub fn process_annotations(rows: &[AnnotationRow], grouped_x: bool) -> AnnotationSet {
    let mut date_count: FxHashMap<String, usize> = FxHashMap::default();
    let mut annotations = Vec::with_capacity(rows.len());
    let mut legend: Vec<LegendEntry> = Vec::new();

    for row in rows {
        let y_step_index = match row.date {
            Some(date) => {
                let key = format_axis_key(&date, grouped_x);
                let count = date_count.entry(key).or_insert(0);
                let index = *count;
                *count += 1;
                index
            }
            None => 0,
        };

        if !legend.iter().any(|entry| entry.text == row.name) {
            legend.push(LegendEntry {
                name: None,
                text: row.name.clone(),
                color: row.color.as_ref().map(|color| format!("#{color}")),
                shape: Some(LegendShape::X),
                separator: false,
                hover_text: None,
            });
        }

        annotations.push(Annotation {
            date: row.date,
            description: row.description.clone(),
            created: row.created,
            created_by: row.created_by.clone(),
            name: row.name.clone(),
            color: row.color.clone(),
            y_step_index,
        });
    }

    let max_stacked = date_count.values().copied().max().unwrap_or(0);
    AnnotationSet {
        annotations,
        legend,
        max_stacked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_datetime;

    fn row(date: &str, name: &str, color: &str) -> AnnotationRow {
        AnnotationRow {
            date: Some(parse_datetime(date).unwrap()),
            description: None,
            created: None,
            created_by: None,
            name: name.to_string(),
            color: Some(color.to_string()),
        }
    }

    #[test]
    fn same_date_annotations_stack() {
        let rows = vec![
            row("2024-03-01 10:00", "Column Change", "FF0000"),
            row("2024-03-01 10:00", "Recalibration", "00FF00"),
            row("2024-03-02 09:00", "Column Change", "FF0000"),
        ];
        let set = process_annotations(&rows, false);
        assert_eq!(set.annotations[0].y_step_index, 0);
        assert_eq!(set.annotations[1].y_step_index, 1);
        assert_eq!(set.annotations[2].y_step_index, 0);
        assert_eq!(set.max_stacked, 2);
    }

    #[test]
    fn grouped_x_stacks_by_day() {
        let rows = vec![
            row("2024-03-01 10:00", "Column Change", "FF0000"),
            row("2024-03-01 18:00", "Recalibration", "00FF00"),
        ];
        let ungrouped = process_annotations(&rows, false);
        assert_eq!(ungrouped.max_stacked, 1);
        let grouped = process_annotations(&rows, true);
        assert_eq!(grouped.max_stacked, 2);
    }

    #[test]
    fn legend_entries_are_unique_per_name() {
        let rows = vec![
            row("2024-03-01 10:00", "Column Change", "FF0000"),
            row("2024-03-02 10:00", "Column Change", "FF0000"),
        ];
        let set = process_annotations(&rows, false);
        assert_eq!(set.legend.len(), 1);
        assert_eq!(set.legend[0].color.as_deref(), Some("#FF0000"));
    }
}
