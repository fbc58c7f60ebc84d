//! Output formatting for filters, as JSON or as a table.

use owo_colors::OwoColorize;
use prep_filter_rs::{DisplayValue, FilterDescriptor, TreeNode};
use serde::Serialize;

/// JSON output structure for a single filter.
///
/// The descriptor's wire fields plus its derived display values.
#[derive(Serialize)]
pub struct FilterOutput<'a> {
    #[serde(flatten)]
    pub filter: &'a FilterDescriptor,
    pub value: &'a [DisplayValue],
}

impl<'a> From<&'a FilterDescriptor> for FilterOutput<'a> {
    fn from(filter: &'a FilterDescriptor) -> Self {
        Self {
            filter,
            value: filter.value(),
        }
    }
}

/// JSON output structure for the create command.
#[derive(Serialize)]
pub struct CreatedFilterOutput<'a> {
    pub filter: FilterOutput<'a>,
    pub tree: &'a TreeNode,
}

/// Collects the JSON output of a filter list.
pub fn filters_output(filters: &[FilterDescriptor]) -> Vec<FilterOutput<'_>> {
    filters.iter().map(FilterOutput::from).collect()
}

/// Renders the display values of a filter on one line.
pub fn format_values(values: &[DisplayValue]) -> String {
    values
        .iter()
        .map(|value| match value {
            DisplayValue::Text { value } => value.as_str(),
            DisplayValue::Interval { label, .. } | DisplayValue::Label { label, .. } => {
                label.as_str()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Truncates a string to a maximum number of characters.
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        s.to_string()
    }
}

/// Formats filters as a table.
pub fn format_filters_table(filters: &[FilterDescriptor], use_colors: bool) -> String {
    if filters.is_empty() {
        return "No filters.\n".to_string();
    }

    let mut output = String::new();

    let header = format!("{:<16} {:<20} {}", "Type", "Column", "Values");
    if use_colors {
        output.push_str(&format!("{}\n", header.dimmed()));
    } else {
        output.push_str(&header);
        output.push('\n');
    }

    for filter in filters {
        let column = filter
            .column_name()
            .or(filter.column_id())
            .map(|c| truncate_str(c, 20))
            .unwrap_or_else(|| "*".to_string());
        let filter_type = filter.filter_type().as_str();
        let filter_type = if use_colors {
            filter_type.cyan().to_string()
        } else {
            filter_type.to_string()
        };
        let values = truncate_str(&format_values(filter.value()), 50);

        // Padding counts escape codes, so pad the plain name first.
        let padding = 16usize.saturating_sub(filter.filter_type().as_str().len());
        output.push_str(&format!(
            "{}{} {:<20} {}\n",
            filter_type,
            " ".repeat(padding),
            column,
            values
        ));
    }

    output
}
