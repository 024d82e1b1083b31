use serde::Deserialize;

/// Body of the AJAX edit and delete posts.
///
/// `row_data[]` repeats once per column, so the form is read as raw pairs
/// rather than through a derived struct.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowForm {
    pub table_name: Option<String>,
    pub row_data: Vec<String>,
    pub confirm: bool,
}

impl RowForm {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut form = RowForm::default();
        for (key, value) in pairs {
            match key.as_str() {
                "table_name" => form.table_name = Some(value),
                "row_data[]" | "row_data" => form.row_data.push(value),
                "confirm" => form.confirm = is_truthy(&value),
                _ => {}
            }
        }
        form
    }

    /// Non-blank table name
    pub fn table(&self) -> Option<&str> {
        self.table_name
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Table picker on the analytics page
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsForm {
    pub table: Option<String>,
    pub column: Option<String>,
    #[serde(rename = "column-order")]
    pub column_order: Option<String>,
}

impl AnalyticsForm {
    pub fn table(&self) -> Option<&str> {
        non_blank(&self.table)
    }

    pub fn column(&self) -> Option<&str> {
        non_blank(&self.column)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnsQuery {
    pub table: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn collects_repeated_row_values_in_order() {
        let form = RowForm::from_pairs(vec![
            pair("table_name", "customer"),
            pair("row_data[]", "1"),
            pair("row_data[]", "Ada"),
            pair("csrfmiddlewaretoken", "ignored"),
            pair("row_data[]", ""),
        ]);
        assert_eq!(form.table(), Some("customer"));
        assert_eq!(form.row_data, vec!["1", "Ada", ""]);
        assert!(!form.confirm);
    }

    #[test]
    fn confirm_and_blank_table() {
        let form = RowForm::from_pairs(vec![pair("table_name", "  "), pair("confirm", "true")]);
        assert_eq!(form.table(), None);
        assert!(form.confirm);
    }

    #[test]
    fn analytics_form_reads_dashed_field() {
        let form: AnalyticsForm =
            serde_json::from_value(serde_json::json!({"table": "book", "column-order": "DESC"}))
                .unwrap();
        assert_eq!(form.table(), Some("book"));
        assert_eq!(form.column(), None);
        assert_eq!(form.column_order.as_deref(), Some("DESC"));
    }
}
