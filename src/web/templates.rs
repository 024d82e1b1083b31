use askama::Template;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::browser::TableData;
use crate::ordering::{Direction, SortOrder};
use crate::schema::TableInfo;
use crate::value::CellValue;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub version: &'static str,
}

#[derive(Template)]
#[template(path = "table_list.html")]
pub struct TableListTemplate {
    pub tables: Vec<TableLink>,
}

impl TableListTemplate {
    pub fn new(table_names: Vec<String>) -> Self {
        TableListTemplate {
            tables: table_names
                .into_iter()
                .map(|name| TableLink {
                    href: format!("/tables/{}", path_segment(&name)),
                    name,
                })
                .collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "table_detail.html")]
pub struct TableDetailTemplate {
    pub table_name: String,
    pub headers: Vec<HeaderView>,
    pub rows: Vec<Vec<CellView>>,
    pub messages: Vec<String>,
    pub truncated: bool,
}

#[derive(Template)]
#[template(path = "analytics.html")]
pub struct AnalyticsTemplate {
    pub table_options: Vec<OptionView>,
    pub table_name: Option<String>,
    pub table_columns: Vec<String>,
    pub column_options: Vec<OptionView>,
    pub table_data: Vec<Vec<CellView>>,
    pub descending: bool,
    pub messages: Vec<String>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub message: String,
}

pub struct TableLink {
    pub name: String,
    pub href: String,
}

pub struct HeaderView {
    pub name: String,
    /// Sort link for the column
    pub href: String,
    /// Arrow shown next to the column the table is sorted by
    pub marker: &'static str,
}

pub struct OptionView {
    pub value: String,
    pub selected: bool,
}

pub struct CellView {
    pub text: String,
    pub editable: bool,
}

impl TableDetailTemplate {
    pub fn new(table: &TableInfo, data: TableData, order: Option<&SortOrder>) -> Self {
        let editable: Vec<bool> = table.columns.iter().map(|c| c.is_editable()).collect();
        let table_segment = path_segment(&data.table_name);
        let headers = data
            .columns
            .iter()
            .map(|name| HeaderView {
                marker: match order {
                    Some(o) if o.column.eq_ignore_ascii_case(name) => match o.direction {
                        Direction::Asc => "▲",
                        Direction::Desc => "▼",
                    },
                    _ => "",
                },
                href: format!("/tables/{}/order/{}", table_segment, path_segment(name)),
                name: name.clone(),
            })
            .collect();
        TableDetailTemplate {
            table_name: data.table_name,
            headers,
            rows: cell_views(data.rows, &editable),
            messages: Vec::new(),
            truncated: data.truncated,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }
}

impl AnalyticsTemplate {
    pub fn picker(tables: Vec<String>) -> Self {
        AnalyticsTemplate {
            table_options: options(tables, None),
            table_name: None,
            table_columns: Vec::new(),
            column_options: Vec::new(),
            table_data: Vec::new(),
            descending: false,
            messages: Vec::new(),
        }
    }

    pub fn with_data(
        mut self,
        table: &TableInfo,
        data: TableData,
        order: Option<(&str, Direction)>,
    ) -> Self {
        let editable: Vec<bool> = table.columns.iter().map(|c| c.is_editable()).collect();
        for option in &mut self.table_options {
            option.selected = option.value == data.table_name;
        }
        self.column_options = options(data.columns.clone(), order.map(|(column, _)| column));
        self.descending = matches!(order, Some((_, Direction::Desc)));
        self.table_name = Some(data.table_name);
        self.table_columns = data.columns;
        self.table_data = cell_views(data.rows, &editable);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }
}

// Unreserved characters stay literal, everything else is escaped
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn path_segment(raw: &str) -> String {
    utf8_percent_encode(raw, PATH_SEGMENT).to_string()
}

fn options(values: Vec<String>, selected: Option<&str>) -> Vec<OptionView> {
    values
        .into_iter()
        .map(|value| OptionView {
            selected: selected.is_some_and(|s| s.eq_ignore_ascii_case(&value)),
            value,
        })
        .collect()
}

fn cell_views(rows: Vec<Vec<CellValue>>, editable: &[bool]) -> Vec<Vec<CellView>> {
    rows.into_iter()
        .map(|row| {
            row.into_iter()
                .enumerate()
                .map(|(i, cell)| CellView {
                    text: cell.to_string(),
                    editable: editable.get(i).copied().unwrap_or(false),
                })
                .collect()
        })
        .collect()
}
