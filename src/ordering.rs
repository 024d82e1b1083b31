use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    /// Anything other than a case-insensitive `desc` sorts ascending
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("desc") {
            Direction::Desc
        } else {
            Direction::Asc
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        })
    }
}

/// Sort preference remembered in the session between clicks on a header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub table: String,
    pub column: String,
    pub direction: Direction,
}

impl SortOrder {
    /// Clicking the header that is already sorted flips the direction;
    /// any other header starts ascending.
    pub fn next(previous: Option<&SortOrder>, table: &str, column: &str) -> Self {
        let table = table.to_lowercase();
        let column = column.to_lowercase();
        let direction = match previous {
            Some(prev) if prev.table == table && prev.column == column => prev.direction.toggled(),
            _ => Direction::Asc,
        };
        SortOrder {
            table,
            column,
            direction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_click_sorts_ascending() {
        let order = SortOrder::next(None, "Book", "Title");
        assert_eq!(order.column, "title");
        assert_eq!(order.direction, Direction::Asc);
    }

    #[test]
    fn repeated_click_toggles() {
        let first = SortOrder::next(None, "book", "title");
        let second = SortOrder::next(Some(&first), "book", "TITLE");
        assert_eq!(second.direction, Direction::Desc);
        let third = SortOrder::next(Some(&second), "book", "title");
        assert_eq!(third.direction, Direction::Asc);
    }

    #[test]
    fn other_column_or_table_resets() {
        let desc = SortOrder {
            table: "book".to_string(),
            column: "title".to_string(),
            direction: Direction::Desc,
        };
        assert_eq!(SortOrder::next(Some(&desc), "book", "isbn").direction, Direction::Asc);
        assert_eq!(SortOrder::next(Some(&desc), "author", "title").direction, Direction::Asc);
    }

    #[test]
    fn direction_parsing() {
        assert_eq!(Direction::parse("DESC"), Direction::Desc);
        assert_eq!(Direction::parse("desc "), Direction::Desc);
        assert_eq!(Direction::parse("ASC"), Direction::Asc);
        assert_eq!(Direction::parse(""), Direction::Asc);
        assert_eq!(Direction::Desc.as_sql(), "DESC");
    }
}
