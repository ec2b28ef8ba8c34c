//! Movie list filters and the WHERE / ORDER BY clauses built from them.
//!
//! Values only ever reach SQL through `?` placeholders. Column names only ever
//! come from [`SortField::column`], a fixed allow-list.

use std::fmt;
use std::str::FromStr;

/// Columns a movie list can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Title,
    DateOfRelease,
    Director,
    Rating,
    IsWatched,
}

impl SortField {
    /// Qualified column this field sorts on
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Id => "m.id",
            SortField::Title => "m.title",
            SortField::DateOfRelease => "m.date_of_release",
            SortField::Director => "m.director",
            SortField::Rating => "m.rating",
            SortField::IsWatched => "m.is_watched",
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "id" => Ok(SortField::Id),
            "title" => Ok(SortField::Title),
            "dateofrelease" | "date_of_release" => Ok(SortField::DateOfRelease),
            "director" => Ok(SortField::Director),
            "rating" => Ok(SortField::Rating),
            "iswatched" | "is_watched" => Ok(SortField::IsWatched),
            _ => Err(format!("Unknown sort field: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// Sort field plus direction, parsed from `title` / `-title` style keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        let (direction, name) = match raw.strip_prefix('-') {
            Some(rest) => (SortDirection::Desc, rest),
            None => (SortDirection::Asc, raw),
        };
        if name.is_empty() {
            return Err("Sort field is required".to_string());
        }
        Ok(Self {
            field: name.parse()?,
            direction,
        })
    }
}

/// Optional criteria for listing movies; every present criterion narrows the
/// result (AND)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieFilters {
    /// Case-insensitive substring of the title
    pub search: Option<String>,
    pub watched: Option<bool>,
    /// Movies linked to at least one of these genres
    pub genre_ids: Vec<i64>,
    pub sort: Option<SortKey>,
}

/// A value bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Text(String),
    Bool(bool),
    Int(i64),
}

/// WHERE conditions, their bound parameters and the ORDER BY clause
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    /// Conditions joined by `AND`, without the `WHERE` keyword; empty when
    /// nothing filters
    pub sql: String,
    pub params: Vec<BindValue>,
    pub order_by: String,
}

impl Predicate {
    pub fn where_clause(&self) -> String {
        if self.sql.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.sql)
        }
    }
}

/// Build the WHERE conditions and ORDER BY clause for a movie listing
pub fn build_predicate(filters: &MovieFilters) -> Predicate {
    let mut conditions = Vec::new();
    let mut params = Vec::new();

    if let Some(term) = filters.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        conditions.push(r"m.title LIKE ? ESCAPE '\'".to_string());
        params.push(BindValue::Text(format!("%{}%", escape_like(term))));
    }

    if let Some(watched) = filters.watched {
        conditions.push("m.is_watched = ?".to_string());
        params.push(BindValue::Bool(watched));
    }

    if !filters.genre_ids.is_empty() {
        let mut ids = filters.genre_ids.clone();
        ids.sort_unstable();
        ids.dedup();

        let placeholders = vec!["?"; ids.len()].join(", ");
        conditions.push(format!(
            "m.id IN (SELECT mg.movie_id FROM movie_genres mg WHERE mg.genre_id IN ({}))",
            placeholders
        ));
        params.extend(ids.into_iter().map(BindValue::Int));
    }

    // m.id breaks ties so rows of one movie stay in a stable order.
    let order_by = match filters.sort {
        Some(SortKey { field: SortField::Id, direction }) => {
            format!("ORDER BY m.id {}", direction)
        }
        Some(key) => format!("ORDER BY {} {}, m.id ASC", key.field.column(), key.direction),
        None => "ORDER BY m.id ASC".to_string(),
    };

    Predicate {
        sql: conditions.join(" AND "),
        params,
        order_by,
    }
}

/// Escape LIKE wildcards so the term matches literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
