//! Free-text search predicates over the catalog.
//!
//! A [`Predicate`] is built from the user's term and a [`SearchMode`]. It can
//! be evaluated in memory against a [`Book`] or rendered as a SQL condition
//! over the lowercase `*_fold` columns of the `books` table. Both paths fold
//! case the same way (`str::to_lowercase`), so they agree on every input.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Book;

/// Which fields a search term is matched against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Title, author or publisher
    #[default]
    Text,
    /// Category only
    Category,
}

impl SearchMode {
    fn columns(self) -> &'static [&'static str] {
        match self {
            SearchMode::Text => &["title_fold", "author_fold", "publisher_fold"],
            SearchMode::Category => &["category_fold"],
        }
    }

    fn fields(self, book: &Book) -> Vec<&str> {
        match self {
            SearchMode::Text => vec![book.title.as_str(), book.author.as_str(), book.publisher.as_str()],
            SearchMode::Category => vec![book.category.as_str()],
        }
    }
}

/// Fold a value for case-insensitive comparison. Whitespace is kept as is.
///
/// This is Unicode lowercasing, not full case folding: characters whose fold
/// expands to several (`ß` vs `SS`) do not match each other.
pub fn fold(value: &str) -> String {
    value.to_lowercase()
}

/// Case-insensitive substring match over the fields selected by a mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    mode: SearchMode,
    /// Folded search term; `None` matches every book
    needle: Option<String>,
}

/// SQL rendering of a predicate: a WHERE condition and its bound values in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlFilter {
    pub condition: String,
    pub binds: Vec<String>,
}

impl Predicate {
    /// Build a predicate. An empty term matches everything; a term made only
    /// of spaces is still a real term.
    pub fn new(term: &str, mode: SearchMode) -> Self {
        let needle = if term.is_empty() { None } else { Some(fold(term)) };
        Self { mode, needle }
    }

    /// Predicate matching every book
    pub fn all() -> Self {
        Self {
            mode: SearchMode::default(),
            needle: None,
        }
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn matches_all(&self) -> bool {
        self.needle.is_none()
    }

    pub fn matches(&self, book: &Book) -> bool {
        match &self.needle {
            None => true,
            Some(needle) => self
                .mode
                .fields(book)
                .into_iter()
                .any(|field| fold(field).contains(needle.as_str())),
        }
    }

    /// `instr` is used instead of `LIKE` so `%` and `_` in the term match literally.
    pub fn to_sql(&self) -> SqlFilter {
        match &self.needle {
            None => SqlFilter {
                condition: "1=1".to_string(),
                binds: Vec::new(),
            },
            Some(needle) => {
                let columns = self.mode.columns();
                let condition = columns
                    .iter()
                    .map(|col| format!("instr({}, ?) > 0", col))
                    .collect::<Vec<_>>()
                    .join(" OR ");
                SqlFilter {
                    condition: format!("({})", condition),
                    binds: vec![needle.clone(); columns.len()],
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn book(title: &str, category: &str, author: &str, publisher: &str) -> Book {
        Book {
            id: Uuid::new_v4(),
            title: title.to_string(),
            category: category.to_string(),
            author: author.to_string(),
            publisher: publisher.to_string(),
            page_count: 100,
            stock: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_term_matches_everything() {
        let p = Predicate::new("", SearchMode::Text);
        assert!(p.matches_all());
        assert!(p.matches(&book("a", "b", "c", "d")));
        assert_eq!(p.to_sql().condition, "1=1");
        assert!(p.to_sql().binds.is_empty());
    }

    #[test]
    fn test_text_mode_fields() {
        let dune = book("Dune", "Sci-Fi", "Frank Herbert", "Ace Books");
        assert!(Predicate::new("DUNE", SearchMode::Text).matches(&dune));
        assert!(Predicate::new("herb", SearchMode::Text).matches(&dune));
        assert!(Predicate::new("ace", SearchMode::Text).matches(&dune));
        // category is not part of text mode
        assert!(!Predicate::new("sci", SearchMode::Text).matches(&dune));
    }

    #[test]
    fn test_category_mode_only_checks_category() {
        let dune = book("Dune", "Sci-Fi", "Frank Herbert", "Ace Books");
        assert!(Predicate::new("sci-fi", SearchMode::Category).matches(&dune));
        assert!(!Predicate::new("dune", SearchMode::Category).matches(&dune));
    }

    #[test]
    fn test_unicode_case_folding() {
        let b = book("Ÿ Été à Paris", "Роман", "x", "y");
        assert!(Predicate::new("été", SearchMode::Text).matches(&b));
        assert!(Predicate::new("ÿ", SearchMode::Text).matches(&b));
        assert!(Predicate::new("роман", SearchMode::Category).matches(&b));

        // lowercasing only; multi-character folds do not match
        let street = book("Straße", "c", "a", "p");
        assert!(Predicate::new("STRAẞE", SearchMode::Text).matches(&street));
        assert!(!Predicate::new("STRASSE", SearchMode::Text).matches(&street));
    }

    #[test]
    fn test_whitespace_is_not_normalized() {
        let b = book("War and Peace", "Classic", "Tolstoy", "Penguin");
        assert!(!Predicate::new("war  and", SearchMode::Text).matches(&b));
        assert!(!Predicate::new(" dune", SearchMode::Text).matches(&book("Dune", "c", "a", "p")));
        assert!(Predicate::new(" and ", SearchMode::Text).matches(&b));
    }

    #[test]
    fn test_sql_rendering() {
        let sql = Predicate::new("Dune", SearchMode::Text).to_sql();
        assert_eq!(
            sql.condition,
            "(instr(title_fold, ?) > 0 OR instr(author_fold, ?) > 0 OR instr(publisher_fold, ?) > 0)"
        );
        assert_eq!(sql.binds, vec!["dune", "dune", "dune"]);

        let sql = Predicate::new("Fantasy", SearchMode::Category).to_sql();
        assert_eq!(sql.condition, "(instr(category_fold, ?) > 0)");
        assert_eq!(sql.binds, vec!["fantasy"]);
    }
}
