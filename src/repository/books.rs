//! Books repository.
//!
//! Every public method runs in its own transaction. A transaction that is
//! dropped without `commit` is rolled back, so an early `?` return never
//! leaves a partial write behind.

use chrono::Utc;
use uuid::Uuid;

use super::DbPool;
use crate::{
    catalog::search::{fold, Predicate},
    error::{AppError, AppResult},
    models::book::{normalize_key, Book, CreateBook},
};

const BOOK_COLUMNS: &str =
    "id, title, category, author, publisher, page_count, stock, created_at, updated_at";

#[derive(Clone)]
pub struct BooksRepository {
    pool: DbPool,
}

impl BooksRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // READ
    // =========================================================================

    /// Look up a book by its normalized (title, publisher) key.
    /// Matching ignores case and surrounding whitespace on both inputs.
    pub async fn find_by_title_and_publisher(
        &self,
        title: &str,
        publisher: &str,
    ) -> AppResult<Option<Book>> {
        let query = format!(
            "SELECT {} FROM books WHERE title_key = ? AND publisher_key = ?",
            BOOK_COLUMNS
        );
        let book = sqlx::query_as::<_, Book>(&query)
            .bind(normalize_key(title))
            .bind(normalize_key(publisher))
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    /// Get a book by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Book> {
        let query = format!("SELECT {} FROM books WHERE id = ?", BOOK_COLUMNS);
        sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    /// Search with pagination.
    ///
    /// Returns one page of books ordered by (title, publisher) key and the
    /// number of books matching the predicate over all pages. Both are read
    /// in the same transaction so they describe the same snapshot.
    pub async fn search(
        &self,
        predicate: &Predicate,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Book>, i64)> {
        if limit < 0 || offset < 0 {
            return Err(AppError::InvalidValue(format!(
                "limit and offset must not be negative (limit={}, offset={})",
                limit, offset
            )));
        }

        let filter = predicate.to_sql();
        tracing::debug!(condition = %filter.condition, limit, offset, "Searching books");

        let mut tx = self.pool.begin().await?;

        let count_query = format!("SELECT COUNT(*) FROM books WHERE {}", filter.condition);
        let mut count = sqlx::query_scalar::<_, i64>(&count_query);
        for value in &filter.binds {
            count = count.bind(value);
        }
        let total = count.fetch_one(&mut *tx).await?;

        let select_query = format!(
            "SELECT {} FROM books WHERE {} ORDER BY title_key, publisher_key LIMIT ? OFFSET ?",
            BOOK_COLUMNS, filter.condition
        );
        let mut select = sqlx::query_as::<_, Book>(&select_query);
        for value in &filter.binds {
            select = select.bind(value);
        }
        let books = select.bind(limit).bind(offset).fetch_all(&mut *tx).await?;

        tx.commit().await?;

        Ok((books, total))
    }

    /// Every book, unfiltered and unpaged (export path)
    pub async fn list_all(&self) -> AppResult<Vec<Book>> {
        let query = format!(
            "SELECT {} FROM books ORDER BY title_key, publisher_key",
            BOOK_COLUMNS
        );
        let books = sqlx::query_as::<_, Book>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    // =========================================================================
    // CREATE
    // =========================================================================

    /// Insert a new book.
    ///
    /// Fails with [`AppError::DuplicateKey`] when a book with the same
    /// normalized (title, publisher) key exists, including when a concurrent
    /// create wins the race between the caller's existence check and this
    /// insert. Callers turn that into a stock increment.
    pub async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        let book = Book::new(data)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO books (
                id, title, category, author, publisher, page_count, stock,
                title_fold, category_fold, author_fold, publisher_fold,
                title_key, publisher_key, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.category)
        .bind(&book.author)
        .bind(&book.publisher)
        .bind(book.page_count)
        .bind(book.stock)
        .bind(fold(&book.title))
        .bind(fold(&book.category))
        .bind(fold(&book.author))
        .bind(fold(&book.publisher))
        .bind(book.title_key())
        .bind(book.publisher_key())
        .bind(book.created_at)
        .bind(book.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::DuplicateKey(_) => AppError::DuplicateKey(format!(
                "A book titled '{}' from publisher '{}' already exists",
                book.title, book.publisher
            )),
            other => other,
        })?;

        tx.commit().await?;

        tracing::info!(id = %book.id, title = %book.title, "Book created");
        Ok(book)
    }

    // =========================================================================
    // UPDATE
    // =========================================================================

    /// Set the stock of a book to an absolute value
    pub async fn update_stock(&self, id: Uuid, new_stock: i64) -> AppResult<()> {
        if new_stock < 0 {
            return Err(AppError::InvalidValue(format!(
                "stock must not be negative (got {})",
                new_stock
            )));
        }

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE books SET stock = ?, updated_at = ? WHERE id = ?")
            .bind(new_stock)
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book {} not found", id)));
        }

        tx.commit().await?;

        tracing::info!(id = %id, stock = new_stock, "Stock updated");
        Ok(())
    }

    /// Add `amount` copies to a book's stock and return the updated record
    pub async fn add_stock(&self, id: Uuid, amount: i64) -> AppResult<Book> {
        if amount <= 0 {
            return Err(AppError::InvalidValue(format!(
                "amount to add must be greater than 0 (got {})",
                amount
            )));
        }

        let mut tx = self.pool.begin().await?;

        // The guard keeps `stock + amount` inside i64; SQLite would turn it into a REAL
        let result = sqlx::query(
            "UPDATE books SET stock = stock + ?, updated_at = ? WHERE id = ? AND stock <= ?",
        )
        .bind(amount)
        .bind(Utc::now())
        .bind(id)
        .bind(i64::MAX - amount)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let current: Option<i64> = sqlx::query_scalar("SELECT stock FROM books WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
            return Err(match current {
                None => AppError::NotFound(format!("Book {} not found", id)),
                Some(stock) => AppError::InvalidValue(format!(
                    "adding {} copies to a stock of {} is out of range",
                    amount, stock
                )),
            });
        }

        let query = format!("SELECT {} FROM books WHERE id = ?", BOOK_COLUMNS);
        let book = sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(id = %id, added = amount, stock = book.stock, "Stock increased");
        Ok(book)
    }

    // =========================================================================
    // DELETE
    // =========================================================================

    /// Permanently delete a book. Deleting twice fails the second time.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book {} not found", id)));
        }

        tx.commit().await?;

        tracing::info!(id = %id, "Book deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog::search::SearchMode, config::DatabaseConfig, repository};

    async fn setup() -> BooksRepository {
        repository::open(&DatabaseConfig::in_memory())
            .await
            .unwrap()
            .books
    }

    fn new_book(title: &str, publisher: &str, stock: i64) -> CreateBook {
        CreateBook {
            title: title.to_string(),
            category: "Sci-Fi".to_string(),
            author: "Herbert".to_string(),
            publisher: publisher.to_string(),
            page_count: 412,
            stock,
        }
    }

    #[tokio::test]
    async fn test_find_is_case_and_trim_insensitive() {
        let repo = setup().await;
        let created = repo.create(&new_book("Dune", "Ace", 10)).await.unwrap();

        let found = repo
            .find_by_title_and_publisher("Dune ", "  ACE")
            .await
            .unwrap()
            .expect("book should be found");
        assert_eq!(found.id, created.id);
        assert_eq!(found.title, "Dune");
        let found = repo.find_by_title_and_publisher("dune", "ace").await.unwrap();
        assert_eq!(found.map(|b| b.id), Some(created.id));

        assert!(repo
            .find_by_title_and_publisher("Dune", "Chilton")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_key_never_creates_second_row() {
        let repo = setup().await;
        repo.create(&new_book("Dune", "Ace", 10)).await.unwrap();

        let err = repo.create(&new_book("  DUNE", "ace ", 3)).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateKey(_)), "got {:?}", err);

        let (books, total) = repo.search(&Predicate::all(), 20, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(books[0].stock, 10);
    }

    #[tokio::test]
    async fn test_same_title_other_publisher_is_distinct() {
        let repo = setup().await;
        repo.create(&new_book("Dune", "Ace", 1)).await.unwrap();
        repo.create(&new_book("Dune", "Chilton", 1)).await.unwrap();
        let (_, total) = repo.search(&Predicate::all(), 20, 0).await.unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_values() {
        let repo = setup().await;
        let mut data = new_book("Dune", "Ace", 1);
        data.page_count = 0;
        assert!(matches!(repo.create(&data).await, Err(AppError::InvalidValue(_))));
        let (_, total) = repo.search(&Predicate::all(), 20, 0).await.unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_update_stock() {
        let repo = setup().await;
        let book = repo.create(&new_book("Dune", "Ace", 10)).await.unwrap();

        repo.update_stock(book.id, 0).await.unwrap();
        assert_eq!(repo.get_by_id(book.id).await.unwrap().stock, 0);

        let err = repo.update_stock(book.id, -1).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidValue(_)));
        assert_eq!(repo.get_by_id(book.id).await.unwrap().stock, 0);

        let err = repo.update_stock(Uuid::new_v4(), 3).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_add_stock() {
        let repo = setup().await;
        let book = repo.create(&new_book("Dune", "Ace", 10)).await.unwrap();

        let updated = repo.add_stock(book.id, 5).await.unwrap();
        assert_eq!(updated.stock, 15);
        assert!(updated.updated_at >= book.updated_at);

        assert!(matches!(
            repo.add_stock(book.id, 0).await,
            Err(AppError::InvalidValue(_))
        ));
        assert!(matches!(
            repo.add_stock(Uuid::new_v4(), 1).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_add_stock_out_of_range_leaves_row_unchanged() {
        let repo = setup().await;
        let created = repo.create(&new_book("Dune", "Ace", 1)).await.unwrap();
        let book = repo.get_by_id(created.id).await.unwrap();

        let err = repo.add_stock(book.id, i64::MAX).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidValue(_)), "got {:?}", err);

        let after = repo.get_by_id(book.id).await.unwrap();
        assert_eq!(after.stock, 1);
        assert_eq!(after.updated_at, book.updated_at);

        // The exact upper bound is still accepted
        let full = repo.add_stock(book.id, i64::MAX - 1).await.unwrap();
        assert_eq!(full.stock, i64::MAX);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = setup().await;
        let book = repo.create(&new_book("Dune", "Ace", 10)).await.unwrap();
        repo.create(&new_book("Emma", "Penguin", 2)).await.unwrap();

        repo.delete(book.id).await.unwrap();
        assert!(matches!(repo.get_by_id(book.id).await, Err(AppError::NotFound(_))));

        // second delete fails and leaves the store unchanged
        assert!(matches!(repo.delete(book.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            repo.delete(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(repo.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_counts_unpaged_set() {
        let repo = setup().await;
        for i in 0..45 {
            repo.create(&new_book(&format!("Book {:02}", i), "Ace", 1))
                .await
                .unwrap();
        }
        repo.create(&new_book("Other", "Penguin", 1)).await.unwrap();

        let predicate = Predicate::new("book", SearchMode::Text);
        let (page, total) = repo.search(&predicate, 20, 40).await.unwrap();
        assert_eq!(total, 45);
        assert_eq!(page.len(), 5);
        assert_eq!(page[0].title, "Book 40");

        let (page, total) = repo.search(&predicate, 20, 100).await.unwrap();
        assert_eq!(total, 45);
        assert!(page.is_empty());

        let (page, total) = repo.search(&Predicate::all(), 20, 0).await.unwrap();
        assert_eq!(total, 46);
        assert_eq!(page.len(), 20);
    }

    #[tokio::test]
    async fn test_search_modes_and_literal_terms() {
        let repo = setup().await;
        repo.create(&new_book("100% Rust", "Ace", 1)).await.unwrap();
        let mut fantasy = new_book("The Hobbit", "Allen & Unwin", 1);
        fantasy.category = "Fantasy".to_string();
        fantasy.author = "Tolkien".to_string();
        repo.create(&fantasy).await.unwrap();

        let (books, total) = repo
            .search(&Predicate::new("0%", SearchMode::Text), 20, 0)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(books[0].title, "100% Rust");

        // '%' is not a wildcard
        let (_, total) = repo
            .search(&Predicate::new("%", SearchMode::Category), 20, 0)
            .await
            .unwrap();
        assert_eq!(total, 0);

        let (books, _) = repo
            .search(&Predicate::new("FANTASY", SearchMode::Category), 20, 0)
            .await
            .unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].author, "Tolkien");

        let (books, total) = repo
            .search(&Predicate::new("nothing here", SearchMode::Text), 20, 0)
            .await
            .unwrap();
        assert_eq!(total, 0);
        assert!(books.is_empty());
    }

    #[tokio::test]
    async fn test_search_unicode_case() {
        let repo = setup().await;
        repo.create(&new_book("Ödön von Horváth", "Édition Ÿ", 1))
            .await
            .unwrap();
        let (_, total) = repo
            .search(&Predicate::new("ÖDÖN", SearchMode::Text), 20, 0)
            .await
            .unwrap();
        assert_eq!(total, 1);
        let (_, total) = repo
            .search(&Predicate::new("édition ÿ", SearchMode::Text), 20, 0)
            .await
            .unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_search_rejects_negative_window() {
        let repo = setup().await;
        assert!(matches!(
            repo.search(&Predicate::all(), -1, 0).await,
            Err(AppError::InvalidValue(_))
        ));
    }
}
