//! Catalog management service

use chrono::Local;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    catalog::{
        annotate, to_export_row, DisplayBook, PageInfo, PageRequest, Paginated, Predicate,
        SearchMode,
    },
    error::{AppError, AppResult},
    models::{Book, CreateBook},
    repository::Repository,
    services::export::{self, ExportFile},
};

/// What registering a book ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RegisterAction {
    /// A new record was inserted
    Created,
    /// The book already existed; its stock was increased instead
    Restocked,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub action: RegisterAction,
    pub book: Book,
    /// Copies added to an existing record (0 for new records)
    pub added: i64,
}

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search the catalog and return one annotated page.
    ///
    /// `page` below 1 is treated as 1. A page past the end comes back empty
    /// with the real page count.
    pub async fn search(
        &self,
        term: &str,
        mode: SearchMode,
        page: Option<i64>,
    ) -> AppResult<Paginated<DisplayBook>> {
        let predicate = Predicate::new(term, mode);
        let request = PageRequest::new(page);

        let (books, total) = self
            .repository
            .books
            .search(&predicate, request.limit(), request.offset())
            .await?;

        let info = PageInfo::new(request, total);
        tracing::debug!(
            term,
            ?mode,
            page = info.page,
            total = info.total,
            total_pages = info.total_pages,
            "Catalog search"
        );

        Ok(Paginated { items: books, info }.map(annotate))
    }

    /// Every book in catalog order
    pub async fn all_books(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list_all().await
    }

    pub async fn get_book(&self, id: Uuid) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    pub async fn find_book(&self, title: &str, publisher: &str) -> AppResult<Option<Book>> {
        self.repository
            .books
            .find_by_title_and_publisher(title, publisher)
            .await
    }

    /// Register a book, or restock it when the (title, publisher) key is taken.
    ///
    /// The requested stock is added to the existing record; a request for zero
    /// copies leaves it untouched. If another request creates the same book
    /// between the lookup and the insert, the insert fails with a duplicate
    /// key and is retried once as a restock.
    pub async fn register(&self, data: CreateBook) -> AppResult<Registration> {
        data.check()?;

        if let Some(existing) = self.find_book(&data.title, &data.publisher).await? {
            return self.restock(existing, data.stock).await;
        }

        match self.repository.books.create(&data).await {
            Ok(book) => Ok(Registration {
                action: RegisterAction::Created,
                book,
                added: 0,
            }),
            Err(AppError::DuplicateKey(msg)) => {
                tracing::info!("Concurrent registration detected, restocking instead: {}", msg);
                let existing = self
                    .find_book(&data.title, &data.publisher)
                    .await?
                    .ok_or_else(|| AppError::DuplicateKey(msg))?;
                self.restock(existing, data.stock).await
            }
            Err(e) => Err(e),
        }
    }

    async fn restock(&self, existing: Book, amount: i64) -> AppResult<Registration> {
        let book = if amount > 0 {
            self.repository.books.add_stock(existing.id, amount).await?
        } else {
            existing
        };
        Ok(Registration {
            action: RegisterAction::Restocked,
            book,
            added: amount,
        })
    }

    /// Add copies to an existing book
    pub async fn add_stock(&self, id: Uuid, amount: i64) -> AppResult<Book> {
        self.repository.books.add_stock(id, amount).await
    }

    /// Set the stock of a book and return the updated record
    pub async fn update_stock(&self, id: Uuid, stock: i64) -> AppResult<Book> {
        self.repository.books.update_stock(id, stock).await?;
        self.repository.books.get_by_id(id).await
    }

    pub async fn delete_book(&self, id: Uuid) -> AppResult<()> {
        self.repository.books.delete(id).await
    }

    /// Build the inventory spreadsheet, or `None` when the catalog is empty
    pub async fn export(&self) -> AppResult<Option<ExportFile>> {
        let books = self.repository.books.list_all().await?;
        if books.is_empty() {
            return Ok(None);
        }

        let rows: Vec<_> = books.iter().map(to_export_row).collect();
        let bytes = export::write_workbook(&rows)?;
        tracing::info!(rows = rows.len(), size = bytes.len(), "Inventory exported");

        Ok(Some(ExportFile {
            filename: export::export_filename(Local::now().date_naive()),
            content_type: export::XLSX_CONTENT_TYPE,
            bytes,
        }))
    }

    /// Check that the store answers
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog::ExportValue, config::DatabaseConfig, repository};

    async fn setup() -> CatalogService {
        let repo = repository::open(&DatabaseConfig::in_memory()).await.unwrap();
        CatalogService::new(repo)
    }

    fn dune(stock: i64) -> CreateBook {
        CreateBook {
            title: "Dune".to_string(),
            category: "Sci-Fi".to_string(),
            author: "Herbert".to_string(),
            publisher: "Ace".to_string(),
            page_count: 412,
            stock,
        }
    }

    #[tokio::test]
    async fn test_register_then_restock() {
        let service = setup().await;

        let first = service.register(dune(10)).await.unwrap();
        assert_eq!(first.action, RegisterAction::Created);
        assert_eq!(first.book.stock, 10);

        let mut again = dune(3);
        again.title = "  dune ".to_string();
        again.publisher = "ACE".to_string();
        let second = service.register(again).await.unwrap();
        assert_eq!(second.action, RegisterAction::Restocked);
        assert_eq!(second.added, 3);
        assert_eq!(second.book.id, first.book.id);
        assert_eq!(second.book.stock, 13);

        assert_eq!(service.all_books().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_duplicate_with_zero_stock_is_noop() {
        let service = setup().await;
        let first = service.register(dune(4)).await.unwrap();
        let second = service.register(dune(0)).await.unwrap();
        assert_eq!(second.action, RegisterAction::Restocked);
        assert_eq!(second.added, 0);
        assert_eq!(second.book.id, first.book.id);
        assert_eq!(second.book.stock, 4);
    }

    #[tokio::test]
    async fn test_register_restock_out_of_range_is_invalid() {
        let service = setup().await;
        service.register(dune(1)).await.unwrap();

        let err = service.register(dune(i64::MAX)).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidValue(_)), "got {:?}", err);

        let books = service.all_books().await.unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].stock, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_collapse_into_restocks() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("race.sqlite").display()),
            ..Default::default()
        };
        let service = CatalogService::new(repository::open(&config).await.unwrap());

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.register(dune(1)).await })
            })
            .collect();

        let mut created = 0;
        let mut restocked = 0;
        for handle in handles {
            match handle.await.unwrap().unwrap().action {
                RegisterAction::Created => created += 1,
                RegisterAction::Restocked => restocked += 1,
            }
        }
        assert_eq!(created, 1);
        assert_eq!(restocked, 19);

        let books = service.all_books().await.unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].stock, 20);
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_input() {
        let service = setup().await;
        let err = service.register(dune(-2)).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidValue(_)));
    }

    #[tokio::test]
    async fn test_search_pages_and_annotation() {
        let service = setup().await;
        for i in 0..41 {
            let mut data = dune(i % 7);
            data.title = format!("Dune {:02}", i);
            service.register(data).await.unwrap();
        }

        let page = service.search("", SearchMode::Text, None).await.unwrap();
        assert_eq!(page.info.total, 41);
        assert_eq!(page.info.total_pages, 3);
        assert_eq!(page.items.len(), 20);
        for book in &page.items {
            assert_eq!(book.low_stock, book.stock < 5);
        }

        let last = service.search("dune", SearchMode::Text, Some(3)).await.unwrap();
        assert_eq!(last.items.len(), 1);

        let past = service.search("dune", SearchMode::Text, Some(5)).await.unwrap();
        assert!(past.items.is_empty());
        assert_eq!(past.info.total_pages, 3);

        let clamped = service.search("", SearchMode::Text, Some(0)).await.unwrap();
        assert_eq!(clamped.info.page, 1);
        assert_eq!(clamped.items[0].title, "Dune 00");
    }

    #[tokio::test]
    async fn test_update_stock_returns_record() {
        let service = setup().await;
        let created = service.register(dune(10)).await.unwrap().book;
        let updated = service.update_stock(created.id, 2).await.unwrap();
        assert_eq!(updated.stock, 2);
        assert!(matches!(
            service.update_stock(Uuid::new_v4(), 2).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_end_to_end_export_row() {
        let service = setup().await;
        let created = service.register(dune(10)).await.unwrap().book;

        let page = service.search("dune", SearchMode::Text, None).await.unwrap();
        assert_eq!(page.info.total, 1);
        assert_eq!(page.items[0].id, created.id);

        let books = service.all_books().await.unwrap();
        let row = to_export_row(&books[0]);
        assert_eq!(row["Title"], ExportValue::Text("Dune".into()));
        assert_eq!(row["Category"], ExportValue::Text("Sci-Fi".into()));
        assert_eq!(row["Author"], ExportValue::Text("Herbert".into()));
        assert_eq!(row["Publisher"], ExportValue::Text("Ace".into()));
        assert_eq!(row["PageCount"], ExportValue::Integer(412));
        assert_eq!(row["Stock"], ExportValue::Integer(10));
        assert_eq!(row["ID"], ExportValue::Text(created.id.to_string()));
    }

    #[tokio::test]
    async fn test_export() {
        let service = setup().await;
        assert!(service.export().await.unwrap().is_none());

        service.register(dune(10)).await.unwrap();
        let file = service.export().await.unwrap().expect("export file");
        assert!(file.filename.starts_with("inventory_"));
        assert!(file.filename.ends_with(".xlsx"));
        assert_eq!(file.content_type, export::XLSX_CONTENT_TYPE);
        assert_eq!(&file.bytes[..2], b"PK");
    }
}
