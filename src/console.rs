//! Interactive console menu over the catalog.
//!
//! The menu reads from any [`BufRead`] and writes to any [`Write`], one
//! request/response exchange at a time. Numeric prompts ask again until they
//! get a valid number. A failing operation is reported and the menu carries
//! on; only I/O errors on the console itself end the loop.

use std::io::{self, BufRead, Write};

use thiserror::Error;

use crate::{
    catalog::{
        annotate,
        presentation::{table_header, table_row},
        SearchMode,
    },
    error::AppError,
    models::{Book, CreateBook},
    services::catalog::{CatalogService, RegisterAction},
};

const RULE_WIDTH: usize = 120;

#[derive(Debug, Error)]
enum ConsoleError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("input closed")]
    Eof,
    #[error(transparent)]
    App(#[from] AppError),
}

type ConsoleResult<T> = Result<T, ConsoleError>;

pub struct Console<R, W> {
    catalog: CatalogService,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(catalog: CatalogService, input: R, output: W) -> Self {
        Self {
            catalog,
            input,
            output,
        }
    }

    /// Give back the output sink (used to inspect transcripts)
    pub fn into_output(self) -> W {
        self.output
    }

    /// Run the menu until the user exits or input ends
    pub async fn run(&mut self) -> io::Result<()> {
        loop {
            self.print_menu()?;

            let choice = match self.prompt(">>> ") {
                Ok(choice) => choice,
                Err(ConsoleError::Eof) => return Ok(()),
                Err(ConsoleError::Io(e)) => return Err(e),
                Err(ConsoleError::App(_)) => continue,
            };

            let outcome = match choice.as_str() {
                "1" => self.register().await,
                "2" => self.view_catalog().await,
                "3" => self.search().await,
                "4" => self.update_stock().await,
                "5" => self.delete().await,
                "6" => {
                    writeln!(self.output, "Closing inventory...")?;
                    return Ok(());
                }
                other => {
                    writeln!(self.output, "Unknown option '{}'.", other)?;
                    continue;
                }
            };

            match outcome {
                Ok(()) => {}
                Err(ConsoleError::App(e)) => {
                    tracing::warn!("Console operation failed: {}", e);
                    writeln!(self.output, "Error: {}", e)?;
                }
                Err(ConsoleError::Eof) => return Ok(()),
                Err(ConsoleError::Io(e)) => return Err(e),
            }
        }
    }

    fn print_menu(&mut self) -> io::Result<()> {
        writeln!(self.output)?;
        writeln!(self.output, "{}", "=".repeat(30))?;
        writeln!(self.output, "      BOOK INVENTORY")?;
        writeln!(self.output, "{}", "-".repeat(30))?;
        writeln!(self.output, "1. Register book")?;
        writeln!(self.output, "2. View catalog")?;
        writeln!(self.output, "3. Search")?;
        writeln!(self.output, "4. Update stock")?;
        writeln!(self.output, "5. Delete book")?;
        writeln!(self.output, "6. Exit")
    }

    // =========================================================================
    // PROMPTS
    // =========================================================================

    /// Print `label` and read one trimmed line
    fn prompt(&mut self, label: &str) -> ConsoleResult<String> {
        write!(self.output, "{}", label)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(ConsoleError::Eof);
        }
        Ok(line.trim().to_string())
    }

    fn prompt_required(&mut self, label: &str) -> ConsoleResult<String> {
        loop {
            let value = self.prompt(label)?;
            if !value.is_empty() {
                return Ok(value);
            }
            writeln!(self.output, "A value is required.")?;
        }
    }

    /// Ask until the answer is an integer `>= min`
    fn prompt_number(&mut self, label: &str, min: i64) -> ConsoleResult<i64> {
        loop {
            let raw = self.prompt(label)?;
            match raw.parse::<i64>() {
                Ok(n) if n >= min => return Ok(n),
                Ok(_) if min > 0 => writeln!(self.output, "Must be greater than {}.", min - 1)?,
                Ok(_) => writeln!(self.output, "Must be {} or more.", min)?,
                Err(_) => writeln!(self.output, "Error: enter a whole number.")?,
            }
        }
    }

    fn confirm(&mut self, label: &str) -> ConsoleResult<bool> {
        let answer = self.prompt(label)?.to_lowercase();
        Ok(matches!(answer.as_str(), "y" | "yes"))
    }

    fn print_books(&mut self, books: Vec<Book>) -> io::Result<()> {
        writeln!(self.output, "{}", table_header())?;
        writeln!(self.output, "{}", "-".repeat(RULE_WIDTH))?;
        for book in books {
            writeln!(self.output, "{}", table_row(&annotate(book)))?;
        }
        Ok(())
    }

    /// Locate a book by title and publisher, reporting when it is missing
    async fn locate(&mut self) -> ConsoleResult<Option<Book>> {
        let title = self.prompt("Title: ")?;
        let publisher = self.prompt("Publisher: ")?;
        let found = self.catalog.find_book(&title, &publisher).await?;
        if found.is_none() {
            writeln!(self.output, "Not found.")?;
        }
        Ok(found)
    }

    // =========================================================================
    // ACTIONS
    // =========================================================================

    async fn register(&mut self) -> ConsoleResult<()> {
        writeln!(self.output, "\n--- New book ---")?;
        let title = self.prompt_required("Title: ")?;
        let publisher = self.prompt_required("Publisher: ")?;

        if let Some(existing) = self.catalog.find_book(&title, &publisher).await? {
            writeln!(self.output, "\nThis book is already in the catalog.")?;
            writeln!(self.output, "Current stock: {}", existing.stock)?;
            if self.confirm("Add stock? (y/n): ")? {
                let amount = self.prompt_number("Copies to add: ", 1)?;
                let book = self.catalog.add_stock(existing.id, amount).await?;
                writeln!(self.output, "Stock updated. New stock: {}", book.stock)?;
            }
            return Ok(());
        }

        let category = self.prompt_required("Category: ")?;
        let author = self.prompt_required("Author: ")?;
        let page_count = self.prompt_number("Pages: ", 1)?;
        let stock = self.prompt_number("Initial stock: ", 0)?;

        let registration = self
            .catalog
            .register(CreateBook {
                title,
                category,
                author,
                publisher,
                page_count,
                stock,
            })
            .await?;

        match registration.action {
            RegisterAction::Created => {
                writeln!(self.output, "Book saved with ID: {}", registration.book.id)?
            }
            RegisterAction::Restocked => writeln!(
                self.output,
                "Book registered meanwhile; stock is now {}",
                registration.book.stock
            )?,
        }
        Ok(())
    }

    async fn view_catalog(&mut self) -> ConsoleResult<()> {
        let books = self.catalog.all_books().await?;
        if books.is_empty() {
            writeln!(self.output, "The catalog is empty.")?;
            return Ok(());
        }

        writeln!(self.output, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(self.output, "BOOK CATALOG")?;
        writeln!(self.output, "{}", "=".repeat(RULE_WIDTH))?;
        self.print_books(books)?;
        Ok(())
    }

    async fn search(&mut self) -> ConsoleResult<()> {
        writeln!(self.output, "\n--- Search ---")?;
        writeln!(self.output, "1. By title, author or publisher")?;
        writeln!(self.output, "2. By category")?;

        let mode = match self.prompt(">>> Choose (1-2): ")?.as_str() {
            "1" => SearchMode::Text,
            "2" => SearchMode::Category,
            _ => {
                writeln!(self.output, "Unknown option. Back to menu.")?;
                return Ok(());
            }
        };

        let term = self.prompt("Search term: ")?;
        let mut page = 1;
        loop {
            let result = self.catalog.search(&term, mode, Some(page)).await?;
            if result.info.total == 0 {
                writeln!(self.output, "No books match '{}'.", term)?;
                return Ok(());
            }

            writeln!(
                self.output,
                "\nFound {} books (page {} of {}):",
                result.info.total, result.info.page, result.info.total_pages
            )?;
            writeln!(self.output, "{}", table_header())?;
            writeln!(self.output, "{}", "-".repeat(RULE_WIDTH))?;
            for book in &result.items {
                writeln!(self.output, "{}", table_row(book))?;
            }

            if !result.info.has_next || !self.confirm("Next page? (y/n): ")? {
                return Ok(());
            }
            page += 1;
        }
    }

    async fn update_stock(&mut self) -> ConsoleResult<()> {
        let Some(book) = self.locate().await? else {
            return Ok(());
        };
        writeln!(self.output, "Current stock of '{}': {}", book.title, book.stock)?;
        let stock = self.prompt_number("New stock: ", 0)?;
        let updated = self.catalog.update_stock(book.id, stock).await?;
        writeln!(self.output, "Stock updated. New stock: {}", updated.stock)?;
        Ok(())
    }

    async fn delete(&mut self) -> ConsoleResult<()> {
        let Some(book) = self.locate().await? else {
            return Ok(());
        };
        if self.confirm(&format!("Delete '{}'? (y/n): ", book.title))? {
            self.catalog.delete_book(book.id).await?;
            writeln!(self.output, "Deleted.")?;
        }
        Ok(())
    }
}
