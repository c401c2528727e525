use reprise::{
    AsValue, ColumnDef, ColumnRef, FieldType, FromRow, Model, Result, RowLabeled, TableRef,
    Value, take_column,
};

static AUTHOR_TABLE: TableRef = TableRef::new("reprise_author");
static AUTHOR_COLUMNS: [ColumnDef; 3] = [Author::ID, Author::NAME, Author::EMAIL];

#[derive(Debug, Clone, PartialEq)]
pub struct Author {
    pub id: Option<i32>,
    pub name: String,
    pub email: Option<String>,
}

impl Author {
    pub const ID: ColumnDef =
        ColumnDef::new("reprise_author", "id", FieldType::AutoField).primary_key();
    pub const NAME: ColumnDef =
        ColumnDef::new("reprise_author", "name", FieldType::Char { max_length: 100 }).unique();
    pub const EMAIL: ColumnDef =
        ColumnDef::new("reprise_author", "email", FieldType::EMAIL).nullable();

    pub fn new(id: i32, name: &str) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
            email: None,
        }
    }
}

impl FromRow for Author {
    fn from_row(mut row: RowLabeled) -> Result<Self> {
        Ok(Self {
            id: take_column(&mut row, "id")?,
            name: take_column(&mut row, "name")?,
            email: take_column(&mut row, "email")?,
        })
    }
}

impl Model for Author {
    fn table_ref() -> &'static TableRef {
        &AUTHOR_TABLE
    }
    fn columns() -> &'static [ColumnDef] {
        &AUTHOR_COLUMNS
    }
    fn primary_key_def() -> &'static ColumnDef {
        &AUTHOR_COLUMNS[0]
    }
    fn row(&self) -> Vec<(&'static str, Value)> {
        let mut row = Vec::with_capacity(3);
        if let Some(id) = self.id {
            row.push(("id", id.as_value()));
        }
        row.push(("name", self.name.clone().as_value()));
        row.push(("email", self.email.clone().as_value()));
        row
    }
    fn primary_key(&self) -> Value {
        self.id.as_value()
    }
}

static BOOK_TABLE: TableRef = TableRef::new("reprise_book");
static BOOK_COLUMNS: [ColumnDef; 4] = [Book::ID, Book::TITLE, Book::AUTHOR, Book::YEAR];

#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub id: Option<i32>,
    pub title: String,
    pub author: i32,
    pub year: Option<u32>,
}

impl Book {
    pub const ID: ColumnDef =
        ColumnDef::new("reprise_book", "id", FieldType::AutoField).primary_key();
    pub const TITLE: ColumnDef =
        ColumnDef::new("reprise_book", "title", FieldType::Char { max_length: 200 });
    pub const AUTHOR: ColumnDef = ColumnDef::new(
        "reprise_book",
        "author_id",
        FieldType::ForeignKey {
            target: &FieldType::AutoField,
        },
    )
    .references(ColumnRef::new("reprise_author", "id"));
    pub const YEAR: ColumnDef =
        ColumnDef::new("reprise_book", "year", FieldType::PositiveInteger).nullable();

    pub fn new(id: i32, title: &str, author: i32, year: u32) -> Self {
        Self {
            id: Some(id),
            title: title.into(),
            author,
            year: Some(year),
        }
    }
}

impl FromRow for Book {
    fn from_row(mut row: RowLabeled) -> Result<Self> {
        Ok(Self {
            id: take_column(&mut row, "id")?,
            title: take_column(&mut row, "title")?,
            author: take_column(&mut row, "author_id")?,
            year: take_column(&mut row, "year")?,
        })
    }
}

impl Model for Book {
    fn table_ref() -> &'static TableRef {
        &BOOK_TABLE
    }
    fn columns() -> &'static [ColumnDef] {
        &BOOK_COLUMNS
    }
    fn primary_key_def() -> &'static ColumnDef {
        &BOOK_COLUMNS[0]
    }
    fn row(&self) -> Vec<(&'static str, Value)> {
        let mut row = Vec::with_capacity(4);
        if let Some(id) = self.id {
            row.push(("id", id.as_value()));
        }
        row.push(("title", self.title.clone().as_value()));
        row.push(("author_id", self.author.as_value()));
        row.push(("year", self.year.as_value()));
        row
    }
    fn primary_key(&self) -> Value {
        self.id.as_value()
    }
}

pub fn authors() -> Vec<Author> {
    vec![
        Author::new(1, "Svetlana Alexievich"),
        Author::new(2, "Olga Tokarczuk"),
        Author::new(3, "Kazuo Ishiguro"),
        Author::new(4, "Annie Ernaux"),
    ]
}

pub fn books() -> Vec<Book> {
    vec![
        Book::new(1, "Voices from Chernobyl", 1, 1997),
        Book::new(2, "The Unwomanly Face of War", 1, 1985),
        Book::new(3, "Flights", 2, 2007),
        Book::new(4, "The Books of Jacob", 2, 2014),
        Book::new(5, "Never Let Me Go", 3, 2005),
        Book::new(6, "The Remains of the Day", 3, 1989),
        Book::new(7, "The Years", 4, 2008),
    ]
}
