#![allow(dead_code)]
use reprise::{
    AsValue, ColumnDef, Connection, ConnectionHandle, Driver, Error, Executor, FieldType,
    FromRow, Model, QueryResult, Result, RowLabeled, RowNames, RowsAffected, TableRef, Value,
    parse_connection_url, stream::{self, Stream}, take_column,
};
use std::{borrow::Cow, marker::PhantomData};

pub trait Vendor: Send + Sync + 'static {
    const NAME: &'static str;
}

pub struct Postgres;
impl Vendor for Postgres {
    const NAME: &'static str = "postgres";
}

pub struct MySql;
impl Vendor for MySql {
    const NAME: &'static str = "mysql";
}

pub struct MockDriver<V>(PhantomData<V>);

impl<V: Vendor> Driver for MockDriver<V> {
    type Connection = MockConnection<V>;

    const NAME: &'static str = V::NAME;

    fn get_instance() -> Self {
        Self(PhantomData)
    }
}

/// Connection recording every statement, queries answer with `rows`.
pub struct MockConnection<V> {
    driver: MockDriver<V>,
    handle: ConnectionHandle,
    pub log: Vec<String>,
    pub rows: Vec<RowLabeled>,
    /// Statements starting with this prefix fail.
    pub fail_on: Option<&'static str>,
}

impl<V: Vendor> MockConnection<V> {
    pub fn new() -> Self {
        Self {
            driver: MockDriver::get_instance(),
            handle: ConnectionHandle::new(),
            log: Vec::new(),
            rows: Vec::new(),
            fail_on: None,
        }
    }

    pub fn with_rows(mut self, rows: Vec<RowLabeled>) -> Self {
        self.rows = rows;
        self
    }

    pub fn sent(&self, prefix: &str) -> usize {
        self.log.iter().filter(|v| v.starts_with(prefix)).count()
    }

    pub fn last(&self) -> &str {
        self.log.last().map(String::as_str).unwrap_or_default()
    }
}

impl<V: Vendor> Executor for MockConnection<V> {
    type Driver = MockDriver<V>;

    fn driver(&self) -> &Self::Driver {
        &self.driver
    }

    fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    fn run(&mut self, query: String) -> impl Stream<Item = Result<QueryResult>> + Send {
        self.log.push(query.clone());
        let results = if self.fail_on.is_some_and(|v| query.starts_with(v)) {
            vec![Err(Error::msg(format!("Mock failure on `{}`", query)))]
        } else if query.starts_with("SELECT") || query.starts_with("EXECUTE") {
            self.rows.iter().cloned().map(QueryResult::Row).map(Ok).collect()
        } else {
            vec![Ok(QueryResult::Affected(RowsAffected::default()))]
        };
        stream::iter(results)
    }
}

impl<V: Vendor> Connection for MockConnection<V> {
    async fn connect(url: Cow<'static, str>) -> Result<Self> {
        parse_connection_url::<MockDriver<V>>(&url)?;
        Ok(Self::new())
    }
}

pub static AUTHOR_TABLE: TableRef = TableRef::new("author");
pub static AUTHOR_COLUMNS: [ColumnDef; 3] = [Author::ID, Author::NAME, Author::EMAIL];

#[derive(Debug, Clone, PartialEq)]
pub struct Author {
    pub id: Option<i32>,
    pub name: String,
    pub email: Option<String>,
}

impl Author {
    pub const ID: ColumnDef = ColumnDef::new("author", "id", FieldType::AutoField).primary_key();
    pub const NAME: ColumnDef =
        ColumnDef::new("author", "name", FieldType::Char { max_length: 100 });
    pub const EMAIL: ColumnDef = ColumnDef::new("author", "email", FieldType::EMAIL).nullable();

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

pub fn author_rows(authors: &[Author]) -> Vec<RowLabeled> {
    let labels: RowNames = ["id", "name", "email"].map(String::from).into();
    authors
        .iter()
        .map(|v| {
            RowLabeled::new(
                labels.clone(),
                [
                    v.id.as_value(),
                    v.name.clone().as_value(),
                    v.email.clone().as_value(),
                ]
                .into(),
            )
        })
        .collect()
}

pub fn fixture() -> Vec<Author> {
    vec![
        Author::new(1, "Svetlana Alexievich"),
        Author::new(2, "Olga Tokarczuk"),
        Author::new(3, "Kazuo Ishiguro"),
        Author::new(4, "Annie Ernaux"),
    ]
}

pub fn postgres() -> MockConnection<Postgres> {
    MockConnection::new()
}

pub fn mysql() -> MockConnection<MySql> {
    MockConnection::new()
}
