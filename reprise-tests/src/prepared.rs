use crate::{Author, Book};
use reprise::{
    Argument, BindArray, BindParam, Connection, Executor, ExpressionExt, Model,
    PreparedError, StatementsPool, args,
};

pub async fn prepared<C: Connection>(connection: &mut C, pool: &StatementsPool) {
    let handle = connection.handle().clone();

    // Exact lookup, prepared once and executed many times
    let by_name = Author::objects()
        .filter(Author::NAME.eq(BindParam::new("name")))
        .expect("Failed to filter by name")
        .prepare(connection)
        .expect("Failed to prepare by_name");
    let name = by_name
        .statement_name()
        .expect("A prepared query set has a statement name")
        .to_string();
    assert!(by_name.to_string().contains("PREPARE"));
    let found: Vec<Author> = by_name
        .execute(connection, pool, &args! { "name" => "Svetlana Alexievich" })
        .await
        .expect("Failed to execute by_name");
    assert_eq!(found, [Author::new(1, "Svetlana Alexievich")]);
    assert!(pool.contains(&handle, &name));
    let found: Vec<Author> = by_name
        .execute(connection, pool, &args! { "name" => "Olga Tokarczuk" })
        .await
        .expect("Failed to execute by_name again");
    assert_eq!(found, [Author::new(2, "Olga Tokarczuk")]);
    let found: Vec<Author> = by_name
        .execute(connection, pool, &args! { "name" => "Nobody" })
        .await
        .expect("Failed to execute by_name without matches");
    assert!(found.is_empty());
    assert_eq!(pool.prepared_on(&handle), 1);

    // Preparing again gives the same statement
    let again = by_name
        .prepare(connection)
        .expect("Preparing a prepared query set must succeed");
    assert_eq!(again.statement_name(), Some(name.as_str()));

    // Membership with an array parameter, padded with NULL
    let by_ids = Author::objects()
        .filter(Author::ID.is_in(BindArray::new("ids", 3)))
        .and_then(|v| v.order_by(Author::ID.asc()))
        .and_then(|v| v.prepare(connection))
        .expect("Failed to prepare by_ids");
    let found: Vec<Author> = by_ids
        .execute(connection, pool, &args! { "ids" => vec![1, 3] })
        .await
        .expect("Failed to execute by_ids");
    assert_eq!(
        found.into_iter().map(|v| v.id).collect::<Vec<_>>(),
        [Some(1), Some(3)]
    );

    // Case insensitive pattern
    let matching = Author::objects()
        .filter(Author::NAME.icontains(BindParam::new("part")))
        .and_then(|v| v.order_by(Author::NAME.asc()))
        .and_then(|v| v.prepare(connection))
        .expect("Failed to prepare matching");
    let found: Vec<Author> = matching
        .execute(connection, pool, &args! { "part" => "AN" })
        .await
        .expect("Failed to execute matching");
    assert_eq!(
        found.into_iter().map(|v| v.name).collect::<Vec<_>>(),
        ["Annie Ernaux", "Svetlana Alexievich"]
    );

    // Foreign key compared with a referenced model
    let by_author = Book::objects()
        .filter(Book::AUTHOR.eq(BindParam::new("author")))
        .and_then(|v| v.order_by(Book::YEAR.asc()))
        .and_then(|v| v.prepare(connection))
        .expect("Failed to prepare by_author");
    let tokarczuk = Author::new(2, "Olga Tokarczuk");
    let found: Vec<Book> = by_author
        .execute(
            connection,
            pool,
            &args! { "author" => Argument::reference(&tokarczuk) },
        )
        .await
        .expect("Failed to execute by_author");
    assert_eq!(
        found.into_iter().map(|v| v.title).collect::<Vec<_>>(),
        ["Flights", "The Books of Jacob"]
    );

    // Number of rows as a parameter
    let first_books = Book::objects()
        .order_by(Book::ID.asc())
        .and_then(|v| v.limit(BindParam::new("count")))
        .and_then(|v| v.prepare(connection))
        .expect("Failed to prepare first_books");
    for count in [1u64, 3, 10] {
        let found: Vec<Book> = first_books
            .execute(connection, pool, &args! { "count" => count })
            .await
            .expect("Failed to execute first_books");
        assert_eq!(found.len() as u64, count.min(7));
    }

    // Both bounds as parameters
    let window = Book::objects()
        .order_by(Book::ID.asc())
        .and_then(|v| {
            v.slice(
                BindParam::new("start"),
                Some(BindParam::new("end").into()),
            )
        })
        .and_then(|v| v.prepare(connection))
        .expect("Failed to prepare window");
    let found: Vec<Book> = window
        .execute(connection, pool, &args! { "start" => 1, "end" => 3 })
        .await
        .expect("Failed to execute window");
    assert_eq!(
        found.into_iter().map(|v| v.id).collect::<Vec<_>>(),
        [Some(2), Some(3)]
    );
    let found: Vec<Book> = window
        .execute(connection, pool, &args! { "start" => 5, "end" => 2 })
        .await
        .expect("Failed to execute an empty window");
    assert!(found.is_empty());

    // The shape of a prepared query set is frozen
    let error = by_name
        .filter(Author::ID.gt(1))
        .expect_err("Filtering a prepared query set must fail");
    assert!(matches!(
        PreparedError::of(&error),
        Some(PreparedError::OperationOnPreparedStatement { .. })
    ));

    // Arguments are checked before reaching the server
    let prepared = pool.prepared_on(&handle);
    let error = by_name
        .execute::<Author, _>(connection, pool, &args! {})
        .await
        .expect_err("Missing arguments must be rejected");
    assert!(matches!(
        PreparedError::of(&error),
        Some(PreparedError::IncorrectBindParameter { .. })
    ));
    let error = by_name
        .execute::<Author, _>(connection, pool, &args! { "name" => "x".repeat(101) })
        .await
        .expect_err("Too long values must be rejected");
    assert!(matches!(
        PreparedError::of(&error),
        Some(PreparedError::InvalidParameterType { .. })
    ));
    let error = by_ids
        .execute::<Author, _>(connection, pool, &args! { "ids" => vec![1, 2, 3, 4] })
        .await
        .expect_err("Too many values must be rejected");
    assert!(matches!(
        PreparedError::of(&error),
        Some(PreparedError::ArraySizeExceeded { size: 3, len: 4, .. })
    ));
    assert_eq!(pool.prepared_on(&handle), prepared);
}
