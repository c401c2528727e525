use crate::{Author, Book};
use reprise::{Executor, Expression, ExpressionExt, Model, Value, stream::TryStreamExt};

pub async fn queries<E: Executor>(executor: &mut E) {
    let authors = Author::objects();
    assert_eq!(authors.count(executor).await.expect("Failed to count"), 4);
    let after_first = authors.filter(Author::ID.gt(1)).expect("Failed to filter");
    assert_eq!(
        after_first.count(executor).await.expect("Failed to count"),
        3
    );
    assert!(after_first.exists(executor).await.expect("Failed to check"));
    assert!(
        !authors
            .filter(Author::NAME.eq("Nobody"))
            .expect("Failed to filter")
            .exists(executor)
            .await
            .expect("Failed to check")
    );

    let ishiguro = authors
        .filter(Author::ID.eq(3))
        .expect("Failed to filter")
        .get(executor)
        .await
        .expect("Failed to get");
    assert_eq!(ishiguro, Author::new(3, "Kazuo Ishiguro"));
    assert!(authors.get(executor).await.is_err());

    let first = authors.first(executor).await.expect("Failed to get first");
    assert_eq!(first.map(|v| v.id), Some(Some(1)));
    let last = authors.last(executor).await.expect("Failed to get last");
    assert_eq!(last.map(|v| v.id), Some(Some(4)));

    let names: Vec<String> = authors
        .order_by(Author::NAME.asc())
        .and_then(|v| v.values_list(&[&Author::NAME]))
        .expect("Failed to project")
        .all_as(executor)
        .await
        .expect("Failed to read the names");
    assert_eq!(
        names,
        [
            "Annie Ernaux",
            "Kazuo Ishiguro",
            "Olga Tokarczuk",
            "Svetlana Alexievich"
        ]
    );

    let titles: Vec<String> = Book::objects()
        .filter(Book::YEAR.lt(2000))
        .and_then(|v| v.order_by(Book::YEAR.desc()))
        .expect("Failed to filter")
        .iter(executor)
        .expect("Failed to iterate")
        .map_ok(|v| v.title)
        .try_collect()
        .await
        .expect("Failed to read the titles");
    assert_eq!(
        titles,
        [
            "Voices from Chernobyl",
            "The Remains of the Day",
            "The Unwomanly Face of War"
        ]
    );

    // Modify
    let ernaux = authors
        .filter(Author::NAME.eq("Annie Ernaux"))
        .expect("Failed to filter");
    let email = Value::Varchar(Some("annie@example.com".into()));
    ernaux
        .update(executor, &[(&Author::EMAIL, &email as &dyn Expression)])
        .await
        .expect("Failed to update");
    let ernaux = ernaux.get(executor).await.expect("Failed to get");
    assert_eq!(ernaux.email.as_deref(), Some("annie@example.com"));

    let result = Book::objects()
        .filter(Book::TITLE.startswith("The"))
        .expect("Failed to filter")
        .delete(executor)
        .await
        .expect("Failed to delete");
    assert_eq!(result.rows_affected, 4);
    assert_eq!(
        Book::objects().count(executor).await.expect("Failed to count"),
        3
    );
}
