mod mock;

#[cfg(test)]
mod tests {
    use crate::mock::{Author, author_rows, fixture, mysql, postgres};
    use indoc::indoc;
    use reprise::{
        BindArray, BindParam, Bound, Connection, Error, Executor, ExpressionExt, Model,
        PreparedError, QuerySet, Result, StatementsPool, Value, args, stream::TryStreamExt,
    };
    use std::fmt::Debug;

    fn error_of<T: Debug>(result: Result<T>) -> PreparedError {
        let error = result.expect_err("should fail");
        PreparedError::of(&error)
            .cloned()
            .unwrap_or_else(|| panic!("unexpected error {:#}", error))
    }

    fn by_name() -> QuerySet<Author> {
        Author::objects()
            .filter(Author::NAME.eq(BindParam::new("name")))
            .unwrap()
    }

    #[tokio::test]
    async fn execute_on_postgres() {
        let svetlana = fixture().swap_remove(0);
        let mut connection = postgres().with_rows(author_rows(&[svetlana.clone()]));
        let pool = StatementsPool::new();
        let prepared = by_name().prepare(&connection).unwrap();
        let name = prepared.statement_name().unwrap().to_string();
        assert!(name.starts_with("author_"));
        assert_eq!(
            prepared.sql().unwrap(),
            format!(
                "PREPARE {} (VARCHAR(100)) AS {};",
                name,
                indoc! {r#"
                    SELECT "id", "name", "email"
                    FROM "author"
                    WHERE "name" = $1"#}
            )
        );
        assert_eq!(prepared.param_names(), ["name"]);

        let arguments = args! { "name" => "Svetlana Alexievich" };
        let authors: Vec<Author> = prepared
            .execute(&mut connection, &pool, &arguments)
            .await
            .unwrap();
        assert_eq!(authors, [svetlana.clone()]);
        let authors: Vec<Author> = prepared
            .execute(&mut connection, &pool, &arguments)
            .await
            .unwrap();
        assert_eq!(authors.len(), 1);

        assert_eq!(connection.sent("PREPARE"), 1);
        assert_eq!(connection.sent("EXECUTE"), 2);
        assert_eq!(
            connection.last(),
            format!("EXECUTE {}('Svetlana Alexievich');", name)
        );
        assert!(pool.contains(connection.handle(), &name));
    }

    #[tokio::test]
    async fn execute_on_mysql() {
        let mut connection = mysql().with_rows(author_rows(&fixture()[1..2]));
        let pool = StatementsPool::new();
        let prepared = by_name().prepare(&connection).unwrap();
        let name = prepared.statement_name().unwrap().to_string();
        assert!(prepared.sql().unwrap().starts_with(&format!("PREPARE {} FROM '", name)));
        assert!(prepared.sql().unwrap().contains("WHERE `name` = ?"));

        let authors: Vec<Author> = prepared
            .execute(&mut connection, &pool, &args! { "name" => "Olga Tokarczuk" })
            .await
            .unwrap();
        assert_eq!(authors[0].name, "Olga Tokarczuk");
        assert_eq!(
            connection.log[1..],
            [
                "SET @p0 = 'Olga Tokarczuk';".to_string(),
                format!("EXECUTE {} USING @p0;", name),
            ]
        );
    }

    #[tokio::test]
    async fn prepares_again_on_a_new_connection() {
        let pool = StatementsPool::new();
        let prepared = by_name().prepare(&postgres()).unwrap();
        let arguments = args! { "name" => "Kazuo Ishiguro" };

        let mut first = postgres();
        prepared
            .execute::<Author, _>(&mut first, &pool, &arguments)
            .await
            .unwrap();
        let mut second = postgres();
        prepared
            .execute::<Author, _>(&mut second, &pool, &arguments)
            .await
            .unwrap();
        assert_eq!(first.sent("PREPARE"), 1);
        assert_eq!(second.sent("PREPARE"), 1);
        assert_eq!(pool.len(), 2);

        first.disconnect(&pool).await.unwrap();
        assert_eq!(pool.len(), 1);
        drop(second);
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn failed_prepare_is_retried() {
        let pool = StatementsPool::new();
        let mut connection = postgres();
        connection.fail_on = Some("PREPARE");
        let prepared = by_name().prepare(&connection).unwrap();
        let arguments = args! { "name" => "Annie Ernaux" };
        let error = prepared
            .execute::<Author, _>(&mut connection, &pool, &arguments)
            .await
            .expect_err("the prepare fails");
        assert!(format!("{:#}", error).contains("Mock failure on `PREPARE"));
        assert_eq!(connection.sent("EXECUTE"), 0);

        connection.fail_on = None;
        prepared
            .execute::<Author, _>(&mut connection, &pool, &arguments)
            .await
            .unwrap();
        assert_eq!(connection.sent("PREPARE"), 2);
        assert_eq!(connection.sent("EXECUTE"), 1);
    }

    #[tokio::test]
    async fn setup_failure_keeps_the_original_error() {
        let pool = StatementsPool::new();
        let mut connection = mysql();
        connection.fail_on = Some("SET @p0 = 'A");
        let prepared = by_name().prepare(&connection).unwrap();
        let error = prepared
            .execute::<Author, _>(&mut connection, &pool, &args! { "name" => "Annie Ernaux" })
            .await
            .expect_err("the setup fails");
        assert!(
            format!("{:#}", error).contains("Mock failure on `SET @p0 = 'Annie Ernaux';`"),
            "{:#}",
            error
        );
        assert_eq!(connection.last(), "SET @p0 = NULL;");
        assert_eq!(connection.sent("EXECUTE"), 0);
    }

    #[tokio::test]
    async fn arguments_must_match_the_parameters() {
        let pool = StatementsPool::new();
        let mut connection = postgres();
        let prepared = by_name().prepare(&connection).unwrap();

        let result = prepared
            .execute::<Author, _>(&mut connection, &pool, &args! {})
            .await;
        assert_eq!(
            error_of(result),
            PreparedError::IncorrectBindParameter {
                expected: vec!["name".into()],
                received: vec![],
            }
        );
        let result = prepared
            .execute::<Author, _>(
                &mut connection,
                &pool,
                &args! { "name" => "Olga Tokarczuk", "limit" => 3 },
            )
            .await;
        assert_eq!(
            error_of(result),
            PreparedError::IncorrectBindParameter {
                expected: vec!["name".into()],
                received: vec!["limit".into(), "name".into()],
            }
        );
        let result = prepared
            .execute::<Author, _>(&mut connection, &pool, &args! { "name" => "x".repeat(101) })
            .await;
        assert!(matches!(
            error_of(result),
            PreparedError::InvalidParameterType { name, .. } if name == "name"
        ));
        assert!(connection.log.is_empty());
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn array_parameter() {
        let pool = StatementsPool::new();
        let mut connection = postgres();
        let prepared = Author::objects()
            .filter(Author::ID.is_in(BindArray::new("ids", 3)))
            .unwrap()
            .prepare(&connection)
            .unwrap();
        let artifact = prepared.artifact().unwrap();
        assert!(artifact.body.ends_with(r#"WHERE "id" IN ($1, $2, $3)"#));
        assert!(artifact.statement_sql.contains("(INTEGER, INTEGER, INTEGER)"));

        prepared
            .execute::<Author, _>(&mut connection, &pool, &args! { "ids" => vec![1, 2] })
            .await
            .unwrap();
        assert_eq!(
            connection.last(),
            format!("EXECUTE {}(1, 2, NULL);", artifact.name)
        );
        let result = prepared
            .execute::<Author, _>(
                &mut connection,
                &pool,
                &args! { "ids" => vec![1, 2, 3, 4] },
            )
            .await;
        assert_eq!(
            error_of(result),
            PreparedError::ArraySizeExceeded {
                name: "ids".into(),
                size: 3,
                len: 4,
            }
        );
    }

    #[tokio::test]
    async fn sliced_by_parameter() {
        let pool = StatementsPool::new();
        let mut connection = postgres().with_rows(author_rows(&fixture()));
        let prepared = Author::objects()
            .order_by(Author::NAME.asc())
            .unwrap()
            .slice(0u64, Some(Bound::from(BindParam::new("limit"))))
            .unwrap()
            .prepare(&connection)
            .unwrap();
        assert!(
            prepared
                .artifact()
                .unwrap()
                .body
                .ends_with("ORDER BY \"name\" ASC\nLIMIT $1")
        );
        let stream = prepared
            .execute_iterator::<Author, _>(&mut connection, &pool, &args! { "limit" => 5 })
            .unwrap();
        let authors: Vec<Author> = stream.try_collect().await.unwrap();
        assert_eq!(authors.len(), 4);
        assert!(connection.last().ends_with("(5);"));
    }

    #[test]
    fn prepared_query_set_is_frozen() {
        let prepared = by_name().prepare(&postgres()).unwrap();
        assert!(prepared.is_prepared());
        assert!(!by_name().is_prepared());
        let rejected = |result: Result<QuerySet<Author>>| match error_of(result) {
            PreparedError::OperationOnPreparedStatement { operation } => operation,
            e => panic!("unexpected error {}", e),
        };
        assert_eq!(rejected(prepared.filter(Author::ID.eq(1))), "filter");
        assert_eq!(rejected(prepared.exclude(Author::ID.eq(1))), "exclude");
        assert_eq!(rejected(prepared.order_by(Author::ID.desc())), "order_by");
        assert_eq!(rejected(prepared.values(&[&Author::NAME])), "values");
        assert_eq!(rejected(prepared.only(&[&Author::NAME])), "only");
        assert_eq!(rejected(prepared.defer(&[&Author::EMAIL])), "defer");
        assert_eq!(rejected(prepared.distinct()), "distinct");
        assert_eq!(rejected(prepared.reverse()), "reverse");
        assert_eq!(rejected(prepared.limit(3u64)), "limit");
        assert_eq!(rejected(prepared.using("replica")), "using");
        assert_eq!(rejected(prepared.none()), "none");
        assert_eq!(rejected(by_name().and(&prepared)), "and");
        assert_eq!(rejected(prepared.or(&by_name())), "or");
        assert_eq!(
            rejected(prepared.select_related(&["publisher"])),
            "select_related"
        );
    }

    #[tokio::test]
    async fn immediate_operations_on_a_prepared_query_set_fail() {
        let prepared = by_name().prepare(&postgres()).unwrap();
        let mut connection = postgres();
        assert!(matches!(
            error_of(prepared.count(&mut connection).await),
            PreparedError::OperationOnPreparedStatement { operation: "count" }
        ));
        assert!(matches!(
            error_of(prepared.all(&mut connection).await),
            PreparedError::OperationOnPreparedStatement { operation: "all" }
        ));
        assert!(matches!(
            error_of(prepared.first(&mut connection).await),
            PreparedError::OperationOnPreparedStatement { operation: "first" }
        ));
        assert!(matches!(
            error_of(prepared.delete(&mut connection).await),
            PreparedError::OperationOnPreparedStatement { operation: "delete" }
        ));
        assert!(connection.log.is_empty());
    }

    #[tokio::test]
    async fn execute_requires_prepare() {
        let pool = StatementsPool::new();
        let mut connection = postgres();
        let result = by_name()
            .execute::<Author, _>(&mut connection, &pool, &args! { "name" => "Olga Tokarczuk" })
            .await;
        assert_eq!(error_of(result), PreparedError::QueryNotPrepared);
        assert!(connection.log.is_empty());
    }

    #[test]
    fn prepare_is_idempotent() {
        let connection = postgres();
        let prepared = by_name().prepare(&connection).unwrap();
        let again = prepared.prepare(&connection).unwrap();
        assert_eq!(prepared.statement_name(), again.statement_name());
        assert!(std::sync::Arc::ptr_eq(
            prepared.artifact().unwrap(),
            again.artifact().unwrap()
        ));

        let on_mysql = prepared.prepare(&mysql()).unwrap();
        assert!(on_mysql.sql().unwrap().contains("FROM '"));
        assert_ne!(prepared.sql(), on_mysql.sql());
    }

    #[test]
    fn display() {
        let query = by_name();
        assert_eq!(
            query.to_string(),
            indoc! {r#"
                QuerySet <SELECT "id", "name", "email"
                FROM "author"
                WHERE "name" = ?>"#}
        );
        let prepared = query.prepare(&postgres()).unwrap();
        let rendered = prepared.to_string();
        let token = prepared.query().params.get("name").unwrap().token();
        assert!(rendered.starts_with("PreparedQuerySet <PREPARE author_"));
        assert!(rendered.ends_with(&format!("({})>", token)));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let result = Author::objects()
            .filter(Author::NAME.eq(BindParam::new("value")))
            .unwrap()
            .filter(Author::EMAIL.eq(BindParam::new("value")));
        assert_eq!(
            error_of(result),
            PreparedError::DuplicateParameterName {
                name: "value".into()
            }
        );
    }

    #[test]
    fn unsupported_lookups() {
        let connection = postgres();
        let result = Author::objects()
            .filter(Author::ID.is_in(BindParam::new("ids")))
            .unwrap()
            .prepare(&connection);
        assert_eq!(
            error_of(result),
            PreparedError::ArrayParameterRequired { name: "ids".into() }
        );
    }

    #[tokio::test]
    async fn sliced_by_two_parameters() {
        let window = || {
            Author::objects()
                .order_by(Author::ID.asc())
                .unwrap()
                .slice(
                    Bound::from(BindParam::new("start")),
                    Some(Bound::from(BindParam::new("end"))),
                )
                .unwrap()
        };
        let pool = StatementsPool::new();

        let mut connection = postgres();
        let prepared = window().prepare(&connection).unwrap();
        let artifact = prepared.artifact().unwrap();
        assert!(artifact.body.ends_with("LIMIT $1\nOFFSET $2"));
        assert_eq!(prepared.param_names(), ["start", "end"]);
        prepared
            .execute::<Author, _>(&mut connection, &pool, &args! { "start" => 5, "end" => 2 })
            .await
            .unwrap();
        assert_eq!(
            connection.last(),
            format!("EXECUTE {}(0, 5);", artifact.name)
        );

        let mut connection = mysql();
        let prepared = window().prepare(&connection).unwrap();
        let name = prepared.statement_name().unwrap().to_string();
        assert!(prepared.sql().unwrap().contains("LIMIT ?\nOFFSET ?"));
        prepared
            .execute::<Author, _>(&mut connection, &pool, &args! { "start" => 1, "end" => 3 })
            .await
            .unwrap();
        assert_eq!(
            connection.log[1..],
            [
                "SET @p0 = 2, @p1 = 1;".to_string(),
                format!("EXECUTE {} USING @p0, @p1;", name),
            ]
        );
        prepared
            .execute::<Author, _>(&mut connection, &pool, &args! { "start" => 5, "end" => 2 })
            .await
            .unwrap();
        assert_eq!(connection.log[3], "SET @p0 = 0, @p1 = 5;");
    }

    #[tokio::test]
    async fn nullable_columns_accept_null() {
        let pool = StatementsPool::new();
        let mut connection = postgres();
        let prepared = Author::objects()
            .filter(Author::EMAIL.eq(BindParam::new("email")))
            .unwrap()
            .prepare(&connection)
            .unwrap();
        prepared
            .execute::<Author, _>(&mut connection, &pool, &args! { "email" => Value::Null })
            .await
            .unwrap();
        assert!(connection.last().ends_with("(NULL);"));

        let result = by_name()
            .prepare(&connection)
            .unwrap()
            .execute::<Author, _>(&mut connection, &pool, &args! { "name" => Value::Null })
            .await;
        assert!(matches!(
            error_of(result),
            PreparedError::InvalidParameterType { .. }
        ));
    }

    #[tokio::test]
    async fn mock_errors_are_not_prepared_errors() {
        let pool = StatementsPool::new();
        let mut connection = postgres();
        connection.fail_on = Some("EXECUTE");
        let prepared = by_name().prepare(&connection).unwrap();
        let error: Error = prepared
            .execute::<Author, _>(&mut connection, &pool, &args! { "name" => "Olga Tokarczuk" })
            .await
            .expect_err("the execute fails");
        assert!(PreparedError::of(&error).is_none());
        assert!(format!("{:#}", error).starts_with("While executing the prepared statement"));
    }
}
