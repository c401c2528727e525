mod mock;

#[cfg(test)]
mod tests {
    use crate::mock::{Author, author_rows, fixture, postgres};
    use indoc::indoc;
    use reprise::{
        AsValue, Expression, ExpressionExt, Model, RowLabeled, RowNames, Value, stream::TryStreamExt,
    };

    fn count_row(count: i64) -> Vec<RowLabeled> {
        let labels: RowNames = ["count".to_string()].into();
        vec![RowLabeled::new(labels, [count.as_value()].into())]
    }

    #[tokio::test]
    async fn count_and_exists() {
        let mut connection = postgres().with_rows(count_row(2));
        let objects = Author::objects()
            .filter(Author::NAME.icontains("o"))
            .unwrap();
        assert_eq!(objects.count(&mut connection).await.unwrap(), 2);
        assert_eq!(
            connection.last(),
            indoc! {r#"
                SELECT COUNT(*)
                FROM "author"
                WHERE "name" ILIKE '%' || 'o' || '%'"#}
        );
        assert!(objects.exists(&mut connection).await.unwrap());
        assert!(connection.last().ends_with("\nLIMIT 1"));

        connection.rows.clear();
        assert!(!objects.exists(&mut connection).await.unwrap());
    }

    #[tokio::test]
    async fn get_single_row() {
        let mut connection = postgres().with_rows(author_rows(&fixture()[..1]));
        let objects = Author::objects().filter(Author::ID.eq(1)).unwrap();
        let author = objects.get(&mut connection).await.unwrap();
        assert_eq!(author.name, "Svetlana Alexievich");
        assert!(connection.last().ends_with("WHERE \"id\" = 1\nLIMIT 21"));

        connection.rows = author_rows(&fixture());
        let error = objects.get(&mut connection).await.unwrap_err();
        assert!(error.to_string().contains("returned more than one"));
        connection.rows.clear();
        let error = objects.get(&mut connection).await.unwrap_err();
        assert!(error.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn first_and_last() {
        let mut connection = postgres().with_rows(author_rows(&fixture()[..1]));
        let objects = Author::objects();
        let first = objects.first(&mut connection).await.unwrap();
        assert_eq!(first.map(|v| v.name).as_deref(), Some("Svetlana Alexievich"));
        assert!(connection.last().ends_with("ORDER BY \"id\" ASC\nLIMIT 1"));
        objects.last(&mut connection).await.unwrap();
        assert!(connection.last().ends_with("ORDER BY \"id\" DESC\nLIMIT 1"));

        let by_name = objects.order_by(Author::NAME.desc()).unwrap();
        by_name.last(&mut connection).await.unwrap();
        assert!(connection.last().ends_with("ORDER BY \"name\" ASC\nLIMIT 1"));
        by_name.get_index(&mut connection, 2).await.unwrap();
        assert!(connection.last().ends_with("\nLIMIT 1\nOFFSET 2"));
    }

    #[tokio::test]
    async fn projections() {
        let mut connection = postgres().with_rows(author_rows(&fixture()));
        let objects = Author::objects();
        let rows: Vec<RowLabeled> = objects
            .values(&[&Author::NAME])
            .unwrap()
            .all_as(&mut connection)
            .await
            .unwrap();
        assert_eq!(rows.len(), 4);
        assert!(connection.last().starts_with("SELECT \"name\"\nFROM"));

        objects
            .only(&[&Author::NAME])
            .unwrap()
            .all(&mut connection)
            .await
            .unwrap();
        assert!(connection.last().starts_with("SELECT \"id\", \"name\"\nFROM"));
        objects
            .defer(&[&Author::EMAIL])
            .unwrap()
            .all(&mut connection)
            .await
            .unwrap();
        assert!(connection.last().starts_with("SELECT \"id\", \"name\"\nFROM"));

        let ids: Vec<i32> = objects
            .values_list(&[&Author::ID])
            .unwrap()
            .all_as(&mut connection)
            .await
            .unwrap();
        assert_eq!(ids, [1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn deferred_columns() {
        let mut connection = postgres().with_rows(author_rows(&fixture()));
        let objects = Author::objects();
        objects
            .defer(&[&Author::NAME])
            .unwrap()
            .all(&mut connection)
            .await
            .unwrap();
        assert!(connection.last().starts_with("SELECT \"id\", \"email\"\nFROM"));
        objects
            .defer(&[&Author::ID, &Author::NAME, &Author::EMAIL])
            .unwrap()
            .all(&mut connection)
            .await
            .unwrap();
        assert!(connection.last().starts_with("SELECT \"id\"\nFROM"));
        objects
            .only(&[&Author::NAME, &Author::EMAIL])
            .and_then(|v| v.defer(&[&Author::EMAIL]))
            .unwrap()
            .all(&mut connection)
            .await
            .unwrap();
        assert!(connection.last().starts_with("SELECT \"id\", \"name\"\nFROM"));
    }

    #[tokio::test]
    async fn combined_and_sliced() {
        let mut connection = postgres();
        let lhs = Author::objects().filter(Author::ID.gt(1)).unwrap();
        let rhs = Author::objects()
            .filter(Author::NAME.startswith("Ann"))
            .unwrap();
        lhs.or(&rhs).unwrap().all(&mut connection).await.unwrap();
        assert!(
            connection
                .last()
                .ends_with("WHERE \"id\" > 1 OR \"name\" LIKE 'Ann' || '%'")
        );

        let sliced = Author::objects()
            .order_by(Author::ID.asc())
            .unwrap()
            .slice(1u64, Some(3u64.into()))
            .unwrap()
            .slice(1u64, None)
            .unwrap();
        sliced.all(&mut connection).await.unwrap();
        assert!(connection.last().ends_with("\nLIMIT 1\nOFFSET 2"));
        assert!(sliced.filter(Author::ID.eq(1)).is_err());

        Author::objects()
            .none()
            .unwrap()
            .all(&mut connection)
            .await
            .unwrap();
        assert!(connection.last().ends_with("WHERE false"));
    }

    #[tokio::test]
    async fn modify() {
        let mut connection = postgres();
        let objects = Author::objects();
        objects
            .create(&mut connection, &Author::new(5, "Jon Fosse"))
            .await
            .unwrap();
        assert!(connection.last().starts_with("INSERT INTO \"author\""));

        let ernaux = objects.filter(Author::NAME.eq("Annie Ernaux")).unwrap();
        let email = Value::Varchar(Some("annie@example.com".into()));
        ernaux
            .update(&mut connection, &[(&Author::EMAIL, &email as &dyn Expression)])
            .await
            .unwrap();
        assert_eq!(
            connection.last(),
            indoc! {r#"
                UPDATE "author"
                SET "email" = 'annie@example.com'
                WHERE "name" = 'Annie Ernaux'"#}
        );
        ernaux.delete(&mut connection).await.unwrap();
        assert!(connection.last().starts_with("DELETE FROM \"author\""));
    }

    #[tokio::test]
    async fn stream_rows() {
        let mut connection = postgres().with_rows(author_rows(&fixture()));
        let names: Vec<String> = Author::objects()
            .iter(&mut connection)
            .unwrap()
            .map_ok(|v| v.name)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(names.len(), 4);
        assert_eq!(names[3], "Annie Ernaux");
    }
}
