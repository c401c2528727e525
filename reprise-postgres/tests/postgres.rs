
#[cfg(test)]
mod tests {
    use super::init::init;
    use reprise_core::{Connection, Executor, StatementsPool, future::TryFutureExt};
    use reprise_postgres::PostgresConnection;
    use reprise_tests::{execute_tests, init_logs, silent_logs};
    use std::sync::Mutex;

    static MUTEX: Mutex<()> = Mutex::new(());

    #[tokio::test]
    async fn postgres() {
        init_logs();
        let _guard = MUTEX.lock().unwrap();
        let Some((url, container)) = init().await else {
            return;
        };
        let error_msg = format!("Could not connect to `{url}`");
        let connection = PostgresConnection::connect(url.into())
            .await
            .expect(&error_msg);
        execute_tests(connection).await;
        drop(container);
    }

    #[tokio::test]
    async fn disconnect_forgets_statements() {
        init_logs();
        let _guard = MUTEX.lock().unwrap();
        let Some((url, _container)) = init().await else {
            return;
        };
        let pool = StatementsPool::new();
        let mut connection = PostgresConnection::connect(url.into())
            .await
            .expect("Could not connect");
        let handle = connection.handle().clone();
        pool.ensure_prepared(&handle, "reprise_ping", || {
            connection
                .execute("PREPARE reprise_ping (INTEGER) AS SELECT $1;".into())
                .map_ok(|_| ())
        })
        .await
        .expect("Could not prepare");
        assert_eq!(pool.prepared_on(&handle), 1);
        connection.disconnect(&pool).await.expect("Could not disconnect");
        assert_eq!(pool.prepared_on(&handle), 0);
    }

    #[tokio::test]
    async fn wrong_url() {
        silent_logs! {
            assert!(
                PostgresConnection::connect("mysql://some_url".into())
                    .await
                    .is_err()
            );
        }
    }
}
