mod init;

#[cfg(test)]
mod tests {
    use super::init::init;
    use reprise_core::Connection;
    use reprise_mysql::MySqlConnection;
    use reprise_tests::{execute_tests, init_logs, silent_logs};
    use std::sync::Mutex;

    static MUTEX: Mutex<()> = Mutex::new(());

    #[tokio::test]
    async fn mysql() {
        init_logs();
        let _guard = MUTEX.lock().unwrap();
        let Some((url, container)) = init().await else {
            return;
        };
        let error_msg = format!("Could not connect to `{url}`");
        let connection = MySqlConnection::connect(url.into())
            .await
            .expect(&error_msg);
        execute_tests(connection).await;
        drop(container);
    }

    #[tokio::test]
    async fn wrong_url() {
        silent_logs! {
            assert!(
                MySqlConnection::connect("postgres://some_url".into())
                    .await
                    .is_err()
            );
        }
    }
}
