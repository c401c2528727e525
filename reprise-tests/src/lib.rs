mod library;
mod prepared;
mod queries;

pub use library::*;
pub use log;

use log::LevelFilter;
use prepared::prepared;
use queries::queries;
use reprise::{Connection, Executor, Model, StatementsPool};
use std::env;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Recreate the library tables with the fixture rows.
pub async fn setup<E: Executor>(executor: &mut E) {
    Book::drop_table(executor, true)
        .await
        .expect("Failed to drop the book table");
    Author::drop_table(executor, true)
        .await
        .expect("Failed to drop the author table");
    Author::create_table(executor, false)
        .await
        .expect("Failed to create the author table");
    Book::create_table(executor, false)
        .await
        .expect("Failed to create the book table");
    Author::insert_many(executor, &authors())
        .await
        .expect("Failed to insert the authors");
    Book::insert_many(executor, &books())
        .await
        .expect("Failed to insert the books");
}

pub async fn execute_tests<C: Connection>(mut connection: C) {
    let pool = StatementsPool::new();
    setup(&mut connection).await;
    prepared(&mut connection, &pool).await;
    setup(&mut connection).await;
    queries(&mut connection).await;

    let handle = connection.handle().clone();
    assert!(pool.prepared_on(&handle) > 0);
    connection
        .disconnect(&pool)
        .await
        .expect("Could not disconnect");
    assert_eq!(pool.prepared_on(&handle), 0);
    assert!(pool.is_empty());
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = $crate::log::max_level();
        $crate::log::set_max_level($crate::log::LevelFilter::Off);
        $($code)+
        $crate::log::set_max_level(level);
    }};
}
