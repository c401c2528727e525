use crate::PostgresConnection;
use reprise_core::Driver;

#[derive(Debug, Default)]
pub struct PostgresDriver {}

impl PostgresDriver {
    pub const fn new() -> Self {
        Self {}
    }
}

impl Driver for PostgresDriver {
    type Connection = PostgresConnection;

    const NAME: &'static str = "postgres";

    fn get_instance() -> Self {
        Self::new()
    }
}
