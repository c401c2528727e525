use crate::MySqlConnection;
use reprise_core::Driver;

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDriver;

impl MySqlDriver {
    pub const fn new() -> Self {
        Self
    }
}

impl Driver for MySqlDriver {
    type Connection = MySqlConnection;

    const NAME: &'static str = "mysql";

    fn get_instance() -> Self {
        Self
    }
}
