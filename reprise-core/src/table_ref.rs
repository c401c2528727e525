/// Reference to a table, optionally schema qualified and aliased.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub name: &'static str,
    pub schema: &'static str,
    pub alias: &'static str,
}

impl TableRef {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            schema: "",
            alias: "",
        }
    }

    pub const fn with_schema(self, schema: &'static str) -> Self {
        Self { schema, ..self }
    }

    pub fn full_name(&self) -> String {
        let mut result = String::new();
        if !self.alias.is_empty() {
            result.push_str(self.alias);
        } else {
            if !self.schema.is_empty() {
                result.push_str(self.schema);
                result.push('.');
            }
            result.push_str(self.name);
        }
        result
    }
}
