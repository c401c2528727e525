use crate::SqlParam;
use std::mem;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    #[default]
    None,
    RangeBounds,
    SqlCreateTable,
    SqlDeleteFrom,
    SqlDeleteFromWhere,
    SqlDropTable,
    SqlInsertInto,
    SqlInsertIntoValues,
    SqlSelect,
    SqlSelectFrom,
    SqlSelectLimit,
    SqlSelectOrderBy,
    SqlSelectWhere,
    SqlUpdate,
    SqlUpdateSet,
    SqlUpdateWhere,
}

/// State threaded through a writer while it renders one statement.
///
/// Literal values and bind parameter occurrences are not written in the text, they are
/// collected in `params` together with the byte offset where they belong.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    pub fragment: Fragment,
    pub qualify_columns: bool,
    pub params: Vec<(usize, SqlParam)>,
}

impl Context {
    pub fn new(fragment: Fragment, qualify_columns: bool) -> Self {
        Self {
            fragment,
            qualify_columns,
            params: Vec::new(),
        }
    }

    pub fn switch_fragment<'s>(&'s mut self, fragment: Fragment) -> ContextUpdater<'s> {
        ContextUpdater {
            current: Context {
                fragment,
                qualify_columns: self.qualify_columns,
                params: mem::take(&mut self.params),
            },
            previous: self,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new(Fragment::None, false)
    }
}

/// Restores the collected parameters into the parent context when dropped.
pub struct ContextUpdater<'a> {
    pub current: Context,
    pub previous: &'a mut Context,
}

impl<'a> Drop for ContextUpdater<'a> {
    fn drop(&mut self) {
        self.previous.params = mem::take(&mut self.current.params);
    }
}
