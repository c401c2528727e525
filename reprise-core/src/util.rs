use std::fmt::{self, Display, Formatter};

pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    // Items may record parameters without writing any text, the separator goes between every pair
    for (i, v) in values.into_iter().enumerate() {
        if i > 0 {
            out.push_str(separator);
        }
        f(out, v);
    }
}

pub fn consume_while<'s>(input: &mut &'s str, predicate: impl FnMut(&char) -> bool) -> &'s str {
    let value: &'s str = input;
    let len = value
        .chars()
        .take_while(predicate)
        .map(char::len_utf8)
        .sum::<usize>();
    *input = &value[len..];
    &value[..len]
}

#[macro_export]
macro_rules! possibly_parenthesized {
    ($buff:ident, $cond:expr, $v:expr) => {
        if $cond {
            $buff.push('(');
            $v;
            $buff.push(')');
        } else {
            $v;
        }
    };
}

/// Displays at most 497 bytes of a string, used to keep long queries out of error messages.
pub struct Truncated<'a>(&'a str);

impl<'a> Truncated<'a> {
    pub fn new<S: AsRef<str> + ?Sized>(value: &'a S) -> Self {
        Self(value.as_ref())
    }
}

impl Display for Truncated<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        const LIMIT: usize = 497;
        if self.0.len() <= LIMIT {
            return f.write_str(self.0.trim_end());
        }
        let mut end = LIMIT;
        while !self.0.is_char_boundary(end) {
            end -= 1;
        }
        write!(f, "{}...", self.0[..end].trim_end())
    }
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        $crate::Truncated::new(&$query)
    };
}
