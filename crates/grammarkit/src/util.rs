use std::fmt;

pub fn display_fn(f: impl Fn(&mut fmt::Formatter<'_>) -> fmt::Result) -> impl fmt::Display {
    DisplayFn(f)
}

struct DisplayFn<F>(F);
impl<F> fmt::Display for DisplayFn<F>
where
    F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
{
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self.0)(formatter)
    }
}

/// Write `{ a, b, c }` with the names sorted lexicographically.
pub(crate) fn write_sorted_set<'a>(
    f: &mut fmt::Formatter<'_>,
    names: impl IntoIterator<Item = &'a str>,
) -> fmt::Result {
    let mut names: Vec<&str> = names.into_iter().collect();
    names.sort_unstable();
    if names.is_empty() {
        return f.write_str("{ }");
    }
    write!(f, "{{ {} }}", names.join(", "))
}
