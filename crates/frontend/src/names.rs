//! Helpers for Java type names.

/// Removes every balanced `<...>` span, at any nesting depth.
///
/// ```
/// use frontend::names::strip_type_arguments;
/// assert_eq!(strip_type_arguments("pkg.Foo<Bar<T>>"), "pkg.Foo");
/// assert_eq!(strip_type_arguments("Map<K,V>.Entry<K,V>"), "Map.Entry");
/// ```
pub fn strip_type_arguments(name: &str) -> String {
    if !name.contains('<') {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len());
    let mut depth = 0usize;
    for c in name.chars() {
        match c {
            '<' => depth += 1,
            '>' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Last dotted segment.
pub fn simple_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

/// Everything before the last dot, empty for unqualified names.
pub fn qualifier(qualified: &str) -> &str {
    qualified.rfind('.').map_or("", |pos| &qualified[..pos])
}
