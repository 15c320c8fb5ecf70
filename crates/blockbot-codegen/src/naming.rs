//! Python naming and literal helpers.

pub use blockbot_core::decl::python_identifier;

/// PascalCase class name for a module name (`drive_opmode` -> `DriveOpmode`).
pub fn class_name(module_name: &str) -> String {
    let mut out = String::new();
    for part in module_name.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.extend(chars);
        }
    }
    if out.is_empty() {
        return "Module".to_string();
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Double-quoted python string literal.
pub fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_names() {
        assert_eq!(class_name("drive_opmode"), "DriveOpmode");
        assert_eq!(class_name("arm"), "Arm");
        assert_eq!(class_name("my-Arm 2"), "MyArm2");
        assert_eq!(class_name("2arm"), "_2arm");
        assert_eq!(class_name("__"), "Module");
    }

    #[test]
    fn string_literals_escape() {
        assert_eq!(string_literal("hi"), "\"hi\"");
        assert_eq!(string_literal("a\"b\\c\n"), "\"a\\\"b\\\\c\\n\"");
    }
}
