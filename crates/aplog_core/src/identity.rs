//! Split runner test identities into report `classname` / `name` parts.
//!
//! Runners identify a test as `package.module.Class.method`, optionally followed by a parenthesized
//! argument suffix for generated or parametrized tests: `pkg.T.test_alt(3, 'x.y')`.
//!
//! ## Notes
//! - The argument suffix starts at the first `(` of an identity that ends in `)`, so dots inside the
//!   arguments never move the class/name boundary.
//! - The suffix stays attached to the display name.
//! - An identity without a `.` before its suffix is a single-part name: both parts are the whole id.

/// A test identity split for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestIdentity {
    /// Everything before the rightmost `.` of the qualified name.
    pub class_name: String,
    /// The final segment plus any argument suffix.
    pub name: String,
}

impl TestIdentity {
    /// Split a runner test id.
    ///
    /// ## Parameters
    /// - `id`: identity as reported by the runner.
    ///
    /// ## Returns
    /// - `TestIdentity`: the class qualifier and display name.
    pub fn parse(id: &str) -> Self {
        let (qualified, args) = split_argument_suffix(id);
        match qualified.rsplit_once('.') {
            Some((head, tail)) => Self {
                class_name: head.to_string(),
                name: format!("{tail}{args}"),
            },
            None => Self {
                class_name: id.to_string(),
                name: id.to_string(),
            },
        }
    }
}

/// Separate a trailing `( ... )` argument suffix from the qualified name.
fn split_argument_suffix(id: &str) -> (&str, &str) {
    if !id.ends_with(')') {
        return (id, "");
    }
    match id.find('(') {
        Some(open) => id.split_at(open),
        None => (id, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(id: &str) -> (String, String) {
        let identity = TestIdentity::parse(id);
        (identity.class_name, identity.name)
    }

    #[test]
    fn splits_on_rightmost_dot() {
        assert_eq!(parts("pkg.T.test_ok"), ("pkg.T".to_string(), "test_ok".to_string()));
    }

    #[test]
    fn keeps_argument_suffix_on_name() {
        assert_eq!(
            parts("pkg.mod.T.test_alt(3, 'x.y')"),
            ("pkg.mod.T".to_string(), "test_alt(3, 'x.y')".to_string())
        );
    }

    #[test]
    fn nested_parentheses_stay_in_suffix() {
        assert_eq!(
            parts("pkg.check(f(1), (2))"),
            ("pkg".to_string(), "check(f(1), (2))".to_string())
        );
    }

    #[test]
    fn single_part_identity() {
        assert_eq!(parts("test_standalone"), ("test_standalone".to_string(), "test_standalone".to_string()));
    }

    #[test]
    fn single_part_identity_with_arguments() {
        assert_eq!(parts("generated(1.5)"), ("generated(1.5)".to_string(), "generated(1.5)".to_string()));
    }

    #[test]
    fn unbalanced_suffix_is_not_an_argument_list() {
        assert_eq!(parts("pkg.T.weird)"), ("pkg.T".to_string(), "weird)".to_string()));
    }
}
