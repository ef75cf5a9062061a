use strum_macros::{Display, EnumIter, EnumString};
use enum_assoc::Assoc;

/// Primitive is the table of rules that compile to fixed text instead of a composed template.
/// Variant names are the rule names of the program grammar, parsing a rule name with `from_str`
/// looks up its entry.
#[allow(non_camel_case_types)]
#[derive(Debug,
         Eq, PartialEq,
         Copy, Clone,
         EnumString, Display, EnumIter,
         Assoc)]
#[func(pub const fn text(&self) -> &'static str)]
pub enum Primitive {
    #[assoc(text = " >= ")]
    ge,
    #[assoc(text = " <= ")]
    le,
    #[assoc(text = " == ")]
    eq,
    #[assoc(text = " != ")]
    ne,
    #[assoc(text = " < ")]
    lt,
    #[assoc(text = " > ")]
    gt,

    #[assoc(text = " && ")]
    and,
    #[assoc(text = " || ")]
    or,

    #[assoc(text = " + ")]
    plus,
    #[assoc(text = " - ")]
    minus,
    #[assoc(text = "!")]
    not,

    #[assoc(text = ".")]
    MemberAccess,
    #[assoc(text = "break")]
    BreakStatement,
}

#[cfg(test)]
mod tests {
    use super::Primitive;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_lookup_by_rule_name() {
        assert_eq!(Ok(Primitive::ge), Primitive::from_str("ge"));
        assert_eq!(" >= ", Primitive::ge.text());
        assert_eq!("break", Primitive::from_str("BreakStatement").unwrap().text());
        assert!(Primitive::from_str("If").is_err());
    }

    #[test]
    fn test_every_primitive_has_text() {
        for primitive in Primitive::iter() {
            assert!(!primitive.text().is_empty(), "{} has no text", primitive);
            assert_eq!(Ok(primitive), primitive.to_string().parse());
        }
    }
}
