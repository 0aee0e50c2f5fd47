//! PEG grammar for PEP 440 specifier sets, PEP 508 markers, and requirement
//! strings (`Requires-Dist` lines). Adapted from the njsmith/posy
//! `reqparse.rs` vocabulary grammar this crate's teacher vendors; trimmed to
//! the productions this crate actually needs (no `@ url` direct references,
//! no extras-context gating on the `extra` marker variable).

use crate::marker::{Expr, Op, Value};
use crate::package_name::PackageName;
use crate::specifier::{CompareOp, Specifier, Specifiers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequirement {
    pub name: PackageName,
    pub extras: Vec<String>,
    pub specifiers: Specifiers,
    pub marker: Option<Expr>,
}

peg::parser! {
    grammar parser() for str {
        rule wsp() = quiet!{[' ' | '\t']}

        rule letter_or_digit() = quiet!{['A'..='Z' | 'a'..='z' | '0'..='9']} / expected!("letter or digit")

        rule _() = quiet!{wsp()*}

        rule version_cmp() -> &'input str
            = $("<=" / "<" / "!=" / "==" / ">=" / ">" / "~=" / "===")

        rule version() = (letter_or_digit() / "-" / "_" / "." / "*" / "+" / "!")+

        rule version_one() -> Specifier
            = _ op:version_cmp() _ v:$(version())
            {?
                if op == "===" {
                    Err("'===' is not implemented")
                } else {
                    Ok(Specifier { op: op.parse().unwrap(), value: v.into() })
                }
            }

        rule version_many() -> Specifiers
            = specs:(version_one() ++ (_ ",")) { Specifiers(specs) }

        pub rule versionspec() -> Specifiers
            = ("(" vm:version_many() ")" { vm }) / version_many()

        rule not_in() -> &'static str
            = "not" wsp()+ "in" { "not in" }

        rule marker_op() -> &'input str
            = _ op:(version_cmp() / $("in") / not_in()) { op }

        rule python_str_c() -> &'input str
            = $(quiet! { [' ' | '\t' | 'A'..='Z' | 'a'..='z' | '0'..='9' | '(' | ')'
                 | '.' | '{' | '}' | '-' | '_' | '*' | '#' | ':' | ';' | ','
                 | '/' | '?' | '[' | ']' | '!' | '~' | '`' | '@' | '$' | '%'
                 | '^' | '&' | '=' | '+' | '|' | '<' | '>'] })
              / expected!("printable character")

        rule python_squote_str() -> &'input str
            = "'" s:$((python_str_c() / "\"")*) "'" { s }

        rule python_dquote_str() -> &'input str
            = "\"" s:$((python_str_c() / "'")*) "\"" { s }

        rule python_str() -> Value
            = s:(python_squote_str() / python_dquote_str()) { Value::Literal(s.into()) }

        rule env_var() -> Value
            = var:$(
                "python_version" / "python_full_version" / "os_name"
                / "sys_platform" / "platform_release" / "platform_system"
                / "platform_version" / "platform_machine"
                / "platform_python_implementation" / "implementation_name"
                / "implementation_version" / "extra"
              )
              { Value::Variable(var.to_owned()) }

        // https://peps.python.org/pep-0345/#environment-markers
        rule pep345_env_var() -> Value
           = var:$(
               "os.name" / "sys.platform" / "platform.version" / "platform.machine"
               / "platform.python_implementation"
             )
             { Value::Variable(var.replace('.', "_")) }

        rule setuptools_env_var() -> Value
           = "python_implementation"
             { Value::Variable("platform_python_implementation".into()) }

        rule marker_value() -> Value
            = _ v:(env_var() / pep345_env_var() / setuptools_env_var() / python_str()) { v }

        rule marker_expr() -> Expr
            = _ "(" m:marker() _ ")" { m }
              / lhs:marker_value() op:marker_op() rhs:marker_value()
              {
                  use CompareOp::*;
                  let op = match op {
                      "<=" => Op::Compare(LessThanEqual),
                      "<" => Op::Compare(StrictlyLessThan),
                      "!=" => Op::Compare(NotEqual),
                      "==" => Op::Compare(Equal),
                      ">=" => Op::Compare(GreaterThanEqual),
                      ">" => Op::Compare(StrictlyGreaterThan),
                      "~=" => Op::Compare(Compatible),
                      "in" => Op::In,
                      "not in" => Op::NotIn,
                      _ => unreachable!(),
                  };
                  Expr::Operator { op, lhs, rhs }
              }

        rule marker_and() -> Expr
            = lhs:marker_expr() _ "and" _ rhs:marker_and() { Expr::And(Box::new(lhs), Box::new(rhs)) }
              / marker_expr()

        rule marker_or() -> Expr
            = lhs:marker_and() _ "or" _ rhs:marker_or() { Expr::Or(Box::new(lhs), Box::new(rhs)) }
              / marker_and()

        pub rule marker() -> Expr = marker_or()

        rule quoted_marker() -> Expr
            = ";" _ m:marker() { m }

        rule identifier() -> &'input str
            = $(letter_or_digit() (letter_or_digit() / "-" / "_" / ".")*)

        rule name() -> PackageName
            = n:identifier() { PackageName::from(n) }

        rule extra() -> String
            = e:identifier() { e.to_owned() }

        rule extras() -> Vec<String>
            = "[" _ es:(extra() ** (_ "," _)) _ "]" { es }

        pub rule requirement() -> ParsedRequirement
            = _ name:name()
              _ extras:(extras() / "" { Vec::new() })
              _ specifiers:(versionspec() / "" { Specifiers(Vec::new()) })
              _ marker:(quoted_marker()?)
              _
              { ParsedRequirement { name, extras, specifiers, marker } }
    }
}

pub fn versionspec(input: &str) -> Result<Specifiers, peg::error::ParseError<peg::str::LineCol>> {
    parser::versionspec(input)
}

pub fn marker(input: &str) -> Result<Expr, peg::error::ParseError<peg::str::LineCol>> {
    parser::marker(input)
}

pub fn requirement(
    input: &str,
) -> Result<ParsedRequirement, peg::error::ParseError<peg::str::LineCol>> {
    parser::requirement(input)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_plain_requirement() {
        let r = requirement("requests >=2,<3").unwrap();
        assert_eq!(r.name.as_str(), "requests");
        assert!(r.marker.is_none());
    }

    #[test]
    fn parses_requirement_with_extras_and_marker() {
        let r = requirement("twisted[tls] >= 20, != 20.1.*; python_version >= '3' and extra == 'hi'").unwrap();
        assert_eq!(r.name.as_str(), "twisted");
        assert_eq!(r.extras, vec!["tls".to_owned()]);
        assert!(r.marker.is_some());
    }

    #[test]
    fn parses_legacy_env_marker_vars() {
        let r = requirement("foo; os.name == 'nt' and python_implementation == 'pypy'").unwrap();
        let text = r.marker.unwrap().to_string();
        assert!(text.contains("os_name"));
        assert!(text.contains("platform_python_implementation"));
    }

    #[test]
    fn requirement_without_constraints() {
        let r = requirement("foo").unwrap();
        assert!(r.specifiers.0.is_empty());
    }
}
