// Implementation comes from https://github.com/njsmith/posy/blob/main/src/vocab/rfc822ish.rs
// Licensed under MIT or Apache-2.0

use std::collections::HashMap;

pub type Fields = HashMap<String, Vec<String>>;

#[derive(Debug, PartialEq, Eq)]
pub struct RFC822ish {
    pub fields: Fields,
    pub body: Option<String>,
}

// Allegedly, a METADATA/PKG-INFO file is formatted as an RFC822 email
// message. This is absolutely not true. The actual format is "whatever the
// Python stdlib module email.parser does". We try to be a bit more strict
// than that module -- lenient of mangled utf-8 (someone surely messed that up
// somewhere in PyPI's history) but not of oddities like an empty field name
// or a continuation line at the very start of input.
peg::parser! {
    grammar rfc822ish_parser() for str {
        rule line_ending()
            = quiet!{"\r\n" / "\r" / "\n"}
              / expected!("end of line")

        rule field_name() -> &'input str
            = quiet!{$(['\x21'..='\x39' | '\x3b'..='\x7e']+)}
              / expected!("field name")

        rule field_separator()
            = ":" [' ' | '\t']*

        rule field_value_piece()
            = [^ '\r' | '\n']*

        rule continuation_line_ending()
            = quiet!{line_ending() [' ' | '\t']} / expected!("continuation line")

        rule field_value() -> &'input str
            = $(field_value_piece() ** continuation_line_ending())

        rule field() -> (String, String)
            = n:field_name() field_separator() v:field_value()
                { (n.to_ascii_lowercase(), v.to_owned()) }

        rule fields() -> Vec<(String, String)>
            = field() ** line_ending()

        rule trailing_body() -> String
            = line_ending() line_ending() b:$([_]*) { b.to_owned() }

        pub rule rfc822ish() -> RFC822ish
            = f:fields() body:(trailing_body()?) line_ending()?
            {
                let mut fields: Fields = HashMap::new();
                for (name, value) in f {
                    fields.entry(name).or_default().push(value);
                }
                RFC822ish { fields, body }
            }
    }
}

impl RFC822ish {
    pub fn parse(input: &str) -> Result<RFC822ish, peg::error::ParseError<peg::str::LineCol>> {
        rfc822ish_parser::rfc822ish(input)
    }

    /// All values for `name`, in file order; empty if the field never
    /// appeared.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.fields
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_requires_dist_lines() {
        let text = "Metadata-Version: 2.1\nName: foo\nRequires-Dist: bar (>=1.0)\nRequires-Dist: baz; extra == \"x\"\n\nSome description.\n";
        let parsed = RFC822ish::parse(text).unwrap();
        assert_eq!(
            parsed.get_all("requires-dist"),
            &["bar (>=1.0)".to_owned(), "baz; extra == \"x\"".to_owned()]
        );
        assert_eq!(parsed.body.as_deref(), Some("Some description.\n"));
    }

    #[test]
    fn tolerates_no_body() {
        let text = "Name: foo\n";
        let parsed = RFC822ish::parse(text).unwrap();
        assert_eq!(parsed.get_all("name"), &["foo".to_owned()]);
    }
}
