//! Element selectors.
//!
//! Supports comma-separated lists of compound selectors built from a type
//! selector (`iframe`, `*`), an id (`#banner`) and classes (`.frame`), e.g.
//! `"iframe.goog-te-banner-frame, #goog-gt-tt"`. Combinators and
//! pseudo-classes are rejected.

use std::fmt;
use std::str::FromStr;

use cssparser::{Parser, ParserInput, Token};

use crate::error::{Error, Result};

/// A single compound selector such as `iframe#banner.frame`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CompoundSelector {
    /// Lower-cased tag name; `None` matches any tag.
    pub tag: Option<String>,
    /// Required id.
    pub id: Option<String>,
    /// Required classes.
    pub classes: Vec<String>,
    universal: bool,
}

impl CompoundSelector {
    fn is_empty(&self) -> bool {
        !self.universal && self.tag.is_none() && self.id.is_none() && self.classes.is_empty()
    }

    /// Whether an element with this tag, id and classes matches.
    pub fn matches(
        &self,
        tag: &str,
        id: Option<&str>,
        mut has_class: impl FnMut(&str) -> bool,
    ) -> bool {
        if let Some(expected) = &self.tag {
            if !expected.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(expected) = &self.id {
            if id != Some(expected.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|class| has_class(class.as_str()))
    }
}

impl fmt::Display for CompoundSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{tag}")?,
            None if self.universal => write!(f, "*")?,
            None => {}
        }
        if let Some(id) = &self.id {
            write!(f, "#{id}")?;
        }
        for class in &self.classes {
            write!(f, ".{class}")?;
        }
        Ok(())
    }
}

/// A comma-separated list of compound selectors. Matches when any entry does.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectorList {
    selectors: Vec<CompoundSelector>,
}

impl SelectorList {
    /// Parse a selector list.
    pub fn parse(source: &str) -> Result<Self> {
        let mut input = ParserInput::new(source);
        let mut parser = Parser::new(&mut input);

        let mut selectors = Vec::new();
        let mut current = CompoundSelector::default();
        let mut after_whitespace = false;

        loop {
            let token = match parser.next_including_whitespace() {
                Ok(t) => t.clone(),
                Err(_) => break,
            };

            match token {
                Token::WhiteSpace(_) => {
                    after_whitespace = !current.is_empty();
                }
                Token::Comma => {
                    finish_compound(source, &mut selectors, current)?;
                    current = CompoundSelector::default();
                    after_whitespace = false;
                }
                _ if after_whitespace => {
                    return Err(Error::invalid_selector(
                        source,
                        "combinators are not supported",
                    ));
                }
                Token::Ident(name) => {
                    if !current.is_empty() {
                        return Err(Error::invalid_selector(
                            source,
                            "type selector must come first",
                        ));
                    }
                    current.tag = Some(name.to_ascii_lowercase());
                }
                Token::Delim('*') => {
                    if !current.is_empty() {
                        return Err(Error::invalid_selector(
                            source,
                            "universal selector must come first",
                        ));
                    }
                    current.universal = true;
                }
                Token::Delim('.') => {
                    let class = match parser.next_including_whitespace() {
                        Ok(Token::Ident(name)) => name.to_string(),
                        _ => {
                            return Err(Error::invalid_selector(
                                source,
                                "expected class name after '.'",
                            ));
                        }
                    };
                    current.classes.push(class);
                }
                Token::IDHash(id) => {
                    if current.id.is_some() {
                        return Err(Error::invalid_selector(source, "more than one id"));
                    }
                    current.id = Some(id.to_string());
                }
                Token::Delim('>' | '+' | '~') => {
                    return Err(Error::invalid_selector(
                        source,
                        "combinators are not supported",
                    ));
                }
                Token::Colon => {
                    return Err(Error::invalid_selector(
                        source,
                        "pseudo-classes are not supported",
                    ));
                }
                other => {
                    return Err(Error::invalid_selector(
                        source,
                        format!("unexpected token {other:?}"),
                    ));
                }
            }
        }

        finish_compound(source, &mut selectors, current)?;
        Ok(Self { selectors })
    }

    /// The compound selectors in this list.
    pub fn selectors(&self) -> &[CompoundSelector] {
        &self.selectors
    }

    /// Whether any compound selector in the list matches.
    pub fn matches(&self, tag: &str, id: Option<&str>, has_class: impl Fn(&str) -> bool) -> bool {
        self.selectors
            .iter()
            .any(|selector| selector.matches(tag, id, &has_class))
    }
}

fn finish_compound(
    source: &str,
    selectors: &mut Vec<CompoundSelector>,
    compound: CompoundSelector,
) -> Result<()> {
    if compound.is_empty() {
        return Err(Error::invalid_selector(source, "empty selector"));
    }
    selectors.push(compound);
    Ok(())
}

impl FromStr for SelectorList {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, selector) in self.selectors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{selector}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes<'a>(list: &'a [&'a str]) -> impl Fn(&str) -> bool + 'a {
        move |class| list.iter().any(|c| *c == class)
    }

    #[test]
    fn test_parse_class_selector() {
        let list = SelectorList::parse(".goog-te-banner-frame").unwrap();
        assert_eq!(list.selectors().len(), 1);
        assert_eq!(list.selectors()[0].classes, vec!["goog-te-banner-frame"]);
        assert!(list.matches("iframe", None, classes(&["goog-te-banner-frame"])));
        assert!(!list.matches("iframe", None, classes(&["other"])));
    }

    #[test]
    fn test_parse_compound_selector() {
        let list = SelectorList::parse("IFRAME#banner.a.b").unwrap();
        let compound = &list.selectors()[0];
        assert_eq!(compound.tag.as_deref(), Some("iframe"));
        assert_eq!(compound.id.as_deref(), Some("banner"));
        assert_eq!(compound.classes, vec!["a", "b"]);

        assert!(list.matches("iframe", Some("banner"), classes(&["b", "a", "c"])));
        assert!(!list.matches("div", Some("banner"), classes(&["a", "b"])));
        assert!(!list.matches("iframe", Some("other"), classes(&["a", "b"])));
        assert!(!list.matches("iframe", Some("banner"), classes(&["a"])));
    }

    #[test]
    fn test_parse_selector_list() {
        let list = SelectorList::parse(" .frame , #tooltip ").unwrap();
        assert_eq!(list.selectors().len(), 2);
        assert!(list.matches("div", Some("tooltip"), classes(&[])));
        assert!(list.matches("iframe", None, classes(&["frame"])));
        assert_eq!(list.to_string(), ".frame, #tooltip");
    }

    #[test]
    fn test_universal_selector() {
        let list: SelectorList = "*".parse().unwrap();
        assert!(list.matches("anything", None, classes(&[])));
        assert_eq!(list.to_string(), "*");
    }

    #[test]
    fn test_rejects_unsupported_syntax() {
        for source in ["", "div span", "div > span", "a:hover", ".frame,", ".", "#a#b", "div."] {
            let err = SelectorList::parse(source).unwrap_err();
            assert!(
                matches!(err, Error::InvalidSelector { .. }),
                "{source:?} gave {err}"
            );
        }
    }
}
