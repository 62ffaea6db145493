use crate::{Error, Result};

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Date,
    ByteNumber,
    TimeString,
    Number,
    Comparison,
    Paren,
    Bracket,
    ListDelim,
    Boolean,
    ListComparison,
    Negate,
    Command,
    String,
    Unquoted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,

    /// Source text of the token, quotes and backticks included.
    pub(crate) text: String,
}

const HMS: &str = r"(?:\d\d|\d):\d\d(?::\d\d)?(?:am|pm)?|(?:\d\d|\d)(?:am|pm)";

pub(crate) const MONTH: &str = r"jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sept?(?:ember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";

const NUMBER: &str = r"-?(?:\d+\.\d*|\.\d+|\d+)(?:[eE][-+]?\d+)?";

struct Patterns {
    classes: Vec<(TokenKind, Regex)>,

    /// Fallback for command output: any run of non-blank characters.
    word: Regex,
}

fn patterns() -> Result<&'static Patterns> {
    static PATTERNS: OnceLock<std::result::Result<Patterns, regex::Error>> = OnceLock::new();

    PATTERNS
        .get_or_init(|| {
            let date = format!(
                r"(?i)^(?:(?:{MONTH}|\d\d|\d)[-/](?:\d\d|\d)(?:[-/](?:\d\d\d\d|\d\d))?(?:[|.](?:{HMS}))?|(?:{HMS}))"
            );

            let classes = [
                (TokenKind::Date, date),
                (
                    TokenKind::ByteNumber,
                    format!(r"^{NUMBER}(?:[kKmMgGtTpP][bB]|[bBKMGTP])"),
                ),
                (TokenKind::TimeString, r"^-?(?:\d+\.\d*|\.\d+|\d+)[smhdw]".to_string()),
                (
                    TokenKind::Number,
                    r"^-?(?:\d+\.\d*(?:[eE][-+]?\d+)?|\.\d+(?:[eE][-+]?\d+)?|\d+[eE][-+]?\d+|\d+L?)"
                        .to_string(),
                ),
                (TokenKind::Comparison, r"^(?:==|!=|>=|<=|=|<|>|is|IS)".to_string()),
                (TokenKind::Paren, r"^[()]".to_string()),
                (TokenKind::Bracket, r"^[\[\]]".to_string()),
                (TokenKind::ListDelim, r"^,".to_string()),
                (TokenKind::Boolean, r"^(?:and|or|AND|OR)".to_string()),
                (TokenKind::ListComparison, r"^(?:in|like|has|IN|LIKE|HAS)".to_string()),
                (TokenKind::Negate, r"^(?:not|NOT)".to_string()),
                (TokenKind::Command, r"^`[^`]*`".to_string()),
                (
                    TokenKind::String,
                    r#"^(?s:"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*')"#.to_string(),
                ),
                (TokenKind::Unquoted, r#"^[^!()\[\],<>='"\s]+"#.to_string()),
            ];

            let classes = classes
                .into_iter()
                .map(|(kind, pattern)| Ok((kind, Regex::new(&pattern)?)))
                .collect::<std::result::Result<Vec<_>, regex::Error>>()?;

            Ok(Patterns {
                classes,
                word: Regex::new(r"^\S+")?,
            })
        })
        .as_ref()
        .map_err(|err| Error::from(err.clone()))
}

impl TokenKind {
    /// Words and numbers must end where a new token can start, so that
    /// `android` is not read as `and` followed by `roid`.
    fn needs_boundary(self, text: &str) -> bool {
        match self {
            TokenKind::Date
            | TokenKind::ByteNumber
            | TokenKind::TimeString
            | TokenKind::Number
            | TokenKind::Boolean
            | TokenKind::ListComparison
            | TokenKind::Negate => true,
            TokenKind::Comparison => text.chars().all(|c| c.is_ascii_alphabetic()),
            _ => false,
        }
    }

    /// Kinds command output is split into.
    fn is_data(self) -> bool {
        matches!(
            self,
            TokenKind::Date
                | TokenKind::ByteNumber
                | TokenKind::TimeString
                | TokenKind::Number
                | TokenKind::Command
                | TokenKind::String
        )
    }
}

fn at_boundary(rest: &str) -> bool {
    match rest.chars().next() {
        None => true,
        Some(c) => c.is_whitespace() || "()[],=<>!'\"`".contains(c),
    }
}

/// Splits a WHERE string into tokens.
pub(crate) fn tokenize(text: &str) -> Result<Vec<Token>> {
    let patterns = patterns()?;
    let mut tokens = vec![];
    let mut rest = text.trim_start();

    while !rest.is_empty() {
        let token = patterns.classes.iter().find_map(|(kind, re)| {
            let m = re.find(rest)?;
            if kind.needs_boundary(m.as_str()) && !at_boundary(&rest[m.end()..]) {
                return None;
            }
            Some(Token {
                kind: *kind,
                text: m.as_str().to_string(),
            })
        });

        let Some(token) = token else {
            return Err(Error::tokenize(rest));
        };

        rest = rest[token.text.len()..].trim_start();
        tokens.push(token);
    }

    Ok(tokens)
}

/// Splits command output into data tokens. Anything that is not a date,
/// quantity, number or quoted string becomes an unquoted word.
pub(crate) fn data_tokens(text: &str) -> Result<Vec<Token>> {
    let patterns = patterns()?;
    let mut tokens = vec![];
    let mut rest = text.trim_start();

    while !rest.is_empty() {
        let data = patterns
            .classes
            .iter()
            .filter(|(kind, _)| kind.is_data())
            .find_map(|(kind, re)| {
                let m = re.find(rest)?;
                let end = &rest[m.end()..];
                if !end.is_empty() && !end.starts_with(char::is_whitespace) {
                    return None;
                }
                Some(Token {
                    kind: *kind,
                    text: m.as_str().to_string(),
                })
            });

        let token = match data {
            Some(token) => token,
            None => match patterns.word.find(rest) {
                Some(m) => Token {
                    kind: TokenKind::Unquoted,
                    text: m.as_str().to_string(),
                },
                None => break,
            },
        };

        rest = rest[token.text.len()..].trim_start();
        tokens.push(token);
    }

    Ok(tokens)
}

impl Token {
    pub(crate) fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub(crate) fn is_text(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text.eq_ignore_ascii_case(text)
    }

    /// Contents of a quoted string with backslash escapes resolved.
    pub(crate) fn unquote(&self) -> String {
        let inner = self
            .text
            .get(1..self.text.len().saturating_sub(1))
            .unwrap_or_default();

        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => out.push('\\'),
                },
                c => out.push(c),
            }
        }
        out
    }

    /// The command between backticks.
    pub(crate) fn command(&self) -> &str {
        self.text.trim_matches('`')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::*;

    fn kinds(text: &str) -> Vec<(TokenKind, std::string::String)> {
        tokenize(text)
            .unwrap()
            .into_iter()
            .map(|token| (token.kind, token.text))
            .collect()
    }

    fn kind_of(text: &str) -> TokenKind {
        let tokens = tokenize(text).unwrap();
        assert_eq!(tokens.len(), 1, "{text} → {tokens:?}");
        tokens[0].kind
    }

    #[test]
    fn comparison_phrase() {
        assert_eq!(
            kinds("priority > 300 and user=thing"),
            [
                (Unquoted, "priority".to_string()),
                (Comparison, ">".to_string()),
                (Number, "300".to_string()),
                (Boolean, "and".to_string()),
                (Unquoted, "user".to_string()),
                (Comparison, "=".to_string()),
                (Unquoted, "thing".to_string()),
            ]
        );
    }

    #[test]
    fn literal_classes() {
        assert_eq!(kind_of("3/15"), Date);
        assert_eq!(kind_of("3/15|4pm"), Date);
        assert_eq!(kind_of("mar-15-2005.10:30"), Date);
        assert_eq!(kind_of("10am"), Date);
        assert_eq!(kind_of("3G"), ByteNumber);
        assert_eq!(kind_of("1.5MB"), ByteNumber);
        assert_eq!(kind_of("-1m"), TimeString);
        assert_eq!(kind_of("2.5h"), TimeString);
        assert_eq!(kind_of("300"), Number);
        assert_eq!(kind_of("-4.5e3"), Number);
        assert_eq!(kind_of("10L"), Number);
        assert_eq!(kind_of("'it\\'s'"), String);
        assert_eq!(kind_of("`echo hi`"), Command);
        assert_eq!(kind_of("foo"), Unquoted);
    }

    #[test]
    fn keywords_need_a_boundary() {
        assert_eq!(kind_of("android"), Unquoted);
        assert_eq!(kind_of("island"), Unquoted);
        assert_eq!(kind_of("notes"), Unquoted);
        assert_eq!(kind_of("3abc"), Unquoted);
        assert_eq!(
            kinds("not(a)"),
            [
                (Negate, "not".to_string()),
                (Paren, "(".to_string()),
                (Unquoted, "a".to_string()),
                (Paren, ")".to_string()),
            ]
        );
    }

    #[test]
    fn lists_and_negated_list_operators() {
        let tokens: Vec<_> = kinds("owner not in [tom, dick]")
            .into_iter()
            .map(|(kind, _)| kind)
            .collect();
        assert_eq!(
            tokens,
            [Unquoted, Negate, ListComparison, Bracket, Unquoted, ListDelim, Unquoted, Bracket]
        );
    }

    #[test]
    fn unmatched_text_is_a_tokenize_error() {
        let err = tokenize("user=joe and !!user").unwrap_err();
        assert!(err.is_tokenize());
        assert_eq!(err.to_string(), "syntax error in where string near: '!!user'");
    }

    #[test]
    fn string_escapes() {
        let token = &tokenize(r#""say \"hi\"""#).unwrap()[0];
        assert_eq!(token.unquote(), r#"say "hi""#);
    }

    #[test]
    fn command_output_is_split_into_data() {
        let tokens = data_tokens("12 'a b' 3G host-01").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|token| token.kind).collect();
        assert_eq!(kinds, [Number, String, ByteNumber, Unquoted]);
        assert_eq!(tokens[3].text, "host-01");
    }
}
