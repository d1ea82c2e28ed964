//! Tokenizer for the supported SQL subset.
//!
//! Recognizes identifiers/keywords, positional parameters (`$N`), unsigned
//! integers (LIMIT), and the handful of punctuation the grammar needs. Any
//! other character is a tokenization error, which the shim reports as an
//! unparseable statement.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Identifier or keyword; keyword matching is case-insensitive.
    Ident(String),
    /// `$N`, kept 1-based as written.
    Param(usize),
    Number(u64),
    Equals,
    Comma,
    Star,
    LParen,
    RParen,
    Semicolon,
}

impl Token {
    /// True when the token is this keyword (case-insensitive).
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Ident(s) if s.eq_ignore_ascii_case(keyword))
    }

    pub fn describe(&self) -> String {
        match self {
            Token::Ident(s) => format!("'{}'", s),
            Token::Param(n) => format!("${}", n),
            Token::Number(n) => n.to_string(),
            Token::Equals => "'='".to_string(),
            Token::Comma => "','".to_string(),
            Token::Star => "'*'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Semicolon => "';'".to_string(),
        }
    }
}

pub fn tokenize(sql: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = sql.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '=' => {
                chars.next();
                tokens.push(Token::Equals);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ';' => {
                chars.next();
                tokens.push(Token::Semicolon);
            }
            '$' => {
                chars.next();
                let mut digits = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        digits.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if digits.is_empty() {
                    return Err("'$' must be followed by a parameter index".to_string());
                }
                let index: usize = digits
                    .parse()
                    .map_err(|_| format!("parameter index '${}' is out of range", digits))?;
                if index == 0 {
                    return Err("parameter indices are 1-based; $0 is not valid".to_string());
                }
                tokens.push(Token::Param(index));
            }
            c if c.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        digits.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let n: u64 = digits
                    .parse()
                    .map_err(|_| format!("number '{}' is out of range", digits))?;
                tokens.push(Token::Number(n));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => {
                return Err(format!("unexpected character '{}'", other));
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_select() {
        let tokens = tokenize("SELECT * FROM users WHERE id = $1").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("SELECT".into()),
                Token::Star,
                Token::Ident("FROM".into()),
                Token::Ident("users".into()),
                Token::Ident("WHERE".into()),
                Token::Ident("id".into()),
                Token::Equals,
                Token::Param(1),
            ]
        );
    }

    #[test]
    fn test_param_must_have_index() {
        assert!(tokenize("WHERE id = $").is_err());
        assert!(tokenize("WHERE id = $0").is_err());
    }

    #[test]
    fn test_literals_are_rejected() {
        // string literals are not part of the subset
        assert!(tokenize("WHERE name = 'ada'").is_err());
        assert!(tokenize("WHERE a > $1").is_err());
    }
}
