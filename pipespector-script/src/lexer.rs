use crate::error::ScriptError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Ident(String),
    Str(Vec<u8>),
    Assign,
    Plus,
    Comma,
    Semi,
    LParen,
    RParen,
}

/// A token plus the 1-based column it started at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub column: usize,
}

pub fn tokenize(src: &str) -> Result<Vec<Spanned>, ScriptError> {
    let chars: Vec<char> = src.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let column = i + 1;

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let simple = match c {
            '=' => Some(Token::Assign),
            '+' => Some(Token::Plus),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semi),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            _ => None,
        };
        if let Some(token) = simple {
            out.push(Spanned { token, column });
            i += 1;
            continue;
        }

        // b"..." / b'...' byte literals read the same as plain literals.
        if c == 'b' && matches!(chars.get(i + 1), Some('"') | Some('\'')) {
            i += 1;
            continue;
        }

        if c == '"' || c == '\'' {
            let (bytes, next) = read_string(&chars, i)?;
            out.push(Spanned {
                token: Token::Str(bytes),
                column,
            });
            i = next;
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            out.push(Spanned {
                token: Token::Ident(chars[start..i].iter().collect()),
                column,
            });
            continue;
        }

        return Err(ScriptError::syntax(column, format!("unexpected character '{}'", c)));
    }

    Ok(out)
}

/// Reads a quoted literal starting at `start` (the quote). Returns the bytes
/// and the index just past the closing quote.
fn read_string(chars: &[char], start: usize) -> Result<(Vec<u8>, usize), ScriptError> {
    let quote = chars[start];
    let mut bytes = Vec::new();
    let mut i = start + 1;

    while i < chars.len() {
        let c = chars[i];
        if c == quote {
            return Ok((bytes, i + 1));
        }

        if c != '\\' {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            i += 1;
            continue;
        }

        let Some(&esc) = chars.get(i + 1) else {
            break;
        };
        match esc {
            'n' => bytes.push(b'\n'),
            'r' => bytes.push(b'\r'),
            't' => bytes.push(b'\t'),
            '0' => bytes.push(0),
            '\\' => bytes.push(b'\\'),
            '"' => bytes.push(b'"'),
            '\'' => bytes.push(b'\''),
            'x' => {
                let digits = match (chars.get(i + 2), chars.get(i + 3)) {
                    (Some(&hi), Some(&lo)) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                        [hi, lo]
                    }
                    _ => return Err(ScriptError::syntax(i + 1, "\\x needs two hex digits")),
                };
                let value = digits
                    .iter()
                    .filter_map(|d| d.to_digit(16))
                    .fold(0u8, |acc, d| (acc << 4) | d as u8);
                bytes.push(value);
                i += 2;
            }
            other => {
                return Err(ScriptError::syntax(
                    i + 1,
                    format!("unknown escape '\\{}'", other),
                ));
            }
        }
        i += 2;
    }

    Err(ScriptError::syntax(start + 1, "unterminated string"))
}
