//! JSON tokenizer.
//!
//! The [`Lexer`] walks a mutable byte buffer and returns one [`Token`] at a
//! time. String tokens are unescaped in place: the decoded bytes are written
//! back over the escaped source, which is always at least as long, so no
//! second buffer is needed.
//!
//! Running out of bytes inside a token yields [`Token::Incomplete`] rather
//! than [`Token::Error`]. That distinction is what lets the parser tell a
//! truncated message apart from a malformed one.

// ============================================================================
// Constants
// ============================================================================

/// Hex digit values, `-1` for bytes that are not hex digits.
const HEX: [i8; 256] = build_hex_table();

const fn build_hex_table() -> [i8; 256] {
    let mut table = [-1i8; 256];
    let mut i = 0;
    while i < 10 {
        table[b'0' as usize + i] = i as i8;
        i += 1;
    }
    let mut i = 0;
    while i < 6 {
        table[b'a' as usize + i] = 10 + i as i8;
        table[b'A' as usize + i] = 10 + i as i8;
        i += 1;
    }
    table
}

// ============================================================================
// Token
// ============================================================================

/// Lexical tokens returned by the [`Lexer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// `{`
    StartObject,
    /// `}`
    EndObject,
    /// `[`
    StartArray,
    /// `]`
    EndArray,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// Quoted string. The unescaped text is at [`Lexer::span`].
    String,
    /// Digits with no fraction or exponent. The text is at [`Lexer::span`].
    Integer,
    /// Any other valid number. The text is at [`Lexer::span`].
    Number,
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,
    /// No more input.
    End,
    /// Input ended inside a token.
    Incomplete,
    /// Malformed input.
    Error,
}

// ============================================================================
// Span
// ============================================================================

/// Byte range inside the scan buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    /// First byte.
    pub start: usize,
    /// One past the last byte.
    pub end: usize,
}

impl Span {
    #[inline]
    pub(crate) const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

// ============================================================================
// NumberState
// ============================================================================

/// States of the JSON number production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumberState {
    /// After a leading `-`.
    Sign,
    /// Integer part is a single `0`.
    Zero,
    /// Integer part started with `1`-`9`.
    Int,
    /// After `.`, no digit yet.
    FracStart,
    /// In fraction digits.
    Frac,
    /// After `e` or `E`.
    ExpStart,
    /// After the exponent sign.
    ExpSign,
    /// In exponent digits.
    Exp,
}

// ============================================================================
// Lexer
// ============================================================================

/// Tokenizer over a mutable scan buffer.
#[derive(Debug)]
pub struct Lexer<'a> {
    buf: &'a mut [u8],
    pos: usize,
    line: u32,
    comments: bool,
    span: Span,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer positioned at the start of `buf`.
    ///
    /// When `comments` is set, `/* */` and `//` comments are accepted
    /// wherever whitespace is.
    #[must_use]
    pub fn new(buf: &'a mut [u8], comments: bool) -> Self {
        Self {
            buf,
            pos: 0,
            line: 1,
            comments,
            span: Span::default(),
        }
    }

    /// Current byte position.
    #[inline]
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Current 1-based line.
    #[inline]
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Span of the last `String`, `Integer` or `Number` token.
    #[inline]
    #[must_use]
    pub fn span(&self) -> Span {
        self.span
    }

    /// Bytes of the last `String`, `Integer` or `Number` token.
    #[inline]
    #[must_use]
    pub fn text(&self) -> &[u8] {
        &self.buf[self.span.start..self.span.end]
    }

    /// Skips whitespace (but not comments).
    pub fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.buf.get(self.pos) {
            match ch {
                b' ' | b'\t' | b'\r' | 0x0b | 0x0c => {}
                b'\n' => self.line += 1,
                _ => return,
            }
            self.pos += 1;
        }
    }

    /// Returns the next token and advances past it.
    pub fn next_token(&mut self) -> Token {
        while let Some(&ch) = self.buf.get(self.pos) {
            self.pos += 1;
            match ch {
                b' ' | b'\t' | b'\r' | 0x0b | 0x0c => {}
                b'\n' => self.line += 1,
                b'{' => return Token::StartObject,
                b'}' => return Token::EndObject,
                b'[' => return Token::StartArray,
                b']' => return Token::EndArray,
                b':' => return Token::Colon,
                b',' => return Token::Comma,
                b'"' => return self.string(),
                b'-' | b'0'..=b'9' => return self.number(),
                b't' => return self.keyword(b"true", Token::True),
                b'f' => return self.keyword(b"false", Token::False),
                b'n' => return self.keyword(b"null", Token::Null),
                b'/' if self.comments => {
                    if let Some(token) = self.comment() {
                        return token;
                    }
                }
                _ => return Token::Error,
            }
        }
        Token::End
    }

    /// Skips a comment. Returns a token only if the comment is unterminated
    /// or malformed.
    fn comment(&mut self) -> Option<Token> {
        let Some(&kind) = self.buf.get(self.pos) else {
            return Some(Token::Incomplete);
        };
        self.pos += 1;

        match kind {
            b'*' => loop {
                let Some(&ch) = self.buf.get(self.pos) else {
                    return Some(Token::Incomplete);
                };
                self.pos += 1;
                match ch {
                    b'\n' => self.line += 1,
                    b'*' if self.buf.get(self.pos) == Some(&b'/') => {
                        self.pos += 1;
                        return None;
                    }
                    _ => {}
                }
            },
            b'/' => {
                while let Some(&ch) = self.buf.get(self.pos) {
                    self.pos += 1;
                    if ch == b'\n' {
                        self.line += 1;
                        break;
                    }
                    if ch == b'\r' {
                        break;
                    }
                }
                None
            }
            _ => Some(Token::Error),
        }
    }

    /// Matches the rest of a keyword whose first byte was consumed.
    fn keyword(&mut self, word: &[u8], token: Token) -> Token {
        let rest = &word[1..];
        let available = &self.buf[self.pos..];
        let n = rest.len().min(available.len());

        if available[..n] != rest[..n] {
            return Token::Error;
        }
        if n < rest.len() {
            return Token::Incomplete;
        }
        self.pos += rest.len();
        token
    }

    /// Scans a string whose opening quote was consumed, unescaping in place.
    fn string(&mut self) -> Token {
        let start = self.pos;
        let mut ip = start;
        let mut op = start;

        loop {
            let Some(&ch) = self.buf.get(ip) else {
                return Token::Incomplete;
            };
            ip += 1;

            match ch {
                b'"' => {
                    if std::str::from_utf8(&self.buf[start..op]).is_err() {
                        return Token::Error;
                    }
                    self.span = Span::new(start, op);
                    self.pos = ip;
                    return Token::String;
                }
                b'\\' => {
                    let Some(&escape) = self.buf.get(ip) else {
                        return Token::Incomplete;
                    };
                    ip += 1;

                    let byte = match escape {
                        b'b' => 0x08,
                        b'f' => 0x0c,
                        b'n' => b'\n',
                        b'r' => b'\r',
                        b't' => b'\t',
                        b'"' | b'\\' | b'/' => escape,
                        b'u' => {
                            let decoded = match self.unicode_escape(&mut ip) {
                                Ok(decoded) => decoded,
                                Err(token) => return token,
                            };
                            let mut utf8 = [0u8; 4];
                            let encoded = decoded.encode_utf8(&mut utf8).as_bytes();
                            self.buf[op..op + encoded.len()].copy_from_slice(encoded);
                            op += encoded.len();
                            continue;
                        }
                        _ => return Token::Error,
                    };
                    self.buf[op] = byte;
                    op += 1;
                }
                // Control characters must be escaped.
                0x00..=0x1f => return Token::Error,
                _ => {
                    self.buf[op] = ch;
                    op += 1;
                }
            }
        }
    }

    /// Decodes the hex part of a `\u` escape, combining surrogate pairs.
    ///
    /// Unpaired surrogates decode to U+FFFD.
    fn unicode_escape(&self, ip: &mut usize) -> Result<char, Token> {
        let first = self.hex4(ip)?;

        if (0xD800..0xDC00).contains(&first) {
            match (self.buf.get(*ip), self.buf.get(*ip + 1)) {
                (Some(b'\\'), Some(b'u')) => {
                    let mut look = *ip + 2;
                    let second = self.hex4(&mut look)?;
                    if (0xDC00..0xE000).contains(&second) {
                        *ip = look;
                        let code = 0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00);
                        return Ok(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
                    }
                }
                (None, _) | (Some(b'\\'), None) => return Err(Token::Incomplete),
                _ => {}
            }
        }

        Ok(char::from_u32(first).unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    /// Reads four hex digits.
    fn hex4(&self, ip: &mut usize) -> Result<u32, Token> {
        let mut value = 0u32;
        for _ in 0..4 {
            let Some(&ch) = self.buf.get(*ip) else {
                return Err(Token::Incomplete);
            };
            let digit = HEX[ch as usize];
            if digit < 0 {
                return Err(Token::Error);
            }
            value = value << 4 | digit as u32;
            *ip += 1;
        }
        Ok(value)
    }

    /// Scans a number whose first byte was consumed.
    fn number(&mut self) -> Token {
        use NumberState::*;

        let start = self.pos - 1;
        let mut state = match self.buf[start] {
            b'-' => Sign,
            b'0' => Zero,
            _ => Int,
        };
        let mut ip = self.pos;

        let token = loop {
            let Some(&ch) = self.buf.get(ip) else {
                return Token::Incomplete;
            };
            state = match (state, ch) {
                (Sign, b'0') => Zero,
                (Sign | Int, b'1'..=b'9') | (Int, b'0') => Int,
                (Zero, b'0'..=b'9') => return Token::Error,
                (Zero | Int, b'.') => FracStart,
                (Zero | Int | Frac, b'e' | b'E') => ExpStart,
                (FracStart | Frac, b'0'..=b'9') => Frac,
                (ExpStart, b'+' | b'-') => ExpSign,
                (ExpStart | ExpSign | Exp, b'0'..=b'9') => Exp,
                (Zero | Int, _) => break Token::Integer,
                (Frac | Exp, _) => break Token::Number,
                _ => return Token::Error,
            };
            ip += 1;
        };

        self.span = Span::new(start, ip);
        self.pos = ip;
        token
    }
}

// ============================================================================
// Tests
// ============================================================================
