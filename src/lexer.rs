//! Content stream tokenizer.
//!
//! Splits a decoded content stream into operations (operands followed by an
//! operator) and records the byte range each operation occupies, so callers
//! can splice new operators into the original bytes without re-encoding the
//! rest of the stream.
//!
//! Only the operand shapes that matching needs are kept: numbers and names.
//! Strings, arrays, dictionaries and keywords are recognised (so their
//! contents can never be mistaken for operators) and then discarded.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while, take_while1},
    character::complete::char,
    combinator::{map, map_opt, recognize, value},
    multi::many0,
    sequence::{delimited, preceded},
    IResult,
};
use smallvec::SmallVec;
use std::ops::Range;
use tracing::trace;

use crate::error::{Result, TaggingError};
use crate::logging::PDF_OPERATIONS;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(f64),
    Name(Vec<u8>),
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub operator: String,
    pub operands: SmallVec<[Operand; 6]>,
    /// Byte range from the first operand through the end of the operator.
    pub span: Range<usize>,
}

impl Operation {
    /// The first `N` operands as numbers, if there are at least `N` and all
    /// of them are numeric.
    pub fn numbers<const N: usize>(&self) -> Option<[f64; N]> {
        if self.operands.len() < N {
            return None;
        }
        let mut out = [0.0; N];
        for (slot, operand) in out.iter_mut().zip(self.operands.iter()) {
            match operand {
                Operand::Number(n) => *slot = *n,
                _ => return None,
            }
        }
        Some(out)
    }

    pub fn last_name(&self) -> Option<&[u8]> {
        match self.operands.last() {
            Some(Operand::Name(name)) => Some(name.as_slice()),
            _ => None,
        }
    }
}

enum Token<'a> {
    Operand(Operand),
    Operator(&'a [u8]),
}

fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

fn is_delimiter(c: u8) -> bool {
    matches!(
        c,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

pub(crate) fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

fn comment(input: &[u8]) -> IResult<&[u8], &[u8]> {
    recognize(preceded(
        char('%'),
        take_till(|c: u8| c == b'\r' || c == b'\n'),
    ))(input)
}

fn skip_ws(input: &[u8]) -> IResult<&[u8], ()> {
    value((), many0(alt((take_while1(is_whitespace), comment))))(input)
}

fn literal_string(input: &[u8]) -> IResult<&[u8], Operand> {
    if input.first() != Some(&b'(') {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )));
    }
    let mut depth = 0usize;
    let mut i = 0;
    while i < input.len() {
        match input[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&input[i + 1..], Operand::Other));
                }
            }
            _ => {}
        }
        i += 1;
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

fn hex_string(input: &[u8]) -> IResult<&[u8], Operand> {
    value(
        Operand::Other,
        delimited(char('<'), take_till(|c: u8| c == b'>'), char('>')),
    )(input)
}

fn decode_name(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' && i + 2 < raw.len() {
            let hex = std::str::from_utf8(&raw[i + 1..i + 3])
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            if let Some(byte) = hex {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(raw[i]);
        i += 1;
    }
    out
}

fn name(input: &[u8]) -> IResult<&[u8], Operand> {
    map(preceded(char('/'), take_while(is_regular)), |raw: &[u8]| {
        Operand::Name(decode_name(raw))
    })(input)
}

fn array(input: &[u8]) -> IResult<&[u8], Operand> {
    value(
        Operand::Other,
        delimited(
            char('['),
            many0(preceded(skip_ws, object)),
            preceded(skip_ws, char(']')),
        ),
    )(input)
}

fn dictionary(input: &[u8]) -> IResult<&[u8], Operand> {
    value(
        Operand::Other,
        delimited(
            tag("<<"),
            many0(preceded(skip_ws, object)),
            preceded(skip_ws, tag(">>")),
        ),
    )(input)
}

/// Operands that start with a delimiter.
fn compound(input: &[u8]) -> IResult<&[u8], Operand> {
    alt((dictionary, array, hex_string, literal_string, name))(input)
}

fn parse_number(word: &[u8]) -> Option<f64> {
    match word.first() {
        Some(c) if c.is_ascii_digit() || matches!(c, b'+' | b'-' | b'.') => {}
        _ => return None,
    }
    std::str::from_utf8(word).ok()?.parse::<f64>().ok()
}

fn bare_operand(word: &[u8]) -> Option<Operand> {
    match word {
        b"true" | b"false" | b"null" => Some(Operand::Other),
        _ => parse_number(word).map(Operand::Number),
    }
}

fn object(input: &[u8]) -> IResult<&[u8], Operand> {
    alt((compound, map_opt(take_while1(is_regular), bare_operand)))(input)
}

fn classify(word: &[u8]) -> Token<'_> {
    match bare_operand(word) {
        Some(operand) => Token::Operand(operand),
        None => Token::Operator(word),
    }
}

fn token(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    alt((map(compound, Token::Operand), map(take_while1(is_regular), classify)))(input)
}

/// Skip an inline image body: the parameter dictionary up to `ID`, then the
/// raw sample bytes up to an `EI` that stands alone between whitespace.
fn inline_image(input: &[u8]) -> IResult<&[u8], ()> {
    let mut rest = input;
    loop {
        let (r, _) = skip_ws(rest)?;
        rest = r;
        if rest.starts_with(b"ID") && rest.get(2).is_some_and(|c| is_whitespace(*c)) {
            return image_data(&rest[3..]);
        }
        let (r, _) = object(rest)?;
        let (r, _) = skip_ws(r)?;
        let (r, _) = object(r)?;
        rest = r;
    }
}

fn image_data(data: &[u8]) -> IResult<&[u8], ()> {
    for i in 0..data.len().saturating_sub(1) {
        let standalone = (i == 0 || is_whitespace(data[i - 1]))
            && (i + 2 == data.len() || !is_regular(data[i + 2]));
        if &data[i..i + 2] == b"EI" && standalone {
            return Ok((&data[i + 2..], ()));
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(
        data,
        nom::error::ErrorKind::Eof,
    )))
}

fn lex_error(data: &[u8], at: &[u8], reason: &str) -> TaggingError {
    TaggingError::Lex {
        offset: data.len() - at.len(),
        reason: reason.to_string(),
    }
}

/// Tokenize a decoded content stream into operations with byte spans.
pub fn tokenize(data: &[u8]) -> Result<Vec<Operation>> {
    let mut operations = Vec::new();
    let mut operands: SmallVec<[Operand; 6]> = SmallVec::new();
    let mut start: Option<usize> = None;
    let mut input = data;

    loop {
        let (rest, _) = skip_ws(input).map_err(|_| lex_error(data, input, "bad whitespace"))?;
        input = rest;
        if input.is_empty() {
            break;
        }
        let offset = data.len() - input.len();

        let (rest, tok) =
            token(input).map_err(|_| lex_error(data, input, "unexpected byte"))?;

        match tok {
            Token::Operand(operand) => {
                start.get_or_insert(offset);
                operands.push(operand);
                input = rest;
            }
            Token::Operator(word) => {
                let operator = String::from_utf8_lossy(word).into_owned();
                let rest = if operator == "BI" {
                    let (after, _) = inline_image(rest)
                        .map_err(|_| lex_error(data, rest, "unterminated inline image"))?;
                    after
                } else {
                    rest
                };
                let end = data.len() - rest.len();
                operations.push(Operation {
                    operator,
                    operands: std::mem::take(&mut operands),
                    span: start.take().unwrap_or(offset)..end,
                });
                input = rest;
            }
        }
    }

    if !operands.is_empty() {
        return Err(TaggingError::Lex {
            offset: start.unwrap_or(data.len()),
            reason: "operands without an operator".to_string(),
        });
    }

    trace!(
        target: PDF_OPERATIONS,
        operations = operations.len(),
        bytes = data.len(),
        "tokenized content stream"
    );
    Ok(operations)
}
