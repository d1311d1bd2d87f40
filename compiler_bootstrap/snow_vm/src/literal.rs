//! Parser for the literal operand of `PUSH_R` (the only instruction whose
//! operand text can contain embedded whitespace: quoted strings and bracketed
//! array literals). The decoder splits off just the opcode token before
//! handing the remainder here unparsed, see [`crate::decode`].

use snow_common::ConstantValue;

use crate::error::{FaultKind, VmResult};

/// Parses a single `PUSH_R` literal: `true`/`false`, a double-quoted string
/// with Rust-style escapes, a suffixed numeric atom (`b/B`, `s/S`, `l/L`,
/// `f/F`; no suffix infers `D64` if the text contains `.`/`e`/`E`, else
/// `I32`), or a `[elem, elem, ...]` array of any of the above.
pub fn parse_literal(text: &str) -> VmResult<ConstantValue> {
    let mut chars = text.trim().char_indices().peekable();
    let value = parse_value(text.trim(), &mut chars)?;
    Ok(value)
}

type Chars<'a> = std::iter::Peekable<std::str::CharIndices<'a>>;

fn parse_value(src: &str, chars: &mut Chars) -> VmResult<ConstantValue> {
    skip_ws(src, chars);
    match chars.peek().copied() {
        Some((_, '[')) => parse_array(src, chars),
        Some((_, '"')) => parse_string(src, chars),
        Some(_) => parse_atom(src, chars),
        None => Err(FaultKind::InvalidInstruction(
            "PUSH_R".to_string(),
            "empty literal".to_string(),
        )),
    }
}

fn skip_ws(_src: &str, chars: &mut Chars) {
    while matches!(chars.peek(), Some((_, c)) if c.is_whitespace()) {
        chars.next();
    }
}

fn parse_array(src: &str, chars: &mut Chars) -> VmResult<ConstantValue> {
    chars.next(); // consume '['
    let mut items = Vec::new();
    skip_ws(src, chars);
    if matches!(chars.peek(), Some((_, ']'))) {
        chars.next();
        return Ok(ConstantValue::List(items));
    }
    loop {
        let item = parse_value(src, chars)?;
        items.push(item);
        skip_ws(src, chars);
        match chars.next() {
            Some((_, ',')) => {
                skip_ws(src, chars);
                continue;
            }
            Some((_, ']')) => break,
            other => {
                return Err(FaultKind::InvalidInstruction(
                    "PUSH_R".to_string(),
                    format!("expected ',' or ']' in array literal, found {other:?}"),
                ))
            }
        }
    }
    Ok(ConstantValue::List(items))
}

fn parse_string(src: &str, chars: &mut Chars) -> VmResult<ConstantValue> {
    let (start, _) = chars.next().unwrap(); // consume opening '"'
    let mut out = String::new();
    loop {
        match chars.next() {
            Some((_, '"')) => break,
            Some((_, '\\')) => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, '\\')) => out.push('\\'),
                Some((_, '"')) => out.push('"'),
                Some((_, '\'')) => out.push('\''),
                Some((_, 'f')) => out.push('\u{000C}'),
                Some((_, 'b')) => out.push('\u{0008}'),
                Some((_, '0')) => out.push('\0'),
                Some((i, 'u')) => {
                    let (code, advanced) = parse_unicode_escape(&src[i + 1..])?;
                    out.push(code);
                    for _ in 0..advanced {
                        chars.next();
                    }
                }
                Some((_, other)) => {
                    return Err(FaultKind::InvalidInstruction(
                        "PUSH_R".to_string(),
                        format!("unknown escape '\\{other}'"),
                    ))
                }
                None => {
                    return Err(FaultKind::InvalidInstruction(
                        "PUSH_R".to_string(),
                        "unterminated escape".to_string(),
                    ))
                }
            },
            Some((_, c)) => out.push(c),
            None => {
                return Err(FaultKind::InvalidInstruction(
                    "PUSH_R".to_string(),
                    format!("unterminated string starting at byte {start}"),
                ))
            }
        }
    }
    Ok(ConstantValue::Str(out))
}

/// Parses `{XXXX}` (brace form, Rust's own debug-escape shape) or bare
/// `XXXX` (4 hex digits, the form the spec's prose grammar uses) after a
/// `\u`. Returns the decoded char and how many source bytes to skip.
fn parse_unicode_escape(rest: &str) -> VmResult<(char, usize)> {
    let err = || {
        FaultKind::InvalidInstruction(
            "PUSH_R".to_string(),
            format!("malformed unicode escape near '{rest}'"),
        )
    };
    if let Some(braced) = rest.strip_prefix('{') {
        let end = braced.find('}').ok_or_else(err)?;
        let code = u32::from_str_radix(&braced[..end], 16).map_err(|_| err())?;
        let c = char::from_u32(code).ok_or_else(err)?;
        return Ok((c, 1 + end + 1));
    }
    if rest.len() >= 4 {
        let code = u32::from_str_radix(&rest[..4], 16).map_err(|_| err())?;
        let c = char::from_u32(code).ok_or_else(err)?;
        return Ok((c, 4));
    }
    Err(err())
}

fn parse_atom(src: &str, chars: &mut Chars) -> VmResult<ConstantValue> {
    let start = chars.peek().map(|(i, _)| *i).unwrap_or(src.len());
    let mut end = src.len();
    while let Some((i, c)) = chars.peek().copied() {
        if c == ',' || c == ']' || c.is_whitespace() {
            end = i;
            break;
        }
        chars.next();
    }
    let token = &src[start..end];
    parse_atom_token(token)
}

fn parse_atom_token(token: &str) -> VmResult<ConstantValue> {
    let malformed = || {
        FaultKind::InvalidInstruction(
            "PUSH_R".to_string(),
            format!("malformed numeric literal '{token}'"),
        )
    };
    if token == "true" {
        return Ok(ConstantValue::Bool(true));
    }
    if token == "false" {
        return Ok(ConstantValue::Bool(false));
    }
    if token.is_empty() {
        return Err(malformed());
    }

    let (body, suffix) = token.split_at(token.len() - 1);
    match suffix {
        "b" | "B" => return Ok(ConstantValue::B8(body.parse().map_err(|_| malformed())?)),
        "s" | "S" => return Ok(ConstantValue::S16(body.parse().map_err(|_| malformed())?)),
        "L" => return Ok(ConstantValue::L64(body.parse().map_err(|_| malformed())?)),
        "f" | "F" => return Ok(ConstantValue::F32(body.parse().map_err(|_| malformed())?)),
        _ => {}
    }

    if token.contains('.') || token.contains('e') || token.contains('E') {
        return Ok(ConstantValue::D64(token.parse().map_err(|_| malformed())?));
    }
    Ok(ConstantValue::I32(token.parse().map_err(|_| malformed())?))
}
