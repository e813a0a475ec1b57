use memchr::memchr;

use crate::charclass;
use crate::error::Error;
use crate::matches::Match;
use crate::prog::Code;

/// One piece of a tokenized replacement template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Segment {
    Literal(String),
    /// `$n`, `${n}`, `${name}`: a group's current text, by user number.
    Group(usize),
    /// ``$` ``: the input before the match.
    LeftPortion,
    /// `$'`: the input after the match.
    RightPortion,
    /// `$+`: the highest-numbered group.
    LastGroup,
    /// `$_`: the whole input.
    WholeInput,
}

/// A replacement template, tokenized once per replace call and reused for
/// every match.
#[derive(Clone, Debug)]
pub(crate) struct Replacement {
    segments: Vec<Segment>,
}

impl Replacement {
    /// Tokenize `template` against the capture metadata of `code`.
    ///
    /// `$$` is a literal dollar and an unrecognized escape like `$x` is
    /// literal text, but a reference to a group the pattern never
    /// declared is an error.
    pub fn parse(template: &str, code: &Code) -> Result<Replacement, Error> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        while !rest.is_empty() {
            let dollar = match memchr(b'$', rest.as_bytes()) {
                None => {
                    literal.push_str(rest);
                    break;
                }
                Some(i) => i,
            };
            literal.push_str(&rest[..dollar]);
            rest = &rest[dollar..];

            let (segment, consumed) = scan_dollar(rest, code)?;
            match segment {
                Segment::Literal(ref s) => literal.push_str(s),
                other => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(
                            &mut literal,
                        )));
                    }
                    segments.push(other);
                }
            }
            rest = &rest[consumed..];
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Replacement { segments })
    }

    /// Append the template, expanded against `m`, to `dst`.
    pub fn expand(&self, m: &Match, dst: &mut String) {
        for segment in &self.segments {
            match *segment {
                Segment::Literal(ref s) => dst.push_str(s),
                Segment::Group(n) => {
                    if let Some(g) = m.group(n) {
                        dst.push_str(&g.value());
                    }
                }
                Segment::LeftPortion => {
                    dst.extend(&m.text()[..m.index()]);
                }
                Segment::RightPortion => {
                    dst.extend(&m.text()[m.index() + m.len()..]);
                }
                Segment::LastGroup => {
                    if let Some(g) = m.last_group() {
                        dst.push_str(&g.value());
                    }
                }
                Segment::WholeInput => {
                    dst.extend(m.text());
                }
            }
        }
    }
}

/// Scan one `$..` escape at the start of `s` (which begins with `$`).
/// Returns the segment and the number of bytes consumed.
fn scan_dollar(s: &str, code: &Code) -> Result<(Segment, usize), Error> {
    let mut chars = s.char_indices().skip(1).peekable();
    let (first_pos, first) = match chars.peek().copied() {
        Some(x) => x,
        None => return Ok((Segment::Literal("$".to_string()), 1)),
    };

    match first {
        '$' => return Ok((Segment::Literal("$".to_string()), first_pos + 1)),
        '&' => return Ok((Segment::Group(0), first_pos + 1)),
        '`' => return Ok((Segment::LeftPortion, first_pos + 1)),
        '\'' => return Ok((Segment::RightPortion, first_pos + 1)),
        '+' => return Ok((Segment::LastGroup, first_pos + 1)),
        '_' => return Ok((Segment::WholeInput, first_pos + 1)),
        _ => {}
    }

    if first.is_ascii_digit() {
        let mut number = 0usize;
        let mut end = first_pos;
        for (i, c) in chars {
            if !c.is_ascii_digit() {
                end = i;
                break;
            }
            number = number.saturating_mul(10) + (c as u8 - b'0') as usize;
            end = i + 1;
        }
        if code.slot_of(number).is_none() {
            return Err(Error::replacement(format!(
                "reference to undefined group number {}",
                number
            )));
        }
        return Ok((Segment::Group(number), end));
    }

    if first == '{' {
        let inner_start = first_pos + 1;
        let close = match memchr(b'}', s[inner_start..].as_bytes()) {
            Some(i) => inner_start + i,
            None => return Ok((Segment::Literal("$".to_string()), 1)),
        };
        let name = &s[inner_start..close];
        if name.is_empty() || !name.chars().all(charclass::is_word_char) {
            return Ok((Segment::Literal("$".to_string()), 1));
        }
        let number = if name.chars().all(|c| c.is_ascii_digit()) {
            name.parse::<usize>().ok().filter(|&n| code.slot_of(n).is_some())
        } else {
            code.group_number(name)
        };
        return match number {
            Some(n) => Ok((Segment::Group(n), close + 1)),
            None => Err(Error::replacement(format!(
                "reference to undefined group `{}`",
                name
            ))),
        };
    }

    Ok((Segment::Literal("$".to_string()), 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;
    use crate::parse;
    use crate::re::RegexOptions;

    fn code_for(pat: &str) -> Code {
        let ast = parse::parse(pat, RegexOptions::empty()).unwrap();
        compile::write(&ast).unwrap()
    }

    #[test]
    fn tokenizes_once() {
        let code = code_for(r"(?<y>\d{4})-(?<m>\d{2})");
        let rep = Replacement::parse("$m/$1 ${y}$$", &code).unwrap();
        // "$m" is not a bare-name form; only digits follow a bare `$`
        assert!(rep
            .segments
            .iter()
            .any(|s| *s == Segment::Literal("$m/".to_string())));
        assert!(rep.segments.contains(&Segment::Group(1)));
        assert!(rep.segments.contains(&Segment::Group(1)));
    }

    #[test]
    fn braced_names_resolve() {
        let code = code_for(r"(?<word>\w+)");
        let rep = Replacement::parse("<${word}>", &code).unwrap();
        assert_eq!(
            rep.segments,
            vec![
                Segment::Literal("<".to_string()),
                Segment::Group(1),
                Segment::Literal(">".to_string()),
            ]
        );
    }

    #[test]
    fn undefined_references_error() {
        let code = code_for(r"(a)");
        assert!(Replacement::parse("$2", &code).is_err());
        assert!(Replacement::parse("${nope}", &code).is_err());
        assert!(Replacement::parse("$$2", &code).is_ok());
    }

    #[test]
    fn specials_parse() {
        let code = code_for(r"(a)");
        let rep = Replacement::parse("$`$'$+$_$&", &code).unwrap();
        assert_eq!(
            rep.segments,
            vec![
                Segment::LeftPortion,
                Segment::RightPortion,
                Segment::LastGroup,
                Segment::WholeInput,
                Segment::Group(0),
            ]
        );
    }

    #[test]
    fn trailing_dollar_is_literal() {
        let code = code_for("a");
        let rep = Replacement::parse("x$", &code).unwrap();
        assert_eq!(rep.segments, vec![Segment::Literal("x$".to_string())]);
    }
}
