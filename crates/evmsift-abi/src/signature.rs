//! Parser for human-readable signature strings.
//!
//! The signature database returns signatures like
//! `batchMintAxies(uint256[],bytes[],address)` or
//! `foo((uint256,address),bool)`. This parser turns them into [`AbiEntry`]
//! values with synthesized positional parameter names: `param_0`,
//! `param_1`, and `param_0_0` for nested tuple members. `indexed` flags are
//! left unset; the caller decides them.

use crate::entry::{AbiEntry, AbiKind, AbiParam};
use evmsift_core::error::AbiError;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Tok<'a> {
    Open,
    Close,
    Comma,
    Word(&'a str),
}

/// Split on `(`, `)` and `,`, yielding trimmed type tokens in between.
fn tokenize(s: &str) -> Vec<Tok<'_>> {
    let mut toks = Vec::new();
    let mut start = 0;
    for (pos, ch) in s.char_indices() {
        if matches!(ch, '(' | ')' | ',') {
            let word = s[start..pos].trim();
            if !word.is_empty() {
                toks.push(Tok::Word(word));
            }
            toks.push(match ch {
                '(' => Tok::Open,
                ')' => Tok::Close,
                _ => Tok::Comma,
            });
            start = pos + 1;
        }
    }
    let tail = s[start..].trim();
    if !tail.is_empty() {
        toks.push(Tok::Word(tail));
    }
    toks
}

fn malformed(sig: &str, reason: impl Into<String>) -> AbiError {
    AbiError::Signature {
        input: sig.to_string(),
        reason: reason.into(),
    }
}

/// Parse one parameter list up to and including its closing paren.
fn parse_params<'a, I>(
    toks: &mut I,
    prefix: &str,
    sig: &str,
) -> Result<Vec<AbiParam>, AbiError>
where
    I: Iterator<Item = Tok<'a>>,
{
    let mut params = Vec::new();
    let mut ty: Option<String> = None;
    let mut components: Option<Vec<AbiParam>> = None;
    let mut index = 0usize;

    loop {
        let tok = toks
            .next()
            .ok_or_else(|| malformed(sig, "unbalanced parentheses"))?;
        match tok {
            Tok::Open => {
                if ty.is_some() {
                    return Err(malformed(sig, "unexpected '('"));
                }
                let inner = parse_params(toks, &format!("{prefix}_{index}"), sig)?;
                if inner.is_empty() {
                    return Err(malformed(sig, "empty tuple"));
                }
                components = Some(inner);
                ty = Some("tuple".to_string());
            }
            Tok::Word(w) => {
                if let Some(t) = ty.as_mut() {
                    // Array suffix after a closed tuple: (...)[] or (...)[3]
                    if w.starts_with('[') {
                        t.push_str(w);
                    } else {
                        return Err(malformed(sig, format!("unexpected token '{w}'")));
                    }
                } else {
                    ty = Some(w.to_string());
                }
            }
            Tok::Comma | Tok::Close => {
                let closing = tok == Tok::Close;
                match ty.take() {
                    Some(t) => params.push(AbiParam {
                        name: format!("{prefix}_{index}"),
                        ty: t,
                        components: components.take(),
                        indexed: None,
                        internal_type: None,
                    }),
                    None => {
                        if closing && params.is_empty() {
                            return Ok(params);
                        }
                        return Err(malformed(sig, "empty type"));
                    }
                }
                if closing {
                    return Ok(params);
                }
                index += 1;
            }
        }
    }
}

/// Parse a `name(type,...)` signature string into an [`AbiEntry`] of the
/// given kind. Malformed input is rejected, never guessed at.
pub fn parse_signature(kind: AbiKind, sig: &str) -> Result<AbiEntry, AbiError> {
    if !matches!(kind, AbiKind::Function | AbiKind::Event) {
        return Err(malformed(sig, "only function and event signatures parse"));
    }
    let (name, remainder) = sig
        .split_once('(')
        .ok_or_else(|| malformed(sig, "missing parameter list"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(malformed(sig, "empty name"));
    }

    let mut toks = tokenize(remainder).into_iter();
    let inputs = parse_params(&mut toks, "param", sig)?;
    if toks.next().is_some() {
        return Err(malformed(sig, "trailing characters after parameter list"));
    }

    Ok(AbiEntry {
        kind,
        name: name.to_string(),
        inputs,
        outputs: match kind {
            AbiKind::Function => Some(Vec::new()),
            _ => None,
        },
        anonymous: None,
        state_mutability: None,
        discovered: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::entry_selector;

    #[test]
    fn flat_parameter_list() {
        let entry =
            parse_signature(AbiKind::Function, "batchMintAxies(uint256[],bytes[],address)")
                .unwrap();
        assert_eq!(entry.name, "batchMintAxies");
        assert_eq!(entry.inputs.len(), 3);
        assert_eq!(entry.inputs[0].name, "param_0");
        assert_eq!(entry.inputs[0].ty, "uint256[]");
        assert_eq!(entry.inputs[1].name, "param_1");
        assert_eq!(entry.inputs[1].ty, "bytes[]");
        assert_eq!(entry.inputs[2].name, "param_2");
        assert_eq!(entry.inputs[2].ty, "address");
        assert!(entry.inputs.iter().all(|p| p.indexed.is_none()));
    }

    #[test]
    fn nested_tuple_components() {
        let entry = parse_signature(AbiKind::Function, "foo((uint256,address),bool)").unwrap();
        assert_eq!(entry.inputs.len(), 2);
        let tup = &entry.inputs[0];
        assert_eq!(tup.ty, "tuple");
        let comps = tup.components.as_ref().unwrap();
        assert_eq!(comps[0].name, "param_0_0");
        assert_eq!(comps[0].ty, "uint256");
        assert_eq!(comps[1].name, "param_0_1");
        assert_eq!(comps[1].ty, "address");
        assert_eq!(entry.inputs[1].ty, "bool");
    }

    #[test]
    fn tuple_array_suffix() {
        let entry = parse_signature(AbiKind::Function, "bar((uint256,bytes)[],address)").unwrap();
        assert_eq!(entry.inputs[0].ty, "tuple[]");
        assert!(entry.inputs[0].components.is_some());
    }

    #[test]
    fn parsed_signature_derives_matching_selector() {
        let entry = parse_signature(AbiKind::Function, "transfer(address,uint256)").unwrap();
        assert_eq!(entry.signature(), "transfer(address,uint256)");
        assert_eq!(entry_selector(&entry).unwrap().to_hex(), "0xa9059cbb");
    }

    #[test]
    fn event_kind_has_no_outputs() {
        let entry =
            parse_signature(AbiKind::Event, "Transfer(address,address,uint256)").unwrap();
        assert_eq!(entry.kind, AbiKind::Event);
        assert!(entry.outputs.is_none());
    }

    #[test]
    fn zero_arg_signature() {
        let entry = parse_signature(AbiKind::Function, "pause()").unwrap();
        assert!(entry.inputs.is_empty());
    }

    #[test]
    fn malformed_signatures_rejected() {
        assert!(parse_signature(AbiKind::Function, "foo(uint256").is_err());
        assert!(parse_signature(AbiKind::Function, "foo(uint256,,bool)").is_err());
        assert!(parse_signature(AbiKind::Function, "(uint256)").is_err());
        assert!(parse_signature(AbiKind::Function, "foo").is_err());
        assert!(parse_signature(AbiKind::Function, "foo(uint256))").is_err());
        assert!(parse_signature(AbiKind::Fallback, "foo(uint256)").is_err());
    }
}
