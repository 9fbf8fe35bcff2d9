//! Typed value checking: `range`/`length` expression parsing and validation
//! of default values and data leaf values against resolved types.

use crate::context::Context;
use crate::error::{Error, ErrorKind, Result};
use crate::schema::{RangeBound, Restriction, TypeBase, TypeId, TypeSpec};

/// Parse a `range` or `length` argument: parts separated by `|`, each either
/// a single value or `lo .. hi`, with `min`/`max` standing for the type
/// bounds. Parts must be in ascending order.
pub(crate) fn parse_range_parts(
    expr: &str,
    decimal: bool,
) -> Result<Vec<(RangeBound, RangeBound)>> {
    let invalid = || {
        Error::new(ErrorKind::InvalidRange {
            expr: expr.to_string(),
        })
    };

    let mut parts = Vec::new();
    for part in expr.split('|') {
        let part = part.trim();
        if part.is_empty() {
            return Err(invalid());
        }
        let (lo, hi) = match part.split_once("..") {
            Some((lo, hi)) => (
                parse_bound(lo.trim(), decimal).ok_or_else(invalid)?,
                parse_bound(hi.trim(), decimal).ok_or_else(invalid)?,
            ),
            None => {
                let bound = parse_bound(part, decimal).ok_or_else(invalid)?;
                (bound, bound)
            }
        };
        if bound_gt(&lo, &hi) {
            return Err(invalid());
        }
        if let Some((_, prev_hi)) = parts.last() {
            if !bound_lt(prev_hi, &lo) {
                return Err(invalid());
            }
        }
        parts.push((lo, hi));
    }
    if parts.is_empty() {
        return Err(invalid());
    }
    Ok(parts)
}

fn parse_bound(s: &str, decimal: bool) -> Option<RangeBound> {
    match s {
        "min" => Some(RangeBound::Min),
        "max" => Some(RangeBound::Max),
        _ => {
            if decimal && s.contains('.') {
                s.parse::<f64>().ok().map(RangeBound::Dec)
            } else {
                s.parse::<i128>().ok().map(RangeBound::Int)
            }
        }
    }
}

fn bound_value(b: &RangeBound) -> Option<f64> {
    match b {
        RangeBound::Min | RangeBound::Max => None,
        RangeBound::Int(i) => Some(*i as f64),
        RangeBound::Dec(d) => Some(*d),
    }
}

fn bound_gt(lo: &RangeBound, hi: &RangeBound) -> bool {
    match (lo, hi) {
        (RangeBound::Min, _) | (_, RangeBound::Max) => false,
        (RangeBound::Max, _) | (_, RangeBound::Min) => true,
        _ => bound_value(lo) > bound_value(hi),
    }
}

fn bound_lt(a: &RangeBound, b: &RangeBound) -> bool {
    match (a, b) {
        (RangeBound::Min, _) | (_, RangeBound::Max) => true,
        (RangeBound::Max, _) | (_, RangeBound::Min) => false,
        _ => bound_value(a) < bound_value(b),
    }
}

/// The built-in value span of an integer base.
pub(crate) fn integer_bounds(base: TypeBase) -> (i128, i128) {
    match base {
        TypeBase::Int8 => (i8::MIN as i128, i8::MAX as i128),
        TypeBase::Int16 => (i16::MIN as i128, i16::MAX as i128),
        TypeBase::Int32 => (i32::MIN as i128, i32::MAX as i128),
        TypeBase::Int64 => (i64::MIN as i128, i64::MAX as i128),
        TypeBase::Uint8 => (0, u8::MAX as i128),
        TypeBase::Uint16 => (0, u16::MAX as i128),
        TypeBase::Uint32 => (0, u32::MAX as i128),
        TypeBase::Uint64 => (0, u64::MAX as i128),
        _ => (i128::MIN, i128::MAX),
    }
}

fn in_parts(parts: &[(RangeBound, RangeBound)], value: f64) -> bool {
    parts.iter().any(|(lo, hi)| {
        let lo_ok = match bound_value(lo) {
            Some(b) => value >= b,
            None => !matches!(lo, RangeBound::Max),
        };
        let hi_ok = match bound_value(hi) {
            Some(b) => value <= b,
            None => !matches!(hi, RangeBound::Min),
        };
        lo_ok && hi_ok
    })
}

fn check_restriction(restr: Option<&Restriction>, value: f64) -> bool {
    match restr {
        None => true,
        Some(r) => in_parts(&r.parts, value),
    }
}

/// Check a canonical value string against a resolved type. Restrictions are
/// enforced along the whole derivation chain; pattern matching is out of
/// scope at load time (XPath-level expressions are syntactic only).
pub(crate) fn check_value(ctx: &Context, ty: TypeId, value: &str) -> Result<()> {
    let bad = |keyword: &str| {
        Error::new(ErrorKind::InvalidValue {
            keyword: keyword.to_string(),
            value: value.to_string(),
        })
    };

    let t = ctx.typ(ty);
    match t.base {
        TypeBase::Unknown => Err(Error::internal("value check against unresolved type")),
        TypeBase::Int8
        | TypeBase::Int16
        | TypeBase::Int32
        | TypeBase::Int64
        | TypeBase::Uint8
        | TypeBase::Uint16
        | TypeBase::Uint32
        | TypeBase::Uint64 => {
            let base = t.base;
            let parsed: i128 = value.trim().parse().map_err(|_| bad(base.name()))?;
            let (min, max) = integer_bounds(base);
            if parsed < min || parsed > max {
                return Err(bad(base.name()));
            }
            for restr in chain_ranges(ctx, ty) {
                if !check_restriction(Some(restr), parsed as f64) {
                    return Err(bad(base.name()));
                }
            }
            Ok(())
        }
        TypeBase::Boolean => match value {
            "true" | "false" => Ok(()),
            _ => Err(bad("boolean")),
        },
        TypeBase::Empty => Err(Error::new(ErrorKind::InvalidValue {
            keyword: "empty".to_string(),
            value: value.to_string(),
        })),
        TypeBase::String => {
            let length = value.chars().count() as f64;
            for restr in chain_lengths(ctx, ty) {
                if !check_restriction(Some(restr), length) {
                    return Err(bad("string"));
                }
            }
            Ok(())
        }
        TypeBase::Binary => {
            let stripped: String = value.chars().filter(|c| !c.is_whitespace()).collect();
            let valid = stripped
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='));
            if !valid {
                return Err(bad("binary"));
            }
            Ok(())
        }
        TypeBase::Decimal64 => {
            let digits = chain_find(ctx, ty, |spec| match spec {
                TypeSpec::Decimal64 { digits, .. } => Some(*digits),
                _ => None,
            })
            .unwrap_or(1);
            let parsed = parse_decimal(value, digits).ok_or_else(|| bad("decimal64"))?;
            for restr in chain_ranges(ctx, ty) {
                if !check_restriction(Some(restr), parsed) {
                    return Err(bad("decimal64"));
                }
            }
            Ok(())
        }
        TypeBase::Enumeration => {
            let enums = chain_find(ctx, ty, |spec| match spec {
                TypeSpec::Enumeration { enums } => Some(enums.clone()),
                _ => None,
            })
            .unwrap_or_default();
            if enums.iter().any(|e| ctx.str(e.name) == value) {
                Ok(())
            } else {
                Err(bad("enumeration"))
            }
        }
        TypeBase::Bits => {
            let bits = chain_find(ctx, ty, |spec| match spec {
                TypeSpec::Bits { bits } => Some(bits.clone()),
                _ => None,
            })
            .unwrap_or_default();
            for name in value.split_whitespace() {
                if !bits.iter().any(|b| ctx.str(b.name) == name) {
                    return Err(bad("bits"));
                }
            }
            Ok(())
        }
        TypeBase::Identityref => {
            // Membership in the derived set is established by the resolver;
            // here the value only has to be a well-formed reference.
            let (_, name) = crate::path::split_reference(value);
            if name.is_empty() {
                Err(bad("identityref"))
            } else {
                Ok(())
            }
        }
        TypeBase::InstanceIdentifier => Ok(()),
        TypeBase::Leafref => {
            let target = chain_find(ctx, ty, |spec| match spec {
                TypeSpec::Leafref { target, .. } => Some(*target),
                _ => None,
            })
            .flatten();
            match target.and_then(|t| ctx.node(t).type_id()) {
                Some(target_ty) => check_value(ctx, target_ty, value),
                None => Ok(()),
            }
        }
        TypeBase::Union => {
            let members = chain_find(ctx, ty, |spec| match spec {
                TypeSpec::Union { types } => Some(types.clone()),
                _ => None,
            })
            .unwrap_or_default();
            if members.iter().any(|m| check_value(ctx, *m, value).is_ok()) {
                Ok(())
            } else {
                Err(bad("union"))
            }
        }
    }
}

/// Parse a decimal64 literal with at most `digits` fraction digits.
fn parse_decimal(value: &str, digits: u8) -> Option<f64> {
    let trimmed = value.trim();
    let unsigned = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
        || frac_part.len() > digits as usize
    {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Walk the derivation chain from the given type towards the built-in,
/// yielding the first spec detail `f` extracts.
pub(crate) fn chain_find<T>(
    ctx: &Context,
    ty: TypeId,
    f: impl Fn(&TypeSpec) -> Option<T>,
) -> Option<T> {
    let mut current = Some(ty);
    while let Some(id) = current {
        let t = ctx.typ(id);
        if let Some(found) = f(&t.spec) {
            return Some(found);
        }
        current = t.derived.map(|td| ctx.typedef(td).ty);
    }
    None
}

/// All `range` restrictions along the derivation chain, outermost first.
fn chain_ranges(ctx: &Context, ty: TypeId) -> Vec<&Restriction> {
    let mut out = Vec::new();
    let mut current = Some(ty);
    while let Some(id) = current {
        let t = ctx.typ(id);
        match &t.spec {
            TypeSpec::Number { range: Some(r) } => out.push(r),
            TypeSpec::Decimal64 { range: Some(r), .. } => out.push(r),
            _ => {}
        }
        current = t.derived.map(|td| ctx.typedef(td).ty);
    }
    out
}

/// All `length` restrictions along the derivation chain, outermost first.
fn chain_lengths(ctx: &Context, ty: TypeId) -> Vec<&Restriction> {
    let mut out = Vec::new();
    let mut current = Some(ty);
    while let Some(id) = current {
        let t = ctx.typ(id);
        match &t.spec {
            TypeSpec::String {
                length: Some(r), ..
            } => out.push(r),
            TypeSpec::Binary { length: Some(r) } => out.push(r),
            _ => {}
        }
        current = t.derived.map(|td| ctx.typedef(td).ty);
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn it_parses_range_expressions() {
        let parts = parse_range_parts("1..64 | 100 | 200..max", false).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], (RangeBound::Int(1), RangeBound::Int(64)));
        assert_eq!(parts[1], (RangeBound::Int(100), RangeBound::Int(100)));
        assert_eq!(parts[2], (RangeBound::Int(200), RangeBound::Max));
    }

    #[test]
    fn it_rejects_descending_ranges() {
        assert!(parse_range_parts("64..1", false).is_err());
        assert!(parse_range_parts("1..10 | 5..20", false).is_err());
        assert!(parse_range_parts("", false).is_err());
    }

    #[test]
    fn it_parses_decimal_literals() {
        assert_eq!(parse_decimal("3.14", 2), Some(3.14));
        assert!(parse_decimal("3.141", 2).is_none());
        assert!(parse_decimal("abc", 2).is_none());
        assert_eq!(parse_decimal("-8", 2), Some(-8.0));
    }
}
