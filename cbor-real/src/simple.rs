//! Simplified arithmetic (General Decimal Arithmetic, Appendix A).
//!
//! Operands are rounded to the working precision before the operation,
//! signalling `LOST_DIGITS` when that discards non-zero digits; subnormal
//! results flush to zero; zeros never keep a positive exponent; divisions
//! lose their trailing zeros.

use cbor_bigint::BigInt;

use crate::{
    accumulator::ShiftAccumulator,
    context::{
        ArithmeticError,
        PrecisionContext,
        Signals,
    },
    number::{
        NumberFlags,
        RadixNumber,
    },
    radix_math,
};

type OpResult<N> = Result<N, ArithmeticError>;

fn quiet_from<N: RadixNumber>(src: &N, ctx: &PrecisionContext) -> N {
    let p = ctx.precision_u64();
    let mut payload = src.mantissa().clone();
    if p > 0 && N::digits(&payload) > p {
        let mut acc = N::accumulator(payload, 0, 0);
        let d = acc.digit_length();
        acc.shift_right(d - p);
        payload = acc.into_shifted();
    }
    let mut flags = NumberFlags::QUIET_NAN;
    if src.is_negative() {
        flags |= NumberFlags::NEGATIVE;
    }
    N::from_parts(payload, BigInt::zero(), flags)
}

/// Simplified NaN propagation: a signaling NaN quietens and raises
/// `INVALID`; a quiet NaN passes through with its payload truncated.
fn handle_nans<N: RadixNumber>(
    a: &N,
    b: Option<&N>,
    ctx: &mut PrecisionContext,
) -> Option<OpResult<N>> {
    let signaling = a.is_signaling_nan() || b.map_or(false, |b| b.is_signaling_nan());
    if signaling {
        let src = if a.is_signaling_nan() {
            a
        } else {
            b.unwrap_or(a)
        };
        let quiet = quiet_from(src, ctx);
        return Some(match ctx.report(Signals::INVALID) {
            Ok(()) => Ok(quiet),
            Err(e) => Err(e),
        });
    }
    if a.is_nan() {
        return Some(Ok(quiet_from(a, ctx)));
    }
    if let Some(b) = b {
        if b.is_nan() {
            return Some(Ok(quiet_from(b, ctx)));
        }
    }
    None
}

/// Round an operand to the working precision before the operation.
fn pre_round<N: RadixNumber>(x: &N, ctx: &mut PrecisionContext) -> OpResult<N> {
    if !x.is_finite() {
        return Ok(x.clone());
    }
    let p = ctx.precision_u64();
    if p == 0 {
        return Ok(x.clone());
    }
    let d = N::digits(x.mantissa());
    if d <= p {
        return Ok(x.clone());
    }
    let negative = x.is_negative();
    let mut acc = N::accumulator(x.mantissa().clone(), 0, 0);
    acc.shift_right(d - p);
    let exponent = x.exponent() + BigInt::from(d - p);
    let inexact = acc.last_discarded() != 0 || acc.sticky() != 0;
    let last = acc.last_discarded();
    let sticky = acc.sticky();
    let mut m = acc.into_shifted();
    if inexact {
        let low = N::low_digit(&m);
        if radix_math::round_up(ctx.rounding(), negative, last, sticky, low, N::RADIX) {
            m = &m + &BigInt::one();
        }
        ctx.report(Signals::LOST_DIGITS | Signals::INEXACT | Signals::ROUNDED)?;
    }
    Ok(N::from_parts(
        m,
        exponent,
        if negative {
            NumberFlags::NEGATIVE
        } else {
            NumberFlags::empty()
        },
    ))
}

/// Appendix A post-processing of a finite kernel result.
fn post_process<N: RadixNumber>(
    mut result: N,
    mut flags: Signals,
    strip_zeros: bool,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    if result.is_finite() {
        if flags.contains(Signals::UNDERFLOW) {
            // Subnormals are not representable here: flush to zero.
            let e = if ctx.has_exponent_range() {
                ctx.e_tiny()
            } else {
                BigInt::zero()
            };
            result = N::from_parts(
                BigInt::zero(),
                e,
                result.flags() & NumberFlags::NEGATIVE,
            );
            flags |= Signals::CLAMPED;
        }
        if result.mantissa().is_zero() && *result.exponent() > BigInt::zero() {
            // A zero never keeps a positive exponent.
            let mut e = BigInt::zero();
            if ctx.has_exponent_range() && &e > ctx.e_max() {
                e = ctx.e_max().clone();
            }
            result =
                N::from_parts(BigInt::zero(), e, result.flags() & NumberFlags::NEGATIVE);
        }
        if strip_zeros && !result.mantissa().is_zero() {
            let radix = BigInt::from(N::RADIX);
            let mut m = result.mantissa().clone();
            let mut e = result.exponent().clone();
            while !m.is_zero() && N::low_digit(&m) == 0 {
                m = &m / &radix;
                e = &e + &BigInt::one();
            }
            result = N::from_parts(m, e, result.flags());
        }
    }
    ctx.report(flags)?;
    Ok(result)
}

/// Run a unary kernel operation under simplified semantics.
pub(crate) fn unary<N, F>(
    a: &N,
    ctx: &mut PrecisionContext,
    strip_zeros: bool,
    op: F,
) -> OpResult<N>
where
    N: RadixNumber,
    F: FnOnce(&N, &mut PrecisionContext) -> OpResult<N>,
{
    if let Some(r) = handle_nans(a, None, ctx) {
        return r;
    }
    let a = pre_round(a, ctx)?;
    let mut child = ctx.clone().with_blank_flags();
    let result = op(&a, &mut child)?;
    post_process(result, child.flags(), strip_zeros, ctx)
}

/// Run a binary kernel operation under simplified semantics.
pub(crate) fn binary<N, F>(
    a: &N,
    b: &N,
    ctx: &mut PrecisionContext,
    strip_zeros: bool,
    op: F,
) -> OpResult<N>
where
    N: RadixNumber,
    F: FnOnce(&N, &N, &mut PrecisionContext) -> OpResult<N>,
{
    if let Some(r) = handle_nans(a, Some(b), ctx) {
        return r;
    }
    let a = pre_round(a, ctx)?;
    let b = pre_round(b, ctx)?;
    let mut child = ctx.clone().with_blank_flags();
    let result = op(&a, &b, &mut child)?;
    post_process(result, child.flags(), strip_zeros, ctx)
}

/// Run a ternary kernel operation under simplified semantics.
pub(crate) fn ternary<N, F>(
    a: &N,
    b: &N,
    c: &N,
    ctx: &mut PrecisionContext,
    op: F,
) -> OpResult<N>
where
    N: RadixNumber,
    F: FnOnce(&N, &N, &N, &mut PrecisionContext) -> OpResult<N>,
{
    if a.is_nan() || b.is_nan() || c.is_nan() {
        let signaling =
            a.is_signaling_nan() || b.is_signaling_nan() || c.is_signaling_nan();
        let src = [a, b, c]
            .into_iter()
            .find(|v| {
                if signaling {
                    v.is_signaling_nan()
                } else {
                    v.is_nan()
                }
            })
            .unwrap_or(a);
        let quiet = quiet_from(src, ctx);
        if signaling {
            ctx.report(Signals::INVALID)?;
        }
        return Ok(quiet);
    }
    let a = pre_round(a, ctx)?;
    let b = pre_round(b, ctx)?;
    let c = pre_round(c, ctx)?;
    let mut child = ctx.clone().with_blank_flags();
    let result = op(&a, &b, &c, &mut child)?;
    post_process(result, child.flags(), false, ctx)
}

/// Run a generator (no numeric operands) under simplified semantics.
pub(crate) fn nullary<N, F>(ctx: &mut PrecisionContext, op: F) -> OpResult<N>
where
    N: RadixNumber,
    F: FnOnce(&mut PrecisionContext) -> OpResult<N>,
{
    let mut child = ctx.clone().with_blank_flags();
    let result = op(&mut child)?;
    post_process(result, child.flags(), false, ctx)
}
