//! Radix-generic arithmetic kernel.
//!
//! Every operation here is monomorphised over a [`RadixNumber`] (radix 2 or
//! 10). Finite results funnel through [`round_parts`], which realises the
//! rounding pipeline: shift to precision, apply the rounding mode, propagate
//! the carry, check the exponent range, clamp or go subnormal, and report
//! the accumulated signals.

use cbor_bigint::BigInt;
use core::cmp::Ordering;

use crate::{
    accumulator::ShiftAccumulator,
    context::{
        ArithmeticError,
        PrecisionContext,
        RoundingMode,
        Signals,
    },
    number::{
        NumberFlags,
        RadixNumber,
    },
};

type OpResult<N> = Result<N, ArithmeticError>;

// ---------------------------------------------------------------------------
// Construction and inspection helpers

fn finite<N: RadixNumber>(negative: bool, mantissa: BigInt, exponent: BigInt) -> N {
    let flags = if negative {
        NumberFlags::NEGATIVE
    } else {
        NumberFlags::empty()
    };
    N::from_parts(mantissa, exponent, flags)
}

fn zero<N: RadixNumber>(negative: bool, exponent: BigInt) -> N {
    finite(negative, BigInt::zero(), exponent)
}

fn infinity<N: RadixNumber>(negative: bool) -> N {
    let mut flags = NumberFlags::INFINITY;
    if negative {
        flags |= NumberFlags::NEGATIVE;
    }
    N::from_parts(BigInt::zero(), BigInt::zero(), flags)
}

fn quiet_nan<N: RadixNumber>(payload: BigInt, negative: bool) -> N {
    let mut flags = NumberFlags::QUIET_NAN;
    if negative {
        flags |= NumberFlags::NEGATIVE;
    }
    N::from_parts(payload, BigInt::zero(), flags)
}

fn int_value<N: RadixNumber>(v: i64) -> N {
    finite(v < 0, BigInt::from(v.unsigned_abs()), BigInt::zero())
}

fn one<N: RadixNumber>() -> N {
    int_value(1)
}

/// One half, exactly representable in either radix.
fn half<N: RadixNumber>() -> N {
    if N::RADIX == 10 {
        finite(false, BigInt::from(5u32), BigInt::from(-1i32))
    } else {
        finite(false, BigInt::one(), BigInt::from(-1i32))
    }
}

fn digits_of<N: RadixNumber>(m: &BigInt) -> u64 {
    N::digits(m)
}

/// `exponent + digits - 1` of a finite non-zero value.
fn adjusted_exponent<N: RadixNumber>(x: &N) -> BigInt {
    x.exponent() + BigInt::from(digits_of::<N>(x.mantissa())) - BigInt::one()
}

fn adjusted_exponent_i64<N: RadixNumber>(x: &N) -> i64 {
    let adj = adjusted_exponent(x);
    i64::try_from(&adj).unwrap_or(if adj.is_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}

fn big_to_u64_saturating(v: &BigInt) -> u64 {
    if v.is_negative() {
        return 0;
    }
    u64::try_from(v).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// NaN handling

/// Truncate a NaN diagnostic payload to the context's precision.
fn truncate_payload<N: RadixNumber>(payload: &BigInt, ctx: &PrecisionContext) -> BigInt {
    let p = ctx.precision_u64();
    if p == 0 {
        return payload.clone();
    }
    let d = digits_of::<N>(payload);
    if d <= p {
        return payload.clone();
    }
    let mut acc = N::accumulator(payload.clone(), 0, 0);
    acc.shift_right(d - p);
    acc.into_shifted()
}

/// Produce the result for an operation with the NaN operand `src`.
fn nan_result<N: RadixNumber>(src: &N, ctx: &mut PrecisionContext) -> OpResult<N> {
    let payload = truncate_payload::<N>(src.mantissa(), ctx);
    if src.is_signaling_nan() {
        ctx.report(Signals::INVALID)?;
    }
    Ok(quiet_nan(payload, src.is_negative()))
}

/// Dispatch NaN operands: signaling NaNs win and raise `INVALID`; quiet
/// NaNs propagate, first operand first.
fn handle_nans<N: RadixNumber>(
    a: &N,
    b: Option<&N>,
    ctx: &mut PrecisionContext,
) -> Option<OpResult<N>> {
    if a.is_signaling_nan() {
        return Some(nan_result(a, ctx));
    }
    if let Some(b) = b {
        if b.is_signaling_nan() {
            return Some(nan_result(b, ctx));
        }
    }
    if a.is_nan() {
        return Some(nan_result(a, ctx));
    }
    if let Some(b) = b {
        if b.is_nan() {
            return Some(nan_result(b, ctx));
        }
    }
    None
}

fn invalid_operation<N: RadixNumber>(ctx: &mut PrecisionContext) -> OpResult<N> {
    ctx.report(Signals::INVALID)?;
    Ok(quiet_nan(BigInt::zero(), false))
}

// ---------------------------------------------------------------------------
// The rounding pipeline

/// Whether the retained mantissa must be incremented. Only called when a
/// non-zero digit was discarded.
pub(crate) fn round_up(
    mode: RoundingMode,
    negative: bool,
    last: u8,
    sticky: u8,
    low_digit: u8,
    radix: u32,
) -> bool {
    let half = (radix / 2) as u8;
    match mode {
        RoundingMode::Down => false,
        RoundingMode::Up => true,
        RoundingMode::Ceiling => !negative,
        RoundingMode::Floor => negative,
        RoundingMode::HalfUp => last >= half,
        RoundingMode::HalfDown => last > half || (last == half && sticky != 0),
        RoundingMode::HalfEven => {
            last > half || (last == half && (sticky != 0 || low_digit & 1 == 1))
        }
        RoundingMode::ZeroFiveUp => {
            low_digit == 0 || u32::from(low_digit) * 2 == radix
        }
    }
}

/// The overflow result mandated by the rounding mode: the largest finite
/// value when rounding toward zero, infinity otherwise.
fn overflow_result<N: RadixNumber>(negative: bool, ctx: &PrecisionContext) -> N {
    let toward_zero = match ctx.rounding() {
        RoundingMode::Down | RoundingMode::ZeroFiveUp => true,
        RoundingMode::Ceiling => negative,
        RoundingMode::Floor => !negative,
        _ => false,
    };
    let p = ctx.precision_u64();
    if toward_zero && p > 0 {
        largest_finite(negative, ctx)
    } else {
        infinity(negative)
    }
}

fn largest_finite<N: RadixNumber>(negative: bool, ctx: &PrecisionContext) -> N {
    let p = ctx.precision_u64();
    let m = N::radix_power(p) - BigInt::one();
    let e = ctx.e_max() + BigInt::one() - BigInt::from(p);
    finite(negative, m, e)
}

/// Round a finite value: the common back end of every operation.
///
/// `seed_last`/`seed_sticky` carry discarded-digit information the caller
/// already accumulated (an inexact division, a collapsed addend). `forced`
/// signals are reported unconditionally.
fn round_parts<N: RadixNumber>(
    negative: bool,
    mantissa: BigInt,
    exponent: BigInt,
    seed_last: u8,
    seed_sticky: u8,
    forced: Signals,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    let precision = ctx.precision_u64();
    let mut signals = forced;
    let mut acc = N::accumulator(mantissa, seed_last, seed_sticky);
    let mut exponent = exponent;

    // Shift to precision.
    if precision > 0 {
        let d = acc.digit_length();
        if d > precision {
            let shift = d - precision;
            acc.shift_right(shift);
            exponent = &exponent + &BigInt::from(shift);
        }
    }

    // Tininess is judged before the rounding increment; a subnormal result
    // rounds at the reduced precision that fits above `e_tiny`.
    let mut tiny = false;
    if ctx.has_exponent_range() && !acc.shifted().is_zero() {
        let d = acc.digit_length();
        let adj = &exponent + BigInt::from(d) - BigInt::one();
        if adj < *ctx.e_min() {
            tiny = true;
            let e_tiny = ctx.e_tiny();
            if exponent < e_tiny {
                let shift = big_to_u64_saturating(&(&e_tiny - &exponent));
                acc.shift_right(shift);
                exponent = e_tiny;
            }
        }
    }

    let discarded_any = acc.last_discarded() != 0
        || acc.sticky() != 0
        || !acc.discarded_count().is_zero();
    let discarded_nonzero = acc.last_discarded() != 0 || acc.sticky() != 0;
    if discarded_any {
        signals |= Signals::ROUNDED;
    }
    if discarded_nonzero {
        signals |= Signals::INEXACT;
    }

    // Apply the rounding mode, then let a carry out of the precision fall
    // back into range by dropping one more digit.
    let last = acc.last_discarded();
    let sticky = acc.sticky();
    let mut mantissa = acc.into_shifted();
    if discarded_nonzero {
        let low = N::low_digit(&mantissa);
        if round_up(ctx.rounding(), negative, last, sticky, low, N::RADIX) {
            mantissa = &mantissa + &BigInt::one();
            if precision > 0 && digits_of::<N>(&mantissa) > precision {
                let radix = BigInt::from(N::RADIX);
                mantissa = &mantissa / &radix;
                exponent = &exponent + &BigInt::one();
            }
        }
    }

    if tiny {
        signals |= Signals::SUBNORMAL;
        if signals.contains(Signals::INEXACT) {
            signals |= Signals::UNDERFLOW;
        }
    }

    if ctx.has_exponent_range() {
        if !mantissa.is_zero() {
            let adj =
                &exponent + BigInt::from(digits_of::<N>(&mantissa)) - BigInt::one();
            if adj > *ctx.e_max() {
                signals |= Signals::OVERFLOW | Signals::INEXACT | Signals::ROUNDED;
                let result = overflow_result(negative, ctx);
                ctx.report(signals)?;
                return Ok(result);
            }
            // Clamp normal exponents down to `e_max + 1 - precision` by
            // padding the mantissa with trailing zeros.
            if ctx.clamp_normal_exponents() && precision > 0 {
                let limit = ctx.e_max() + BigInt::one() - BigInt::from(precision);
                if exponent > limit {
                    let pad = big_to_u64_saturating(&(&exponent - &limit));
                    mantissa = &mantissa * &N::radix_power(pad);
                    exponent = limit;
                    signals |= Signals::CLAMPED;
                }
            }
        } else {
            // A zero's exponent is folded into the representable window.
            let limit = if ctx.clamp_normal_exponents() && precision > 0 {
                ctx.e_max() + BigInt::one() - BigInt::from(precision)
            } else {
                ctx.e_max().clone()
            };
            if exponent > limit {
                exponent = limit;
                signals |= Signals::CLAMPED;
            }
            let e_tiny = ctx.e_tiny();
            if exponent < e_tiny {
                exponent = e_tiny;
                signals |= Signals::CLAMPED;
            }
        }
    }

    ctx.report(signals)?;
    Ok(finite(negative, mantissa, exponent))
}

/// Round a value to the context's precision and range.
pub(crate) fn round_to_precision<N: RadixNumber>(
    x: &N,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    if let Some(r) = handle_nans(x, None, ctx) {
        return r;
    }
    if x.is_infinite() {
        return Ok(x.clone());
    }
    round_parts(
        x.is_negative(),
        x.mantissa().clone(),
        x.exponent().clone(),
        0,
        0,
        Signals::empty(),
        ctx,
    )
}

// ---------------------------------------------------------------------------
// Comparison

/// Compare absolute values of finite, non-zero operands.
fn compare_abs<N: RadixNumber>(a: &N, b: &N) -> Ordering {
    let adj_a = adjusted_exponent(a);
    let adj_b = adjusted_exponent(b);
    match adj_a.cmp(&adj_b) {
        Ordering::Equal => {}
        ord => return ord,
    }
    // Same adjusted exponent: align over a bounded digit distance.
    let delta = a.exponent() - b.exponent();
    if delta.is_zero() {
        a.mantissa().cmp(b.mantissa())
    } else if delta.is_negative() {
        let shift = big_to_u64_saturating(&-delta);
        a.mantissa().cmp(&(b.mantissa() * &N::radix_power(shift)))
    } else {
        let shift = big_to_u64_saturating(&delta);
        (a.mantissa() * &N::radix_power(shift)).cmp(b.mantissa())
    }
}

/// Numeric comparison of non-NaN values. Zeros compare equal regardless of
/// sign and exponent.
fn compare_values<N: RadixNumber>(a: &N, b: &N) -> Ordering {
    match (a.is_infinite(), b.is_infinite()) {
        (true, true) => {
            return match (a.is_negative(), b.is_negative()) {
                (x, y) if x == y => Ordering::Equal,
                (true, false) => Ordering::Less,
                _ => Ordering::Greater,
            }
        }
        (true, false) => {
            return if a.is_negative() {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (false, true) => {
            return if b.is_negative() {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (false, false) => {}
    }
    match (a.mantissa().is_zero(), b.mantissa().is_zero()) {
        (true, true) => return Ordering::Equal,
        (true, false) => {
            return if b.is_negative() {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (false, true) => {
            return if a.is_negative() {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (false, false) => {}
    }
    match (a.is_negative(), b.is_negative()) {
        (false, true) => Ordering::Greater,
        (true, false) => Ordering::Less,
        (false, false) => compare_abs(a, b),
        (true, true) => compare_abs(b, a),
    }
}

/// Numeric comparison; `None` when either operand is a NaN.
pub(crate) fn compare_to<N: RadixNumber>(a: &N, b: &N) -> Option<Ordering> {
    if a.is_nan() || b.is_nan() {
        return None;
    }
    Some(compare_values(a, b))
}

/// Comparison returning a number: −1, 0 or 1, or a NaN when an operand is
/// one. With `signaling`, any NaN operand raises `INVALID`.
pub(crate) fn compare_to_with_context<N: RadixNumber>(
    a: &N,
    b: &N,
    signaling: bool,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    if a.is_nan() || b.is_nan() {
        if signaling {
            return invalid_operation(ctx);
        }
        if let Some(r) = handle_nans(a, Some(b), ctx) {
            return r;
        }
    }
    Ok(match compare_values(a, b) {
        Ordering::Less => int_value(-1),
        Ordering::Equal => int_value(0),
        Ordering::Greater => int_value(1),
    })
}

// ---------------------------------------------------------------------------
// Addition and subtraction

fn signed_mantissa<N: RadixNumber>(negative: bool, m: BigInt) -> BigInt {
    if negative {
        -m
    } else {
        m
    }
}

/// Add two finite non-zero operands, or dispatch the special cases.
pub(crate) fn add<N: RadixNumber>(
    a: &N,
    b: &N,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    if let Some(r) = handle_nans(a, Some(b), ctx) {
        return r;
    }
    if a.is_infinite() || b.is_infinite() {
        if a.is_infinite() && b.is_infinite() && a.is_negative() != b.is_negative() {
            return invalid_operation(ctx);
        }
        let negative = if a.is_infinite() {
            a.is_negative()
        } else {
            b.is_negative()
        };
        return Ok(infinity(negative));
    }
    let (na, nb) = (a.is_negative(), b.is_negative());
    let (ma, mb) = (a.mantissa(), b.mantissa());
    let (ea, eb) = (a.exponent(), b.exponent());

    if ma.is_zero() && mb.is_zero() {
        // The sum of two zeros keeps a negative sign only when both are
        // negative, or under floor rounding.
        let negative = if na == nb {
            na
        } else {
            ctx.rounding() == RoundingMode::Floor
        };
        let exponent = if ea <= eb { ea.clone() } else { eb.clone() };
        return round_parts(negative, BigInt::zero(), exponent, 0, 0, Signals::empty(), ctx);
    }
    if ma.is_zero() || mb.is_zero() {
        // x + 0: the value is x, carried down toward the smaller exponent
        // as far as the precision allows.
        let (nx, mx, ex, eo) = if ma.is_zero() {
            (nb, mb, eb, ea)
        } else {
            (na, ma, ea, eb)
        };
        if eo < ex {
            let p = ctx.precision_u64();
            let dx = digits_of::<N>(mx);
            let delta = big_to_u64_saturating(&(ex - eo));
            let pad = if p == 0 {
                delta
            } else {
                delta.min(p.saturating_sub(dx))
            };
            let m = mx * &N::radix_power(pad);
            let e = ex - BigInt::from(pad);
            return round_parts(nx, m, e, 0, 0, Signals::empty(), ctx);
        }
        return round_parts(nx, mx.clone(), ex.clone(), 0, 0, Signals::empty(), ctx);
    }

    // Order by exponent; `hi` has the larger exponent.
    let (nh, mh, eh, nl, ml, el) = if ea >= eb {
        (na, ma, ea, nb, mb, eb)
    } else {
        (nb, mb, eb, na, ma, ea)
    };
    let delta = eh - el;
    let p = ctx.precision_u64();

    // When the gap dwarfs the precision, the smaller operand collapses to
    // a guard digit plus a sticky bit: correct rounding in O(precision)
    // instead of O(delta).
    if p > 0 && !delta.is_zero() {
        let dh = digits_of::<N>(mh);
        let dl = digits_of::<N>(ml);
        let guard = (p + 2).saturating_sub(dh).max(2);
        let scaled_e = eh - BigInt::from(guard);
        if el + BigInt::from(dl) < scaled_e {
            let scaled = mh * &N::radix_power(guard);
            if nh == nl {
                return round_parts(nh, scaled, scaled_e, 0, 1, Signals::empty(), ctx);
            }
            let m = &scaled - &BigInt::one();
            let top = (N::RADIX - 1) as u8;
            return round_parts(nh, m, scaled_e, top, 1, Signals::empty(), ctx);
        }
    }

    let shift = big_to_u64_saturating(&delta);
    let aligned = mh * &N::radix_power(shift);
    let sum = signed_mantissa::<N>(nh, aligned) + signed_mantissa::<N>(nl, ml.clone());
    if sum.is_zero() {
        // Exact cancellation: positive zero, except under floor rounding.
        let negative = ctx.rounding() == RoundingMode::Floor;
        return round_parts(negative, BigInt::zero(), el.clone(), 0, 0, Signals::empty(), ctx);
    }
    let negative = sum.is_negative();
    round_parts(negative, sum.abs(), el.clone(), 0, 0, Signals::empty(), ctx)
}

/// Flip the sign flag without rounding.
fn negate_raw<N: RadixNumber>(x: &N) -> N {
    N::from_parts(
        x.mantissa().clone(),
        x.exponent().clone(),
        x.flags() ^ NumberFlags::NEGATIVE,
    )
}

pub(crate) fn subtract<N: RadixNumber>(
    a: &N,
    b: &N,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    add(a, &negate_raw(b), ctx)
}

// ---------------------------------------------------------------------------
// Multiplication

pub(crate) fn multiply<N: RadixNumber>(
    a: &N,
    b: &N,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    if let Some(r) = handle_nans(a, Some(b), ctx) {
        return r;
    }
    let negative = a.is_negative() != b.is_negative();
    if a.is_infinite() || b.is_infinite() {
        if a.is_zero_value() || b.is_zero_value() {
            return invalid_operation(ctx);
        }
        return Ok(infinity(negative));
    }
    let m = a.mantissa() * b.mantissa();
    let e = a.exponent() + b.exponent();
    round_parts(negative, m, e, 0, 0, Signals::empty(), ctx)
}

/// `x * m + a` with the product computed exactly.
pub(crate) fn multiply_and_add<N: RadixNumber>(
    x: &N,
    m: &N,
    a: &N,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    let mut exact = PrecisionContext::unlimited().with_blank_flags();
    let product = multiply(x, m, &mut exact)?;
    ctx.report(exact.flags())?;
    add(&product, a, ctx)
}

// ---------------------------------------------------------------------------
// Division

/// Remove trailing zero digits, raising the exponent toward (never past)
/// the ideal exponent.
fn strip_toward_ideal<N: RadixNumber>(m: &mut BigInt, e: &mut BigInt, ideal: &BigInt) {
    if m.is_zero() {
        return;
    }
    let radix = BigInt::from(N::RADIX);
    while &*e < ideal && N::low_digit(m) == 0 {
        *m = &*m / &radix;
        *e = &*e + &BigInt::one();
    }
}

/// Shared special-case handling for the division family. Returns `None`
/// when both operands are finite and the divisor is non-zero.
fn divide_specials<N: RadixNumber>(
    a: &N,
    b: &N,
    ctx: &mut PrecisionContext,
) -> Option<OpResult<N>> {
    if let Some(r) = handle_nans(a, Some(b), ctx) {
        return Some(r);
    }
    let negative = a.is_negative() != b.is_negative();
    if a.is_infinite() {
        if b.is_infinite() {
            return Some(invalid_operation(ctx));
        }
        return Some(Ok(infinity(negative)));
    }
    if b.is_infinite() {
        return Some(Ok(zero(negative, BigInt::zero())));
    }
    if b.mantissa().is_zero() {
        if a.mantissa().is_zero() {
            return Some(invalid_operation(ctx));
        }
        return Some(match ctx.report(Signals::DIVIDE_BY_ZERO) {
            Ok(()) => Ok(infinity(negative)),
            Err(e) => Err(e),
        });
    }
    None
}

/// Division rounded to the context precision.
///
/// With unlimited precision the quotient must terminate; a non-terminating
/// expansion is reported as [`ArithmeticError::PrecisionRequired`].
pub(crate) fn divide<N: RadixNumber>(
    a: &N,
    b: &N,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    if let Some(r) = divide_specials(a, b, ctx) {
        return r;
    }
    let negative = a.is_negative() != b.is_negative();
    let ideal = a.exponent() - b.exponent();
    if a.mantissa().is_zero() {
        return round_parts(negative, BigInt::zero(), ideal, 0, 0, Signals::empty(), ctx);
    }
    let p = ctx.precision_u64();
    if p == 0 {
        return divide_exact(a, b, negative, ideal, ctx);
    }
    let da = digits_of::<N>(a.mantissa());
    let db = digits_of::<N>(b.mantissa());
    let wanted = p + 1;
    let shift = (db + wanted).saturating_sub(da);
    let num = a.mantissa() * &N::radix_power(shift);
    let (q, r) = num
        .div_rem(b.mantissa())
        .map_err(|_| ArithmeticError::Unsupported("divide"))?;
    let mut exp = &ideal - &BigInt::from(shift);
    if r.is_zero() {
        let mut q = q;
        strip_toward_ideal::<N>(&mut q, &mut exp, &ideal);
        return round_parts(negative, q, exp, 0, 0, Signals::empty(), ctx);
    }
    round_parts(negative, q, exp, 0, 1, Signals::empty(), ctx)
}

/// Exact division for unlimited precision: strip the radix's factors out of
/// the reduced divisor; anything left means the expansion does not end.
fn divide_exact<N: RadixNumber>(
    a: &N,
    b: &N,
    negative: bool,
    ideal: BigInt,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    let g = a.mantissa().gcd(b.mantissa());
    let reduced = (b.mantissa().div_rem(&g))
        .map_err(|_| ArithmeticError::Unsupported("divide"))?
        .0;
    let two = BigInt::from(2u32);
    let five = BigInt::from(5u32);
    let mut rest = reduced;
    let mut twos: u64 = 0;
    let mut fives: u64 = 0;
    while rest.is_even() && !rest.is_zero() {
        rest = &rest / &two;
        twos += 1;
    }
    if N::RADIX == 10 {
        loop {
            let (q, r) = rest.div_rem(&five).unwrap_or((BigInt::zero(), BigInt::one()));
            if !r.is_zero() {
                break;
            }
            rest = q;
            fives += 1;
        }
    }
    if rest != BigInt::one() {
        return Err(ArithmeticError::PrecisionRequired("divide"));
    }
    let shift = twos.max(fives);
    let num = a.mantissa() * &N::radix_power(shift);
    let (q, _) = num
        .div_rem(b.mantissa())
        .map_err(|_| ArithmeticError::Unsupported("divide"))?;
    let mut q = q;
    let mut exp = &ideal - &BigInt::from(shift);
    strip_toward_ideal::<N>(&mut q, &mut exp, &ideal);
    round_parts(negative, q, exp, 0, 0, Signals::empty(), ctx)
}

/// Division rounded to a caller-fixed exponent.
pub(crate) fn divide_to_exponent<N: RadixNumber>(
    a: &N,
    b: &N,
    desired: &BigInt,
    rounding: RoundingMode,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    if let Some(r) = divide_specials(a, b, ctx) {
        return r;
    }
    if ctx.has_exponent_range()
        && (desired > ctx.e_max() || *desired < ctx.e_tiny())
    {
        return invalid_operation(ctx);
    }
    let negative = a.is_negative() != b.is_negative();
    if a.mantissa().is_zero() {
        return Ok(zero(negative, desired.clone()));
    }
    let shift = a.exponent() - b.exponent() - desired;
    let (num, den) = if shift.is_negative() {
        let s = big_to_u64_saturating(&-&shift);
        (a.mantissa().clone(), b.mantissa() * &N::radix_power(s))
    } else {
        let s = big_to_u64_saturating(&shift);
        (a.mantissa() * &N::radix_power(s), b.mantissa().clone())
    };
    let (mut q, r) = num
        .div_rem(&den)
        .map_err(|_| ArithmeticError::Unsupported("divide"))?;
    let mut signals = Signals::empty();
    if !r.is_zero() {
        signals |= Signals::INEXACT | Signals::ROUNDED;
        let scaled = &r * &BigInt::from(N::RADIX);
        let (digit, rest) = scaled
            .div_rem(&den)
            .map_err(|_| ArithmeticError::Unsupported("divide"))?;
        let last = i64::try_from(&digit).unwrap_or(0) as u8;
        let sticky = u8::from(!rest.is_zero());
        let low = N::low_digit(&q);
        if round_up(rounding, negative, last, sticky, low, N::RADIX) {
            q = &q + &BigInt::one();
        }
    }
    let p = ctx.precision_u64();
    if p > 0 && digits_of::<N>(&q) > p {
        return invalid_operation(ctx);
    }
    ctx.report(signals)?;
    Ok(finite(negative, q, desired.clone()))
}

/// Integer quotient truncated toward zero; shared by both integer-divide
/// flavors and the remainder family. No inexactness is signalled.
fn integer_quotient<N: RadixNumber>(
    a: &N,
    b: &N,
    ctx: &mut PrecisionContext,
) -> Result<(bool, BigInt), ArithmeticError> {
    let negative = a.is_negative() != b.is_negative();
    let shift = a.exponent() - b.exponent();
    let (num, den) = if shift.is_negative() {
        let s = big_to_u64_saturating(&-&shift);
        (a.mantissa().clone(), b.mantissa() * &N::radix_power(s))
    } else {
        let s = big_to_u64_saturating(&shift);
        (a.mantissa() * &N::radix_power(s), b.mantissa().clone())
    };
    let (q, _) = num
        .div_rem(&den)
        .map_err(|_| ArithmeticError::Unsupported("divide"))?;
    let p = ctx.precision_u64();
    if p > 0 && digits_of::<N>(&q) > p {
        return Err(ArithmeticError::Unsupported("integer quotient overflow"));
    }
    Ok((negative, q))
}

/// Integer division; the result exponent is drawn toward
/// `max(0, exp(a) - exp(b))` by removing trailing zeros.
pub(crate) fn divide_to_integer_natural_scale<N: RadixNumber>(
    a: &N,
    b: &N,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    if let Some(r) = divide_specials(a, b, ctx) {
        return r;
    }
    let mut preferred = a.exponent() - b.exponent();
    if preferred.is_negative() {
        preferred = BigInt::zero();
    }
    if a.mantissa().is_zero() {
        let negative = a.is_negative() != b.is_negative();
        return Ok(zero(negative, preferred));
    }
    let (negative, mut q) = match integer_quotient(a, b, ctx) {
        Ok(v) => v,
        Err(ArithmeticError::Unsupported(_)) => return invalid_operation(ctx),
        Err(e) => return Err(e),
    };
    let mut exp = BigInt::zero();
    strip_toward_ideal::<N>(&mut q, &mut exp, &preferred);
    if q.is_zero() {
        exp = preferred;
    }
    round_parts(negative, q, exp, 0, 0, Signals::empty(), ctx)
}

/// Integer division with the result exponent pinned to zero.
pub(crate) fn divide_to_integer_zero_scale<N: RadixNumber>(
    a: &N,
    b: &N,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    if let Some(r) = divide_specials(a, b, ctx) {
        return r;
    }
    let negative = a.is_negative() != b.is_negative();
    if a.mantissa().is_zero() {
        return Ok(zero(negative, BigInt::zero()));
    }
    let (negative, q) = match integer_quotient(a, b, ctx) {
        Ok(v) => v,
        Err(ArithmeticError::Unsupported(_)) => return invalid_operation(ctx),
        Err(e) => return Err(e),
    };
    Ok(finite(negative, q, BigInt::zero()))
}

// ---------------------------------------------------------------------------
// Remainders

/// `a - b * n` for an integral `n`; the remainder keeps the dividend's sign.
fn remainder_from_quotient<N: RadixNumber>(
    a: &N,
    b: &N,
    quotient: &N,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    let mut exact = PrecisionContext::unlimited();
    let product = multiply(b, quotient, &mut exact)?;
    let r = subtract(a, &product, &mut exact)?;
    if r.is_zero_value() {
        // Exact cancellation takes the dividend's sign.
        let e = if a.exponent() <= b.exponent() {
            a.exponent().clone()
        } else {
            b.exponent().clone()
        };
        return round_to_precision(&zero::<N>(a.is_negative(), e), ctx);
    }
    round_to_precision(&r, ctx)
}

pub(crate) fn remainder<N: RadixNumber>(
    a: &N,
    b: &N,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    if let Some(r) = handle_nans(a, Some(b), ctx) {
        return r;
    }
    if a.is_infinite() || b.mantissa().is_zero() && !b.is_infinite() {
        return invalid_operation(ctx);
    }
    if b.is_infinite() {
        return round_to_precision(a, ctx);
    }
    if a.mantissa().is_zero() {
        return round_to_precision(a, ctx);
    }
    let mut exact = PrecisionContext::unlimited();
    let q = divide_to_integer_zero_scale(a, b, &mut exact)?;
    if q.is_nan() {
        return invalid_operation(ctx);
    }
    remainder_from_quotient(a, b, &q, ctx)
}

/// Remainder from the quotient rounded half-even to the nearest integer,
/// giving `|result| <= |b| / 2`.
pub(crate) fn remainder_near<N: RadixNumber>(
    a: &N,
    b: &N,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    if let Some(r) = handle_nans(a, Some(b), ctx) {
        return r;
    }
    if a.is_infinite() || b.mantissa().is_zero() && !b.is_infinite() {
        return invalid_operation(ctx);
    }
    if b.is_infinite() {
        return round_to_precision(a, ctx);
    }
    if a.mantissa().is_zero() {
        return round_to_precision(a, ctx);
    }
    let mut exact = PrecisionContext::unlimited();
    let q = divide_to_exponent(a, b, &BigInt::zero(), RoundingMode::HalfEven, &mut exact)?;
    if q.is_nan() {
        return invalid_operation(ctx);
    }
    let p = ctx.precision_u64();
    if p > 0 && digits_of::<N>(q.mantissa()) > p {
        return invalid_operation(ctx);
    }
    remainder_from_quotient(a, b, &q, ctx)
}

// ---------------------------------------------------------------------------
// Quantize and the round-to-exponent family

fn rescale<N: RadixNumber>(
    a: &N,
    target: &BigInt,
    ctx: &mut PrecisionContext,
    suppress_rounded: bool,
) -> OpResult<N> {
    if ctx.has_exponent_range()
        && (target > ctx.e_max() || *target < ctx.e_tiny())
    {
        return invalid_operation(ctx);
    }
    let negative = a.is_negative();
    let p = ctx.precision_u64();
    if a.mantissa().is_zero() {
        // The one place a zero keeps the target exponent instead of being
        // renormalised.
        return Ok(zero(negative, target.clone()));
    }
    let shift = a.exponent() - target;
    if !shift.is_negative() {
        let s = big_to_u64_saturating(&shift);
        if p > 0 && digits_of::<N>(a.mantissa()).saturating_add(s) > p {
            return invalid_operation(ctx);
        }
        let m = a.mantissa() * &N::radix_power(s);
        return Ok(finite(negative, m, target.clone()));
    }
    let s = big_to_u64_saturating(&-&shift);
    let mut acc = N::accumulator(a.mantissa().clone(), 0, 0);
    acc.shift_right(s);
    let mut signals = Signals::ROUNDED;
    let inexact = acc.last_discarded() != 0 || acc.sticky() != 0;
    if inexact {
        signals |= Signals::INEXACT;
    }
    let last = acc.last_discarded();
    let sticky = acc.sticky();
    let mut m = acc.into_shifted();
    if inexact {
        let low = N::low_digit(&m);
        if round_up(ctx.rounding(), negative, last, sticky, low, N::RADIX) {
            m = &m + &BigInt::one();
        }
    }
    if p > 0 && digits_of::<N>(&m) > p {
        return invalid_operation(ctx);
    }
    if suppress_rounded {
        signals -= Signals::ROUNDED;
    }
    ctx.report(signals)?;
    Ok(finite(negative, m, target.clone()))
}

/// Rescale `a` to the exponent of `b`.
pub(crate) fn quantize<N: RadixNumber>(
    a: &N,
    b: &N,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    if let Some(r) = handle_nans(a, Some(b), ctx) {
        return r;
    }
    match (a.is_infinite(), b.is_infinite()) {
        (true, true) => return Ok(a.clone()),
        (false, false) => {}
        _ => return invalid_operation(ctx),
    }
    rescale(a, &b.exponent().clone(), ctx, false)
}

pub(crate) fn round_to_exponent_exact<N: RadixNumber>(
    a: &N,
    target: &BigInt,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    if let Some(r) = handle_nans(a, None, ctx) {
        return r;
    }
    if a.is_infinite() {
        return Ok(a.clone());
    }
    rescale(a, target, ctx, false)
}

/// Like the exact variant, but values already at or above the target
/// exponent pass through unrescaled.
pub(crate) fn round_to_exponent_simple<N: RadixNumber>(
    a: &N,
    target: &BigInt,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    if let Some(r) = handle_nans(a, None, ctx) {
        return r;
    }
    if a.is_infinite() {
        return Ok(a.clone());
    }
    if a.mantissa().is_zero() || a.exponent() >= target {
        return round_to_precision(a, ctx);
    }
    rescale(a, target, ctx, false)
}

/// Like the exact variant with the `ROUNDED` signal suppressed.
pub(crate) fn round_to_exponent_no_rounded_flag<N: RadixNumber>(
    a: &N,
    target: &BigInt,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    if let Some(r) = handle_nans(a, None, ctx) {
        return r;
    }
    if a.is_infinite() {
        return Ok(a.clone());
    }
    rescale(a, target, ctx, true)
}

/// Remove trailing zeros after rounding to precision. A zero result is
/// normalised to exponent 0.
pub(crate) fn reduce<N: RadixNumber>(a: &N, ctx: &mut PrecisionContext) -> OpResult<N> {
    if let Some(r) = handle_nans(a, None, ctx) {
        return r;
    }
    if a.is_infinite() {
        return Ok(a.clone());
    }
    let rounded = round_to_precision(a, ctx)?;
    if rounded.is_nan() || rounded.is_infinite() {
        return Ok(rounded);
    }
    let negative = rounded.is_negative();
    if rounded.mantissa().is_zero() {
        return Ok(zero(negative, BigInt::zero()));
    }
    let mut m = rounded.mantissa().clone();
    let mut e = rounded.exponent().clone();
    let radix = BigInt::from(N::RADIX);
    while !m.is_zero() && N::low_digit(&m) == 0 {
        m = &m / &radix;
        e = &e + &BigInt::one();
    }
    Ok(finite(negative, m, e))
}

// ---------------------------------------------------------------------------
// Plus, abs, negate, min/max

pub(crate) fn plus<N: RadixNumber>(a: &N, ctx: &mut PrecisionContext) -> OpResult<N> {
    round_to_precision(a, ctx)
}

pub(crate) fn abs<N: RadixNumber>(a: &N, ctx: &mut PrecisionContext) -> OpResult<N> {
    if let Some(r) = handle_nans(a, None, ctx) {
        return r;
    }
    let cleared = N::from_parts(
        a.mantissa().clone(),
        a.exponent().clone(),
        a.flags() - NumberFlags::NEGATIVE,
    );
    if cleared.is_infinite() {
        return Ok(cleared);
    }
    round_to_precision(&cleared, ctx)
}

pub(crate) fn negate<N: RadixNumber>(a: &N, ctx: &mut PrecisionContext) -> OpResult<N> {
    if let Some(r) = handle_nans(a, None, ctx) {
        return r;
    }
    let flipped = negate_raw(a);
    if flipped.is_infinite() {
        return Ok(flipped);
    }
    round_to_precision(&flipped, ctx)
}

/// Which extremum an order-statistic operation selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Extremum {
    Min,
    Max,
    MinMagnitude,
    MaxMagnitude,
}

/// Min/max with IEEE NaN semantics: a quiet NaN is missing data and yields
/// the other operand; a signaling NaN is an error.
pub(crate) fn min_max<N: RadixNumber>(
    a: &N,
    b: &N,
    which: Extremum,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    if a.is_signaling_nan() || b.is_signaling_nan() {
        if let Some(r) = handle_nans(a, Some(b), ctx) {
            return r;
        }
    }
    match (a.is_nan(), b.is_nan()) {
        (true, true) => return nan_result(a, ctx),
        (true, false) => return round_to_precision(b, ctx),
        (false, true) => return round_to_precision(a, ctx),
        (false, false) => {}
    }
    let magnitude = matches!(which, Extremum::MinMagnitude | Extremum::MaxMagnitude);
    let want_greater = matches!(which, Extremum::Max | Extremum::MaxMagnitude);
    if magnitude {
        let (aa, ab) = (abs_raw(a), abs_raw(b));
        match compare_values(&aa, &ab) {
            Ordering::Less => {
                return round_to_precision(if want_greater { b } else { a }, ctx)
            }
            Ordering::Greater => {
                return round_to_precision(if want_greater { a } else { b }, ctx)
            }
            Ordering::Equal => {}
        }
    }
    let pick_a = match compare_values(a, b) {
        Ordering::Greater => want_greater,
        Ordering::Less => !want_greater,
        Ordering::Equal => {
            // Tie-break on sign, then exponent, so the choice is
            // deterministic for distinct representations of one value.
            if a.is_negative() != b.is_negative() {
                a.is_negative() != want_greater
            } else if a.is_negative() {
                (a.exponent() <= b.exponent()) == want_greater
            } else {
                (a.exponent() >= b.exponent()) == want_greater
            }
        }
    };
    round_to_precision(if pick_a { a } else { b }, ctx)
}

fn abs_raw<N: RadixNumber>(a: &N) -> N {
    N::from_parts(
        a.mantissa().clone(),
        a.exponent().clone(),
        a.flags() - NumberFlags::NEGATIVE,
    )
}

// ---------------------------------------------------------------------------
// Neighbour values

fn ensure_next_context(
    ctx: &PrecisionContext,
    name: &'static str,
) -> Result<(), ArithmeticError> {
    if ctx.precision_u64() == 0 {
        return Err(ArithmeticError::PrecisionRequired(name));
    }
    if !ctx.has_exponent_range() {
        return Err(ArithmeticError::Unsupported(
            "neighbour operations require an exponent range",
        ));
    }
    Ok(())
}

fn directed_step<N: RadixNumber>(
    a: &N,
    min_exp_hint: &BigInt,
    upward: bool,
    ctx: &PrecisionContext,
) -> OpResult<N> {
    let step_exp = min_exp_hint - BigInt::from(2u32);
    let eps = finite::<N>(!upward, BigInt::one(), step_exp);
    let rounding = if upward {
        RoundingMode::Ceiling
    } else {
        RoundingMode::Floor
    };
    let mut child = ctx
        .clone()
        .with_rounding(rounding)
        .with_traps(Signals::empty())
        .with_blank_flags();
    add(a, &eps, &mut child)
}

pub(crate) fn next_plus<N: RadixNumber>(a: &N, ctx: &mut PrecisionContext) -> OpResult<N> {
    if let Some(r) = handle_nans(a, None, ctx) {
        return r;
    }
    ensure_next_context(ctx, "next-plus")?;
    if a.is_infinite() {
        return if a.is_negative() {
            Ok(largest_finite(true, ctx))
        } else {
            Ok(infinity(false))
        };
    }
    let e_tiny = ctx.e_tiny();
    let hint = if a.exponent() < &e_tiny {
        a.exponent().clone()
    } else {
        e_tiny
    };
    directed_step(a, &hint, true, ctx)
}

pub(crate) fn next_minus<N: RadixNumber>(a: &N, ctx: &mut PrecisionContext) -> OpResult<N> {
    if let Some(r) = handle_nans(a, None, ctx) {
        return r;
    }
    ensure_next_context(ctx, "next-minus")?;
    if a.is_infinite() {
        return if a.is_negative() {
            Ok(infinity(true))
        } else {
            Ok(largest_finite(false, ctx))
        };
    }
    let e_tiny = ctx.e_tiny();
    let hint = if a.exponent() < &e_tiny {
        a.exponent().clone()
    } else {
        e_tiny
    };
    directed_step(a, &hint, false, ctx)
}

pub(crate) fn next_toward<N: RadixNumber>(
    a: &N,
    b: &N,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    if let Some(r) = handle_nans(a, Some(b), ctx) {
        return r;
    }
    ensure_next_context(ctx, "next-toward")?;
    match compare_values(a, b) {
        Ordering::Equal => {
            // Arrived: the result is the target's representation of the
            // shared value, unrounded flags-wise.
            let mut child = ctx.clone().with_blank_flags();
            round_to_precision(b, &mut child)
        }
        Ordering::Less => {
            if a.is_infinite() {
                return Ok(largest_finite(true, ctx));
            }
            let mut hint = ctx.e_tiny();
            if a.is_finite() && a.exponent() < &hint {
                hint = a.exponent().clone();
            }
            if b.is_finite() && b.exponent() < &hint {
                hint = b.exponent().clone();
            }
            directed_step(a, &hint, true, ctx)
        }
        Ordering::Greater => {
            if a.is_infinite() {
                return Ok(largest_finite(false, ctx));
            }
            let mut hint = ctx.e_tiny();
            if a.is_finite() && a.exponent() < &hint {
                hint = a.exponent().clone();
            }
            if b.is_finite() && b.exponent() < &hint {
                hint = b.exponent().clone();
            }
            directed_step(a, &hint, false, ctx)
        }
    }
}

// ---------------------------------------------------------------------------
// Transcendental operations

/// Halve a positive finite value exactly: in decimal multiply the mantissa
/// by 5 and drop the exponent; in binary just drop the exponent.
fn halve_exact<N: RadixNumber>(x: &N) -> N {
    let e = x.exponent() - BigInt::one();
    let m = if N::RADIX == 10 {
        x.mantissa() * &BigInt::from(5u32)
    } else {
        x.mantissa().clone()
    };
    finite(x.is_negative(), m, e)
}

/// Magnitude guard for the exponential: inputs at or above this adjusted
/// exponent overflow or underflow any realistic exponent range.
fn exp_magnitude_limit<N: RadixNumber>() -> i64 {
    if N::RADIX == 10 {
        15
    } else {
        50
    }
}

fn forced_overflow<N: RadixNumber>(
    negative: bool,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    let e = ctx.e_max() + BigInt::one();
    round_parts(
        negative,
        BigInt::one(),
        e,
        0,
        1,
        Signals::INEXACT | Signals::ROUNDED,
        ctx,
    )
}

fn forced_underflow<N: RadixNumber>(
    negative: bool,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    let e = ctx.e_tiny() - BigInt::from(2u32);
    round_parts(
        negative,
        BigInt::one(),
        e,
        0,
        1,
        Signals::INEXACT | Signals::ROUNDED,
        ctx,
    )
}

/// The exponential function by argument halving, a Taylor series, and
/// repeated squaring.
pub(crate) fn exp<N: RadixNumber>(a: &N, ctx: &mut PrecisionContext) -> OpResult<N> {
    if let Some(r) = handle_nans(a, None, ctx) {
        return r;
    }
    if a.is_infinite() {
        return if a.is_negative() {
            Ok(zero(false, BigInt::zero()))
        } else {
            Ok(infinity(false))
        };
    }
    if a.mantissa().is_zero() {
        return round_to_precision(&one::<N>(), ctx);
    }
    let p = ctx.precision_u64();
    if p == 0 {
        return Err(ArithmeticError::PrecisionRequired("exp"));
    }
    if adjusted_exponent_i64(a) > exp_magnitude_limit::<N>() {
        if !ctx.has_exponent_range() {
            return Err(ArithmeticError::Unsupported(
                "exp of a very large magnitude needs an exponent range",
            ));
        }
        return if a.is_negative() {
            forced_underflow(false, ctx)
        } else {
            forced_overflow(false, ctx)
        };
    }

    // Halve the argument until it is at most 1/2, run the series there,
    // then square the sum back up.
    let negative_arg = a.is_negative();
    let mut t = abs_raw(a);
    let mut halvings: u64 = 0;
    let half_val = half::<N>();
    while compare_values(&t, &half_val) == Ordering::Greater {
        t = halve_exact(&t);
        halvings += 1;
    }
    let wp = p + halvings + 10;
    let mut work = PrecisionContext::for_precision(wp);
    let threshold = -(wp as i64 + 2);

    let mut sum = one::<N>();
    let mut term = one::<N>();
    let mut n: i64 = 1;
    loop {
        term = divide(&multiply(&term, &t, &mut work)?, &int_value(n), &mut work)?;
        if term.is_zero_value() {
            break;
        }
        sum = add(&sum, &term, &mut work)?;
        if adjusted_exponent_i64(&term) < threshold {
            break;
        }
        n += 1;
    }
    for _ in 0..halvings {
        sum = multiply(&sum, &sum, &mut work)?;
    }
    if negative_arg {
        sum = divide(&one::<N>(), &sum, &mut work)?;
    }
    round_parts(
        false,
        sum.mantissa().clone(),
        sum.exponent().clone(),
        0,
        0,
        Signals::INEXACT | Signals::ROUNDED,
        ctx,
    )
}

/// The natural logarithm by square-root reduction toward 1 and the
/// inverse-hyperbolic-tangent series.
pub(crate) fn ln<N: RadixNumber>(a: &N, ctx: &mut PrecisionContext) -> OpResult<N> {
    if let Some(r) = handle_nans(a, None, ctx) {
        return r;
    }
    if a.mantissa().is_zero() && a.is_finite() {
        ctx.report(Signals::DIVIDE_BY_ZERO)?;
        return Ok(infinity(true));
    }
    if a.is_negative() {
        return invalid_operation(ctx);
    }
    if a.is_infinite() {
        return Ok(infinity(false));
    }
    if compare_values(a, &one::<N>()) == Ordering::Equal {
        return round_to_precision(&zero::<N>(false, BigInt::zero()), ctx);
    }
    let p = ctx.precision_u64();
    if p == 0 {
        return Err(ArithmeticError::PrecisionRequired("ln"));
    }

    // Pull the argument into (1/2, 2) by repeated square roots; each one
    // halves the logarithm, undone by doubling the series result.
    let half_val = half::<N>();
    let two = int_value::<N>(2);
    let mut s = a.clone();
    let mut roots: u64 = 0;
    loop {
        let above = compare_values(&s, &half_val) == Ordering::Greater;
        let below = compare_values(&s, &two) == Ordering::Less;
        if above && below {
            break;
        }
        let mut work = PrecisionContext::for_precision(p + roots + 15);
        s = square_root(&s, &mut work)?;
        roots += 1;
    }
    let wp = p + roots + 10;
    let mut work = PrecisionContext::for_precision(wp);
    let threshold = -(wp as i64 + 2);

    let num = subtract(&s, &one::<N>(), &mut work)?;
    let den = add(&s, &one::<N>(), &mut work)?;
    let z = divide(&num, &den, &mut work)?;
    let zsq = multiply(&z, &z, &mut work)?;
    let mut sum = z.clone();
    let mut term = z;
    let mut n: i64 = 1;
    loop {
        term = multiply(&term, &zsq, &mut work)?;
        let contrib = divide(&term, &int_value(2 * n + 1), &mut work)?;
        if contrib.is_zero_value() {
            break;
        }
        sum = add(&sum, &contrib, &mut work)?;
        if adjusted_exponent_i64(&contrib) < threshold {
            break;
        }
        n += 1;
    }
    let mut result = multiply(&sum, &int_value(2), &mut work)?;
    for _ in 0..roots {
        result = add(&result, &result, &mut work)?;
    }
    round_parts(
        result.is_negative(),
        result.mantissa().clone(),
        result.exponent().clone(),
        0,
        0,
        Signals::INEXACT | Signals::ROUNDED,
        ctx,
    )
}

/// Base-10 logarithm: exact for powers of ten, otherwise `ln x / ln 10`.
pub(crate) fn log10<N: RadixNumber>(a: &N, ctx: &mut PrecisionContext) -> OpResult<N> {
    if let Some(r) = handle_nans(a, None, ctx) {
        return r;
    }
    if a.mantissa().is_zero() && a.is_finite() {
        ctx.report(Signals::DIVIDE_BY_ZERO)?;
        return Ok(infinity(true));
    }
    if a.is_negative() {
        return invalid_operation(ctx);
    }
    if a.is_infinite() {
        return Ok(infinity(false));
    }
    if N::RADIX == 10 {
        // 10^k inputs have an exact integer logarithm.
        let d = digits_of::<N>(a.mantissa());
        if *a.mantissa() == N::radix_power(d - 1) {
            let k = adjusted_exponent(a);
            let result = finite::<N>(k.is_negative(), k.abs(), BigInt::zero());
            return round_to_precision(&result, ctx);
        }
    } else if compare_values(a, &one::<N>()) == Ordering::Equal {
        return round_to_precision(&zero::<N>(false, BigInt::zero()), ctx);
    }
    let p = ctx.precision_u64();
    if p == 0 {
        return Err(ArithmeticError::PrecisionRequired("log10"));
    }
    let mut work = PrecisionContext::for_precision(p + 12);
    let num = ln(a, &mut work)?;
    let den = ln(&int_value::<N>(10), &mut work)?;
    let quotient = divide(&num, &den, &mut work)?;
    round_parts(
        quotient.is_negative(),
        quotient.mantissa().clone(),
        quotient.exponent().clone(),
        0,
        0,
        Signals::INEXACT | Signals::ROUNDED,
        ctx,
    )
}

/// π by Machin's formula, `16·atan(1/5) − 4·atan(1/239)`.
pub(crate) fn pi<N: RadixNumber>(ctx: &mut PrecisionContext) -> OpResult<N> {
    let p = ctx.precision_u64();
    if p == 0 {
        return Err(ArithmeticError::PrecisionRequired("pi"));
    }
    let wp = p + 10;
    let mut work = PrecisionContext::for_precision(wp);
    let threshold = -(wp as i64 + 2);

    let mut atan_inv = |den: i64| -> OpResult<N> {
        let x = divide(&one::<N>(), &int_value(den), &mut work)?;
        let xsq = multiply(&x, &x, &mut work)?;
        let mut sum = x.clone();
        let mut power = x;
        let mut n: i64 = 1;
        loop {
            power = multiply(&power, &xsq, &mut work)?;
            let contrib = divide(&power, &int_value(2 * n + 1), &mut work)?;
            if contrib.is_zero_value() {
                break;
            }
            sum = if n % 2 == 1 {
                subtract(&sum, &contrib, &mut work)?
            } else {
                add(&sum, &contrib, &mut work)?
            };
            if adjusted_exponent_i64(&contrib) < threshold {
                break;
            }
            n += 1;
        }
        Ok(sum)
    };

    let a5 = atan_inv(5)?;
    let a239 = atan_inv(239)?;
    let mut work = PrecisionContext::for_precision(wp);
    let sixteen = multiply(&int_value::<N>(16), &a5, &mut work)?;
    let four = multiply(&int_value::<N>(4), &a239, &mut work)?;
    let result = subtract(&sixteen, &four, &mut work)?;
    round_parts(
        false,
        result.mantissa().clone(),
        result.exponent().clone(),
        0,
        0,
        Signals::INEXACT | Signals::ROUNDED,
        ctx,
    )
}

/// The integer value of `y`, when `y` is integral.
fn integer_exponent<N: RadixNumber>(y: &N) -> Option<BigInt> {
    if !y.is_finite() {
        return None;
    }
    if y.mantissa().is_zero() {
        return Some(BigInt::zero());
    }
    let e = y.exponent();
    if !e.is_negative() {
        let s = big_to_u64_saturating(e);
        // Cap the magnitude: larger integer exponents go through exp/ln.
        if digits_of::<N>(y.mantissa()).saturating_add(s) > 1300 {
            return None;
        }
        let m = y.mantissa() * &N::radix_power(s);
        return Some(signed_mantissa::<N>(y.is_negative(), m));
    }
    let s = big_to_u64_saturating(&-e);
    if s >= digits_of::<N>(y.mantissa()) {
        return None;
    }
    let (q, r) = y.mantissa().div_rem(&N::radix_power(s)).ok()?;
    if !r.is_zero() {
        return None;
    }
    Some(signed_mantissa::<N>(y.is_negative(), q))
}

/// `x^y`: square-and-multiply for integer exponents, `exp(y ln x)`
/// otherwise.
pub(crate) fn power<N: RadixNumber>(
    x: &N,
    y: &N,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    if let Some(r) = handle_nans(x, Some(y), ctx) {
        return r;
    }
    let yi = integer_exponent(y);
    if y.is_finite() && y.mantissa().is_zero() {
        if x.is_zero_value() {
            return invalid_operation(ctx);
        }
        return round_to_precision(&one::<N>(), ctx);
    }
    if y.is_infinite() {
        if x.is_zero_value() {
            return if y.is_negative() {
                Ok(infinity(false))
            } else {
                Ok(zero(false, BigInt::zero()))
            };
        }
        if x.is_infinite() {
            return if y.is_negative() {
                Ok(zero(false, BigInt::zero()))
            } else {
                Ok(infinity(false))
            };
        }
        let mag = compare_values(&abs_raw(x), &one::<N>());
        return match (mag, y.is_negative()) {
            (Ordering::Equal, _) => invalid_operation(ctx),
            (Ordering::Less, false) | (Ordering::Greater, true) => {
                Ok(zero(false, BigInt::zero()))
            }
            _ => Ok(infinity(false)),
        };
    }
    let odd_integer = yi.as_ref().map_or(false, |v| !v.is_even());
    if x.is_infinite() {
        let negative = x.is_negative() && odd_integer;
        return if y.is_negative() {
            Ok(zero(negative, BigInt::zero()))
        } else {
            Ok(infinity(negative))
        };
    }
    if x.is_zero_value() {
        let negative = x.is_negative() && odd_integer;
        if y.is_negative() {
            ctx.report(Signals::DIVIDE_BY_ZERO)?;
            return Ok(infinity(negative));
        }
        return Ok(zero(negative, BigInt::zero()));
    }

    if let Some(yi) = yi {
        let p = ctx.precision_u64();
        let wp = if p == 0 {
            0
        } else {
            p + yi.digit_count() + 6
        };
        let mut work = if wp == 0 {
            PrecisionContext::unlimited().with_blank_flags()
        } else {
            PrecisionContext::for_precision(wp).with_blank_flags()
        };
        let mag = yi.abs();
        let bits = mag.bit_length();
        let mut acc = one::<N>();
        let mut base = x.clone();
        for i in 0..bits {
            if mag.test_bit(i) {
                acc = multiply(&acc, &base, &mut work)?;
            }
            if i + 1 < bits {
                base = multiply(&base, &base, &mut work)?;
            }
        }
        if yi.is_negative() {
            acc = divide(&one::<N>(), &acc, &mut work)?;
        }
        let forced = if work.flags().contains(Signals::INEXACT) {
            Signals::INEXACT | Signals::ROUNDED
        } else {
            Signals::empty()
        };
        return round_parts(
            acc.is_negative(),
            acc.mantissa().clone(),
            acc.exponent().clone(),
            0,
            0,
            forced,
            ctx,
        );
    }

    // Non-integral exponent: defined for positive bases only.
    if x.is_negative() {
        return invalid_operation(ctx);
    }
    let p = ctx.precision_u64();
    if p == 0 {
        return Err(ArithmeticError::PrecisionRequired("power"));
    }
    let mut work = PrecisionContext::for_precision(p + 15);
    let lnx = ln(x, &mut work)?;
    let scaled = multiply(&lnx, y, &mut work)?;
    let result = exp(&scaled, &mut work)?;
    round_parts(
        result.is_negative(),
        result.mantissa().clone(),
        result.exponent().clone(),
        0,
        0,
        Signals::INEXACT | Signals::ROUNDED,
        ctx,
    )
}

/// Square root via the integer square root of the mantissa scaled to twice
/// the working digit count, with a sticky tail for correct rounding.
pub(crate) fn square_root<N: RadixNumber>(
    a: &N,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    if let Some(r) = handle_nans(a, None, ctx) {
        return r;
    }
    if a.is_infinite() {
        if a.is_negative() {
            return invalid_operation(ctx);
        }
        return Ok(infinity(false));
    }
    let ideal = a.exponent() >> 1;
    if a.mantissa().is_zero() {
        return Ok(zero(a.is_negative(), ideal));
    }
    if a.is_negative() {
        return invalid_operation(ctx);
    }
    let p = ctx.precision_u64();
    if p == 0 {
        return Err(ArithmeticError::PrecisionRequired("square-root"));
    }
    let d = digits_of::<N>(a.mantissa());
    let mut s = (2 * (p + 1)).saturating_sub(d);
    // The halved exponent must come out whole.
    let e_minus_s = a.exponent() - BigInt::from(s);
    if !e_minus_s.is_even() {
        s += 1;
    }
    let scaled = a.mantissa() * &N::radix_power(s);
    let root = scaled
        .sqrt()
        .map_err(|_| ArithmeticError::Unsupported("square-root"))?;
    let exact = root.square() == scaled;
    let rexp = (a.exponent() - BigInt::from(s)) >> 1;
    if exact {
        let mut m = root;
        let mut e = rexp;
        strip_toward_ideal::<N>(&mut m, &mut e, &ideal);
        return round_parts(false, m, e, 0, 0, Signals::empty(), ctx);
    }
    round_parts(false, root, rexp, 0, 1, Signals::empty(), ctx)
}

/// Round so the mantissa fits `precision` *bits*, whatever the radix.
pub(crate) fn round_to_binary_precision<N: RadixNumber>(
    x: &N,
    ctx: &mut PrecisionContext,
) -> OpResult<N> {
    if N::RADIX == 2 {
        return round_to_precision(x, ctx);
    }
    if let Some(r) = handle_nans(x, None, ctx) {
        return r;
    }
    if x.is_infinite() {
        return Ok(x.clone());
    }
    let p = ctx.precision_u64();
    if p == 0 {
        return round_to_precision(x, ctx);
    }
    let negative = x.is_negative();
    let mut m = x.mantissa().clone();
    let mut e = x.exponent().clone();
    let mut signals = Signals::empty();
    let mut last = 0u8;
    let mut sticky = 0u8;
    while m.bit_length() > p {
        let mut acc = N::accumulator(m, last, sticky);
        acc.shift_right(1);
        signals |= Signals::ROUNDED;
        last = acc.last_discarded();
        sticky = acc.sticky();
        m = acc.into_shifted();
        e = &e + &BigInt::one();
        if m.bit_length() <= p && (last != 0 || sticky != 0) {
            signals |= Signals::INEXACT;
            let low = N::low_digit(&m);
            if round_up(ctx.rounding(), negative, last, sticky, low, N::RADIX) {
                m = &m + &BigInt::one();
                last = 0;
                sticky = 1;
            }
        }
    }
    ctx.report(signals)?;
    Ok(finite(negative, m, e))
}
