//! Amount extraction for Japanese invoices.

use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::models::invoice::TaxBreakdown;

use super::cascade::{Cascade, Rule};
use super::normalize::fold_width;
use super::patterns::{
    SUBTOTAL, TAX, TAX_BREAKDOWN, TAX_EXEMPT, TAX_RATE_LABELED, TAX_RATE_TARGET, TOTAL_LABELED,
    TOTAL_PLAIN, YEN_AMOUNT,
};
use super::{ExtractionMatch, FieldExtractor};

lazy_static! {
    static ref SIGNED_NUMBER: Regex = Regex::new(r"^-?[0-9]+(?:\.[0-9]+)?$").unwrap();
}

/// Smallest plausible invoice amount in yen.
pub fn min_amount() -> Decimal {
    Decimal::ONE_HUNDRED
}

/// Largest plausible invoice amount in yen.
pub fn max_amount() -> Decimal {
    Decimal::from(100_000_000u32)
}

/// Parse a yen amount token such as `¥1,234,567`, `１２，０００円` or `\5,000-`.
///
/// Currency symbols, thousands separators and whitespace are stripped and
/// full-width digits folded. The result must lie within 100 - 100,000,000
/// in absolute value; smaller or larger numbers near an amount label are
/// almost always phone numbers, postal codes or page numbers.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let folded = fold_width(s.trim());

    let cleaned: String = folded
        .chars()
        .filter(|c| !matches!(c, '¥' | '￥' | '\\' | '円' | ',') && !c.is_whitespace())
        .collect();

    // "¥10,000-" and "金壱万円也" style terminators.
    let cleaned = cleaned.trim_end_matches(['-', '也', '―', 'ー']);

    if !SIGNED_NUMBER.is_match(cleaned) {
        return None;
    }

    let amount = Decimal::from_str(cleaned).ok()?;
    let magnitude = amount.abs();

    (magnitude >= min_amount() && magnitude <= max_amount()).then_some(amount)
}

fn parse_positive_amount(s: &str) -> Option<Decimal> {
    parse_amount(s).filter(|a| a.is_sign_positive())
}

fn parse_tax_rate(s: &str) -> Option<u32> {
    fold_width(s).trim().parse().ok().filter(|r| (1..=30).contains(r))
}

/// Amounts found on an invoice before reconciliation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceAmounts {
    /// Amount before tax (小計).
    pub subtotal: Option<ExtractionMatch<Decimal>>,
    /// Consumption tax (消費税).
    pub tax: Option<ExtractionMatch<Decimal>>,
    /// Amount including tax (ご請求金額).
    pub total: Option<ExtractionMatch<Decimal>>,
    /// Tax rate annotated in the text ("10%対象").
    pub tax_rate: Option<u32>,
    /// Per-rate breakdown lines.
    pub breakdown: Vec<TaxBreakdown>,
    /// 非課税/免税/不課税 appears in the text.
    pub tax_exempt: bool,
}

/// Labeled amount extractor.
#[derive(Debug)]
pub struct AmountExtractor {
    total: Cascade<Decimal>,
    subtotal: Cascade<Decimal>,
    tax: Cascade<Decimal>,
    rate: Cascade<u32>,
}

impl AmountExtractor {
    pub fn new() -> Self {
        Self {
            total: Cascade::new("total_amount")
                .rule(Rule::pattern(&TOTAL_LABELED, 0.95, parse_positive_amount))
                .rule(Rule::pattern(&TOTAL_PLAIN, 0.85, parse_positive_amount))
                .rule(Rule::pattern(&YEN_AMOUNT, 0.5, parse_positive_amount)),
            subtotal: Cascade::new("subtotal")
                .rule(Rule::pattern(&SUBTOTAL, 0.9, parse_positive_amount)),
            tax: Cascade::new("tax_amount")
                .rule(Rule::pattern(&TAX, 0.9, parse_positive_amount)),
            rate: Cascade::new("tax_rate")
                .rule(Rule::pattern(&TAX_RATE_TARGET, 0.9, parse_tax_rate))
                .rule(Rule::pattern(&TAX_RATE_LABELED, 0.8, parse_tax_rate)),
        }
    }

    /// Extract labeled totals, the annotated tax rate and the breakdown.
    pub fn extract(&self, text: &str) -> InvoiceAmounts {
        InvoiceAmounts {
            subtotal: self.subtotal.extract(text),
            tax: self.tax.extract(text),
            total: self.total.extract(text),
            tax_rate: self.rate.extract(text).map(|m| m.value),
            breakdown: extract_tax_breakdown(text),
            tax_exempt: TAX_EXEMPT.is_match(text),
        }
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract amounts from invoice text.
pub fn extract_amounts(text: &str) -> InvoiceAmounts {
    AmountExtractor::new().extract(text)
}

/// Read `10%対象 ¥100,000 消費税 ¥10,000` style breakdown lines.
///
/// When the tax figure is missing it is computed (truncated, as Japanese
/// invoices round consumption tax down). One entry per rate.
pub fn extract_tax_breakdown(text: &str) -> Vec<TaxBreakdown> {
    let mut breakdown: Vec<TaxBreakdown> = Vec::new();

    for caps in TAX_BREAKDOWN.captures_iter(text) {
        let Some(rate) = parse_tax_rate(&caps[1]).map(Decimal::from) else {
            continue;
        };
        let Some(taxable_amount) = parse_positive_amount(&caps[2]) else {
            continue;
        };
        if breakdown.iter().any(|b| b.rate == rate) {
            continue;
        }

        let amount = caps
            .get(3)
            .and_then(|m| parse_positive_amount(m.as_str()))
            .unwrap_or_else(|| tax_for(taxable_amount, rate));

        breakdown.push(TaxBreakdown {
            rate,
            amount,
            taxable_amount,
        });
    }

    breakdown
}

/// Consumption tax on `amount` at `rate` percent, rounded down.
pub fn tax_for(amount: Decimal, rate: Decimal) -> Decimal {
    (amount * rate / Decimal::ONE_HUNDRED).round_dp_with_strategy(0, RoundingStrategy::ToZero)
}

/// Which reconciliation rule produced the final amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationTier {
    /// Subtotal and tax were both read from the text.
    Extracted,
    /// Tax derived as total minus subtotal.
    FromSubtotal,
    /// Subtotal derived as total minus tax.
    FromTax,
    /// Both back-computed from the total and a tax rate.
    FromRate,
}

/// Final, mutually consistent amounts.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledAmounts {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    /// Tax rate in percent.
    pub rate: Decimal,
    pub tier: ReconciliationTier,
}

/// Reconcile subtotal, tax and total, trusting extracted values first.
///
/// 1. subtotal and tax extracted: keep both.
/// 2. only subtotal: tax = total - subtotal.
/// 3. only tax: subtotal = total - tax.
/// 4. neither: subtotal = round(total / (1 + rate / 100)), tax = total - subtotal,
///    with `rate` the annotated rate or `default_rate`.
///
/// In tiers 1 - 3 the rate is derived as tax / subtotal x 100. Derived
/// amounts never go below zero.
pub fn reconcile(
    total: Decimal,
    subtotal: Option<Decimal>,
    tax: Option<Decimal>,
    detected_rate: Option<u32>,
    default_rate: u32,
) -> ReconciledAmounts {
    let (subtotal, tax, tier) = match (subtotal, tax) {
        (Some(subtotal), Some(tax)) => (subtotal, tax, ReconciliationTier::Extracted),
        (Some(subtotal), None) => (
            subtotal,
            (total - subtotal).max(Decimal::ZERO),
            ReconciliationTier::FromSubtotal,
        ),
        (None, Some(tax)) => (
            (total - tax).max(Decimal::ZERO),
            tax,
            ReconciliationTier::FromTax,
        ),
        (None, None) => {
            let rate = Decimal::from(detected_rate.unwrap_or(default_rate));
            let divisor = Decimal::ONE + rate / Decimal::ONE_HUNDRED;
            let subtotal =
                (total / divisor).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
            debug!(%total, %rate, "back-computing subtotal from total");
            return ReconciledAmounts {
                subtotal,
                tax: (total - subtotal).max(Decimal::ZERO),
                total,
                rate,
                tier: ReconciliationTier::FromRate,
            };
        }
    };

    let rate = if subtotal.is_zero() {
        Decimal::ZERO
    } else {
        (tax / subtotal * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
    };

    ReconciledAmounts {
        subtotal,
        tax,
        total,
        rate,
        tier,
    }
}

/// Every plausible yen-prefixed amount, in document order.
impl FieldExtractor for AmountExtractor {
    type Output = ExtractionMatch<Decimal>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        YEN_AMOUNT
            .captures_iter(text)
            .filter_map(|caps| {
                let m = caps.get(0)?;
                parse_amount(&caps[1]).map(|amount| {
                    ExtractionMatch::new(amount, 0.5, m.as_str()).with_position(m.start(), m.end())
                })
            })
            .collect()
    }
}
