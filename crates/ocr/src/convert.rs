use std::num::ParseIntError;
use std::sync::OnceLock;

use meisai_core::{Page, PageError, TextBox, Transaction, TransactionList};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

const DEFAULT_DATE_PATTERN: &str = r"\d{2}\.\d{2}\.\d{2}";

re!(re_date_default, r"^(?:\d{2}\.\d{2}\.\d{2})");

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Invalid page: {0}")]
    InvalidInput(#[from] PageError),
    #[error("Degenerate page: median text box height is zero")]
    DegeneratePage,
    #[error("No transactions detectable: found {amounts} amount box(es) and {dates} date box(es)")]
    NoCandidates { amounts: usize, dates: usize },
    #[error("Amount text '{text}' is not an integer")]
    AmountParse {
        text: String,
        #[source]
        source: ParseIntError,
    },
    #[error("Invalid date pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("Height tolerance must be a positive number, got {0}")]
    InvalidTolerance(f64),
}

/// Tunables for [`PageConverter`], read from the `[converter]` config table.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConverterConfig {
    /// Any box whose text contains this character is an amount candidate.
    pub currency_marker: char,
    /// Matched against the start of each box's text to find date candidates.
    pub date_pattern: String,
    /// Maximum relative deviation from the page's median box height an amount
    /// box may have, exclusive.
    pub height_tolerance: f64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            currency_marker: '円',
            date_pattern: DEFAULT_DATE_PATTERN.to_string(),
            height_tolerance: 0.5,
        }
    }
}

/// Turns the unordered boxes of one statement page into transactions.
///
/// The page layout is a vertical list of entries. Each entry prints its amount
/// on one line and its date on a lower line, with the title text to the left
/// of the amount, between the two.
#[derive(Debug, Clone)]
pub struct PageConverter {
    currency_marker: char,
    date_re: Regex,
    height_tolerance: f64,
}

impl Default for PageConverter {
    fn default() -> Self {
        let config = ConverterConfig::default();
        Self {
            currency_marker: config.currency_marker,
            date_re: re_date_default().clone(),
            height_tolerance: config.height_tolerance,
        }
    }
}

impl PageConverter {
    pub fn new(config: ConverterConfig) -> Result<Self, ConvertError> {
        if !config.height_tolerance.is_finite() || config.height_tolerance <= 0.0 {
            return Err(ConvertError::InvalidTolerance(config.height_tolerance));
        }
        // Always anchored at the start; trailing text after the date is fine.
        let date_re = Regex::new(&format!("^(?:{})", config.date_pattern))?;
        Ok(Self {
            currency_marker: config.currency_marker,
            date_re,
            height_tolerance: config.height_tolerance,
        })
    }

    pub fn read_to_transactions(&self, page: &Page) -> Result<TransactionList, ConvertError> {
        let (amounts, dates) = self.classify(page);

        let median = page.median_height()?;
        if median == 0.0 {
            return Err(ConvertError::DegeneratePage);
        }
        let mut amounts = self.reject_height_outliers(amounts, median);
        let mut dates = dates;
        sort_by_top(&mut amounts);
        sort_by_top(&mut dates);

        let dates = trim_orphan_date(&amounts, &dates)?;

        if amounts.len() != dates.len() {
            tracing::warn!(
                amounts = amounts.len(),
                dates = dates.len(),
                "Unpaired candidates will be dropped"
            );
        }

        amounts
            .iter()
            .zip(dates)
            .map(|(amount, date)| self.assemble(page, amount, date))
            .collect()
    }

    /// Split boxes into amount and date candidates. A box can be both.
    fn classify<'p>(&self, page: &'p Page) -> (Vec<&'p TextBox>, Vec<&'p TextBox>) {
        let mut amounts = Vec::new();
        let mut dates = Vec::new();
        for b in page.boxes() {
            if self.is_amount(b) {
                amounts.push(b);
            }
            if self.is_date(b) {
                dates.push(b);
            }
        }
        tracing::debug!(amounts = amounts.len(), dates = dates.len(), "Classified boxes");
        (amounts, dates)
    }

    fn is_amount(&self, b: &TextBox) -> bool {
        b.text().contains(self.currency_marker)
    }

    fn is_date(&self, b: &TextBox) -> bool {
        self.date_re.is_match(b.text())
    }

    /// Drops boxes much taller or shorter than typical text (totals, headers, specks).
    fn reject_height_outliers<'p>(&self, boxes: Vec<&'p TextBox>, median: f64) -> Vec<&'p TextBox> {
        let before = boxes.len();
        let kept: Vec<_> = boxes
            .into_iter()
            .filter(|b| (b.height() - median).abs() / median < self.height_tolerance)
            .collect();
        tracing::debug!(median, before, after = kept.len(), "Rejected amount height outliers");
        kept
    }

    fn assemble(&self, page: &Page, amount: &TextBox, date: &TextBox) -> Result<Transaction, ConvertError> {
        let value = self.parse_amount(amount.text())?;
        let title = title_between(page, amount, date);
        let tx = Transaction::new(normalize_date(date.text()), title, value);
        if tx.naive_date().is_none() {
            tracing::warn!(date = tx.date(), "Date is not a calendar date; keeping it as read");
        }
        Ok(tx)
    }

    fn parse_amount(&self, text: &str) -> Result<i64, ConvertError> {
        let clean: String = text
            .chars()
            .filter(|&c| c != self.currency_marker && c != ',')
            .collect();
        clean.trim().parse().map_err(|source| ConvertError::AmountParse {
            text: text.to_string(),
            source,
        })
    }
}

fn sort_by_top(boxes: &mut [&TextBox]) {
    boxes.sort_by(|a, b| a.y_top().total_cmp(&b.y_top()));
}

/// An amount always sits above its date, so a date above the first amount
/// belongs to an entry cut off at the top of the photo.
fn trim_orphan_date<'a, 'p>(
    amounts: &[&'p TextBox],
    dates: &'a [&'p TextBox],
) -> Result<&'a [&'p TextBox], ConvertError> {
    let (Some(first_amount), Some(first_date)) = (amounts.first(), dates.first()) else {
        return Err(ConvertError::NoCandidates { amounts: amounts.len(), dates: dates.len() });
    };
    if first_date.y_top() < first_amount.y_top() {
        tracing::debug!(text = first_date.text(), "Dropping orphan date above first amount");
        return Ok(&dates[1..]);
    }
    Ok(dates)
}

/// Concatenates every box left of the amount whose bottom edge falls between
/// the amount's top and the date's top.
// TODO: sort fragments left-to-right, top-to-bottom; page order is not reading order.
fn title_between(page: &Page, amount: &TextBox, date: &TextBox) -> String {
    page.boxes()
        .iter()
        .filter(|b| {
            b.x_right() < amount.x_left()
                && b.y_bottom() > amount.y_top()
                && b.y_bottom() < date.y_top()
        })
        .map(TextBox::text)
        .collect()
}

fn normalize_date(text: &str) -> String {
    text.replace('.', "/")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use meisai_core::Point;

    const H: f64 = 20.0;

    fn tb(text: &str, x: f64, y: f64, w: f64) -> TextBox {
        TextBox::from_rect(text, x, y, w, H)
    }

    fn amount_at(text: &str, y: f64) -> TextBox {
        tb(text, 300.0, y, 100.0)
    }

    fn date_at(text: &str, y: f64) -> TextBox {
        tb(text, 20.0, y, 80.0)
    }

    fn convert(boxes: Vec<TextBox>) -> Result<TransactionList, ConvertError> {
        PageConverter::default().read_to_transactions(&Page::new(boxes))
    }

    fn row(date: &str, title: &str, amount: i64) -> (String, String, i64) {
        (date.to_string(), title.to_string(), amount)
    }

    fn rows(list: &TransactionList) -> Vec<(String, String, i64)> {
        list.iter()
            .map(|t| (t.date().to_string(), t.title().to_string(), t.amount()))
            .collect()
    }

    // ── Classification ────────────────────────────────────────────────────────

    #[test]
    fn amount_classification_is_text_only() {
        let c = PageConverter::default();
        assert!(c.is_amount(&tb("1,000円", 0.0, 0.0, 10.0)));
        assert!(c.is_amount(&tb("合計 円", 9999.0, 9999.0, 1.0)));
        assert!(!c.is_amount(&tb("1,000", 300.0, 100.0, 100.0)));
    }

    #[test]
    fn date_classification_anchored_at_start() {
        let c = PageConverter::default();
        assert!(c.is_date(&tb("24.01.15", 0.0, 0.0, 1.0)));
        assert!(c.is_date(&tb("24.01.15 ご利用", 0.0, 0.0, 1.0)));
        assert!(!c.is_date(&tb("ご利用 24.01.15", 0.0, 0.0, 1.0)));
        assert!(!c.is_date(&tb("2024.01.15", 0.0, 0.0, 1.0)));
        assert!(!c.is_date(&tb("24/01/15", 0.0, 0.0, 1.0)));
        assert!(!c.is_date(&tb("4.01.15", 0.0, 0.0, 1.0)));
    }

    #[test]
    fn box_can_be_amount_and_date() {
        let page = Page::new(vec![tb("24.01.15 500円", 0.0, 0.0, 10.0)]);
        let (amounts, dates) = PageConverter::default().classify(&page);
        assert_eq!(amounts.len(), 1);
        assert_eq!(dates.len(), 1);
    }

    // ── Outlier rejection ─────────────────────────────────────────────────────

    #[test]
    fn outlier_boundary_is_exclusive() {
        let c = PageConverter::default();
        let heights = [9.0, 10.0, 11.0, 20.0, 29.0, 30.0, 31.0];
        let boxes: Vec<_> = heights
            .iter()
            .map(|&h| TextBox::from_rect("1円", 0.0, 0.0, 10.0, h))
            .collect();
        let kept: Vec<f64> = c
            .reject_height_outliers(boxes.iter().collect(), 20.0)
            .iter()
            .map(|b| b.height())
            .collect();
        assert_eq!(kept, [11.0, 20.0, 29.0]);
    }

    #[test]
    fn large_total_box_is_ignored() {
        let page = vec![
            TextBox::from_rect("合計 5,000円", 300.0, 10.0, 300.0, 60.0),
            amount_at("1,200円", 100.0),
            date_at("24.01.15", 140.0),
        ];
        let list = convert(page).unwrap();
        assert_eq!(rows(&list), [row("24/01/15", "", 1200)]);
    }

    // ── Pairing ───────────────────────────────────────────────────────────────

    #[test]
    fn single_entry_roundtrip() {
        let list = convert(vec![amount_at("1,234円", 100.0), date_at("24.01.15", 140.0)]).unwrap();
        assert_eq!(rows(&list), [row("24/01/15", "", 1234)]);
    }

    #[test]
    fn pairs_in_top_to_bottom_order_regardless_of_page_order() {
        let list = convert(vec![
            date_at("24.01.20", 240.0),
            amount_at("2,000円", 200.0),
            date_at("24.01.15", 140.0),
            amount_at("1,000円", 100.0),
        ])
        .unwrap();
        assert_eq!(
            rows(&list),
            [
                row("24/01/15", "", 1000),
                row("24/01/20", "", 2000),
            ]
        );
    }

    #[test]
    fn tied_tops_pair_in_page_order() {
        let list = convert(vec![
            amount_at("100円", 100.0),
            amount_at("200円", 100.0),
            date_at("24.01.01", 140.0),
            date_at("24.01.02", 140.0),
        ])
        .unwrap();
        assert_eq!(
            rows(&list),
            [
                row("24/01/01", "", 100),
                row("24/01/02", "", 200),
            ]
        );
    }

    #[test]
    fn extra_amount_is_discarded() {
        let list = convert(vec![
            amount_at("100円", 100.0),
            date_at("24.01.01", 140.0),
            amount_at("200円", 200.0),
            date_at("24.01.02", 240.0),
            amount_at("300円", 300.0),
        ])
        .unwrap();
        assert_eq!(list.len(), 2);
        let amounts: Vec<_> = list.iter().map(Transaction::amount).collect();
        assert_eq!(amounts, [100, 200]);
    }

    #[test]
    fn orphan_top_date_is_dropped() {
        let list = convert(vec![
            date_at("23.12.31", 40.0),
            amount_at("500円", 100.0),
            date_at("24.01.01", 140.0),
            amount_at("700円", 200.0),
            date_at("24.01.02", 240.0),
        ])
        .unwrap();
        assert_eq!(
            rows(&list),
            [
                row("24/01/01", "", 500),
                row("24/01/02", "", 700),
            ]
        );
    }

    #[test]
    fn only_one_orphan_date_is_trimmed() {
        let list = convert(vec![
            date_at("23.12.30", 20.0),
            date_at("23.12.31", 40.0),
            amount_at("500円", 100.0),
        ])
        .unwrap();
        // The second orphan survives the trim and pairs with the amount.
        assert_eq!(rows(&list), [row("23/12/31", "", 500)]);
    }

    #[test]
    fn trimming_the_only_date_yields_empty_list() {
        let list = convert(vec![date_at("24.01.01", 40.0), amount_at("500円", 100.0)]).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn pair_count_never_exceeds_shorter_list() {
        for n_amounts in 1..5 {
            for n_dates in 1..5 {
                let mut page = Vec::new();
                for i in 0..n_amounts {
                    page.push(amount_at("1円", 100.0 + 100.0 * i as f64));
                }
                for i in 0..n_dates {
                    page.push(date_at("24.01.01", 140.0 + 100.0 * i as f64));
                }
                let list = convert(page).unwrap();
                assert_eq!(list.len(), n_amounts.min(n_dates));
            }
        }
    }

    // ── Titles ────────────────────────────────────────────────────────────────

    #[test]
    fn title_concatenates_in_page_order() {
        let list = convert(vec![
            amount_at("880円", 100.0),
            tb("渋谷店", 150.0, 105.0, 60.0),
            date_at("24.01.15", 140.0),
            tb("ローソン", 20.0, 105.0, 120.0),
        ])
        .unwrap();
        // Reading order would be "ローソン渋谷店"; page order wins.
        assert_eq!(list.as_slice()[0].title(), "渋谷店ローソン");
    }

    #[test]
    fn title_region_bounds() {
        let list = convert(vec![
            amount_at("880円", 100.0),
            date_at("24.01.15", 140.0),
            // Bottom edge above the amount's top.
            tb("header", 20.0, 70.0, 50.0),
            // Right edge past the amount's left edge.
            tb("overlap", 250.0, 105.0, 60.0),
            // Bottom edge below the date's top.
            tb("below", 20.0, 125.0, 50.0),
            tb("ok", 20.0, 100.0, 50.0),
        ])
        .unwrap();
        assert_eq!(list.as_slice()[0].title(), "ok");
    }

    #[test]
    fn titles_are_per_entry() {
        let list = convert(vec![
            amount_at("100円", 100.0),
            tb("A社", 20.0, 105.0, 60.0),
            date_at("24.01.01", 140.0),
            amount_at("200円", 200.0),
            tb("B社", 20.0, 205.0, 60.0),
            date_at("24.01.02", 240.0),
        ])
        .unwrap();
        let titles: Vec<_> = list.iter().map(Transaction::title).collect();
        assert_eq!(titles, ["A社", "B社"]);
    }

    // ── Normalization ─────────────────────────────────────────────────────────

    #[test]
    fn normalizes_amount_and_date() {
        let list = convert(vec![amount_at("10,000円", 100.0), date_at("23.12.01", 140.0)]).unwrap();
        assert_eq!(rows(&list), [row("23/12/01", "", 10000)]);
    }

    #[test]
    fn amount_whitespace_is_trimmed() {
        let c = PageConverter::default();
        assert_eq!(c.parse_amount(" 1,200 円").unwrap(), 1200);
        assert_eq!(c.parse_amount("-300円").unwrap(), -300);
    }

    #[test]
    fn date_is_not_validated() {
        assert_eq!(normalize_date("99.99.99"), "99/99/99");
        assert_eq!(normalize_date("24.01.15 ご利用"), "24/01/15 ご利用");
    }

    #[test]
    fn impossible_calendar_date_still_converts() {
        let list = convert(vec![amount_at("800円", 100.0), date_at("24.13.40", 140.0)]).unwrap();
        assert_eq!(rows(&list), [row("24/13/40", "", 800)]);
        assert!(list.iter().next().unwrap().naive_date().is_none());
    }

    // ── Errors ────────────────────────────────────────────────────────────────

    #[test]
    fn malformed_amount_is_parse_error() {
        let err = convert(vec![amount_at("ABC円", 100.0), date_at("24.01.15", 140.0)]).unwrap_err();
        assert!(matches!(err, ConvertError::AmountParse { ref text, .. } if text == "ABC円"));
    }

    #[test]
    fn decimal_amount_is_parse_error() {
        let err = PageConverter::default().parse_amount("1.5円").unwrap_err();
        assert!(matches!(err, ConvertError::AmountParse { .. }));
    }

    #[test]
    fn empty_page_is_invalid_input() {
        let err = convert(vec![]).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidInput(PageError::Empty)));
    }

    #[test]
    fn zero_median_is_degenerate() {
        let flat = |t: &str| TextBox::new(t, vec![Point::new(1.0, 1.0), Point::new(5.0, 1.0)]).unwrap();
        let err = convert(vec![flat("1円"), flat("24.01.01")]).unwrap_err();
        assert!(matches!(err, ConvertError::DegeneratePage));
    }

    #[test]
    fn no_dates_is_no_candidates() {
        let err = convert(vec![amount_at("1円", 100.0), tb("noise", 0.0, 0.0, 10.0)]).unwrap_err();
        assert!(matches!(err, ConvertError::NoCandidates { amounts: 1, dates: 0 }));
    }

    #[test]
    fn amounts_filtered_away_is_no_candidates() {
        let err = convert(vec![
            TextBox::from_rect("合計 9,999円", 300.0, 10.0, 300.0, 80.0),
            date_at("24.01.15", 140.0),
            tb("a", 0.0, 200.0, 10.0),
        ])
        .unwrap_err();
        assert!(matches!(err, ConvertError::NoCandidates { amounts: 0, dates: 1 }));
    }

    // ── Config ────────────────────────────────────────────────────────────────

    #[test]
    fn custom_marker_and_pattern() {
        let c = PageConverter::new(ConverterConfig {
            currency_marker: '$',
            date_pattern: r"\d{4}-\d{2}-\d{2}".to_string(),
            height_tolerance: 0.5,
        })
        .unwrap();
        let page = Page::new(vec![amount_at("$1,500", 100.0), date_at("2024-01-15 paid", 140.0)]);
        let list = c.read_to_transactions(&page).unwrap();
        assert_eq!(rows(&list), [row("2024-01-15 paid", "", 1500)]);
    }

    #[test]
    fn leading_caret_in_pattern_is_harmless() {
        let c = PageConverter::new(ConverterConfig {
            date_pattern: r"^\d{2}\.\d{2}\.\d{2}".to_string(),
            ..ConverterConfig::default()
        })
        .unwrap();
        assert!(c.is_date(&tb("24.01.15", 0.0, 0.0, 1.0)));
        assert!(!c.is_date(&tb("x24.01.15", 0.0, 0.0, 1.0)));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let bad_re = ConverterConfig { date_pattern: "(".to_string(), ..ConverterConfig::default() };
        assert!(matches!(PageConverter::new(bad_re), Err(ConvertError::InvalidPattern(_))));

        let bad_tol = ConverterConfig { height_tolerance: 0.0, ..ConverterConfig::default() };
        assert!(matches!(PageConverter::new(bad_tol), Err(ConvertError::InvalidTolerance(_))));
    }
}
