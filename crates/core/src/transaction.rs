use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One statement entry recovered from a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// `YY/MM/DD`, exactly as printed. Not validated as a calendar date.
    date: String,
    title: String,
    /// Whole currency units (yen have no minor unit).
    amount: i64,
}

impl Transaction {
    pub fn new(date: impl Into<String>, title: impl Into<String>, amount: i64) -> Self {
        Self { date: date.into(), title: title.into(), amount }
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// The date as a calendar date, if it is one.
    pub fn naive_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%y/%m/%d").ok()
    }
}

impl std::fmt::Display for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.date, self.title, self.amount)
    }
}

/// Transactions in processing order (top-to-bottom per page, pages in input order).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionList {
    items: Vec<Transaction>,
}

impl TransactionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tx: Transaction) {
        self.items.push(tx);
    }

    /// Append every transaction of `other`, keeping its order.
    pub fn extend(&mut self, other: TransactionList) {
        self.items.extend(other.items);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Transaction> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Transaction] {
        &self.items
    }
}

impl FromIterator<Transaction> for TransactionList {
    fn from_iter<I: IntoIterator<Item = Transaction>>(iter: I) -> Self {
        Self { items: iter.into_iter().collect() }
    }
}

impl IntoIterator for TransactionList {
    type Item = Transaction;
    type IntoIter = std::vec::IntoIter<Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a TransactionList {
    type Item = &'a Transaction;
    type IntoIter = std::slice::Iter<'a, Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
