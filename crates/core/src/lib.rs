pub mod geometry;
pub mod page;
pub mod transaction;

pub use geometry::{GeometryError, Point, TextBox};
pub use page::{Page, PageError};
pub use transaction::{Transaction, TransactionList};
