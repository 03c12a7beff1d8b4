pub mod table;

pub use table::{PRIMARY_KEY, Table, TableSchema};
