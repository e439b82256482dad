/// This module provides the CSV item reader and writer implementations.
pub mod csv;
