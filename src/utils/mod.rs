pub mod db_utils;
pub mod filter;
pub mod pagination;
