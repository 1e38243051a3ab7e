pub mod fetch;
pub mod replace;
pub mod search;
