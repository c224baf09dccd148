pub mod import;
pub mod review;
