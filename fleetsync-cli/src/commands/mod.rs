pub mod domains;
pub mod sites;
pub mod sync;
