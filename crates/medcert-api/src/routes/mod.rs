pub mod backup;
pub mod documents;
pub mod search;
pub mod status;
