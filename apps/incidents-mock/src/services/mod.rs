pub mod fixtures;
pub mod interception;
pub mod schema;
pub mod selectors;
pub mod series;
pub mod timeline;
