pub mod functions;
pub mod inspect;
pub mod search;
