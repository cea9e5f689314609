pub mod entity;
pub mod error;
pub mod flow;
pub mod inout;
pub mod redirect;
