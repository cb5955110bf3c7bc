pub mod consultation;

pub use consultation::{handle_consultation, ProxyResponse};
