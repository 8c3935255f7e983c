pub mod blueprint;
pub mod character;
pub mod element;
pub mod history;
pub mod mood;
pub mod request;
