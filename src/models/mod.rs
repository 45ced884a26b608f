pub mod api;
pub mod forecast;
pub mod price;
pub mod symbol;
