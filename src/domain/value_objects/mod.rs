pub mod price;
pub mod quantity;
