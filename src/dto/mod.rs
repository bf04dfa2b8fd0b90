pub mod cart;
pub mod params;
pub mod product_details;
pub mod products;
pub mod promotions;
