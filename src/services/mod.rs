pub mod cart_service;
pub mod product_detail_service;
pub mod promotion_service;
pub mod variant_service;
