pub mod product {
    include!(concat!(env!("OUT_DIR"), "/product.rs"));
}
