fn main() {
    if let Err(e) = storefront_admin_lib::run() {
        eprintln!("storefront-admin failed: {}", e);
        std::process::exit(1);
    }
}
