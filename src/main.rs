fn main() {
    if let Err(e) = dstls::cli::run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
