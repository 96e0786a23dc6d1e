fn main() {
    assetc::cli::start_cli();
}
