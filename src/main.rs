fn main() {
    if let Err(error) = guided_sessions_lib::run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}
