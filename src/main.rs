fn main() -> std::process::ExitCode {
    medsum_lib::run()
}
