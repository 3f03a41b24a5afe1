mod driver;

fn main() -> std::process::ExitCode {
    driver::run()
}
