use std::process;

fn main() {
    let code = mltlc::cli::run();
    process::exit(code as i32);
}
