use std::process::ExitCode;

fn main() -> ExitCode {
    match git_stack::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            git_stack::ui::output::error(format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
