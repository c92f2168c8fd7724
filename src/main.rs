use std::process::ExitCode;

use lockpool::pool::PoolError;
use lockpool::ui::output;

fn main() -> ExitCode {
    match lockpool::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<PoolError>() {
                Some(pool_err) => output::error(format!("[{}] {:#}", pool_err.code(), err)),
                None => output::error(format!("{:#}", err)),
            }
            ExitCode::FAILURE
        }
    }
}
