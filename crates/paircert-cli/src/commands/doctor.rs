// The `doctor` command: prove the external generator is usable end-to-end.

use std::time::Duration;

use paircert_engine::DriverError;
use paircert_pict::{resolve_pict, PictRunner};

use crate::cli::DoctorArgs;

const CANARY_MODEL: &str = "a: A1, A2\nb: B1, B2\n";
const CANARY_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn run(args: &DoctorArgs) -> Result<(), DriverError> {
    println!("paircert doctor");
    println!("---------------");

    let binary = match resolve_pict(args.pict_path.as_deref()) {
        Ok(binary) => binary,
        Err(error) => {
            println!("Generator lookup   : FAILED ({error})");
            return Err(DriverError::Validation(error.to_string()));
        }
    };
    println!("Generator binary   : {}", binary.display());

    let runner = PictRunner::new(binary);
    let output = match runner.run(CANARY_MODEL, 2, 0, CANARY_TIMEOUT) {
        Ok(output) => output,
        Err(error) => {
            println!("Generator run      : FAILED ({error})");
            return Err(DriverError::Generator(error.to_string()));
        }
    };
    if output.contains("A1") && output.contains("B1") {
        println!("Generator run      : OK");
    } else {
        println!("Generator run      : UNEXPECTED OUTPUT");
        return Err(DriverError::Generator(
            "generator ran but did not echo the canary model's values".to_string(),
        ));
    }

    println!("Doctor checks passed.");
    Ok(())
}
