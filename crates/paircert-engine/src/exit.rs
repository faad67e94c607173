//! The stable exit-code contract. Every failure kind maps to its code here
//! and nowhere else.

use crate::driver::DriverError;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_VALIDATION: i32 = 2;
pub const EXIT_GENERATOR: i32 = 3;
pub const EXIT_VERIFICATION: i32 = 4;
pub const EXIT_TIMEOUT: i32 = 5;

pub fn exit_code(error: &DriverError) -> i32 {
    match error {
        DriverError::Validation(_) => EXIT_VALIDATION,
        DriverError::Generator(_) => EXIT_GENERATOR,
        DriverError::Verification { .. } => EXIT_VERIFICATION,
        DriverError::Timeout(_) => EXIT_TIMEOUT,
        DriverError::Internal(_) => EXIT_GENERATOR,
    }
}
