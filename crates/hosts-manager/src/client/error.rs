use crate::server::service::ServiceError;

/// Exit codes following Unix conventions
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_CONFLICT: i32 = 3;

/// Turn a service error into a user-facing message
pub fn format_service_error(err: &ServiceError) -> String {
    match err {
        e if e.is_invalid_request() => format!("Invalid input: {}", e),
        e if e.is_conflict() => format!("Conflict: {}", e),
        e => format!("Error: {}", e),
    }
}

pub fn exit_code_for_error(err: &ServiceError) -> i32 {
    match err {
        e if e.is_invalid_request() => EXIT_USAGE,
        e if e.is_conflict() => EXIT_CONFLICT,
        _ => EXIT_ERROR,
    }
}
