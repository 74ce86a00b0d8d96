//! Error macros for quire

/// Return early with a constraint violation
#[macro_export]
macro_rules! bail_constraint {
    ($($arg:tt)*) => {
        return Err($crate::error::QuireError::ConstraintViolation(format!($($arg)*)))
    };
}

/// Return early with a not-found error for the given entity kind
#[macro_export]
macro_rules! bail_not_found {
    ($entity:expr, $id:expr) => {
        return Err($crate::error::QuireError::not_found($entity, $id))
    };
}
