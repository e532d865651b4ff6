/// Returns early with `$error` unless `$predicate` holds.
///
/// ```ignore
/// ensure!(!self.is_started(), SendError::AlreadyStarted);
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
