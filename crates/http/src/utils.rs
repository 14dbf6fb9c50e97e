//! Helper macros used across the parsers.

/// Returns early with `$error` unless `$predicate` holds.
///
/// The parsing counterpart of `assert!`: a broken rule becomes an `Err`
/// instead of a panic.
///
/// ```ignore
/// ensure!(self.headers.len() < max_headers, ParseError::too_many_headers(max_headers));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
