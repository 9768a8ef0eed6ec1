pub mod body;
pub mod probe;
pub mod result;

pub mod prelude {
    pub use super::probe::Prober;
    pub use super::result::{OutcomeKind, ProbeBody, ProbeOutcome};
}

use std::error::Error;
use std::fmt::Write;
use std::io;

/// Flatten an error and its sources into one line.
pub(crate) fn report(mut err: &(dyn Error + 'static)) -> String {
    let mut s = format!("{}", err);
    while let Some(src) = err.source() {
        let _ = write!(s, ": {}", src);
        err = src;
    }
    s
}

/// Whether any error in the source chain is a refused TCP connection.
pub(crate) fn is_connection_refused(mut err: &(dyn Error + 'static)) -> bool {
    loop {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        match err.source() {
            Some(src) => err = src,
            None => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("connect failed")]
    struct Wrapper(#[source] io::Error);

    #[test]
    fn report_joins_the_source_chain() {
        let err = Wrapper(io::Error::new(io::ErrorKind::Other, "no route"));
        assert_eq!(report(&err), "connect failed: no route");
    }

    #[test]
    fn refused_connection_is_found_in_sources() {
        let err = Wrapper(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(is_connection_refused(&err));

        let err = Wrapper(io::Error::from(io::ErrorKind::TimedOut));
        assert!(!is_connection_refused(&err));
    }
}
